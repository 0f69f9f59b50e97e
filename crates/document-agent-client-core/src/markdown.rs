use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

const BLOCKED_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

/// Renders agent/user message content as HTML with GFM extensions.
/// Raw HTML is emitted as escaped text and script-capable link targets are
/// replaced with `#`, so the result is safe to assign to `innerHTML`.
#[must_use]
pub fn render_markdown_html(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let events = Parser::new_ext(source, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: neutralize_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: neutralize_url(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut rendered = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut rendered, events);
    rendered
}

fn neutralize_url(url: CowStr<'_>) -> CowStr<'_> {
    let normalized: String = url
        .chars()
        .filter(|ch| !ch.is_whitespace() && !ch.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    if BLOCKED_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
    {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_emphasis_and_lists() {
        let html = render_markdown_html("**Values**\n\n- solidarity\n- democracy\n");
        assert!(html.contains("<strong>Values</strong>"));
        assert!(html.contains("<li>solidarity</li>"));
    }

    #[test]
    fn renders_gfm_tables_and_strikethrough() {
        let html = render_markdown_html("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~old~~");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>2</td>"));
        assert!(html.contains("<del>old</del>"));
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = render_markdown_html("<script>alert(1)</script>\n\nhi <b onclick=x>there</b>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<b onclick"));
    }

    #[test]
    fn script_links_are_neutralized() {
        let html = render_markdown_html("[click](javascript:alert(1)) [ok](https://example.org)");
        assert!(html.contains(r##"<a href="#">click</a>"##));
        assert!(html.contains(r#"href="https://example.org""#));
        assert!(!html.to_ascii_lowercase().contains("javascript:"));
    }
}
