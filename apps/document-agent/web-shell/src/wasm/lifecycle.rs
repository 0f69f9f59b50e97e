use super::*;

use std::io;

use chrono::FixedOffset;
use document_agent_client_core::config::DEFAULT_BACKEND_BASE_URL;
use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;

use crate::chat_view::offset_from_js_minutes;

    /// Buffers one formatted event and hands it to the matching console
    /// method when dropped.
    pub(super) struct ConsoleWriter {
        level: Level,
        buffer: Vec<u8>,
    }

    impl io::Write for ConsoleWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.buffer.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for ConsoleWriter {
        fn drop(&mut self) {
            let line = String::from_utf8_lossy(&self.buffer);
            let line = line.trim_end();
            if line.is_empty() {
                return;
            }
            let value = JsValue::from_str(line);
            if self.level == Level::ERROR {
                web_sys::console::error_1(&value);
            } else if self.level == Level::WARN {
                web_sys::console::warn_1(&value);
            } else if self.level == Level::INFO {
                web_sys::console::info_1(&value);
            } else {
                web_sys::console::debug_1(&value);
            }
        }
    }

    pub(super) struct ConsoleMakeWriter;

    impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
        type Writer = ConsoleWriter;

        fn make_writer(&'a self) -> Self::Writer {
            ConsoleWriter {
                level: Level::INFO,
                buffer: Vec::new(),
            }
        }

        fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
            ConsoleWriter {
                level: *meta.level(),
                buffer: Vec::new(),
            }
        }
    }

    pub(super) fn install_console_tracing() {
        // Wall-clock timestamps are unavailable to std on wasm32.
        let installed = tracing_subscriber::fmt()
            .with_writer(ConsoleMakeWriter)
            .with_max_level(Level::DEBUG)
            .with_target(false)
            .without_time()
            .try_init();
        if installed.is_err() {
            web_sys::console::debug_1(&JsValue::from_str("tracing subscriber already installed"));
        }
    }

    /// Window global, then the build-time variable, then the local default.
    pub(super) fn resolve_backend_config() -> Result<(BackendConfig, &'static str), String> {
        if let Some(raw) = window_global_string(BACKEND_URL_GLOBAL) {
            return BackendConfig::new(&raw)
                .map(|config| (config, "window_global"))
                .map_err(|error| format!("invalid {BACKEND_URL_GLOBAL}: {error}"));
        }
        if let Some(raw) = option_env!("DOCUMENT_AGENT_BACKEND_URL").filter(|raw| !raw.trim().is_empty()) {
            return BackendConfig::new(raw)
                .map(|config| (config, "build_env"))
                .map_err(|error| format!("invalid DOCUMENT_AGENT_BACKEND_URL: {error}"));
        }
        BackendConfig::new(DEFAULT_BACKEND_BASE_URL)
            .map(|config| (config, "default_local"))
            .map_err(|error| error.to_string())
    }

    pub(super) fn window_global_string(name: &str) -> Option<String> {
        let window = web_sys::window()?;
        let value = js_sys::Reflect::get(&window, &JsValue::from_str(name)).ok()?;
        let value = value.as_string()?.trim().to_string();
        if value.is_empty() { None } else { Some(value) }
    }

    pub(super) fn viewer_offset() -> FixedOffset {
        offset_from_js_minutes(js_sys::Date::new_0().get_timezone_offset())
    }

    pub(super) fn set_boot_phase(phase: &str, detail: &str) {
        DIAGNOSTICS.with(|state| {
            let mut state = state.borrow_mut();
            state.phase = phase.to_string();
            state.detail = detail.to_string();
            if phase != "error" {
                state.last_error = None;
            }
        });
        tracing::debug!(phase, detail, "boot phase");
        update_status_dom(phase, detail, false);
    }

    pub(super) fn set_boot_error(message: &str) {
        DIAGNOSTICS.with(|state| {
            let mut state = state.borrow_mut();
            state.phase = "error".to_string();
            state.detail = "startup failed".to_string();
            state.last_error = Some(message.to_string());
        });
        tracing::error!(error = message, "web shell startup failed");
        update_status_dom("error", message, true);
    }

    pub(super) fn update_status_dom(phase: &str, detail: &str, is_error: bool) {
        let Some(status) = element_by_id::<HtmlElement>(SHELL_STATUS_ID) else {
            return;
        };
        if phase == "ready" {
            let _ = status.style().set_property("display", "none");
            return;
        }
        let label = if is_error { "Boot error" } else { "Boot" };
        status.set_inner_text(&format!("{label}: {phase} ({detail})"));
        let color = if is_error { "#b91c1c" } else { "#6b7280" };
        let _ = status.style().set_property("color", color);
        let _ = status.style().set_property("display", "block");
    }

    pub(super) fn current_pathname() -> String {
        let Some(window) = web_sys::window() else {
            return "/".to_string();
        };
        let Ok(pathname) = window.location().pathname() else {
            return "/".to_string();
        };
        if pathname.trim().is_empty() {
            "/".to_string()
        } else {
            pathname
        }
    }

    pub(super) fn update_route_diagnostics(route: AppRoute) {
        DIAGNOSTICS.with(|state| state.borrow_mut().route_path = route.to_path().to_string());
    }
