use super::*;

use document_agent_client_core::conversation::EXAMPLE_PROMPTS;
use document_agent_client_core::{KeyAction, ScrollMetrics, ScrollRequest};
use web_sys::{Document, HtmlButtonElement, ScrollBehavior, ScrollToOptions};

use crate::chat_view::{THINKING_LABEL, WELCOME_BODY, WELCOME_TITLE, can_send};

    const ACCENT: &str = "#5f7c3a";
    const SURFACE: &str = "#ffffff";
    const TEXT: &str = "#1f2933";
    const TEXT_MUTED: &str = "#6b7280";
    const BORDER: &str = "1px solid #d9dfd2";

    pub(super) fn element_by_id<T: JsCast>(id: &str) -> Option<T> {
        web_sys::window()?
            .document()?
            .get_element_by_id(id)?
            .dyn_into::<T>()
            .ok()
    }

    fn create_element(
        document: &Document,
        tag: &str,
        id: Option<&str>,
        styles: &[(&str, &str)],
    ) -> Result<HtmlElement, String> {
        let element = document
            .create_element(tag)
            .map_err(|_| format!("failed to create {tag} element"))?
            .dyn_into::<HtmlElement>()
            .map_err(|_| format!("{tag} element is not HtmlElement"))?;
        if let Some(id) = id {
            element.set_id(id);
        }
        apply_styles(&element, styles)?;
        Ok(element)
    }

    fn apply_styles(element: &HtmlElement, styles: &[(&str, &str)]) -> Result<(), String> {
        for (property, value) in styles {
            element
                .style()
                .set_property(property, value)
                .map_err(|_| format!("failed to set style {property}"))?;
        }
        Ok(())
    }

    fn append(parent: &HtmlElement, child: &HtmlElement) -> Result<(), String> {
        parent
            .append_child(child)
            .map(|_| ())
            .map_err(|_| "failed to append element".to_string())
    }

    fn set_display(id: &str, visible: bool, display: &str) {
        if let Some(element) = element_by_id::<HtmlElement>(id) {
            let _ = element
                .style()
                .set_property("display", if visible { display } else { "none" });
        }
    }

    fn text_element(
        document: &Document,
        tag: &str,
        id: Option<&str>,
        text: &str,
        styles: &[(&str, &str)],
    ) -> Result<HtmlElement, String> {
        let element = create_element(document, tag, id, styles)?;
        element.set_inner_text(text);
        Ok(element)
    }

    pub(super) fn ensure_shell_dom() -> Result<(), String> {
        let window = web_sys::window().ok_or_else(|| "window is unavailable".to_string())?;
        let document = window
            .document()
            .ok_or_else(|| "document is unavailable".to_string())?;
        let body = document
            .body()
            .ok_or_else(|| "document body is unavailable".to_string())?;

        if document.get_element_by_id(SHELL_STATUS_ID).is_none() {
            let status = create_element(
                &document,
                "div",
                Some(SHELL_STATUS_ID),
                &[
                    ("position", "fixed"),
                    ("bottom", "8px"),
                    ("left", "8px"),
                    ("font-family", "monospace"),
                    ("font-size", "11px"),
                    ("color", TEXT_MUTED),
                ],
            )?;
            append(&body, &status)?;
        }

        if document.get_element_by_id(SHELL_ROOT_ID).is_none() {
            let root = create_element(
                &document,
                "div",
                Some(SHELL_ROOT_ID),
                &[
                    ("position", "fixed"),
                    ("inset", "0"),
                    ("font-family", "Inter, system-ui, sans-serif"),
                    ("color", TEXT),
                    ("background", "#f4f6f0"),
                ],
            )?;
            append(&root, &build_login_panel(&document)?)?;
            append(&root, &build_chat_panel(&document)?)?;
            append(&body, &root)?;
        }

        install_login_handlers()?;
        install_chat_handlers()?;
        Ok(())
    }

    fn build_login_panel(document: &Document) -> Result<HtmlElement, String> {
        let panel = create_element(
            document,
            "section",
            Some(LOGIN_PANEL_ID),
            &[
                ("display", "none"),
                ("height", "100%"),
                ("align-items", "center"),
                ("justify-content", "center"),
            ],
        )?;
        let card = create_element(
            document,
            "div",
            None,
            &[
                ("width", "min(420px, 92vw)"),
                ("padding", "32px"),
                ("box-sizing", "border-box"),
                ("border-radius", "16px"),
                ("background", SURFACE),
                ("border", BORDER),
                ("box-shadow", "0 12px 32px rgba(31, 41, 51, 0.08)"),
            ],
        )?;
        append(&card, &text_element(document, "h1", None, APP_TITLE, &[("margin", "0"), ("font-size", "24px")])?)?;
        append(
            &card,
            &text_element(document, "p", None, LOGIN_SUBTITLE, &[("color", TEXT_MUTED), ("margin", "4px 0 24px")])?,
        )?;

        let form = create_element(
            document,
            "form",
            Some(LOGIN_FORM_ID),
            &[("display", "flex"), ("flex-direction", "column"), ("gap", "12px")],
        )?;
        let field_styles = [
            ("padding", "10px 12px"),
            ("border-radius", "10px"),
            ("border", "1px solid #c7cfbd"),
            ("font-size", "14px"),
        ];
        let email = create_element(document, "input", Some(LOGIN_EMAIL_ID), &field_styles)?;
        let _ = email.set_attribute("type", "email");
        let _ = email.set_attribute("placeholder", "you@email.com");
        let _ = email.set_attribute("autocomplete", "email");
        let _ = email.set_attribute("required", "");
        append(&form, &email)?;

        let password = create_element(document, "input", Some(LOGIN_PASSWORD_ID), &field_styles)?;
        let _ = password.set_attribute("type", "password");
        let _ = password.set_attribute("placeholder", "••••••••");
        let _ = password.set_attribute("autocomplete", "current-password");
        let _ = password.set_attribute("required", "");
        append(&form, &password)?;

        let button_styles = [
            ("padding", "11px 12px"),
            ("border-radius", "10px"),
            ("border", "none"),
            ("font-size", "14px"),
            ("font-weight", "600"),
            ("cursor", "pointer"),
        ];
        let submit = text_element(document, "button", Some(LOGIN_SUBMIT_ID), "", &button_styles)?;
        let _ = submit.set_attribute("type", "submit");
        apply_styles(&submit, &[("background", ACCENT), ("color", "#ffffff")])?;
        append(&form, &submit)?;

        let federated = text_element(
            document,
            "button",
            Some(LOGIN_FEDERATED_ID),
            FEDERATED_BUTTON_LABEL,
            &button_styles,
        )?;
        let _ = federated.set_attribute("type", "button");
        apply_styles(&federated, &[("background", TEXT), ("color", SURFACE)])?;
        append(&form, &federated)?;

        let error = create_element(
            document,
            "p",
            Some(LOGIN_ERROR_ID),
            &[("display", "none"), ("color", "#b91c1c"), ("margin", "4px 0 0"), ("font-size", "13px")],
        )?;
        let _ = error.set_attribute("role", "alert");
        append(&form, &error)?;
        append(&card, &form)?;

        append(
            &card,
            &text_element(document, "p", None, LOGIN_HINT, &[("color", TEXT_MUTED), ("font-size", "12px"), ("margin-top", "24px")])?,
        )?;
        append(&panel, &card)?;
        Ok(panel)
    }

    fn build_chat_panel(document: &Document) -> Result<HtmlElement, String> {
        let panel = create_element(
            document,
            "section",
            Some(CHAT_PANEL_ID),
            &[("display", "none"), ("flex-direction", "column"), ("height", "100%")],
        )?;

        let header = create_element(
            document,
            "header",
            None,
            &[
                ("display", "flex"),
                ("align-items", "center"),
                ("justify-content", "space-between"),
                ("padding", "12px 20px"),
                ("background", SURFACE),
                ("border-bottom", BORDER),
                ("position", "relative"),
            ],
        )?;
        let titles = create_element(document, "div", None, &[])?;
        append(&titles, &text_element(document, "h1", None, APP_TITLE, &[("margin", "0"), ("font-size", "18px")])?)?;
        append(
            &titles,
            &text_element(document, "p", None, APP_SUBTITLE, &[("margin", "0"), ("font-size", "12px"), ("color", TEXT_MUTED)])?,
        )?;
        append(&header, &titles)?;

        let user_area = create_element(
            document,
            "div",
            None,
            &[("display", "flex"), ("align-items", "center"), ("gap", "12px")],
        )?;
        let status = create_element(
            document,
            "span",
            Some(CHAT_STATUS_ID),
            &[("font-size", "12px"), ("color", TEXT_MUTED)],
        )?;
        let _ = status.set_attribute("role", "status");
        append(&user_area, &status)?;

        let avatar = create_element(
            document,
            "button",
            Some(CHAT_AVATAR_ID),
            &[
                ("width", "36px"),
                ("height", "36px"),
                ("border-radius", "50%"),
                ("border", "none"),
                ("background", ACCENT),
                ("color", "#ffffff"),
                ("font-weight", "600"),
                ("cursor", "pointer"),
            ],
        )?;
        let _ = avatar.set_attribute("type", "button");
        let _ = avatar.set_attribute("aria-label", "Open user menu");
        append(&user_area, &avatar)?;

        let menu = create_element(
            document,
            "div",
            Some(CHAT_USER_MENU_ID),
            &[
                ("display", "none"),
                ("position", "absolute"),
                ("top", "60px"),
                ("right", "20px"),
                ("min-width", "220px"),
                ("padding", "12px"),
                ("border-radius", "12px"),
                ("background", SURFACE),
                ("border", BORDER),
                ("box-shadow", "0 8px 24px rgba(31, 41, 51, 0.12)"),
                ("z-index", "10"),
            ],
        )?;
        for (id, weight) in [
            (CHAT_USER_NAME_ID, "600"),
            (CHAT_USER_EMAIL_ID, "400"),
            (CHAT_USER_DEPARTMENT_ID, "400"),
        ] {
            append(
                &menu,
                &create_element(document, "p", Some(id), &[("margin", "2px 0"), ("font-weight", weight), ("font-size", "13px")])?,
            )?;
        }
        let logout = text_element(
            document,
            "button",
            Some(CHAT_LOGOUT_ID),
            LOGOUT_LABEL,
            &[
                ("margin-top", "10px"),
                ("width", "100%"),
                ("text-align", "left"),
                ("padding", "8px"),
                ("border", "none"),
                ("background", "transparent"),
                ("color", TEXT_MUTED),
                ("cursor", "pointer"),
            ],
        )?;
        let _ = logout.set_attribute("type", "button");
        let _ = logout.set_attribute("aria-label", LOGOUT_LABEL);
        append(&menu, &logout)?;
        append(&user_area, &menu)?;
        append(&header, &user_area)?;
        append(&panel, &header)?;

        let messages = create_element(
            document,
            "main",
            Some(CHAT_MESSAGES_ID),
            &[
                ("flex", "1"),
                ("overflow-y", "auto"),
                ("padding", "24px 20px"),
                ("position", "relative"),
            ],
        )?;
        let welcome = create_element(
            document,
            "div",
            Some(CHAT_WELCOME_ID),
            &[("max-width", "640px"), ("margin", "10vh auto 0"), ("text-align", "center")],
        )?;
        append(&welcome, &text_element(document, "h2", None, WELCOME_TITLE, &[])?)?;
        append(&welcome, &text_element(document, "p", None, WELCOME_BODY, &[("color", TEXT_MUTED)])?)?;
        let suggestions = create_element(
            document,
            "div",
            None,
            &[
                ("display", "flex"),
                ("flex-wrap", "wrap"),
                ("gap", "8px"),
                ("justify-content", "center"),
                ("margin-top", "16px"),
            ],
        )?;
        for (id, prompt) in CHAT_PROMPT_IDS.into_iter().zip(EXAMPLE_PROMPTS) {
            let chip = text_element(
                document,
                "button",
                Some(id),
                prompt,
                &[
                    ("padding", "8px 14px"),
                    ("border-radius", "999px"),
                    ("border", BORDER),
                    ("background", SURFACE),
                    ("cursor", "pointer"),
                ],
            )?;
            let _ = chip.set_attribute("type", "button");
            append(&suggestions, &chip)?;
        }
        append(&welcome, &suggestions)?;
        append(&messages, &welcome)?;

        let log = create_element(
            document,
            "div",
            Some(CHAT_LOG_ID),
            &[
                ("display", "flex"),
                ("flex-direction", "column"),
                ("gap", "14px"),
                ("max-width", "760px"),
                ("margin", "0 auto"),
            ],
        )?;
        let _ = log.set_attribute("aria-live", "polite");
        append(&messages, &log)?;
        append(&panel, &messages)?;

        let jump = text_element(
            document,
            "button",
            Some(CHAT_JUMP_ID),
            "↓",
            &[
                ("display", "none"),
                ("position", "absolute"),
                ("right", "28px"),
                ("bottom", "96px"),
                ("width", "36px"),
                ("height", "36px"),
                ("border-radius", "50%"),
                ("border", BORDER),
                ("background", SURFACE),
                ("cursor", "pointer"),
            ],
        )?;
        let _ = jump.set_attribute("type", "button");
        let _ = jump.set_attribute("aria-label", "Scroll to latest message");
        append(&panel, &jump)?;

        let composer = create_element(
            document,
            "form",
            Some(CHAT_COMPOSER_ID),
            &[
                ("display", "flex"),
                ("gap", "8px"),
                ("padding", "12px 20px 20px"),
                ("max-width", "760px"),
                ("width", "100%"),
                ("box-sizing", "border-box"),
                ("margin", "0 auto"),
            ],
        )?;
        let input = create_element(
            document,
            "textarea",
            Some(CHAT_INPUT_ID),
            &[
                ("flex", "1"),
                ("resize", "none"),
                ("min-height", "16px"),
                ("max-height", "200px"),
                ("padding", "12px"),
                ("border-radius", "12px"),
                ("border", "1px solid #c7cfbd"),
                ("font", "inherit"),
            ],
        )?;
        let _ = input.set_attribute("rows", "1");
        let _ = input.set_attribute("placeholder", COMPOSER_PLACEHOLDER);
        append(&composer, &input)?;
        let send = text_element(
            document,
            "button",
            Some(CHAT_SEND_ID),
            "Send",
            &[
                ("padding", "0 18px"),
                ("border-radius", "12px"),
                ("border", "none"),
                ("background", ACCENT),
                ("color", "#ffffff"),
                ("font-weight", "600"),
                ("cursor", "pointer"),
            ],
        )?;
        let _ = send.set_attribute("type", "submit");
        let _ = send.set_attribute("aria-label", "Send message");
        append(&composer, &send)?;
        append(&panel, &composer)?;

        Ok(panel)
    }

    fn install_login_handlers() -> Result<(), String> {
        let form = element_by_id::<HtmlElement>(LOGIN_FORM_ID)
            .ok_or_else(|| "missing login form".to_string())?;
        let federated = element_by_id::<HtmlElement>(LOGIN_FEDERATED_ID)
            .ok_or_else(|| "missing federated login button".to_string())?;

        LOGIN_SUBMIT_HANDLER.with(|slot| {
            if slot.borrow().is_some() {
                return;
            }
            let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |event: web_sys::Event| {
                event.prevent_default();
                let email = element_by_id::<HtmlInputElement>(LOGIN_EMAIL_ID)
                    .map(|input| input.value())
                    .unwrap_or_default();
                let password = element_by_id::<HtmlInputElement>(LOGIN_PASSWORD_ID)
                    .map(|input| input.value())
                    .unwrap_or_default();
                start_local_login(email, password);
            }));
            let _ = form.add_event_listener_with_callback("submit", callback.as_ref().unchecked_ref());
            *slot.borrow_mut() = Some(callback);
        });

        LOGIN_FEDERATED_HANDLER.with(|slot| {
            if slot.borrow().is_some() {
                return;
            }
            let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| {
                start_federated_login();
            }));
            let _ = federated.add_event_listener_with_callback("click", callback.as_ref().unchecked_ref());
            *slot.borrow_mut() = Some(callback);
        });
        Ok(())
    }

    fn install_chat_handlers() -> Result<(), String> {
        let composer = element_by_id::<HtmlElement>(CHAT_COMPOSER_ID)
            .ok_or_else(|| "missing chat composer".to_string())?;
        let input = element_by_id::<HtmlTextAreaElement>(CHAT_INPUT_ID)
            .ok_or_else(|| "missing chat input".to_string())?;
        let messages = element_by_id::<HtmlElement>(CHAT_MESSAGES_ID)
            .ok_or_else(|| "missing chat messages".to_string())?;
        let jump = element_by_id::<HtmlElement>(CHAT_JUMP_ID)
            .ok_or_else(|| "missing jump button".to_string())?;
        let avatar = element_by_id::<HtmlElement>(CHAT_AVATAR_ID)
            .ok_or_else(|| "missing avatar button".to_string())?;
        let logout = element_by_id::<HtmlElement>(CHAT_LOGOUT_ID)
            .ok_or_else(|| "missing logout button".to_string())?;

        CHAT_COMPOSER_SUBMIT_HANDLER.with(|slot| {
            if slot.borrow().is_some() {
                return;
            }
            let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |event: web_sys::Event| {
                event.prevent_default();
                submit_message_from_composer();
            }));
            let _ = composer.add_event_listener_with_callback("submit", callback.as_ref().unchecked_ref());
            *slot.borrow_mut() = Some(callback);
        });

        CHAT_INPUT_HANDLER.with(|slot| {
            if slot.borrow().is_some() {
                return;
            }
            let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| {
                let value = element_by_id::<HtmlTextAreaElement>(CHAT_INPUT_ID)
                    .map(|input| input.value())
                    .unwrap_or_default();
                CONVERSATION.with(|slot| {
                    if let Some(controller) = slot.borrow_mut().as_mut() {
                        controller.state_mut().set_input(value);
                    }
                });
                render_composer_controls();
            }));
            let _ = input.add_event_listener_with_callback("input", callback.as_ref().unchecked_ref());
            *slot.borrow_mut() = Some(callback);
        });

        CHAT_INPUT_KEYDOWN_HANDLER.with(|slot| {
            if slot.borrow().is_some() {
                return;
            }
            let callback = Closure::<dyn FnMut(web_sys::KeyboardEvent)>::wrap(Box::new(
                move |event: web_sys::KeyboardEvent| {
                    if event.is_composing() {
                        return;
                    }
                    let action = CONVERSATION.with(|slot| {
                        slot.borrow_mut()
                            .as_mut()
                            .map(|controller| controller.handle_key(&event.key(), event.shift_key()))
                    });
                    if action == Some(KeyAction::Submit) {
                        event.prevent_default();
                        render_chat_dom();
                        focus_composer();
                    }
                },
            ));
            let _ = input.add_event_listener_with_callback("keydown", callback.as_ref().unchecked_ref());
            *slot.borrow_mut() = Some(callback);
        });

        CHAT_SCROLL_HANDLER.with(|slot| {
            if slot.borrow().is_some() {
                return;
            }
            let container = messages.clone();
            let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| {
                let metrics = ScrollMetrics {
                    scroll_top: f64::from(container.scroll_top()),
                    scroll_height: f64::from(container.scroll_height()),
                    client_height: f64::from(container.client_height()),
                };
                let show_jump = CONVERSATION.with(|slot| {
                    slot.borrow_mut().as_mut().is_some_and(|controller| {
                        controller.state_mut().on_user_scroll(metrics);
                        controller.state().show_jump_to_latest()
                    })
                });
                set_display(CHAT_JUMP_ID, show_jump, "block");
            }));
            let _ = messages.add_event_listener_with_callback("scroll", callback.as_ref().unchecked_ref());
            *slot.borrow_mut() = Some(callback);
        });

        CHAT_JUMP_HANDLER.with(|slot| {
            if slot.borrow().is_some() {
                return;
            }
            let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| {
                let request = CONVERSATION.with(|slot| {
                    slot.borrow_mut()
                        .as_mut()
                        .map(|controller| controller.state_mut().jump_to_latest())
                });
                if let Some(request) = request {
                    scroll_messages_to_bottom(request);
                }
                set_display(CHAT_JUMP_ID, false, "block");
            }));
            let _ = jump.add_event_listener_with_callback("click", callback.as_ref().unchecked_ref());
            *slot.borrow_mut() = Some(callback);
        });

        CHAT_AVATAR_HANDLER.with(|slot| {
            if slot.borrow().is_some() {
                return;
            }
            let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| {
                USER_MENU_OPEN.with(|open| open.set(!open.get()));
                render_chat_dom();
            }));
            let _ = avatar.add_event_listener_with_callback("click", callback.as_ref().unchecked_ref());
            *slot.borrow_mut() = Some(callback);
        });

        CHAT_LOGOUT_HANDLER.with(|slot| {
            if slot.borrow().is_some() {
                return;
            }
            let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| {
                sign_out();
            }));
            let _ = logout.add_event_listener_with_callback("click", callback.as_ref().unchecked_ref());
            *slot.borrow_mut() = Some(callback);
        });

        CHAT_PROMPT_CLICK_HANDLERS.with(|slot| {
            let mut handlers = slot.borrow_mut();
            if !handlers.is_empty() {
                return;
            }
            for (index, id) in CHAT_PROMPT_IDS.iter().enumerate() {
                let Some(button) = element_by_id::<HtmlElement>(id) else {
                    continue;
                };
                let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| {
                    CONVERSATION.with(|slot| {
                        if let Some(controller) = slot.borrow_mut().as_mut() {
                            controller.state_mut().choose_example_prompt(index);
                        }
                    });
                    render_chat_dom();
                    focus_composer();
                }));
                let _ = button.add_event_listener_with_callback("click", callback.as_ref().unchecked_ref());
                handlers.push(callback);
            }
        });
        Ok(())
    }

    pub(super) fn show_route_panel(route: AppRoute) {
        set_display(LOGIN_PANEL_ID, route == AppRoute::Login, "flex");
        set_display(CHAT_PANEL_ID, route == AppRoute::Chat, "flex");
    }

    pub(super) fn render_login_dom() {
        let view = LOGIN_FLOW.with(|flow| LoginView::build(&flow.borrow()));
        if let Some(submit) = element_by_id::<HtmlButtonElement>(LOGIN_SUBMIT_ID) {
            submit.set_disabled(view.loading);
            submit.set_inner_text(view.submit_label);
        }
        if let Some(federated) = element_by_id::<HtmlButtonElement>(LOGIN_FEDERATED_ID) {
            federated.set_disabled(view.loading);
        }
        if let Some(error) = element_by_id::<HtmlElement>(LOGIN_ERROR_ID) {
            error.set_inner_text(view.error.as_deref().unwrap_or_default());
        }
        set_display(LOGIN_ERROR_ID, view.error.is_some(), "block");
    }

    pub(super) fn render_chat_dom() {
        let Some(view) = chat_view_snapshot() else {
            return;
        };
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        if let Some(status) = element_by_id::<HtmlElement>(CHAT_STATUS_ID) {
            status.set_inner_text(view.status_label);
            let _ = status.set_attribute("data-connection", view.connection);
        }
        if let Some(avatar) = element_by_id::<HtmlElement>(CHAT_AVATAR_ID) {
            avatar.set_inner_text(&view.user.initial);
        }
        for (id, text) in [
            (CHAT_USER_NAME_ID, view.user.name.as_str()),
            (CHAT_USER_EMAIL_ID, view.user.email.as_str()),
            (CHAT_USER_DEPARTMENT_ID, view.user.department.as_str()),
        ] {
            if let Some(element) = element_by_id::<HtmlElement>(id) {
                element.set_inner_text(text);
            }
        }
        set_display(CHAT_USER_MENU_ID, USER_MENU_OPEN.with(Cell::get), "block");
        set_display(CHAT_WELCOME_ID, view.show_welcome, "block");

        if let Some(log) = element_by_id::<HtmlElement>(CHAT_LOG_ID) {
            log.set_inner_html("");
            for row in &view.messages {
                if let Ok(element) = message_row_element(&document, row) {
                    let _ = log.append_child(&element);
                }
            }
            if view.show_thinking {
                if let Ok(element) = thinking_row_element(&document) {
                    let _ = log.append_child(&element);
                }
            }
        }
        set_display(CHAT_JUMP_ID, view.show_jump_to_latest, "block");

        if let Some(input) = element_by_id::<HtmlTextAreaElement>(CHAT_INPUT_ID) {
            if input.value() != view.input {
                input.set_value(&view.input);
            }
        }
        if let Some(send) = element_by_id::<HtmlButtonElement>(CHAT_SEND_ID) {
            send.set_disabled(!view.send_enabled);
        }

        let request = CONVERSATION.with(|slot| {
            slot.borrow_mut()
                .as_mut()
                .and_then(|controller| controller.state_mut().take_scroll_request())
        });
        if let Some(request) = request {
            scroll_messages_to_bottom(request);
        }
    }

    fn render_composer_controls() {
        let enabled = CONVERSATION.with(|slot| {
            slot.borrow()
                .as_ref()
                .is_some_and(|controller| can_send(controller.state(), controller.connection_state()))
        });
        if let Some(send) = element_by_id::<HtmlButtonElement>(CHAT_SEND_ID) {
            send.set_disabled(!enabled);
        }
    }

    fn message_row_element(
        document: &Document,
        row: &crate::chat_view::MessageRow,
    ) -> Result<HtmlElement, String> {
        let is_user = row.role_class == "user";
        let element = create_element(
            document,
            "div",
            None,
            &[
                ("display", "flex"),
                ("justify-content", if is_user { "flex-end" } else { "flex-start" }),
            ],
        )?;
        element.set_class_name(&format!("chat-message chat-message--{}", row.role_class));
        let _ = element.set_attribute("role", "article");
        let _ = element.set_attribute("aria-label", row.aria_label);
        let _ = element.set_attribute("data-message-id", &row.id);

        let bubble = create_element(
            document,
            "div",
            None,
            &[
                ("max-width", "80%"),
                ("padding", "10px 14px"),
                ("border-radius", "14px"),
                ("background", if is_user { ACCENT } else { SURFACE }),
                ("color", if is_user { "#ffffff" } else { TEXT }),
                ("border", if is_user { "none" } else { BORDER }),
            ],
        )?;
        let content = create_element(document, "div", None, &[("line-height", "1.5")])?;
        content.set_inner_html(&row.html);
        append(&bubble, &content)?;

        let time = text_element(
            document,
            "time",
            None,
            &row.time_label,
            &[("display", "block"), ("font-size", "11px"), ("opacity", "0.7"), ("margin-top", "4px")],
        )?;
        let _ = time.set_attribute("datetime", &row.datetime);
        append(&bubble, &time)?;
        append(&element, &bubble)?;
        Ok(element)
    }

    fn thinking_row_element(document: &Document) -> Result<HtmlElement, String> {
        let element = create_element(document, "div", None, &[("display", "flex")])?;
        element.set_class_name("chat-message chat-message--assistant");
        let _ = element.set_attribute("role", "status");
        let _ = element.set_attribute("aria-label", "The agent is thinking");
        let bubble = text_element(
            document,
            "div",
            None,
            THINKING_LABEL,
            &[
                ("padding", "10px 14px"),
                ("border-radius", "14px"),
                ("background", SURFACE),
                ("border", BORDER),
                ("color", TEXT_MUTED),
                ("font-style", "italic"),
            ],
        )?;
        append(&element, &bubble)?;
        Ok(element)
    }

    fn scroll_messages_to_bottom(request: ScrollRequest) {
        let Some(container) = element_by_id::<HtmlElement>(CHAT_MESSAGES_ID) else {
            return;
        };
        let origin = f64::from(container.scroll_top());
        CONVERSATION.with(|slot| {
            if let Some(controller) = slot.borrow_mut().as_mut() {
                controller.state_mut().anchor_scroll(origin);
            }
        });
        let options = ScrollToOptions::new();
        options.set_top(f64::from(container.scroll_height()));
        options.set_behavior(if request.smooth {
            ScrollBehavior::Smooth
        } else {
            ScrollBehavior::Auto
        });
        container.scroll_to_with_scroll_to_options(&options);
    }

    fn focus_composer() {
        if let Some(input) = element_by_id::<HtmlTextAreaElement>(CHAT_INPUT_ID) {
            let _ = input.focus();
        }
    }

    fn submit_message_from_composer() {
        let result = CONVERSATION.with(|slot| {
            slot.borrow_mut()
                .as_mut()
                .map(ConversationController::submit)
        });
        if let Some(Err(error)) = result {
            tracing::debug!(error = %error, "message not sent");
        }
        render_chat_dom();
        focus_composer();
    }
