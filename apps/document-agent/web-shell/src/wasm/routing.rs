use super::*;

use document_agent_client_core::resolve_route;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(super) enum HistoryMode {
        /// The browser already shows the path (boot, back/forward).
        Keep,
        Push,
        Replace,
    }

    /// Runs the route guards, syncs browser history, mounts or unmounts the
    /// conversation, and repaints.
    pub(super) fn apply_route(requested: AppRoute, history: HistoryMode) {
        let (route, redirected) = resolve_route(requested, is_logged_in());
        if redirected {
            tracing::debug!(
                from = requested.to_path(),
                to = route.to_path(),
                "route guard redirected"
            );
        }
        match (redirected, history) {
            (true, _) | (false, HistoryMode::Replace) => replace_route_in_browser_history(route),
            (false, HistoryMode::Push) => push_route_to_browser_history(route),
            (false, HistoryMode::Keep) => {}
        }

        let previous = CURRENT_ROUTE.with(|current| current.replace(Some(route)));
        if previous == Some(AppRoute::Chat) && route != AppRoute::Chat {
            unmount_conversation();
        }
        if previous == Some(AppRoute::Login) && route != AppRoute::Login {
            cancel_pending_popup();
        }
        update_route_diagnostics(route);

        match route {
            AppRoute::Login => {
                show_route_panel(route);
                render_login_dom();
            }
            AppRoute::Chat => {
                mount_conversation();
                show_route_panel(route);
                render_chat_dom();
            }
        }
    }

    fn mount_conversation() {
        let (Some(config), Some(credential)) = (current_config(), session_credential()) else {
            return;
        };
        CONVERSATION.with(|slot| {
            let mut slot = slot.borrow_mut();
            let controller = slot.get_or_insert_with(|| ConversationController::new(config));
            if let Err(error) = controller.mount(&credential, open_chat_socket) {
                tracing::warn!(error = %error, "chat channel unavailable");
            }
        });
    }

    fn unmount_conversation() {
        let controller = CONVERSATION.with(|slot| slot.borrow_mut().take());
        if let Some(mut controller) = controller {
            controller.unmount();
        }
        USER_MENU_OPEN.with(|open| open.set(false));
    }

    pub(super) fn install_browser_navigation_handlers() {
        let Some(window) = web_sys::window() else {
            return;
        };

        ROUTE_POPSTATE_HANDLER.with(|slot| {
            if slot.borrow().is_some() {
                return;
            }
            let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| {
                let route = AppRoute::from_path(&current_pathname());
                apply_route(route, HistoryMode::Keep);
            }));
            let _ = window
                .add_event_listener_with_callback("popstate", callback.as_ref().unchecked_ref());
            *slot.borrow_mut() = Some(callback);
        });
    }

    pub(super) fn push_route_to_browser_history(route: AppRoute) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Ok(history) = window.history() else {
            return;
        };
        let route_path = route.to_path();
        if current_pathname() == route_path {
            return;
        }
        let _ = history.push_state_with_url(&JsValue::NULL, "", Some(route_path));
    }

    pub(super) fn replace_route_in_browser_history(route: AppRoute) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Ok(history) = window.history() else {
            return;
        };
        let route_path = route.to_path();
        if current_pathname() == route_path {
            return;
        }
        let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(route_path));
    }
