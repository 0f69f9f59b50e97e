use super::*;

use document_agent_client_core::login::{
    POPUP_POLL_INTERVAL, POPUP_WINDOW_NAME, PopupPlacement, WindowFrame,
};
use document_agent_client_core::{FederatedResolution, FederatedSignal, LoginSuccess};
use gloo_timers::callback::Interval;
use web_sys::{MessageEvent, Window};

    /// Listener and poll timer of one popup login attempt. Dropping it
    /// detaches both.
    pub(crate) struct PendingPopup {
        attempt: FederatedAttemptId,
        message_handler: Closure<dyn FnMut(MessageEvent)>,
        _poll: Interval,
    }

    impl Drop for PendingPopup {
        fn drop(&mut self) {
            if let Some(window) = web_sys::window() {
                let _ = window.remove_event_listener_with_callback(
                    "message",
                    self.message_handler.as_ref().unchecked_ref(),
                );
            }
            tracing::debug!(attempt = ?self.attempt, "popup login listeners released");
        }
    }

    pub(super) fn start_federated_login() {
        let started = LOGIN_FLOW.with(|flow| flow.borrow_mut().begin_federated_request());
        if !started {
            return;
        }
        render_login_dom();

        spawn_local(async {
            let Some(config) = current_config() else {
                return;
            };
            match fetch_login_url(&config).await {
                Ok(login_url) => open_login_popup(&login_url),
                Err(error) => {
                    LOGIN_FLOW.with(|flow| flow.borrow_mut().fail_federated_start(&error));
                    render_login_dom();
                }
            }
        });
    }

    fn open_login_popup(login_url: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let placement = PopupPlacement::centered_on(window_frame(&window));
        let popup = window
            .open_with_url_and_target_and_features(login_url, POPUP_WINDOW_NAME, &placement.features())
            .ok()
            .flatten();

        let attempt = LOGIN_FLOW.with(|flow| flow.borrow_mut().begin_federated(popup.is_some()));
        let (Some(attempt), Some(popup)) = (attempt, popup) else {
            render_login_dom();
            return;
        };

        let message_handler = Closure::<dyn FnMut(MessageEvent)>::wrap(Box::new(
            move |event: MessageEvent| {
                let signal = FederatedSignal::Message {
                    origin: event.origin(),
                    data: js_value_to_json(&event.data()),
                };
                settle_federated_login(attempt, signal);
            },
        ));
        if window
            .add_event_listener_with_callback("message", message_handler.as_ref().unchecked_ref())
            .is_err()
        {
            tracing::warn!("failed to listen for popup login messages");
        }

        let poll_target = popup.clone();
        let poll = Interval::new(POPUP_POLL_INTERVAL.as_millis() as u32, move || {
            let closed = poll_target.closed().unwrap_or(true);
            settle_federated_login(attempt, FederatedSignal::PopupPoll { closed });
        });

        // Replacing an older attempt drops its listener and timer.
        PENDING_POPUP.with(|slot| {
            *slot.borrow_mut() = Some(PendingPopup {
                attempt,
                message_handler,
                _poll: poll,
            });
        });
        tracing::info!(?attempt, "popup login started");
        render_login_dom();
    }

    fn settle_federated_login(attempt: FederatedAttemptId, signal: FederatedSignal) {
        let Some(config) = current_config() else {
            return;
        };
        let resolution =
            LOGIN_FLOW.with(|flow| flow.borrow_mut().handle_federated_signal(attempt, signal, &config));
        let Some(resolution) = resolution else {
            return;
        };

        release_pending_popup(attempt);
        match resolution {
            FederatedResolution::Authenticated(success) => complete_login(success),
            FederatedResolution::Failed(_) | FederatedResolution::Cancelled => render_login_dom(),
        }
    }

    /// Detaches a pending attempt without reporting anything.
    pub(super) fn cancel_pending_popup() {
        LOGIN_FLOW.with(|flow| flow.borrow_mut().cancel_pending());
        let pending = PENDING_POPUP.with(|slot| slot.borrow_mut().take());
        if let Some(pending) = pending {
            spawn_local(async move { drop(pending) });
        }
    }

    fn release_pending_popup(attempt: FederatedAttemptId) {
        let pending = PENDING_POPUP.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.as_ref().is_some_and(|pending| pending.attempt == attempt) {
                slot.take()
            } else {
                None
            }
        });
        // Deferred: the closure being released may be the one running now.
        if let Some(pending) = pending {
            spawn_local(async move { drop(pending) });
        }
    }

    /// Persists the identity and leaves the login screen.
    pub(super) fn complete_login(success: LoginSuccess) {
        SESSION.with(|slot| {
            if let Some(holder) = slot.borrow_mut().as_mut() {
                if let Err(error) = holder.set_identity(success.identity) {
                    tracing::warn!(error = %error, "session could not be persisted");
                }
            }
        });
        apply_route(success.navigate_to, HistoryMode::Replace);
    }

    fn window_frame(window: &Window) -> WindowFrame {
        WindowFrame {
            screen_x: window_number(window, "screenX"),
            screen_y: window_number(window, "screenY"),
            outer_width: window_number(window, "outerWidth"),
            outer_height: window_number(window, "outerHeight"),
        }
    }

    fn window_number(window: &Window, property: &str) -> f64 {
        js_sys::Reflect::get(window, &JsValue::from_str(property))
            .ok()
            .and_then(|value| value.as_f64())
            .unwrap_or(0.0)
    }

    fn js_value_to_json(value: &JsValue) -> serde_json::Value {
        js_sys::JSON::stringify(value)
            .ok()
            .and_then(|serialized| serialized.as_string())
            .and_then(|serialized| serde_json::from_str(&serialized).ok())
            .unwrap_or(serde_json::Value::Null)
    }
