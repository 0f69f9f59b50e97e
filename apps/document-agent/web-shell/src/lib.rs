#[cfg(any(target_arch = "wasm32", test))]
mod chat_view;
#[cfg(target_arch = "wasm32")]
mod wasm_constants;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::{Cell, RefCell};

    use document_agent_client_core::{
        AppRoute, BackendConfig, ConversationController, DemoCredentialVerifier,
        FederatedAttemptId, LoginFlow, SessionHolder,
    };
    use document_agent_client_core::login::LOCAL_LOGIN_DELAY;
    use serde::Serialize;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::spawn_local;
    use web_sys::{HtmlElement, HtmlInputElement, HtmlTextAreaElement};

    use crate::chat_view::{ChatView, LoginView};
    use crate::wasm_constants::*;

    mod dom;
    mod lifecycle;
    mod network;
    mod popup;
    mod routing;
    mod storage;

    use dom::*;
    use lifecycle::*;
    use network::*;
    use popup::*;
    use routing::*;
    use storage::BrowserStorage;

    thread_local! {
        static CONFIG: RefCell<Option<BackendConfig>> = const { RefCell::new(None) };
        static SESSION: RefCell<Option<SessionHolder<BrowserStorage>>> = const { RefCell::new(None) };
        static LOGIN_FLOW: RefCell<LoginFlow> = RefCell::new(LoginFlow::default());
        static CONVERSATION: RefCell<Option<ConversationController<SocketSink>>> = const { RefCell::new(None) };
        static CURRENT_ROUTE: Cell<Option<AppRoute>> = const { Cell::new(None) };
        static USER_MENU_OPEN: Cell<bool> = const { Cell::new(false) };
        static PENDING_POPUP: RefCell<Option<PendingPopup>> = const { RefCell::new(None) };
        static DIAGNOSTICS: RefCell<BootDiagnostics> = RefCell::new(BootDiagnostics::default());
        static LOGIN_SUBMIT_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> = const { RefCell::new(None) };
        static LOGIN_FEDERATED_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> = const { RefCell::new(None) };
        static CHAT_COMPOSER_SUBMIT_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> = const { RefCell::new(None) };
        static CHAT_INPUT_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> = const { RefCell::new(None) };
        static CHAT_INPUT_KEYDOWN_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::KeyboardEvent)>>> = const { RefCell::new(None) };
        static CHAT_SCROLL_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> = const { RefCell::new(None) };
        static CHAT_JUMP_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> = const { RefCell::new(None) };
        static CHAT_AVATAR_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> = const { RefCell::new(None) };
        static CHAT_LOGOUT_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> = const { RefCell::new(None) };
        static CHAT_PROMPT_CLICK_HANDLERS: RefCell<Vec<Closure<dyn FnMut(web_sys::Event)>>> = RefCell::new(Vec::new());
        static ROUTE_POPSTATE_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> = const { RefCell::new(None) };
    }

    #[derive(Debug, Clone, Serialize)]
    struct BootDiagnostics {
        phase: String,
        detail: String,
        backend_base_url: Option<String>,
        config_source: Option<String>,
        route_path: String,
        dom_ready_latency_ms: Option<u64>,
        last_error: Option<String>,
    }

    impl Default for BootDiagnostics {
        fn default() -> Self {
            Self {
                phase: "idle".to_string(),
                detail: "web shell not started".to_string(),
                backend_base_url: None,
                config_source: None,
                route_path: "/".to_string(),
                dom_ready_latency_ms: None,
                last_error: None,
            }
        }
    }

    #[derive(Debug, Serialize)]
    struct SessionSnapshot {
        logged_in: bool,
        name: String,
        email: String,
        department: String,
        login: LoginView,
    }

    #[wasm_bindgen(start)]
    pub fn start() {
        console_error_panic_hook::set_once();
        install_console_tracing();
        set_boot_phase("booting", "initializing document agent web shell");
        spawn_local(async {
            if let Err(error) = boot().await {
                set_boot_error(&error);
            }
        });
    }

    #[wasm_bindgen]
    pub fn boot_diagnostics_json() -> String {
        DIAGNOSTICS.with(|state| {
            serde_json::to_string(&*state.borrow()).unwrap_or_else(|_| {
                "{\"phase\":\"error\",\"detail\":\"diagnostics serialization failed\"}".to_string()
            })
        })
    }

    #[wasm_bindgen]
    pub fn session_state_json() -> String {
        let login = LOGIN_FLOW.with(|flow| LoginView::build(&flow.borrow()));
        let snapshot = SESSION.with(|slot| {
            let slot = slot.borrow();
            let identity = slot.as_ref().map(|holder| holder.identity().clone()).unwrap_or_default();
            SessionSnapshot {
                logged_in: identity.is_authenticated(),
                name: identity.name,
                email: identity.email,
                department: identity.department,
                login,
            }
        });
        serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".to_string())
    }

    #[wasm_bindgen]
    pub fn conversation_state_json() -> String {
        chat_view_snapshot()
            .and_then(|view| serde_json::to_string(&view).ok())
            .unwrap_or_else(|| "{}".to_string())
    }

    #[wasm_bindgen]
    pub fn navigate(path: String) {
        apply_route(AppRoute::from_path(&path), HistoryMode::Push);
    }

    #[wasm_bindgen]
    pub fn logout() {
        sign_out();
    }

    async fn boot() -> Result<(), String> {
        let boot_started_at = web_time::Instant::now();
        let (config, source) = resolve_backend_config()?;
        tracing::info!(base_url = config.base_url(), source, "backend configured");
        DIAGNOSTICS.with(|state| {
            let mut state = state.borrow_mut();
            state.backend_base_url = Some(config.base_url().to_string());
            state.config_source = Some(source.to_string());
        });
        CONFIG.with(|slot| *slot.borrow_mut() = Some(config));

        let session = SessionHolder::rehydrate(BrowserStorage);
        SESSION.with(|slot| *slot.borrow_mut() = Some(session));

        ensure_shell_dom()?;
        install_browser_navigation_handlers();
        apply_route(AppRoute::from_path(&current_pathname()), HistoryMode::Keep);

        let dom_ready_latency_ms =
            u64::try_from(boot_started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        DIAGNOSTICS.with(|state| state.borrow_mut().dom_ready_latency_ms = Some(dom_ready_latency_ms));
        set_boot_phase("ready", "shell mounted");
        Ok(())
    }

    fn current_config() -> Option<BackendConfig> {
        CONFIG.with(|slot| slot.borrow().clone())
    }

    fn is_logged_in() -> bool {
        SESSION.with(|slot| slot.borrow().as_ref().is_some_and(SessionHolder::is_logged_in))
    }

    fn session_credential() -> Option<String> {
        SESSION.with(|slot| {
            slot.borrow()
                .as_ref()
                .filter(|holder| holder.is_logged_in())
                .map(|holder| holder.identity().access_token.clone())
        })
    }

    fn chat_view_snapshot() -> Option<ChatView> {
        let identity = SESSION.with(|slot| {
            slot.borrow()
                .as_ref()
                .map(|holder| holder.identity().clone())
                .unwrap_or_default()
        });
        let offset = viewer_offset();
        CONVERSATION.with(|slot| {
            slot.borrow().as_ref().map(|controller| {
                ChatView::build(
                    controller.state(),
                    controller.connection_state(),
                    &identity,
                    offset,
                )
            })
        })
    }

    fn sign_out() {
        cancel_pending_popup();
        USER_MENU_OPEN.with(|open| open.set(false));
        SESSION.with(|slot| {
            if let Some(holder) = slot.borrow_mut().as_mut() {
                if let Err(error) = holder.logout() {
                    tracing::warn!(error = %error, "failed to clear stored session");
                }
            }
        });
        apply_route(AppRoute::Login, HistoryMode::Replace);
    }

    fn start_local_login(email: String, password: String) {
        let identity = LOGIN_FLOW.with(|flow| {
            flow.borrow_mut()
                .begin_local(&DemoCredentialVerifier::default(), &email, &password)
        });
        render_login_dom();
        let Some(identity) = identity else {
            return;
        };
        spawn_local(async move {
            gloo_timers::future::sleep(LOCAL_LOGIN_DELAY).await;
            let success = LOGIN_FLOW.with(|flow| flow.borrow_mut().finish_local(identity));
            complete_login(success);
        });
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::boot_diagnostics_json;

#[cfg(not(target_arch = "wasm32"))]
pub fn boot_diagnostics_json() -> String {
    "{\"phase\":\"native\",\"detail\":\"web shell diagnostics only available on wasm\"}".to_string()
}
