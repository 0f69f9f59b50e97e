use document_agent_client_core::KeyValueStore;
use web_sys::Storage;

    /// `window.localStorage`, looked up on every call so a storage that
    /// becomes unavailable mid-session degrades to errors instead of panics.
    #[derive(Debug, Clone, Copy, Default)]
    pub(crate) struct BrowserStorage;

    impl KeyValueStore for BrowserStorage {
        type Error = String;

        fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error> {
            local_storage()?
                .get_item(key)
                .map_err(|_| "failed to read local storage".to_string())
        }

        fn set_item(&mut self, key: &str, value: &str) -> Result<(), Self::Error> {
            local_storage()?
                .set_item(key, value)
                .map_err(|_| "failed to write local storage".to_string())
        }

        fn remove_item(&mut self, key: &str) -> Result<(), Self::Error> {
            local_storage()?
                .remove_item(key)
                .map_err(|_| "failed to remove local storage item".to_string())
        }
    }

    fn local_storage() -> Result<Storage, String> {
        let window = web_sys::window().ok_or_else(|| "window is unavailable".to_string())?;
        window
            .local_storage()
            .map_err(|_| "failed to access local storage".to_string())?
            .ok_or_else(|| "local storage is unavailable".to_string())
    }
