use super::ConfigError;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Key/value backend behind [`super::ConfigStore`].
pub trait ConfigStorage: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, ConfigError>;
    fn write(&self, key: &str, value: &str) -> Result<(), ConfigError>;
}

/// `window.localStorage`.
pub struct BrowserStorage;

impl BrowserStorage {
    fn local_storage() -> Result<web_sys::Storage, ConfigError> {
        web_sys::window()
            .ok_or_else(|| ConfigError::Storage("no window".to_string()))?
            .local_storage()
            .map_err(|e| ConfigError::Storage(format!("{e:?}")))?
            .ok_or_else(|| ConfigError::Storage("localStorage unavailable".to_string()))
    }
}

impl ConfigStorage for BrowserStorage {
    fn read(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Self::local_storage()?
            .get_item(key)
            .map_err(|e| ConfigError::Storage(format!("{e:?}")))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        Self::local_storage()?
            .set_item(key, value)
            .map_err(|e| ConfigError::Storage(format!("{e:?}")))
    }
}

/// In-process storage, used when running outside a browser.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    read_only: bool,
}

impl MemoryStorage {
    pub fn with_item(key: &str, value: &str) -> Self {
        let storage = Self::default();
        storage
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        storage
    }

    /// Every write fails, like a full or disabled quota.
    pub fn read_only() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            read_only: true,
        }
    }

    pub fn item(&self, key: &str) -> Option<String> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl ConfigStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.item(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        if self.read_only {
            return Err(ConfigError::Storage("quota exceeded".to_string()));
        }
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
