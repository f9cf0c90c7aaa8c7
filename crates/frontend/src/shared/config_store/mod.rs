//! Persisted application configuration.
//!
//! The whole [`AppConfig`] lives as one JSON blob under
//! [`CONFIG_STORAGE_KEY`]. Loading never fails: corrupt or missing data falls
//! back to defaults field by field. Explicit changes go through `set`/`save`,
//! are validated strictly, persisted, then announced as `config:change`.
//!
//! The AI endpoint (`ai.baseUrl`, `ai.apiKey`, `ai.model`) is only changed by
//! [`ConfigStore::commit_ai_endpoint`], which requires a [`VerifiedEndpoint`]
//! obtained from a successful model listing.

pub mod schema;
pub mod storage;

pub use storage::{BrowserStorage, ConfigStorage, MemoryStorage};

use crate::shared::event_bus::EventBus;
use contracts::shared::app_config::{AppConfig, ChatConfig, StorageMeta, CONFIG_STORAGE_KEY};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

const PROTECTED_PATHS: [&str; 4] = ["ai", "ai.baseUrl", "ai.apiKey", "ai.model"];
const ENDPOINT_FIELDS: [&str; 3] = ["baseUrl", "apiKey", "model"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("本地存储异常: {0}")]
    Storage(String),

    #[error("配置格式无效: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("配置项 {field} 无效: {reason}")]
    Validation { field: String, reason: String },

    #[error("配置项 {0} 只能在连接验证成功后修改")]
    ProtectedKey(String),
}

/// Proof that an endpoint answered a model listing. Only the chat transport
/// creates these.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedEndpoint {
    base_url: String,
    api_key: String,
    models: Vec<String>,
}

impl VerifiedEndpoint {
    pub(crate) fn new(base_url: &str, api_key: &str, models: Vec<String>) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            models,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// True when `base_url`/`api_key` (as typed) name this endpoint.
    pub fn matches(&self, base_url: &str, api_key: &str) -> bool {
        base_url.trim().trim_end_matches('/') == self.base_url && api_key.trim() == self.api_key
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn has_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }
}

#[derive(Clone)]
pub struct ConfigStore {
    current: Arc<Mutex<Value>>,
    storage: Arc<dyn ConfigStorage>,
    bus: EventBus,
}

impl ConfigStore {
    pub fn new(storage: Arc<dyn ConfigStorage>, bus: EventBus) -> Self {
        Self {
            current: Arc::new(Mutex::new(AppConfig::default_json())),
            storage,
            bus,
        }
    }

    pub fn browser(bus: EventBus) -> Self {
        Self::new(Arc::new(BrowserStorage), bus)
    }

    fn lock(&self) -> MutexGuard<'_, Value> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads storage, merges onto defaults and coerces invalid fields.
    /// An outdated `storage.version` is migrated to the current one.
    pub fn load(&self) -> AppConfig {
        let raw = match self.storage.read(CONFIG_STORAGE_KEY) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Config: {}, using defaults", e);
                None
            }
        };
        let parsed = raw.and_then(|text| match serde_json::from_str::<Value>(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Config: stored blob is corrupt ({}), using defaults", e);
                None
            }
        });
        let stored_version = parsed
            .as_ref()
            .and_then(|v| schema::get_path(v, "storage.version"))
            .and_then(Value::as_str)
            .map(str::to_string);

        *self.lock() = schema::normalize(parsed.as_ref().unwrap_or(&Value::Null));

        let current_version = StorageMeta::default().version;
        if let Some(from) = stored_version.filter(|v| *v != current_version) {
            if let Err(e) = self.migrate(&from, &current_version) {
                log::warn!("Config: migration {} -> {} failed: {}", from, current_version, e);
            }
        }
        log::info!("Config: loaded (version {})", self.version());
        self.snapshot()
    }

    pub fn snapshot(&self) -> AppConfig {
        let current = self.lock().clone();
        serde_json::from_value(current).unwrap_or_else(|e| {
            log::error!("Config: normalized tree does not deserialize: {}", e);
            AppConfig::default()
        })
    }

    pub fn ai_config(&self) -> ChatConfig {
        self.snapshot().ai
    }

    pub fn get(&self, path: &str) -> Option<Value> {
        schema::get_path(&self.lock(), path).cloned()
    }

    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get(path).and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn default_value(&self, path: &str) -> Option<Value> {
        schema::get_path(&AppConfig::default_json(), path).cloned()
    }

    fn persist(&self, candidate: Value) -> Result<(), ConfigError> {
        let text = serde_json::to_string(&candidate)?;
        self.storage.write(CONFIG_STORAGE_KEY, &text)?;
        *self.lock() = candidate;
        Ok(())
    }

    fn ensure_unprotected(path: &str) -> Result<(), ConfigError> {
        if PROTECTED_PATHS.contains(&path) {
            return Err(ConfigError::ProtectedKey(path.to_string()));
        }
        Ok(())
    }

    /// Sets one dotted path, leaving siblings untouched.
    pub fn set(&self, path: &str, value: Value) -> Result<(), ConfigError> {
        Self::ensure_unprotected(path)?;
        if path.is_empty() {
            return Err(ConfigError::Validation {
                field: String::new(),
                reason: "路径不能为空".to_string(),
            });
        }

        let (candidate, old) = {
            let current = self.lock();
            let old = schema::get_path(&current, path).cloned();
            let mut candidate = current.clone();
            schema::set_path(&mut candidate, path, value.clone());
            (candidate, old)
        };
        schema::check(&candidate)?;
        self.persist(candidate)?;

        log::debug!("Config: {} updated", path);
        self.bus.emit(
            "config:change",
            json!({"path": path, "value": value, "oldValue": old}),
        );
        Ok(())
    }

    /// Deep-merges a partial tree. The endpoint triple is rejected here too.
    pub fn save(&self, patch: Value) -> Result<(), ConfigError> {
        for field in ENDPOINT_FIELDS {
            if patch.get("ai").and_then(|ai| ai.get(field)).is_some() {
                return Err(ConfigError::ProtectedKey(format!("ai.{}", field)));
            }
        }

        let mut candidate = self.lock().clone();
        schema::deep_merge(&mut candidate, &patch);
        schema::check(&candidate)?;
        self.persist(candidate)?;

        self.bus.emit("config:change", json!({"path": null, "value": patch}));
        Ok(())
    }

    /// Resets one path, or everything when `path` is `None`.
    pub fn reset(&self, path: Option<&str>) -> Result<(), ConfigError> {
        match path {
            Some(path) => {
                let default = self.default_value(path).ok_or_else(|| ConfigError::Validation {
                    field: path.to_string(),
                    reason: "未知配置项".to_string(),
                })?;
                self.set(path, default)
            }
            None => {
                self.persist(AppConfig::default_json())?;
                self.bus.emit("config:reset", Value::Null);
                Ok(())
            }
        }
    }

    pub fn export(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&*self.lock())?)
    }

    /// Replaces the config with an imported blob. The current endpoint triple
    /// is kept because it was not verified on this machine.
    pub fn import(&self, text: &str) -> Result<(), ConfigError> {
        let imported: Value = serde_json::from_str(text)?;
        if !imported.is_object() {
            return Err(ConfigError::Validation {
                field: String::new(),
                reason: "导入内容必须是 JSON 对象".to_string(),
            });
        }

        let mut candidate = schema::normalize(&imported);
        {
            let current = self.lock();
            for field in ENDPOINT_FIELDS {
                let path = format!("ai.{}", field);
                if let Some(value) = schema::get_path(&current, &path) {
                    schema::set_path(&mut candidate, &path, value.clone());
                }
            }
        }
        self.persist(candidate)?;

        log::info!("Config: imported");
        self.bus.emit("config:import", Value::Null);
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        *self.lock() != AppConfig::default_json()
    }

    pub fn version(&self) -> String {
        self.get_as::<String>("storage.version")
            .unwrap_or_else(|| "1.0.0".to_string())
    }

    /// Returns `Ok(false)` when there is nothing to migrate.
    pub fn migrate(&self, from: &str, to: &str) -> Result<bool, ConfigError> {
        if from == to {
            return Ok(false);
        }
        log::info!("Config: migrating {} -> {}", from, to);
        let mut candidate = self.lock().clone();
        schema::set_path(&mut candidate, "storage.version", Value::String(to.to_string()));
        schema::check(&candidate)?;
        self.persist(candidate)?;
        self.bus.emit("config:migrate", json!({"from": from, "to": to}));
        Ok(true)
    }

    /// Stores a verified endpoint together with one of its listed models.
    pub fn commit_ai_endpoint(
        &self,
        verified: &VerifiedEndpoint,
        model: &str,
    ) -> Result<(), ConfigError> {
        if !verified.has_model(model) {
            return Err(ConfigError::Validation {
                field: "ai.model".to_string(),
                reason: format!("模型 {} 不在已验证的模型列表中", model),
            });
        }

        let mut candidate = self.lock().clone();
        schema::set_path(&mut candidate, "ai.baseUrl", json!(verified.base_url));
        schema::set_path(&mut candidate, "ai.apiKey", json!(verified.api_key));
        schema::set_path(&mut candidate, "ai.model", json!(model));
        schema::check(&candidate)?;
        self.persist(candidate)?;

        log::info!("Config: AI endpoint set to {} ({})", verified.base_url, model);
        self.bus.emit(
            "config:change",
            json!({"path": "ai", "value": {"baseUrl": verified.base_url, "model": model}}),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::shared::app_config::{Theme, DEFAULT_BASE_URL};
    use proptest::prelude::*;

    fn store_with(storage: MemoryStorage) -> (ConfigStore, Arc<MemoryStorage>, EventBus) {
        let storage = Arc::new(storage);
        let bus = EventBus::new();
        (ConfigStore::new(storage.clone(), bus.clone()), storage, bus)
    }

    fn verified() -> VerifiedEndpoint {
        VerifiedEndpoint::new("http://ai.local/api", "sk-1", vec!["llama3".into(), "qwen".into()])
    }

    #[test]
    fn test_verified_endpoint_matches_typed_form() {
        let token = verified();
        assert!(token.matches(" http://ai.local/api/ ", "sk-1 "));
        assert!(!token.matches("http://other.local/api", "sk-1"));
        assert!(!token.matches("http://ai.local/api", "sk-2"));
    }

    #[test]
    fn test_load_missing_blob_gives_defaults() {
        let (store, _, _) = store_with(MemoryStorage::default());
        assert_eq!(store.load(), AppConfig::default());
        assert!(!store.is_modified());
    }

    #[test]
    fn test_load_corrupt_blob_gives_defaults() {
        let (store, _, _) = store_with(MemoryStorage::with_item(CONFIG_STORAGE_KEY, "{not json"));
        assert_eq!(store.load(), AppConfig::default());
    }

    #[test]
    fn test_load_out_of_range_temperature_uses_default() {
        let blob = r#"{"ai":{"temperature":3.5,"model":"llama3"},"storage":{"version":"2.0.0"}}"#;
        let (store, _, _) = store_with(MemoryStorage::with_item(CONFIG_STORAGE_KEY, blob));
        let config = store.load();
        assert_eq!(config.ai.temperature, 0.7);
        assert_eq!(config.ai.model, "llama3");
        assert_eq!(store.get("ai.temperature"), Some(json!(0.7)));
    }

    #[test]
    fn test_load_migrates_old_version() {
        let blob = r#"{"storage":{"version":"1.0.0"}}"#;
        let (store, storage, _) = store_with(MemoryStorage::with_item(CONFIG_STORAGE_KEY, blob));
        store.load();
        assert_eq!(store.version(), "2.0.0");
        let persisted: Value = serde_json::from_str(&storage.item(CONFIG_STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(persisted["storage"]["version"], "2.0.0");
    }

    #[test]
    fn test_set_persists_and_emits_change() {
        let (store, storage, bus) = store_with(MemoryStorage::default());
        store.load();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        bus.on("config:change", move |p| {
            sink.lock().unwrap().push(p.clone());
            Ok(())
        });

        store.set("ui.theme", json!("dark")).unwrap();
        assert_eq!(store.snapshot().ui.theme, Theme::Dark);
        assert!(storage.item(CONFIG_STORAGE_KEY).unwrap().contains("\"dark\""));
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["path"], "ui.theme");
        assert_eq!(events[0]["oldValue"], "light");
    }

    #[test]
    fn test_set_rejects_invalid_value_and_keeps_state() {
        let (store, storage, _) = store_with(MemoryStorage::default());
        store.load();
        let err = store.set("ai.temperature", json!(9)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "ai.temperature"));
        assert_eq!(store.get("ai.temperature"), Some(json!(0.7)));
        assert!(storage.item(CONFIG_STORAGE_KEY).is_none());
    }

    #[test]
    fn test_set_refuses_endpoint_triple() {
        let (store, _, _) = store_with(MemoryStorage::default());
        for path in ["ai", "ai.baseUrl", "ai.apiKey", "ai.model"] {
            assert!(matches!(
                store.set(path, json!("x")),
                Err(ConfigError::ProtectedKey(_))
            ));
        }
        assert!(matches!(
            store.save(json!({"ai": {"model": "other"}})),
            Err(ConfigError::ProtectedKey(_))
        ));
    }

    #[test]
    fn test_storage_failure_leaves_memory_unchanged() {
        let (store, _, _) = store_with(MemoryStorage::read_only());
        store.load();
        assert!(matches!(
            store.set("ui.viewMode", json!("list")),
            Err(ConfigError::Storage(_))
        ));
        assert_eq!(store.get("ui.viewMode"), Some(json!("grid")));
    }

    #[test]
    fn test_save_merges_patch() {
        let (store, _, _) = store_with(MemoryStorage::default());
        store.load();
        store
            .save(json!({"ai": {"maxTokens": 2048, "temperature": 1.2}}))
            .unwrap();
        let ai = store.ai_config();
        assert_eq!(ai.max_tokens, 2048);
        assert_eq!(ai.temperature, 1.2);
        assert_eq!(ai.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_commit_endpoint_requires_listed_model() {
        let (store, _, _) = store_with(MemoryStorage::default());
        store.load();
        assert!(matches!(
            store.commit_ai_endpoint(&verified(), "gpt-4"),
            Err(ConfigError::Validation { .. })
        ));
        assert_eq!(store.ai_config().base_url, DEFAULT_BASE_URL);

        store.commit_ai_endpoint(&verified(), "qwen").unwrap();
        let ai = store.ai_config();
        assert_eq!(ai.base_url, "http://ai.local/api");
        assert_eq!(ai.api_key, "sk-1");
        assert_eq!(ai.model, "qwen");
    }

    #[test]
    fn test_reset_single_path_and_all() {
        let (store, _, _) = store_with(MemoryStorage::default());
        store.load();
        store.set("ui.showStats", json!(false)).unwrap();
        store.set("ui.viewMode", json!("list")).unwrap();
        store.reset(Some("ui.showStats")).unwrap();
        assert_eq!(store.get("ui.showStats"), Some(json!(true)));
        assert_eq!(store.get("ui.viewMode"), Some(json!("list")));
        assert!(store.reset(Some("ui.nope")).is_err());
        store.reset(None).unwrap();
        assert!(!store.is_modified());
    }

    #[test]
    fn test_import_keeps_verified_endpoint() {
        let (store, _, _) = store_with(MemoryStorage::default());
        store.load();
        store.commit_ai_endpoint(&verified(), "llama3").unwrap();
        let exported = r#"{"ai":{"baseUrl":"http://evil","model":"x","maxTokens":100},"ui":{"theme":"dark"}}"#;
        store.import(exported).unwrap();
        let config = store.snapshot();
        assert_eq!(config.ai.base_url, "http://ai.local/api");
        assert_eq!(config.ai.model, "llama3");
        assert_eq!(config.ai.max_tokens, 100);
        assert_eq!(config.ui.theme, Theme::Dark);

        assert!(matches!(store.import("nope"), Err(ConfigError::Parse(_))));
        assert!(matches!(store.import("[1]"), Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_export_round_trips_through_import() {
        let (store, _, _) = store_with(MemoryStorage::default());
        store.load();
        store.set("portal.favorites", json!([1, 4])).unwrap();
        let text = store.export().unwrap();

        let (other, _, _) = store_with(MemoryStorage::default());
        other.load();
        other.import(&text).unwrap();
        assert_eq!(other.snapshot(), store.snapshot());
    }

    proptest! {
        #[test]
        fn prop_set_then_get_leaves_siblings(show_stats in any::<bool>(), max_history in 1u32..500) {
            let (store, _, _) = store_with(MemoryStorage::default());
            store.load();
            let before = store.snapshot();
            store.set("ui.showStats", json!(show_stats)).unwrap();
            store.set("ai.maxHistory", json!(max_history)).unwrap();
            prop_assert_eq!(store.get("ui.showStats"), Some(json!(show_stats)));
            prop_assert_eq!(store.get_as::<u32>("ai.maxHistory"), Some(max_history));

            let after = store.snapshot();
            prop_assert_eq!(after.ui.theme, before.ui.theme);
            prop_assert_eq!(after.ui.view_mode, before.ui.view_mode);
            prop_assert_eq!(after.ai.max_tokens, before.ai.max_tokens);
            prop_assert_eq!(after.portal, before.portal);
        }

        #[test]
        fn prop_loaded_temperature_always_in_range(t in -100.0f64..100.0) {
            let blob = json!({"ai": {"temperature": t}}).to_string();
            let (store, _, _) = store_with(MemoryStorage::with_item(CONFIG_STORAGE_KEY, &blob));
            let temperature = store.load().ai.temperature;
            prop_assert!((0.0..=2.0).contains(&temperature));
        }
    }
}
