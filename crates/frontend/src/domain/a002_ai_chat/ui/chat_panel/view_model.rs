//! Chat panel - View Model

use crate::domain::a002_ai_chat::history::ChatHistory;
use crate::shared::config_store::{ConfigError, ConfigStore, VerifiedEndpoint};
use contracts::domain::a002_ai_chat::aggregate::ModelInfo;
use contracts::shared::app_config::ChatConfig;
use futures::future::AbortHandle;
use leptos::prelude::*;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("请先验证API地址并选择模型")]
    Unverified,

    #[error("最大令牌数或创造性参数格式错误")]
    InvalidNumber,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Clone, Copy)]
pub struct ChatPanelVm {
    pub history: RwSignal<ChatHistory>,
    pub input: RwSignal<String>,
    /// Reply being received; `Some("")` shows the typing indicator.
    pub streaming: RwSignal<Option<String>>,
    pub is_sending: RwSignal<bool>,
    /// Message of the last failed exchange, shown with a retry button.
    pub error: RwSignal<Option<String>>,
    pub abort: StoredValue<Option<AbortHandle>>,

    pub settings_open: RwSignal<bool>,
    pub base_url: RwSignal<String>,
    pub api_key: RwSignal<String>,
    pub model: RwSignal<String>,
    pub models: RwSignal<Vec<ModelInfo>>,
    pub max_tokens: RwSignal<String>,
    pub temperature: RwSignal<String>,
    pub verifying: RwSignal<bool>,
    pub verified: RwSignal<Option<VerifiedEndpoint>>,
}

impl ChatPanelVm {
    pub fn new(config: &ChatConfig) -> Self {
        let vm = Self {
            history: RwSignal::new(ChatHistory::new(config.max_history)),
            input: RwSignal::new(String::new()),
            streaming: RwSignal::new(None),
            is_sending: RwSignal::new(false),
            error: RwSignal::new(None),
            abort: StoredValue::new(None),
            settings_open: RwSignal::new(false),
            base_url: RwSignal::new(String::new()),
            api_key: RwSignal::new(String::new()),
            model: RwSignal::new(String::new()),
            models: RwSignal::new(Vec::new()),
            max_tokens: RwSignal::new(String::new()),
            temperature: RwSignal::new(String::new()),
            verifying: RwSignal::new(false),
            verified: RwSignal::new(None),
        };
        vm.load_settings(config);
        vm
    }

    /// Fills the settings form from the stored configuration.
    pub fn load_settings(&self, config: &ChatConfig) {
        self.base_url.set(config.base_url.clone());
        self.api_key.set(config.api_key.clone());
        self.model.set(config.model.clone());
        self.models.set(vec![ModelInfo {
            id: config.model.clone(),
            name: config.model.clone(),
        }]);
        self.max_tokens.set(config.max_tokens.to_string());
        self.temperature.set(config.temperature.to_string());
        self.verified.set(None);
        self.history.update(|h| h.set_max_pairs(config.max_history));
    }

    /// Endpoint fields differ from what is stored.
    pub fn endpoint_edited(&self, config: &ChatConfig) -> bool {
        self.base_url.get_untracked().trim().trim_end_matches('/') != config.endpoint_base()
            || self.api_key.get_untracked().trim() != config.api_key
            || self.model.get_untracked() != config.model
    }

    /// Forgets a verification that no longer matches the typed URL or key.
    pub fn drop_stale_verification(&self) {
        let base_url = self.base_url.get();
        let api_key = self.api_key.get();
        let stale = self
            .verified
            .with_untracked(|v| v.as_ref().is_some_and(|v| !v.matches(&base_url, &api_key)));
        if stale {
            self.verified.set(None);
        }
    }

    /// Writes the form to the store. An edited endpoint is committed only
    /// with a verification of exactly the typed URL and key.
    pub fn save_settings(&self, store: &ConfigStore) -> Result<(), SettingsError> {
        let max_tokens = self.max_tokens.get_untracked().trim().parse::<u64>();
        let temperature = self.temperature.get_untracked().trim().parse::<f64>();
        let (Ok(max_tokens), Ok(temperature)) = (max_tokens, temperature) else {
            return Err(SettingsError::InvalidNumber);
        };

        if self.endpoint_edited(&store.ai_config()) {
            let base_url = self.base_url.get_untracked();
            let api_key = self.api_key.get_untracked();
            let verified = self
                .verified
                .get_untracked()
                .filter(|v| v.matches(&base_url, &api_key))
                .ok_or(SettingsError::Unverified)?;
            store.commit_ai_endpoint(&verified, &self.model.get_untracked())?;
        }

        store.save(json!({"ai": {"maxTokens": max_tokens, "temperature": temperature}}))?;
        self.load_settings(&store.ai_config());
        Ok(())
    }

    /// Drops the unanswered user turn of a cancelled exchange and puts its
    /// text back into an empty input.
    pub fn abandon_exchange(&self) {
        let mut dropped = None;
        self.history.update(|h| dropped = h.pop_last_user());
        if let Some(entry) = dropped {
            if self.input.with_untracked(|i| i.trim().is_empty()) {
                self.input.set(entry.content);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::config_store::MemoryStorage;
    use crate::shared::event_bus::EventBus;
    use contracts::domain::a002_ai_chat::aggregate::ChatRole;
    use std::sync::Arc;

    fn store() -> ConfigStore {
        let store = ConfigStore::new(Arc::new(MemoryStorage::default()), EventBus::new());
        store.load();
        store
    }

    fn verified(base_url: &str) -> VerifiedEndpoint {
        VerifiedEndpoint::new(base_url, "", vec!["m1".to_string()])
    }

    #[test]
    fn test_save_refuses_token_for_another_url() {
        let owner = Owner::new();
        owner.set();
        let store = store();
        let vm = ChatPanelVm::new(&store.ai_config());
        let before = store.ai_config().base_url;

        vm.base_url.set("http://a/api".to_string());
        vm.api_key.set(String::new());
        vm.verified.set(Some(verified("http://a/api")));
        vm.model.set("m1".to_string());
        vm.base_url.set("http://b/api".to_string());

        assert!(matches!(vm.save_settings(&store), Err(SettingsError::Unverified)));
        assert_eq!(store.ai_config().base_url, before);
    }

    #[test]
    fn test_save_commits_verified_endpoint() {
        let owner = Owner::new();
        owner.set();
        let store = store();
        let vm = ChatPanelVm::new(&store.ai_config());

        vm.base_url.set("http://a/api/".to_string());
        vm.api_key.set(String::new());
        vm.verified.set(Some(verified("http://a/api")));
        vm.model.set("m1".to_string());
        vm.max_tokens.set("2048".to_string());

        vm.save_settings(&store).unwrap();
        let stored = store.ai_config();
        assert_eq!(stored.base_url, "http://a/api");
        assert_eq!(stored.model, "m1");
        assert_eq!(stored.max_tokens, 2048);
        assert!(vm.verified.get_untracked().is_none());
    }

    #[test]
    fn test_bad_number_leaves_endpoint_untouched() {
        let owner = Owner::new();
        owner.set();
        let store = store();
        let vm = ChatPanelVm::new(&store.ai_config());
        vm.base_url.set("http://a/api".to_string());
        vm.api_key.set(String::new());
        vm.verified.set(Some(verified("http://a/api")));
        vm.model.set("m1".to_string());
        vm.temperature.set("warm".to_string());

        assert!(matches!(vm.save_settings(&store), Err(SettingsError::InvalidNumber)));
        assert_ne!(store.ai_config().base_url, "http://a/api");
    }

    #[test]
    fn test_editing_url_drops_verification() {
        let owner = Owner::new();
        owner.set();
        let vm = ChatPanelVm::new(&ChatConfig::default());
        vm.base_url.set("http://a/api".to_string());
        vm.api_key.set(String::new());
        vm.verified.set(Some(verified("http://a/api")));

        vm.drop_stale_verification();
        assert!(vm.verified.get_untracked().is_some());

        vm.base_url.set("http://b/api".to_string());
        vm.drop_stale_verification();
        assert!(vm.verified.get_untracked().is_none());
    }

    #[test]
    fn test_abandoned_exchange_returns_text_to_input() {
        let owner = Owner::new();
        owner.set();
        let vm = ChatPanelVm::new(&ChatConfig::default());
        vm.history.update(|h| {
            h.push(ChatRole::User, "第一个问题".to_string());
            h.push(ChatRole::Assistant, "回答".to_string());
            h.push(ChatRole::User, "第二个问题".to_string());
        });

        vm.abandon_exchange();
        assert_eq!(vm.history.with_untracked(|h| h.len()), 2);
        assert_eq!(vm.input.get_untracked(), "第二个问题");

        // nothing left to drop once the trailing turn is the reply
        vm.abandon_exchange();
        assert_eq!(vm.history.with_untracked(|h| h.len()), 2);
    }
}
