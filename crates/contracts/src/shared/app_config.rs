use serde::{Deserialize, Serialize};

/// Key under which the whole config blob lives in localStorage.
pub const CONFIG_STORAGE_KEY: &str = "shengnong_config";

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_MODEL: &str = "qwen2.5:7b";

/// Connection and sampling settings of the AI assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Request timeout, milliseconds.
    pub timeout: u32,
    pub max_retries: u32,
    /// Number of user/assistant pairs kept as conversation context.
    pub max_history: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4000,
            temperature: 0.7,
            timeout: 30_000,
            max_retries: 3,
            max_history: 10,
        }
    }
}

impl ChatConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Base URL without trailing slashes, ready for `format!("{}/models", ..)`.
    pub fn endpoint_base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Auto => "auto",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Theme::Light => "浅色",
            Theme::Dark => "深色",
            Theme::Auto => "跟随系统",
        }
    }

    pub fn all() -> [Theme; 3] {
        [Theme::Light, Theme::Dark, Theme::Auto]
    }

    pub const VALUES: [&'static str; 3] = ["light", "dark", "auto"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "en-US")]
    EnUs,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::ZhCn => "zh-CN",
            Language::EnUs => "en-US",
        }
    }

    pub const VALUES: [&'static str; 2] = ["zh-CN", "en-US"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Grid => "grid",
            ViewMode::List => "list",
        }
    }

    pub const VALUES: [&'static str; 2] = ["grid", "list"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiPreferences {
    pub theme: Theme,
    pub language: Language,
    pub view_mode: ViewMode,
    pub show_stats: bool,
    pub enable_animations: bool,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            language: Language::ZhCn,
            view_mode: ViewMode::Grid,
            show_stats: true,
            enable_animations: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortalPreferences {
    /// Ids of favorited portal systems.
    pub favorites: Vec<u32>,
}

impl Default for PortalPreferences {
    fn default() -> Self {
        Self {
            favorites: vec![2, 5],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageMeta {
    pub prefix: String,
    pub version: String,
}

impl Default for StorageMeta {
    fn default() -> Self {
        Self {
            prefix: "shengnong_".to_string(),
            version: "2.0.0".to_string(),
        }
    }
}

/// Root configuration object persisted as a single JSON blob.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ai: ChatConfig,
    pub ui: UiPreferences,
    pub portal: PortalPreferences,
    pub storage: StorageMeta,
}

impl AppConfig {
    /// Defaults as a JSON tree, the base every stored blob is merged onto.
    pub fn default_json() -> serde_json::Value {
        serde_json::to_value(AppConfig::default()).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_json_uses_camel_case() {
        let json = AppConfig::default_json();
        assert_eq!(json["ai"]["baseUrl"], DEFAULT_BASE_URL);
        assert_eq!(json["ai"]["maxTokens"], 4000);
        assert_eq!(json["ui"]["viewMode"], "grid");
        assert_eq!(json["ui"]["language"], "zh-CN");
        assert_eq!(json["storage"]["version"], "2.0.0");
    }

    #[test]
    fn test_partial_blob_falls_back_to_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"ai":{"model":"llama3"},"ui":{"theme":"dark"}}"#).unwrap();
        assert_eq!(cfg.ai.model, "llama3");
        assert_eq!(cfg.ai.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.ui.theme, Theme::Dark);
        assert_eq!(cfg.ui.language, Language::ZhCn);
    }

    #[test]
    fn test_endpoint_base_strips_trailing_slash() {
        let cfg = ChatConfig {
            base_url: "http://host/api//".into(),
            ..ChatConfig::default()
        };
        assert_eq!(cfg.endpoint_base(), "http://host/api");
    }
}
