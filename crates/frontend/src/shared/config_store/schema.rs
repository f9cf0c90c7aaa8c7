//! JSON-level helpers for the persisted config tree: dotted paths,
//! deep merge and the per-field validation table.

use super::ConfigError;
use contracts::shared::app_config::{AppConfig, Language, Theme, ViewMode};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy)]
enum Rule {
    PositiveInt,
    NonNegativeInt,
    Range(f64, f64),
    NonEmptyString,
    AnyString,
    OneOf(&'static [&'static str]),
    Bool,
    IdList,
}

impl Rule {
    fn accepts(&self, value: &Value) -> bool {
        let fits_u32 = |n: u64| n <= u64::from(u32::MAX);
        match self {
            Rule::PositiveInt => value.as_u64().is_some_and(|n| n > 0 && fits_u32(n)),
            Rule::NonNegativeInt => value.as_u64().is_some_and(fits_u32),
            Rule::Range(min, max) => value.as_f64().is_some_and(|n| n >= *min && n <= *max),
            Rule::NonEmptyString => value.as_str().is_some_and(|s| !s.trim().is_empty()),
            Rule::AnyString => value.is_string(),
            Rule::OneOf(allowed) => value.as_str().is_some_and(|s| allowed.contains(&s)),
            Rule::Bool => value.is_boolean(),
            Rule::IdList => value
                .as_array()
                .is_some_and(|ids| ids.iter().all(|id| id.as_u64().is_some_and(fits_u32))),
        }
    }

    fn describe(&self) -> String {
        match self {
            Rule::PositiveInt => "必须是正整数".to_string(),
            Rule::NonNegativeInt => "必须是非负整数".to_string(),
            Rule::Range(min, max) => format!("必须在 {} 到 {} 之间", min, max),
            Rule::NonEmptyString => "不能为空".to_string(),
            Rule::AnyString => "必须是字符串".to_string(),
            Rule::OneOf(allowed) => format!("必须是 {} 之一", allowed.join(", ")),
            Rule::Bool => "必须是布尔值".to_string(),
            Rule::IdList => "必须是系统编号列表".to_string(),
        }
    }
}

const FIELD_RULES: &[(&str, Rule)] = &[
    ("ai.baseUrl", Rule::NonEmptyString),
    ("ai.apiKey", Rule::AnyString),
    ("ai.model", Rule::NonEmptyString),
    ("ai.maxTokens", Rule::PositiveInt),
    ("ai.temperature", Rule::Range(0.0, 2.0)),
    ("ai.timeout", Rule::PositiveInt),
    ("ai.maxRetries", Rule::NonNegativeInt),
    ("ai.maxHistory", Rule::PositiveInt),
    ("ui.theme", Rule::OneOf(&Theme::VALUES)),
    ("ui.language", Rule::OneOf(&Language::VALUES)),
    ("ui.viewMode", Rule::OneOf(&ViewMode::VALUES)),
    ("ui.showStats", Rule::Bool),
    ("ui.enableAnimations", Rule::Bool),
    ("portal.favorites", Rule::IdList),
    ("storage.prefix", Rule::NonEmptyString),
    ("storage.version", Rule::NonEmptyString),
];

pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |node, key| node.get(key))
}

/// Writes `value` at `path`, replacing any non-object along the way.
pub fn set_path(root: &mut Value, path: &str, value: Value) {
    let mut node = root;
    let mut keys = path.split('.').peekable();
    while let Some(key) = keys.next() {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };
        if keys.peek().is_none() {
            map.insert(key.to_string(), value);
            return;
        }
        node = map.entry(key.to_string()).or_insert(Value::Null);
    }
}

/// Objects merge key by key; anything else (arrays included) replaces the target.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// Merges a raw stored tree onto the defaults and replaces every invalid
/// field with its default value.
pub fn normalize(raw: &Value) -> Value {
    let defaults = AppConfig::default_json();
    let mut merged = defaults.clone();
    if raw.is_object() {
        deep_merge(&mut merged, raw);
    }
    for (path, rule) in FIELD_RULES {
        let valid = get_path(&merged, path).is_some_and(|v| rule.accepts(v));
        if !valid {
            if let Some(default) = get_path(&defaults, path) {
                log::warn!("Config: invalid value at '{}', using default {}", path, default);
                set_path(&mut merged, path, default.clone());
            }
        }
    }
    merged
}

/// Strict check used before persisting explicit changes.
pub fn check(config: &Value) -> Result<(), ConfigError> {
    for (path, rule) in FIELD_RULES {
        match get_path(config, path) {
            Some(value) if rule.accepts(value) => {}
            _ => {
                return Err(ConfigError::Validation {
                    field: path.to_string(),
                    reason: rule.describe(),
                })
            }
        }
    }
    Ok(())
}
