use serde::{Deserialize, Serialize};

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "system" => Ok(ChatRole::System),
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            _ => Err(format!("Unknown chat role: {}", s)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One message of the conversation sent to the completion endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Kind of a RAG attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RagFileKind {
    File,
    Collection,
}

/// File or knowledge-base collection attached to a request (OpenWebUI `files`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagFile {
    #[serde(rename = "type")]
    pub kind: RagFileKind,
    pub id: String,
}

impl RagFile {
    pub fn file(id: impl Into<String>) -> Self {
        Self {
            kind: RagFileKind::File,
            id: id.into(),
        }
    }

    pub fn collection(id: impl Into<String>) -> Self {
        Self {
            kind: RagFileKind::Collection,
            id: id.into(),
        }
    }
}

/// Optional sampling parameters forwarded verbatim when set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingParams {
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub stop: Option<Vec<String>>,
}

/// Body of `POST {baseUrl}/chat/completions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<RagFile>>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>, stream: bool) -> Self {
        Self {
            model: model.into(),
            messages,
            stream,
            max_tokens: None,
            temperature: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            stop: None,
            files: None,
        }
    }

    pub fn with_sampling(mut self, sampling: &SamplingParams) -> Self {
        self.top_p = sampling.top_p;
        self.frequency_penalty = sampling.frequency_penalty;
        self.presence_penalty = sampling.presence_penalty;
        self.stop = sampling.stop.clone().filter(|s| !s.is_empty());
        self
    }
}

/// Model entry returned by `GET {baseUrl}/models`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

impl ModelInfo {
    /// Builds an entry from one raw JSON item; `name` falls back to `id`.
    pub fn from_json(item: &serde_json::Value) -> Option<Self> {
        let id = item.get("id")?.as_str()?.to_string();
        let name = item
            .get("name")
            .and_then(|n| n.as_str())
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| id.clone());
        Some(Self { id, name })
    }

    /// Accepts both `{data: [...]}` and a bare array.
    pub fn list_from_json(body: &serde_json::Value) -> Vec<Self> {
        let items = match body.get("data").and_then(|d| d.as_array()) {
            Some(items) => items,
            None => match body.as_array() {
                Some(items) => items,
                None => return Vec::new(),
            },
        };
        items.iter().filter_map(ModelInfo::from_json).collect()
    }
}

/// Outcome of an endpoint check, shaped like `{success, models, error}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelValidation {
    pub success: bool,
    pub models: Vec<ModelInfo>,
    pub error: Option<String>,
}

impl ModelValidation {
    pub fn ok(models: Vec<ModelInfo>) -> Self {
        Self {
            success: true,
            models,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            models: Vec::new(),
            error: Some(error.into()),
        }
    }
}
