use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Low-level failure reported by an [`super::http::HttpBackend`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportFailure {
    #[error("network error: {0}")]
    Network(String),

    #[error("request aborted")]
    Aborted,

    #[error("body read failed: {0}")]
    Body(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatErrorKind {
    Network,
    Timeout,
    /// 401 / 403
    Auth,
    /// 404
    NotFound,
    /// 429
    RateLimit,
    /// 5xx
    Server,
    MalformedResponse,
    /// Empty input, bad model id or parameters (400 and other 4xx).
    Validation,
}

impl ChatErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatErrorKind::Network => "network",
            ChatErrorKind::Timeout => "timeout",
            ChatErrorKind::Auth => "auth",
            ChatErrorKind::NotFound => "not_found",
            ChatErrorKind::RateLimit => "rate_limit",
            ChatErrorKind::Server => "server",
            ChatErrorKind::MalformedResponse => "malformed_response",
            ChatErrorKind::Validation => "validation",
        }
    }
}

/// What went wrong underneath a [`ChatError`], exposed through `source()`.
#[derive(Debug, Clone, Error)]
pub enum ErrorCause {
    #[error(transparent)]
    Transport(#[from] TransportFailure),

    #[error("HTTP {status} {status_text}: {body}")]
    Status {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("no response within {0} ms")]
    Elapsed(u32),

    #[error("{0}")]
    Detail(String),
}

/// Classified error surfaced to the chat UI. `message` is user-facing.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    #[source]
    pub cause: ErrorCause,
    pub timestamp: DateTime<Utc>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>, cause: ErrorCause) -> Self {
        Self {
            kind,
            message: message.into(),
            cause,
            timestamp: Utc::now(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ChatErrorKind::Validation,
            message.clone(),
            ErrorCause::Detail(message),
        )
    }

    pub fn timeout(timeout_ms: u32) -> Self {
        Self::new(
            ChatErrorKind::Timeout,
            "请求超时，请检查网络连接或增加超时时间",
            ErrorCause::Elapsed(timeout_ms),
        )
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::new(
            ChatErrorKind::MalformedResponse,
            "API响应格式无法识别",
            ErrorCause::Detail(detail.into()),
        )
    }

    pub fn from_transport(failure: TransportFailure) -> Self {
        match failure {
            TransportFailure::Aborted => Self::new(
                ChatErrorKind::Timeout,
                "请求已取消",
                ErrorCause::Transport(failure),
            ),
            other => Self::new(
                ChatErrorKind::Network,
                "网络连接失败，请检查网络设置，请检查API地址是否正确",
                ErrorCause::Transport(other),
            ),
        }
    }

    /// Maps a non-success HTTP status to its kind and message.
    pub fn from_status(status: u16, status_text: &str, body: &str) -> Self {
        let (kind, message) = match status {
            400 => (ChatErrorKind::Validation, "请求参数错误，请检查模型ID和其他配置"),
            401 => (ChatErrorKind::Auth, "API密钥无效或已过期，请重新配置"),
            403 => (ChatErrorKind::Auth, "访问被拒绝，请检查API密钥权限"),
            404 => (ChatErrorKind::NotFound, "API端点不存在，请检查API地址配置"),
            429 => (ChatErrorKind::RateLimit, "请求过于频繁，请稍后重试"),
            500 => (ChatErrorKind::Server, "API服务异常，请稍后重试，服务器内部错误"),
            502 => (ChatErrorKind::Server, "网关错误，API服务可能暂时不可用"),
            503 => (ChatErrorKind::Server, "服务暂时不可用，请稍后重试"),
            405..=499 => (ChatErrorKind::Validation, "请求被拒绝，请检查请求参数"),
            _ => (ChatErrorKind::Server, "API服务异常，请稍后重试"),
        };
        Self::new(
            kind,
            message,
            ErrorCause::Status {
                status,
                status_text: status_text.to_string(),
                body: body.chars().take(500).collect(),
            },
        )
    }

    /// Only connect-level failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ChatErrorKind::Network | ChatErrorKind::Timeout)
            && !matches!(self.cause, ErrorCause::Transport(TransportFailure::Aborted))
    }

    pub fn status(&self) -> Option<u16> {
        match self.cause {
            ErrorCause::Status { status, .. } => Some(status),
            _ => None,
        }
    }
}

impl fmt::Display for ChatErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (400, ChatErrorKind::Validation),
            (401, ChatErrorKind::Auth),
            (403, ChatErrorKind::Auth),
            (404, ChatErrorKind::NotFound),
            (422, ChatErrorKind::Validation),
            (429, ChatErrorKind::RateLimit),
            (500, ChatErrorKind::Server),
            (504, ChatErrorKind::Server),
        ];
        for (status, kind) in cases {
            let err = ChatError::from_status(status, "", "");
            assert_eq!(err.kind, kind, "status {}", status);
            assert_eq!(err.status(), Some(status));
        }
    }

    #[test]
    fn test_source_chain_keeps_cause() {
        let err = ChatError::from_transport(TransportFailure::Network("dns".into()));
        assert_eq!(err.kind, ChatErrorKind::Network);
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("network error: dns"));
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ChatError::timeout(100).is_retryable());
        assert!(ChatError::from_transport(TransportFailure::Network("x".into())).is_retryable());
        assert!(!ChatError::from_transport(TransportFailure::Aborted).is_retryable());
        assert!(!ChatError::from_status(503, "", "").is_retryable());
        assert!(!ChatError::malformed("x").is_retryable());
    }
}
