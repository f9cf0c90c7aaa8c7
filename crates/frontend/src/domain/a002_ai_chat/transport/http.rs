//! Seam between the chat transport and the network.

use super::error::TransportFailure;
use async_trait::async_trait;
use futures::stream::{LocalBoxStream, StreamExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: String) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body),
        }
    }

    /// Adds `Authorization: Bearer` when a key is configured.
    pub fn bearer(mut self, api_key: &str) -> Self {
        let key = api_key.trim();
        if !key.is_empty() {
            self.headers
                .push(("Authorization".to_string(), format!("Bearer {}", key)));
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub type ByteStream = LocalBoxStream<'static, Result<Vec<u8>, TransportFailure>>;

/// Response whose body is read incrementally. Dropping it cancels the request.
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: ByteStream,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drains the body. Use only where the caller already bounds the wait.
    pub async fn text(mut self) -> Result<String, TransportFailure> {
        let mut bytes = Vec::new();
        while let Some(chunk) = self.body.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .finish_non_exhaustive()
    }
}

/// Executes requests and provides timers. Implemented by the browser fetch
/// backend and by scripted backends in tests.
#[async_trait(?Send)]
pub trait HttpBackend {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure>;

    async fn sleep(&self, ms: u32);
}
