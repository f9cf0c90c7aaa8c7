use super::error::ChatError;
use super::extract::{first_content, BUFFERED_EXTRACTORS};
use super::http::{HttpBackend, HttpRequest, HttpResponse};
use super::stream::{StreamEvent, StreamParser};
use crate::shared::config_store::VerifiedEndpoint;
use crate::shared::event_bus::EventBus;
use contracts::domain::a002_ai_chat::aggregate::{
    ChatMessage, ChatRequest, ModelInfo, ModelValidation, RagFile, SamplingParams,
};
use contracts::shared::app_config::ChatConfig;
use futures::future::{self, Either};
use futures::StreamExt;
use serde_json::{json, Value};
use std::cell::Cell;
use std::future::Future;
use std::pin::pin;

/// First retry waits this long; every further retry doubles it.
pub const RETRY_BASE_MS: u32 = 1000;
pub const HEALTH_TIMEOUT_MS: u32 = 5000;
pub const MODELS_TIMEOUT_MS: u32 = 10_000;

pub type OnStream = Box<dyn FnMut(&str, &str)>;
pub type OnComplete = Box<dyn FnOnce(&str)>;
pub type OnError = Box<dyn FnOnce(&ChatError)>;

/// Per-call options of [`ChatTransport::send_message`].
#[derive(Default)]
pub struct SendOptions {
    pub context: Vec<ChatMessage>,
    /// Streams only when an `on_stream` callback is also present.
    pub stream: bool,
    /// `(fragment, accumulated)` for every received fragment.
    pub on_stream: Option<OnStream>,
    pub on_complete: Option<OnComplete>,
    pub on_error: Option<OnError>,
    pub sampling: SamplingParams,
    pub files: Vec<RagFile>,
}

impl SendOptions {
    pub fn buffered(context: Vec<ChatMessage>) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    pub fn streaming(context: Vec<ChatMessage>, on_stream: impl FnMut(&str, &str) + 'static) -> Self {
        Self {
            context,
            stream: true,
            on_stream: Some(Box::new(on_stream)),
            ..Self::default()
        }
    }

    pub fn on_complete(mut self, f: impl FnOnce(&str) + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&ChatError) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

/// Result of probing an endpoint for its model list.
#[derive(Debug, Clone)]
pub struct EndpointCheck {
    pub result: ModelValidation,
    /// Present only on success; required by `ConfigStore::commit_ai_endpoint`.
    pub verified: Option<VerifiedEndpoint>,
}

/// Client of an OpenAI-compatible chat-completion endpoint.
pub struct ChatTransport<B: HttpBackend> {
    backend: B,
    config: ChatConfig,
    bus: EventBus,
    connected: Cell<bool>,
    request_seq: Cell<u64>,
}

impl<B: HttpBackend> ChatTransport<B> {
    pub fn new(backend: B, config: ChatConfig, bus: EventBus) -> Self {
        Self {
            backend,
            config,
            bus,
            connected: Cell::new(false),
            request_seq: Cell::new(0),
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn update_config(&mut self, config: ChatConfig) {
        log::debug!("transport: config updated (model {})", config.model);
        self.config = config;
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    fn next_request_id(&self) -> u64 {
        let id = self.request_seq.get() + 1;
        self.request_seq.set(id);
        id
    }

    /// Races `fut` against the backend timer; `None` means the timer won.
    /// Dropping the losing request aborts it.
    async fn with_timeout<F: Future>(&self, ms: u32, fut: F) -> Option<F::Output> {
        let fut = pin!(fut);
        match future::select(fut, self.backend.sleep(ms)).await {
            Either::Left((output, _)) => Some(output),
            Either::Right(_) => None,
        }
    }

    pub fn build_request(
        &self,
        message: &str,
        context: &[ChatMessage],
        stream: bool,
        sampling: &SamplingParams,
        files: &[RagFile],
    ) -> ChatRequest {
        let mut messages = context.to_vec();
        messages.push(ChatMessage::user(message));

        let mut request = ChatRequest::new(self.config.model.clone(), messages, stream)
            .with_sampling(sampling);
        if self.config.max_tokens > 0 {
            request.max_tokens = Some(self.config.max_tokens);
        }
        request.temperature = Some(self.config.temperature);
        if !files.is_empty() {
            request.files = Some(files.to_vec());
        }
        request
    }

    /// Sends one user message. Streams when `options.stream` is set and an
    /// `on_stream` callback is given, otherwise waits for the whole reply.
    /// On failure `on_error` runs once and the classified error is returned.
    pub async fn send_message(&self, message: &str, options: SendOptions) -> Result<String, ChatError> {
        let SendOptions {
            context,
            stream,
            on_stream,
            on_complete,
            on_error,
            sampling,
            files,
        } = options;
        let request_id = self.next_request_id();

        let result = self
            .run_send(message, request_id, &context, stream, on_stream, &sampling, &files)
            .await;

        match result {
            Ok(text) => {
                if let Some(on_complete) = on_complete {
                    on_complete(&text);
                }
                self.bus.emit(
                    "ai:complete",
                    json!({"requestId": request_id, "content": text}),
                );
                Ok(text)
            }
            Err(err) => {
                log::error!("transport: request {} failed: {} ({})", request_id, err, err.cause);
                if let Some(on_error) = on_error {
                    on_error(&err);
                }
                self.bus.emit(
                    "ai:error",
                    json!({"requestId": request_id, "kind": err.kind.as_str(), "message": err.message}),
                );
                Err(err)
            }
        }
    }

    /// RAG variant: attaches files and/or collections to the request.
    pub async fn send_message_with_files(
        &self,
        message: &str,
        files: Vec<RagFile>,
        options: SendOptions,
    ) -> Result<String, ChatError> {
        self.send_message(message, SendOptions { files, ..options }).await
    }

    pub async fn send_message_with_collection(
        &self,
        message: &str,
        collection_id: &str,
        options: SendOptions,
    ) -> Result<String, ChatError> {
        self.send_message_with_files(message, vec![RagFile::collection(collection_id)], options)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_send(
        &self,
        message: &str,
        request_id: u64,
        context: &[ChatMessage],
        stream: bool,
        on_stream: Option<OnStream>,
        sampling: &SamplingParams,
        files: &[RagFile],
    ) -> Result<String, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::validation("消息内容不能为空"));
        }

        match on_stream {
            Some(on_stream) if stream => {
                let request = self.build_request(message, context, true, sampling, files);
                let response = self.open(&request).await?;
                self.read_stream(response, request_id, on_stream).await
            }
            _ => {
                let request = self.build_request(message, context, false, sampling, files);
                let response = self.open(&request).await?;
                self.read_buffered(response).await
            }
        }
    }

    fn completions_request(&self, request: &ChatRequest) -> Result<HttpRequest, ChatError> {
        let body = serde_json::to_string(request).map_err(|e| ChatError::validation(e.to_string()))?;
        let url = format!("{}/chat/completions", self.config.endpoint_base());
        Ok(HttpRequest::post_json(url, body).bearer(&self.config.api_key))
    }

    async fn open(&self, request: &ChatRequest) -> Result<HttpResponse, ChatError> {
        let http = self.completions_request(request)?;
        let response = self.connect(&http).await?;
        self.ensure_success(response, self.config.timeout).await
    }

    /// Connect step with retry of network failures and timeouts.
    async fn connect(&self, request: &HttpRequest) -> Result<HttpResponse, ChatError> {
        let mut attempt: u32 = 0;
        loop {
            let err = match self
                .with_timeout(self.config.timeout, self.backend.execute(request.clone()))
                .await
            {
                Some(Ok(response)) => return Ok(response),
                Some(Err(failure)) => ChatError::from_transport(failure),
                None => ChatError::timeout(self.config.timeout),
            };

            if !err.is_retryable() || attempt >= self.config.max_retries {
                return Err(err);
            }
            let delay = RETRY_BASE_MS.saturating_mul(2u32.saturating_pow(attempt));
            log::warn!(
                "transport: attempt {} failed ({}), retrying in {} ms",
                attempt + 1,
                err.kind,
                delay
            );
            self.backend.sleep(delay).await;
            attempt += 1;
        }
    }

    async fn ensure_success(&self, response: HttpResponse, timeout_ms: u32) -> Result<HttpResponse, ChatError> {
        if response.is_success() {
            return Ok(response);
        }
        let status = response.status;
        let status_text = response.status_text.clone();
        let body = match self.with_timeout(timeout_ms, response.text()).await {
            Some(Ok(body)) => body,
            _ => String::new(),
        };
        log::warn!("transport: HTTP {} {}: {}", status, status_text, body);
        Err(ChatError::from_status(status, &status_text, &body))
    }

    async fn read_buffered(&self, response: HttpResponse) -> Result<String, ChatError> {
        let text = match self.with_timeout(self.config.timeout, response.text()).await {
            None => return Err(ChatError::timeout(self.config.timeout)),
            Some(Err(failure)) => return Err(ChatError::from_transport(failure)),
            Some(Ok(text)) => text,
        };
        let value: Value = serde_json::from_str(&text).map_err(|e| ChatError::malformed(e.to_string()))?;
        first_content(&value, BUFFERED_EXTRACTORS)
            .map(str::to_string)
            .ok_or_else(|| ChatError::malformed(format!("no content in {}", text)))
    }

    /// Reads the body chunk by chunk; each wait is bound to the request timeout.
    /// Never retried once started.
    async fn read_stream(
        &self,
        response: HttpResponse,
        request_id: u64,
        mut on_stream: OnStream,
    ) -> Result<String, ChatError> {
        let mut body = response.body;
        let mut parser = StreamParser::new();

        let mut deliver = |events: Vec<StreamEvent>| {
            for event in events {
                if let StreamEvent::Fragment { delta, accumulated } = event {
                    on_stream(&delta, &accumulated);
                    self.bus.emit(
                        "ai:stream",
                        json!({"requestId": request_id, "chunk": delta, "fullContent": accumulated}),
                    );
                }
            }
        };

        while !parser.is_finished() {
            match self.with_timeout(self.config.timeout, body.next()).await {
                None => return Err(ChatError::timeout(self.config.timeout)),
                Some(None) => {
                    deliver(parser.finish());
                    break;
                }
                Some(Some(Err(failure))) => return Err(ChatError::from_transport(failure)),
                Some(Some(Ok(bytes))) => deliver(parser.push(&bytes)),
            }
        }
        log::debug!(
            "transport: stream {} finished, {} chars",
            request_id,
            parser.accumulated().chars().count()
        );
        Ok(parser.accumulated().to_string())
    }

    /// Single GET returning parsed JSON, bounded by `timeout_ms`. Not retried.
    async fn fetch_json(&self, request: HttpRequest, timeout_ms: u32) -> Result<Value, ChatError> {
        let response = match self.with_timeout(timeout_ms, self.backend.execute(request)).await {
            None => return Err(ChatError::timeout(timeout_ms)),
            Some(Err(failure)) => return Err(ChatError::from_transport(failure)),
            Some(Ok(response)) => response,
        };
        let response = self.ensure_success(response, timeout_ms).await?;
        let text = match self.with_timeout(timeout_ms, response.text()).await {
            None => return Err(ChatError::timeout(timeout_ms)),
            Some(Err(failure)) => return Err(ChatError::from_transport(failure)),
            Some(Ok(text)) => text,
        };
        serde_json::from_str(&text).map_err(|e| ChatError::malformed(e.to_string()))
    }

    /// `GET {baseUrl}/health`; records and returns the connected flag.
    pub async fn check_connection(&self) -> bool {
        let url = format!("{}/health", self.config.endpoint_base());
        let connected = match self
            .with_timeout(HEALTH_TIMEOUT_MS, self.backend.execute(HttpRequest::get(url)))
            .await
        {
            Some(Ok(response)) => response.is_success(),
            Some(Err(failure)) => {
                log::warn!("transport: health check failed: {}", failure);
                false
            }
            None => {
                log::warn!("transport: health check timed out");
                false
            }
        };
        self.connected.set(connected);
        connected
    }

    /// Lists models of a candidate endpoint. Never fails; an empty list counts
    /// as failure. Success yields the token needed to commit the endpoint.
    pub async fn validate_and_get_models(&self, base_url: &str, api_key: &str) -> EndpointCheck {
        let base = base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return EndpointCheck {
                result: ModelValidation::failed("API地址不能为空"),
                verified: None,
            };
        }

        let request = HttpRequest::get(format!("{}/models", base)).bearer(api_key);
        match self.fetch_json(request, MODELS_TIMEOUT_MS).await {
            Ok(body) => {
                let models = ModelInfo::list_from_json(&body);
                if models.is_empty() {
                    return EndpointCheck {
                        result: ModelValidation::failed("API返回的模型列表为空"),
                        verified: None,
                    };
                }
                log::info!("transport: {} lists {} models", base, models.len());
                let ids = models.iter().map(|m| m.id.clone()).collect();
                EndpointCheck {
                    verified: Some(VerifiedEndpoint::new(base, api_key.trim(), ids)),
                    result: ModelValidation::ok(models),
                }
            }
            Err(err) => {
                log::warn!("transport: validating {} failed: {}", base, err);
                EndpointCheck {
                    result: ModelValidation::failed(err.message),
                    verified: None,
                }
            }
        }
    }

    /// Model list of the configured endpoint; empty on any failure.
    pub async fn get_models(&self) -> Vec<ModelInfo> {
        let request = HttpRequest::get(format!("{}/models", self.config.endpoint_base()))
            .bearer(&self.config.api_key);
        match self.fetch_json(request, self.config.timeout).await {
            Ok(body) => ModelInfo::list_from_json(&body),
            Err(err) => {
                log::warn!("transport: model listing failed: {}", err);
                Vec::new()
            }
        }
    }

    /// Health check followed by a short buffered test message.
    pub async fn validate_config(&self) -> bool {
        if !self.check_connection().await {
            return false;
        }
        self.send_message("你好", SendOptions::default()).await.is_ok()
    }
}
