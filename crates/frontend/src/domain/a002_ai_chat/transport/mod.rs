//! Chat-completion transport.
//!
//! - http.rs: request/response types and the `HttpBackend` seam
//! - fetch.rs: browser backend (gloo-net + ReadableStream)
//! - stream.rs: incremental line parser for streamed replies
//! - extract.rs: ordered response-shape extractors
//! - error.rs: error taxonomy
//! - client.rs: `ChatTransport` (send, retry, timeouts, model listing)

pub mod client;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod http;
pub mod stream;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{ChatTransport, EndpointCheck, SendOptions};
pub use error::{ChatError, ChatErrorKind, TransportFailure};
pub use fetch::FetchBackend;
pub use stream::{StreamEvent, StreamParser};

/// Transport used by the running application.
pub type BrowserTransport = ChatTransport<FetchBackend>;
