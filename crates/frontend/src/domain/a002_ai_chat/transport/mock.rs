//! Scripted in-memory backend for transport tests.

use super::error::TransportFailure;
use super::http::{HttpBackend, HttpRequest, HttpResponse};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub(crate) enum Reply {
    Fail(TransportFailure),
    Respond { status: u16, chunks: Vec<Vec<u8>> },
    /// Sends the chunks, then the body never ends.
    Stall { status: u16, chunks: Vec<Vec<u8>> },
    /// Sends the chunks, then the body read fails.
    Broken { chunks: Vec<Vec<u8>>, failure: TransportFailure },
    /// The request never completes.
    Hang,
}

impl Reply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Reply::Respond {
            status,
            chunks: vec![body.to_string().into_bytes()],
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Reply::Respond {
            status,
            chunks: vec![body.as_bytes().to_vec()],
        }
    }

    /// One network chunk per entry.
    pub fn chunks(parts: &[&str]) -> Self {
        Reply::Respond {
            status: 200,
            chunks: parts.iter().map(|p| p.as_bytes().to_vec()).collect(),
        }
    }

    pub fn network() -> Self {
        Reply::Fail(TransportFailure::Network("Failed to fetch".to_string()))
    }
}

#[derive(Default)]
pub(crate) struct MockBackend {
    replies: RefCell<VecDeque<Reply>>,
    pub requests: RefCell<Vec<HttpRequest>>,
    /// Only timers that actually elapsed are recorded.
    pub sleeps: RefCell<Vec<u32>>,
}

impl MockBackend {
    pub fn new(replies: Vec<Reply>) -> Rc<Self> {
        Rc::new(Self {
            replies: RefCell::new(replies.into()),
            ..Self::default()
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn body(&self, index: usize) -> serde_json::Value {
        let requests = self.requests.borrow();
        let body = requests[index].body.as_deref().unwrap_or("null");
        serde_json::from_str(body).unwrap()
    }
}

enum Tail {
    End,
    Pending,
    Fail(TransportFailure),
}

fn response(status: u16, chunks: Vec<Vec<u8>>, tail: Tail) -> HttpResponse {
    let body = stream::iter(chunks.into_iter().map(Ok));
    HttpResponse {
        status,
        status_text: String::new(),
        body: match tail {
            Tail::End => body.boxed_local(),
            Tail::Pending => body.chain(stream::pending()).boxed_local(),
            Tail::Fail(failure) => body.chain(stream::once(async move { Err(failure) })).boxed_local(),
        },
    }
}

#[async_trait(?Send)]
impl HttpBackend for Rc<MockBackend> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        self.requests.borrow_mut().push(request);
        let reply = self.replies.borrow_mut().pop_front();
        match reply {
            None => Err(TransportFailure::Network("no scripted reply".to_string())),
            Some(Reply::Fail(failure)) => Err(failure),
            Some(Reply::Respond { status, chunks }) => Ok(response(status, chunks, Tail::End)),
            Some(Reply::Stall { status, chunks }) => Ok(response(status, chunks, Tail::Pending)),
            Some(Reply::Broken { chunks, failure }) => Ok(response(200, chunks, Tail::Fail(failure))),
            Some(Reply::Hang) => futures::future::pending().await,
        }
    }

    async fn sleep(&self, ms: u32) {
        self.sleeps.borrow_mut().push(ms);
    }
}
