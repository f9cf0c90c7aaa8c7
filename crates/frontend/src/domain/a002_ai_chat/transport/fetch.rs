//! Browser implementation of [`HttpBackend`] on top of `fetch`.

use super::error::TransportFailure;
use super::http::{ByteStream, HttpBackend, HttpRequest, HttpResponse, Method};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, ReadableStream, ReadableStreamDefaultReader};

/// Aborts the underlying fetch when dropped, unless the body was read to the end.
struct AbortOnDrop {
    controller: AbortController,
    armed: bool,
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.controller.abort();
        }
    }
}

fn js_message(value: &JsValue) -> String {
    Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}

#[derive(Clone, Copy, Default)]
pub struct FetchBackend;

impl FetchBackend {
    fn body_stream(body: Option<ReadableStream>, guard: AbortOnDrop) -> ByteStream {
        let Some(body) = body else {
            return stream::empty().boxed_local();
        };
        let reader: ReadableStreamDefaultReader = body.get_reader().unchecked_into();

        stream::unfold(Some((reader, guard)), |state| async move {
            let (reader, mut guard) = state?;
            let chunk = match JsFuture::from(reader.read()).await {
                Ok(chunk) => chunk,
                Err(e) => return Some((Err(TransportFailure::Body(js_message(&e))), None)),
            };
            let done = Reflect::get(&chunk, &JsValue::from_str("done"))
                .ok()
                .and_then(|d| d.as_bool())
                .unwrap_or(true);
            if done {
                guard.armed = false;
                return None;
            }
            let bytes = Reflect::get(&chunk, &JsValue::from_str("value"))
                .map(|v| Uint8Array::new(&v).to_vec())
                .map_err(|e| TransportFailure::Body(js_message(&e)));
            Some((bytes, Some((reader, guard))))
        })
        .boxed_local()
    }
}

#[async_trait(?Send)]
impl HttpBackend for FetchBackend {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let controller = AbortController::new().map_err(|e| TransportFailure::Network(js_message(&e)))?;
        let signal = controller.signal();
        let guard = AbortOnDrop {
            controller,
            armed: true,
        };

        let mut builder = match request.method {
            Method::Get => Request::get(&request.url),
            Method::Post => Request::post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        builder = builder.abort_signal(Some(&signal));

        let prepared = match request.body {
            Some(body) => builder.body(body),
            None => builder.build(),
        }
        .map_err(|e| TransportFailure::Network(e.to_string()))?;

        let response = prepared.send().await.map_err(|e| {
            let text = e.to_string();
            if text.contains("AbortError") {
                TransportFailure::Aborted
            } else {
                TransportFailure::Network(text)
            }
        })?;

        log::debug!("fetch {} -> {}", request.url, response.status());
        Ok(HttpResponse {
            status: response.status(),
            status_text: response.status_text(),
            body: Self::body_stream(response.body(), guard),
        })
    }

    async fn sleep(&self, ms: u32) {
        TimeoutFuture::new(ms).await;
    }
}
