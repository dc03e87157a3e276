//! The mutable output document a request builds up, plus the completion
//! handler stack that runs once it is finished.
//!
//! Grounded in `redfish-axum`'s `JsonResponse` (`json.rs`) for the final
//! wire-format conversion, and in `async_resp.hpp` (`using AsyncResp =
//! crow::Response`) for the idea that the response IS the thing handlers
//! mutate directly rather than building through a separate builder type.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::request::Request;

/// The response carries a JSON document, a raw byte payload with its own
/// content type (the `$metadata` XML document, mainly), or streams a file.
/// Exactly one at a time — `set_json`/`set_raw`/`set_stream` each clear the
/// others.
#[derive(Debug, Clone)]
pub enum Body {
    Json(Value),
    Raw {
        content_type: String,
        bytes: Bytes,
    },
    Stream {
        path: PathBuf,
        content_length: u64,
        mime: String,
    },
}

/// The mutable part of a [`crate::async_resp::AsyncResp`]: status, headers,
/// and body. Handlers reach this through `AsyncResp::state`/`state_mut`.
#[derive(Debug, Clone)]
pub struct ResponseState {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
    /// Overrides the hash-derived ETag the pipeline would otherwise
    /// compute, e.g. for resources with a stable hardware-backed version.
    pub etag_override: Option<String>,
}

impl ResponseState {
    pub fn new() -> Self {
        ResponseState {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::Json(Value::Object(Default::default())),
            etag_override: None,
        }
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            Body::Json(value) => Some(value),
            Body::Raw { .. } | Body::Stream { .. } => None,
        }
    }

    pub fn json_mut(&mut self) -> Option<&mut Value> {
        match &mut self.body {
            Body::Json(value) => Some(value),
            Body::Raw { .. } | Body::Stream { .. } => None,
        }
    }

    pub fn set_json(&mut self, value: Value) {
        self.body = Body::Json(value);
    }

    pub fn set_raw(&mut self, content_type: impl Into<String>, bytes: Bytes) {
        self.body = Body::Raw {
            content_type: content_type.into(),
            bytes,
        };
    }

    pub fn set_stream(&mut self, path: PathBuf, content_length: u64, mime: String) {
        self.body = Body::Stream {
            path,
            content_length,
            mime,
        };
    }
}

impl Default for ResponseState {
    fn default() -> Self {
        Self::new()
    }
}

/// One link in the completion handler stack. Each layer receives the
/// previous handler boxed inside it at install time (`Response::push_completion`)
/// and is responsible for invoking it, so `run` bodies read as "do my work,
/// then/before delegate to what was already installed" exactly like the
/// source's `setCompleteRequestHandler(new)` returning the old handler for
/// `new` to call.
#[async_trait]
pub trait CompletionLayer: Send {
    async fn run(self: Box<Self>, state: &mut ResponseState, request: &Request);
}

/// The terminal layer: does nothing. Every request starts with this
/// installed; handlers and the dispatcher push layers on top of it.
pub struct NoopCompletion;

#[async_trait]
impl CompletionLayer for NoopCompletion {
    async fn run(self: Box<Self>, _state: &mut ResponseState, _request: &Request) {}
}

/// Wraps a layer that must run *before* delegating to whatever was already
/// installed, mirroring `afterIfMatchRequest`/query-post-processing being
/// installed "on top of" the rest of the stack and unwinding LIFO.
pub struct Layered<F> {
    pub next: Box<dyn CompletionLayer>,
    pub run_first: F,
}

#[async_trait]
impl<F> CompletionLayer for Layered<F>
where
    F: for<'a> FnOnce(
            &'a mut ResponseState,
            &'a Request,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>>
        + Send,
{
    async fn run(self: Box<Self>, state: &mut ResponseState, request: &Request) {
        (self.run_first)(state, request).await;
        self.next.run(state, request).await;
    }
}
