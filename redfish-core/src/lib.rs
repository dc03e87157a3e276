//! Request/response pipeline, bus facade, query engine, and handler
//! dispatcher: the parts of a Redfish management server that sit behind
//! `redfish-router`'s route table and in front of whatever the binary crate
//! wires up as `Bus` and as the set of registered [`dispatch::Handler`]s.
//!
//! Grounded in `redfish-axum` (`lib.rs`/`json.rs`),
//! whose `Tree`/`Node`/`app()` trio this crate replaces with a router-driven
//! dispatcher generalized far past a single in-memory document tree.

pub mod async_resp;
pub mod auth;
pub mod bus;
pub mod dispatch;
pub mod error;
pub mod etag;
pub mod query;
pub mod request;
pub mod response;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::response::{IntoResponse, Json, Response};
use axum::Router as AxumRouter;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use serde_json::Value;

use dispatch::Dispatcher;
use request::{QueryParam, Request};
use response::Body;
use session::Session;

/// A JSON document paired with the status/headers the pipeline computed for
/// it, since `axum::Json` alone only ever serves `200 OK` with no extra
/// headers. Used for both a handler's normal JSON body and an `Error`'s
/// JSON error body.
pub struct JsonResponse {
    status: StatusCode,
    headers: HeaderMap,
    data: Value,
}

impl JsonResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, data: Value) -> Self {
        Self { status, headers, data }
    }
}

impl IntoResponse for JsonResponse {
    fn into_response(self) -> Response {
        let mut response = Json(self.data).into_response();
        *response.status_mut() = self.status;
        response.headers_mut().extend(self.headers);
        response
    }
}

/// Turn a finished [`Body`] into the axum [`Response`] it's served as.
/// `Raw` bodies (the `$metadata` XML document) bypass [`JsonResponse`]
/// entirely so they keep their own content type instead of being wrapped
/// in a JSON string; `Stream` bodies are read in full rather than
/// chunked — the files this server streams (firmware images, crashdumps)
/// are bounded by the same storage quota the bus enforces on them.
async fn body_into_response(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    match body {
        Body::Json(value) => JsonResponse::new(status, headers, value).into_response(),
        Body::Raw { content_type, bytes } => {
            let mut response = (status, headers, bytes).into_response();
            if let Ok(value) = HeaderValue::from_str(&content_type) {
                response.headers_mut().insert(http::header::CONTENT_TYPE, value);
            }
            response
        }
        Body::Stream { path, mime, .. } => match tokio::fs::read(&path).await {
            Ok(contents) => {
                let mut response = (status, headers, contents).into_response();
                if let Ok(value) = HeaderValue::from_str(&mime) {
                    response.headers_mut().insert(http::header::CONTENT_TYPE, value);
                }
                response
            }
            Err(error) => {
                tracing::error!(path = %path.display(), %error, "failed to read streamed response body");
                error::Error::Internal.into_response()
            }
        },
    }
}

/// Split a raw query string into ordered `(key, value)` pairs. A bare key
/// with no `=` (`only`) or an `=` followed by nothing (`only=`) both decode
/// to a `None` value; Redfish's `only` is the sole parameter that cares
/// about this distinction, and it rejects any value regardless.
fn parse_query(raw: Option<&str>) -> Vec<QueryParam> {
    let Some(raw) = raw else { return Vec::new() };
    form_urlencoded::parse(raw.as_bytes())
        .map(|(key, value)| QueryParam {
            key: key.into_owned(),
            value: if value.is_empty() { None } else { Some(value.into_owned()) },
        })
        .collect()
}

fn peer_cert_cn(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-client-cert-cn")
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_string())
}

async fn catch_all(
    State(dispatcher): State<Arc<Dispatcher>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> impl IntoResponse {
    let request = Request {
        method,
        path: uri.path().to_string(),
        query: parse_query(uri.query()),
        is_secure: headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "https")
            .unwrap_or(false),
        peer_cert_cn: peer_cert_cn(&headers),
        headers,
        body,
        session: Option::<Session>::None,
        client_ip: addr.ip(),
    };
    let (status, headers, body) = dispatcher.dispatch(request).await;
    body_into_response(status, headers, body).await
}

/// Mount `dispatcher` as the sole handler for every path under `/redfish`.
/// Unlike `redfish-axum`'s `app()`, this does not run a `tower-http`
/// trailing-slash normalizer in front of the route: `redfish-router`
/// already implements the slash-redirect semantics a normalizer would
/// short-circuit, so the raw path has to reach [`dispatch::Dispatcher`]
/// unmodified.
pub fn app(dispatcher: Arc<Dispatcher>) -> AxumRouter {
    AxumRouter::new().fallback(catch_all).with_state(dispatcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_splits_key_value_pairs() {
        let params = parse_query(Some("$top=5&only"));
        assert_eq!(params[0].key, "$top");
        assert_eq!(params[0].value.as_deref(), Some("5"));
        assert_eq!(params[1].key, "only");
    }

    #[test]
    fn parse_query_handles_missing_query_string() {
        assert!(parse_query(None).is_empty());
    }
}
