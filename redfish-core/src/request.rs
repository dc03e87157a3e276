//! The read-only request view handlers and the query engine operate on.
//!
//! Grounded in `redfish-axum`'s `getter`/`poster`/`patcher` handlers
//! (`lib.rs`), which pull method, path, headers and body straight off axum
//! extractors; this module collects those into a single value so the
//! dispatcher can pass one `Request` down the pipeline instead of four
//! separate extractor arguments.

use std::net::IpAddr;

use bytes::Bytes;
use http::{HeaderMap, Method};

use crate::session::Session;

/// One decoded `key` or `key=value` query parameter, in request order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryParam {
    pub key: String,
    pub value: Option<String>,
}

/// A parsed, read-only view of an incoming HTTP request. Handlers and the
/// query engine borrow this; nothing downstream of dispatch mutates it.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    /// Decoded path, always starting with `/redfish`.
    pub path: String,
    pub query: Vec<QueryParam>,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub session: Option<Session>,
    pub client_ip: IpAddr,
    pub peer_cert_cn: Option<String>,
    pub is_secure: bool,
}

impl Request {
    pub fn query_value(&self, key: &str) -> Option<Option<&str>> {
        self.query
            .iter()
            .find(|param| param.key == key)
            .map(|param| param.value.as_deref())
    }

    pub fn has_query_key(&self, key: &str) -> bool {
        self.query.iter().any(|param| param.key == key)
    }

    /// A shallow copy of this request with the `If-Match` header removed,
    /// used to re-run a request after a synthetic conditional-GET check
    /// confirms the client's ETag is current.
    pub fn without_if_match(&self) -> Request {
        let mut headers = self.headers.clone();
        headers.remove(http::header::IF_MATCH);
        Request {
            headers,
            ..self.clone()
        }
    }

    /// A shallow copy of this request as a `GET`, `If-Match` removed and
    /// body cleared, for fetching a resource's current state to compute its
    /// ETag without re-running whatever side effect the real method has.
    /// Handlers that branch on `request.method` (`SessionMember`'s
    /// `DELETE`, for one) must see `GET` here, not the method that's about
    /// to be precondition-checked.
    pub fn as_etag_probe(&self) -> Request {
        let mut headers = self.headers.clone();
        headers.remove(http::header::IF_MATCH);
        Request {
            method: Method::GET,
            headers,
            body: Bytes::new(),
            ..self.clone()
        }
    }
}
