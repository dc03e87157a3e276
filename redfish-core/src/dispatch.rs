//! The per-request handler dispatcher (C8): authenticate, route, check
//! privileges, handle `If-Match`, install the query/etag completion layers,
//! invoke the handler, and wait for its [`AsyncResp`] to finish.
//!
//! Grounded in `redfish-axum`'s `getter`/`poster`/`patcher`/`deleter`
//! (`lib.rs`), generalized from axum's own `Router`/`Path` extractor to
//! resolve through [`redfish_router::Router`] instead, and extended with
//! privilege checks, conditional requests, and query post-processing that
//! `redfish-axum`'s dispatch never had to do because `Tree::get` returned a
//! whole resource with no query language in front of it.

use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use redfish_data::{AllowedMethods, PrivilegeSet};
use redfish_router::{MatchOutcome, ParamType, RouteParams, Router};
use serde_json::Value;

use crate::async_resp::AsyncResp;
use crate::auth::CredentialStore;
use crate::bus::Bus;
use crate::error::Error;
use crate::etag;
use crate::query::{self, executor::InternalFetch, QueryCapabilities};
use crate::request::{QueryParam, Request};
use crate::response::{Body, Layered, ResponseState};
use crate::session::{Session, SessionStore};

/// A registered endpoint. `params` are the typed values the router captured
/// from the URL; handlers read the body/headers/session off
/// `async_resp.request()` and mutate the response through `async_resp`'s
/// state, exactly as the source's handler lambdas mutate the
/// `crow::Response` they're handed.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, async_resp: AsyncResp, params: RouteParams, bus: Arc<dyn Bus>);

    /// Whether this handler pages `Members` itself, so the executor should
    /// not re-apply `$top`/`$skip` on top of an already-paged collection.
    fn query_capabilities(&self) -> QueryCapabilities {
        QueryCapabilities::default()
    }

    /// The parameter types this handler expects `params` to carry, in
    /// order. Checked against the route's pattern at `Router::validate()`
    /// time (via [`redfish_router::Router::add_with_params`]) so a handler
    /// wired to the wrong pattern is caught at startup instead of panicking
    /// the first time `params.get(n)` is called against an empty bundle.
    /// The default of no declared parameters fits every collection/root
    /// handler, which ignores `params` entirely.
    fn expected_params(&self) -> &'static [ParamType] {
        &[]
    }
}

/// Computes and sets the `ETag` header from the finished JSON body, unless
/// a handler already supplied an override. Installed as the innermost
/// completion layer on every request, so it runs after any query
/// post-processing layer that was pushed on top of it.
fn etag_layer<'a>(
    state: &'a mut ResponseState,
    _request: &'a Request,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
    let computed = match &state.etag_override {
        Some(etag) => Some(etag.clone()),
        None => state.json().map(etag::compute),
    };
    Box::pin(async move {
        if let Some(etag) = computed {
            if let Ok(value) = http::HeaderValue::from_str(&etag) {
                state.headers.insert(http::header::ETAG, value);
            }
        }
    })
}

fn method_to_allowed(method: &Method) -> AllowedMethods {
    match *method {
        Method::GET => AllowedMethods::GET,
        Method::HEAD => AllowedMethods::HEAD,
        Method::POST => AllowedMethods::POST,
        Method::PUT => AllowedMethods::PUT,
        Method::PATCH => AllowedMethods::PATCH,
        Method::DELETE => AllowedMethods::DELETE,
        _ => AllowedMethods::empty(),
    }
}

/// Owns the route table, the bus handle, and the session store; the single
/// entry point axum's fallback route calls into.
///
/// `sessions` is an `Arc` rather than a plain field so the binary crate can
/// hand the same table to its `SessionService` login handler — the
/// dispatcher authenticates incoming requests against it, but only a
/// handler can create a session in the first place.
pub struct Dispatcher {
    router: Router<Arc<dyn Handler>>,
    bus: Arc<dyn Bus>,
    sessions: Arc<tokio::sync::RwLock<SessionStore>>,
    expand_enabled: bool,
    credentials: Option<Arc<dyn CredentialStore>>,
}

impl Dispatcher {
    pub fn new(router: Router<Arc<dyn Handler>>, bus: Arc<dyn Bus>, sessions: SessionStore) -> Self {
        Self::with_shared_sessions(router, bus, Arc::new(tokio::sync::RwLock::new(sessions)))
    }

    pub fn with_shared_sessions(
        router: Router<Arc<dyn Handler>>,
        bus: Arc<dyn Bus>,
        sessions: Arc<tokio::sync::RwLock<SessionStore>>,
    ) -> Self {
        Dispatcher {
            router,
            bus,
            sessions,
            expand_enabled: cfg!(feature = "expand"),
            credentials: None,
        }
    }

    /// Override whether `$expand` is accepted, on top of the `expand`
    /// cargo feature's compile-time default — lets an operator disable it
    /// at runtime without a separate build.
    pub fn with_expand_enabled(mut self, enabled: bool) -> Self {
        self.expand_enabled = enabled;
        self
    }

    /// Back `Authorization: Basic` requests with `store`. Without one,
    /// `session_for` rejects Basic auth outright instead of pretending to
    /// check it.
    pub fn with_credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    pub fn bus(&self) -> &Arc<dyn Bus> {
        &self.bus
    }

    pub async fn sessions(&self) -> tokio::sync::RwLockWriteGuard<'_, SessionStore> {
        self.sessions.write().await
    }

    async fn session_for(&self, headers: &HeaderMap) -> Result<Option<Session>, Error> {
        if let Some(token) = headers.get("x-auth-token") {
            let token = token.to_str().map_err(|_| Error::Unauthorized)?;
            let sessions = self.sessions.read().await;
            return sessions.get(token).cloned().map(Some).ok_or(Error::Unauthorized);
        }
        if let Some(header_val) = headers.get(http::header::AUTHORIZATION) {
            let raw = header_val.to_str().map_err(|_| Error::Unauthorized)?;
            let credentials = http_auth_basic::Credentials::from_header(raw.to_string())
                .map_err(|_| Error::Unauthorized)?;
            let store = self.credentials.as_deref().ok_or(Error::Unauthorized)?;
            let privileges = store
                .verify(&credentials.user_id, &credentials.password)
                .ok_or(Error::Unauthorized)?;
            // Basic auth is stateless: no entry goes into `sessions`, so
            // there's no token to hand back and no session URI to delete.
            return Ok(Some(Session {
                token: String::new(),
                username: credentials.user_id,
                privileges: privileges.into(),
                uri: String::new(),
                client_ip: String::new(),
            }));
        }
        Ok(None)
    }

    fn check_privileges(&self, session: Option<&Session>, required: PrivilegeSet) -> Result<(), Error> {
        if required.is_empty() {
            return Ok(());
        }
        match session {
            None => Err(Error::Unauthorized),
            Some(session) => {
                let granted: PrivilegeSet = session.privileges.into();
                if granted.contains(required) {
                    Ok(())
                } else {
                    Err(Error::Forbidden)
                }
            }
        }
    }

    /// Resolve one request end-to-end and produce the final
    /// status/headers/body. This is the shape axum's fallback handler and
    /// `$expand`/`only`'s internal sub-fetches both call into.
    pub async fn dispatch(&self, request: Request) -> (StatusCode, HeaderMap, Body) {
        match self.dispatch_inner(request).await {
            Ok(result) => result,
            Err(error) => {
                let (status, headers, body) = error.into_parts();
                (status, headers, Body::Json(body))
            }
        }
    }

    async fn dispatch_inner(&self, mut request: Request) -> Result<(StatusCode, HeaderMap, Body), Error> {
        if request.session.is_none() {
            request.session = self.session_for(&request.headers).await?;
        }

        let allowed_method = method_to_allowed(&request.method);
        let outcome = self
            .router
            .find(&request.path, allowed_method)
            .map_err(|_| Error::Internal)?;

        let (rule_id, params) = match outcome {
            MatchOutcome::NotFound => return Err(Error::NotFound),
            MatchOutcome::RedirectSlash => return Err(Error::RedirectSlash(format!("{}/", request.path))),
            MatchOutcome::MethodNotAllowed(_, allowed) => return Err(Error::MethodNotAllowed(allowed)),
            MatchOutcome::Matched(id, params) => (id, params),
        };
        let rule = self.router.rule(rule_id);
        self.check_privileges(request.session.as_ref(), rule.privileges)?;

        let query = if request.query.is_empty() {
            query::Query::default()
        } else {
            query::parser::parse(&request.query, self.expand_enabled)?
        };

        let checks_if_match = matches!(request.method, Method::PATCH | Method::POST | Method::DELETE);
        let if_match_header = checks_if_match
            .then(|| request.headers.get(http::header::IF_MATCH).cloned())
            .flatten();
        if let Some(if_match) = if_match_header {
            let if_match = if_match.to_str().map_err(|_| Error::Internal)?.to_string();
            if if_match != "*" {
                let current = self
                    .invoke(rule.handler.clone(), request.as_etag_probe(), params.clone())
                    .await;
                let current_json = match &current.2 {
                    Body::Json(value) => value.clone(),
                    Body::Raw { .. } | Body::Stream { .. } => Value::Null,
                };
                let computed = current_json
                    .get("@odata.etag")
                    .and_then(Value::as_str)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| etag::compute(&current_json));
                if !etag::matches(&if_match, &computed) {
                    return Err(Error::PreconditionFailed(computed));
                }
            }
            request = request.without_if_match();
        }

        let handler = rule.handler.clone();
        let capabilities = handler.query_capabilities();
        let (status, mut headers, body) = self.invoke(handler, request.clone(), params).await;

        if !query.is_empty() {
            if let Body::Json(mut json_body) = body {
                let mut status = status;
                query::executor::run(
                    &query,
                    &mut status,
                    &mut json_body,
                    self,
                    request.session.as_ref(),
                    capabilities.top_skip_delegated,
                )
                .await;
                headers.insert(
                    http::header::CACHE_CONTROL,
                    http::HeaderValue::from_static("no-cache"),
                );
                return Ok((status, headers, Body::Json(json_body)));
            }
            return Err(Error::QueryNotSupported("$query on a non-JSON resource".to_string()));
        }

        Ok((status, headers, body))
    }

    async fn invoke(&self, handler: Arc<dyn Handler>, request: Request, params: RouteParams) -> (StatusCode, HeaderMap, Body) {
        let (async_resp, receiver) = AsyncResp::new(request);

        async_resp.push_completion(|next| {
            Box::new(Layered {
                next,
                run_first: etag_layer,
            })
        });

        handler.handle(async_resp.clone(), params, Arc::clone(&self.bus)).await;
        drop(async_resp);

        let final_state = receiver.await.unwrap_or_else(|_| ResponseState::new());
        (final_state.status, final_state.headers, final_state.body)
    }
}

#[async_trait]
impl InternalFetch for Dispatcher {
    async fn fetch(&self, url: &str, session: Option<&Session>) -> (StatusCode, Value) {
        let request = Request {
            method: Method::GET,
            path: url.to_string(),
            query: Vec::<QueryParam>::new(),
            headers: HeaderMap::new(),
            body: bytes::Bytes::new(),
            session: session.cloned(),
            client_ip: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            peer_cert_cn: None,
            is_secure: false,
        };
        let (status, _headers, body) = self.dispatch(request).await;
        let json = match body {
            Body::Json(value) => value,
            Body::Raw { .. } | Body::Stream { .. } => Value::Null,
        };
        (status, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MockBus;
    use serde_json::json;
    use std::net::{IpAddr, Ipv4Addr};

    struct StaticHandler(Value);

    #[async_trait]
    impl Handler for StaticHandler {
        async fn handle(&self, async_resp: AsyncResp, _params: RouteParams, _bus: Arc<dyn Bus>) {
            async_resp.with_state(|state| state.set_json(self.0.clone())).await;
        }
    }

    fn test_request(path: &str) -> Request {
        Request {
            method: Method::GET,
            path: path.to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: bytes::Bytes::new(),
            session: None,
            client_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            peer_cert_cn: None,
            is_secure: false,
        }
    }

    fn dispatcher_with(path: &str, body: Value) -> Dispatcher {
        let mut router: Router<Arc<dyn Handler>> = Router::new();
        router
            .add(path, AllowedMethods::GET, PrivilegeSet::empty(), Arc::new(StaticHandler(body)))
            .unwrap();
        router.validate().unwrap();
        Dispatcher::new(router, Arc::new(MockBus::new()), SessionStore::new())
    }

    #[tokio::test]
    async fn matched_route_returns_handler_body() {
        let dispatcher = dispatcher_with("/redfish/v1/Chassis", json!({"Name": "chassis"}));
        let (status, _headers, body) = dispatcher.dispatch(test_request("/redfish/v1/Chassis")).await;
        assert_eq!(status, StatusCode::OK);
        let Body::Json(body) = body else { panic!("expected a JSON body") };
        assert_eq!(body["Name"], "chassis");
    }

    #[tokio::test]
    async fn unmatched_route_returns_not_found_body() {
        let dispatcher = dispatcher_with("/redfish/v1/Chassis", json!({}));
        let (status, _headers, _body) = dispatcher.dispatch(test_request("/redfish/v1/Systems")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn privileged_route_without_session_is_unauthorized() {
        let mut router: Router<Arc<dyn Handler>> = Router::new();
        router
            .add(
                "/redfish/v1/Managers",
                AllowedMethods::GET,
                PrivilegeSet::CONFIGURE_MANAGER,
                Arc::new(StaticHandler(json!({}))),
            )
            .unwrap();
        router.validate().unwrap();
        let dispatcher = Dispatcher::new(router, Arc::new(MockBus::new()), SessionStore::new());
        let (status, _headers, _body) = dispatcher.dispatch(test_request("/redfish/v1/Managers")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn response_carries_a_computed_etag_header() {
        let dispatcher = dispatcher_with("/redfish/v1/Chassis", json!({"Name": "chassis"}));
        let (_status, headers, _body) = dispatcher.dispatch(test_request("/redfish/v1/Chassis")).await;
        assert!(headers.contains_key(http::header::ETAG));
    }

    /// Branches on `request.method` the way `SessionMember`/`Sessions` do:
    /// `DELETE` removes (tracked by `deletes`), anything else answers a
    /// fixed read body. Lets a test catch the etag pre-check invoking the
    /// real mutating method instead of a safe read.
    struct CountingDeleteHandler {
        read_body: Value,
        deletes: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait]
    impl Handler for CountingDeleteHandler {
        async fn handle(&self, async_resp: AsyncResp, _params: RouteParams, _bus: Arc<dyn Bus>) {
            let method = async_resp.request().method.clone();
            if method == Method::DELETE {
                self.deletes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async_resp.with_state(|state| state.status = StatusCode::NO_CONTENT).await;
                return;
            }
            let body = self.read_body.clone();
            async_resp.with_state(|state| state.set_json(body)).await;
        }
    }

    #[tokio::test]
    async fn if_match_precondition_check_does_not_run_the_mutating_method_twice() {
        let read_body = json!({"Name": "session-1"});
        let deletes = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut router: Router<Arc<dyn Handler>> = Router::new();
        router
            .add(
                "/redfish/v1/SessionService/Sessions/1",
                AllowedMethods::GET.union(AllowedMethods::DELETE),
                PrivilegeSet::empty(),
                Arc::new(CountingDeleteHandler {
                    read_body: read_body.clone(),
                    deletes: deletes.clone(),
                }),
            )
            .unwrap();
        router.validate().unwrap();
        let dispatcher = Dispatcher::new(router, Arc::new(MockBus::new()), SessionStore::new());

        let mut request = test_request("/redfish/v1/SessionService/Sessions/1");
        request.method = Method::DELETE;
        request.headers.insert(
            http::header::IF_MATCH,
            http::HeaderValue::from_str(&etag::compute(&read_body)).unwrap(),
        );
        let (status, _headers, _body) = dispatcher.dispatch(request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(
            deletes.load(std::sync::atomic::Ordering::SeqCst),
            1,
            "the etag pre-check must read, not delete"
        );
    }

    #[tokio::test]
    async fn get_with_if_match_is_not_evaluated() {
        let dispatcher = dispatcher_with("/redfish/v1/Chassis", json!({"Name": "chassis"}));
        let mut request = test_request("/redfish/v1/Chassis");
        request
            .headers
            .insert(http::header::IF_MATCH, http::HeaderValue::from_static("\"stale-etag\""));
        let (status, _headers, _body) = dispatcher.dispatch(request).await;
        assert_eq!(status, StatusCode::OK, "If-Match only gates PATCH/POST/DELETE");
    }

    struct StaticCredentials(PrivilegeSet);

    impl crate::auth::CredentialStore for StaticCredentials {
        fn verify(&self, username: &str, password: &str) -> Option<PrivilegeSet> {
            (username == "admin" && password == "admin-password").then_some(self.0)
        }
    }

    #[tokio::test]
    async fn basic_auth_without_a_credential_store_is_unauthorized() {
        let mut router: Router<Arc<dyn Handler>> = Router::new();
        router
            .add(
                "/redfish/v1/Managers",
                AllowedMethods::GET,
                PrivilegeSet::CONFIGURE_MANAGER,
                Arc::new(StaticHandler(json!({}))),
            )
            .unwrap();
        router.validate().unwrap();
        let dispatcher = Dispatcher::new(router, Arc::new(MockBus::new()), SessionStore::new());
        let mut request = test_request("/redfish/v1/Managers");
        request.headers.insert(
            http::header::AUTHORIZATION,
            http::HeaderValue::from_static("Basic YWRtaW46YWRtaW4tcGFzc3dvcmQ="),
        );
        let (status, _headers, _body) = dispatcher.dispatch(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn basic_auth_grants_privileges_from_the_credential_store() {
        let mut router: Router<Arc<dyn Handler>> = Router::new();
        router
            .add(
                "/redfish/v1/Managers",
                AllowedMethods::GET,
                PrivilegeSet::CONFIGURE_MANAGER,
                Arc::new(StaticHandler(json!({}))),
            )
            .unwrap();
        router.validate().unwrap();
        let dispatcher = Dispatcher::new(router, Arc::new(MockBus::new()), SessionStore::new())
            .with_credential_store(Arc::new(StaticCredentials(PrivilegeSet::CONFIGURE_MANAGER)));
        let mut request = test_request("/redfish/v1/Managers");
        request.headers.insert(
            http::header::AUTHORIZATION,
            http::HeaderValue::from_static("Basic YWRtaW46YWRtaW4tcGFzc3dvcmQ="),
        );
        let (status, _headers, _body) = dispatcher.dispatch(request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn basic_auth_with_wrong_password_is_unauthorized() {
        let dispatcher = dispatcher_with("/redfish/v1/Chassis", json!({}))
            .with_credential_store(Arc::new(StaticCredentials(PrivilegeSet::LOGIN)));
        let mut request = test_request("/redfish/v1/Chassis");
        request.headers.insert(
            http::header::AUTHORIZATION,
            http::HeaderValue::from_static("Basic YWRtaW46d3Jvbmc="),
        );
        let (status, _headers, _body) = dispatcher.dispatch(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
