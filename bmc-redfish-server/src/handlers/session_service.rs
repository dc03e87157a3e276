//! `SessionService`, its `Sessions` collection, and individual `Session`
//! members — the login/logout surface `redfish-core`'s `session_for`
//! (`dispatch.rs`) authenticates every other request against.
//!
//! Grounded in `create_session` (`example/src/main.rs`) for
//! the request/response shape, generalized from a `Tree`-mutation closure
//! into a real handler that calls `SessionStore::create`.

use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use redfish_core::async_resp::AsyncResp;
use redfish_core::bus::Bus;
use redfish_core::dispatch::Handler;
use redfish_core::session::SessionStore;
use redfish_router::RouteParams;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use crate::users::UserStore;

pub struct SessionServiceRoot;

#[async_trait]
impl Handler for SessionServiceRoot {
    async fn handle(&self, async_resp: AsyncResp, _params: RouteParams, _bus: Arc<dyn Bus>) {
        async_resp
            .with_state(|state| {
                state.set_json(json!({
                    "@odata.id": "/redfish/v1/SessionService",
                    "@odata.type": "#SessionService.v1_1_9.SessionService",
                    "Id": "SessionService",
                    "Name": "Session Service",
                    "ServiceEnabled": true,
                    "SessionTimeout": 600,
                    "Sessions": { "@odata.id": "/redfish/v1/SessionService/Sessions" },
                }));
            })
            .await;
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(rename = "UserName")]
    user_name: String,
    #[serde(rename = "Password")]
    password: String,
}

/// `GET`/`POST /redfish/v1/SessionService/Sessions`. `POST` needs no prior
/// session (the router registers it with an empty `PrivilegeSet`): it's
/// how a client gets one in the first place.
pub struct Sessions {
    sessions: Arc<RwLock<SessionStore>>,
    users: Arc<dyn UserStore>,
}

impl Sessions {
    pub fn new(sessions: Arc<RwLock<SessionStore>>, users: Arc<dyn UserStore>) -> Self {
        Sessions { sessions, users }
    }
}

#[async_trait]
impl Handler for Sessions {
    async fn handle(&self, async_resp: AsyncResp, _params: RouteParams, _bus: Arc<dyn Bus>) {
        let request = async_resp.request().clone();
        if request.method != http::Method::POST {
            let store = self.sessions.read().await;
            let uris = store.uris();
            async_resp
                .with_state(|state| {
                    state.set_json(json!({
                        "@odata.id": "/redfish/v1/SessionService/Sessions",
                        "@odata.type": "#SessionCollection.SessionCollection",
                        "Name": "Session Collection",
                        "Members@odata.count": uris.len(),
                        "Members": uris.iter().map(|uri| json!({"@odata.id": uri})).collect::<Vec<_>>(),
                    }));
                })
                .await;
            return;
        }

        let login: Result<LoginRequest, _> = serde_json::from_slice(&request.body);
        let Ok(login) = login else {
            async_resp
                .with_state(|state| {
                    state.status = StatusCode::BAD_REQUEST;
                    state.set_json(redfish_data::malformed_json().to_error_body());
                })
                .await;
            return;
        };

        let Some(account) = self.users.authenticate(&login.user_name, &login.password) else {
            async_resp
                .with_state(|state| {
                    state.status = StatusCode::UNAUTHORIZED;
                    state.set_json(redfish_data::insufficient_privilege().to_error_body());
                })
                .await;
            return;
        };

        let mut store = self.sessions.write().await;
        let next_id = store.len() + 1;
        let uri = format!("/redfish/v1/SessionService/Sessions/{next_id}");
        let session = store.create(
            account.username.clone(),
            account.privileges,
            uri.clone(),
            request.client_ip.to_string(),
        );
        drop(store);
        if let Err(error) = self.sessions.read().await.persist().await {
            tracing::warn!(%error, "failed to persist session store after login");
        }

        async_resp
            .with_state(|state| {
                state.status = StatusCode::CREATED;
                if let Ok(value) = http::HeaderValue::from_str(&session.token) {
                    state.headers.insert(
                        http::HeaderName::from_static("x-auth-token"),
                        value,
                    );
                }
                if let Ok(value) = http::HeaderValue::from_str(&uri) {
                    state.headers.insert(http::header::LOCATION, value);
                }
                state.set_json(json!({
                    "@odata.id": uri,
                    "@odata.type": "#Session.v1_6_0.Session",
                    "Id": next_id.to_string(),
                    "Name": format!("Session {next_id}"),
                    "UserName": account.username,
                }));
            })
            .await;
    }
}

/// `GET`/`DELETE /redfish/v1/SessionService/Sessions/<str>`.
pub struct SessionMember {
    sessions: Arc<RwLock<SessionStore>>,
}

impl SessionMember {
    pub fn new(sessions: Arc<RwLock<SessionStore>>) -> Self {
        SessionMember { sessions }
    }
}

#[async_trait]
impl Handler for SessionMember {
    async fn handle(&self, async_resp: AsyncResp, params: RouteParams, _bus: Arc<dyn Bus>) {
        let id = params.get(0).map(|p| p.as_str().to_string()).unwrap_or_default();
        let uri = format!("/redfish/v1/SessionService/Sessions/{id}");
        let request = async_resp.request().clone();

        if request.method == http::Method::DELETE {
            let removed = self.sessions.write().await.remove_by_uri(&uri);
            if removed.is_none() {
                async_resp
                    .with_state(|state| {
                        state.status = StatusCode::NOT_FOUND;
                        state.set_json(redfish_data::resource_not_found("Session", &id).to_error_body());
                    })
                    .await;
                return;
            }
            if let Err(error) = self.sessions.read().await.persist().await {
                tracing::warn!(%error, "failed to persist session store after logout");
            }
            async_resp.with_state(|state| state.status = StatusCode::NO_CONTENT).await;
            return;
        }

        let store = self.sessions.read().await;
        let Some(session) = store.all().find(|s| s.uri == uri) else {
            drop(store);
            async_resp
                .with_state(|state| {
                    state.status = StatusCode::NOT_FOUND;
                    state.set_json(redfish_data::resource_not_found("Session", &id).to_error_body());
                })
                .await;
            return;
        };
        let body = json!({
            "@odata.id": uri,
            "@odata.type": "#Session.v1_6_0.Session",
            "Id": id,
            "Name": format!("Session {id}"),
            "UserName": session.username,
        });
        drop(store);
        async_resp.with_state(|state| state.set_json(body)).await;
    }

    fn expected_params(&self) -> &'static [redfish_router::ParamType] {
        &[redfish_router::ParamType::Str]
    }
}
