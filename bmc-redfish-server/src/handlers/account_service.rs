//! `AccountService`, its `Accounts`/`Roles` collections and their members.
//!
//! Grounded directly in the demo roster of `example/src/main.rs`:
//! one `admin` account holding the `Administrator` role, plus the three
//! predefined roles every Redfish service ships. The account list here
//! comes from [`crate::users::UserStore`] instead of a hardcoded `Tree`
//! entry, so it stays in sync with whatever roster the binary was started
//! with.

use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use redfish_core::async_resp::AsyncResp;
use redfish_core::bus::Bus;
use redfish_core::dispatch::Handler;
use redfish_router::RouteParams;
use serde_json::json;

use crate::users::UserStore;

pub struct AccountServiceRoot;

#[async_trait]
impl Handler for AccountServiceRoot {
    async fn handle(&self, async_resp: AsyncResp, _params: RouteParams, _bus: Arc<dyn Bus>) {
        async_resp
            .with_state(|state| {
                state.set_json(json!({
                    "@odata.id": "/redfish/v1/AccountService",
                    "@odata.type": "#AccountService.v1_12_0.AccountService",
                    "Id": "AccountService",
                    "Name": "Account Service",
                    "ServiceEnabled": true,
                    "Accounts": { "@odata.id": "/redfish/v1/AccountService/Accounts" },
                    "Roles": { "@odata.id": "/redfish/v1/AccountService/Roles" },
                }));
            })
            .await;
    }
}

pub struct Accounts {
    users: Arc<dyn UserStore>,
}

impl Accounts {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Accounts { users }
    }
}

#[async_trait]
impl Handler for Accounts {
    async fn handle(&self, async_resp: AsyncResp, _params: RouteParams, _bus: Arc<dyn Bus>) {
        let members: Vec<_> = self
            .users
            .accounts()
            .iter()
            .map(|account| json!({"@odata.id": format!("/redfish/v1/AccountService/Accounts/{}", account.username)}))
            .collect();
        async_resp
            .with_state(|state| {
                state.set_json(json!({
                    "@odata.id": "/redfish/v1/AccountService/Accounts",
                    "@odata.type": "#ManagerAccountCollection.ManagerAccountCollection",
                    "Name": "Account Collection",
                    "Members@odata.count": members.len(),
                    "Members": members,
                }));
            })
            .await;
    }
}

pub struct AccountMember {
    users: Arc<dyn UserStore>,
}

impl AccountMember {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        AccountMember { users }
    }
}

#[async_trait]
impl Handler for AccountMember {
    async fn handle(&self, async_resp: AsyncResp, params: RouteParams, _bus: Arc<dyn Bus>) {
        let username = params.get(0).map(|p| p.as_str().to_string()).unwrap_or_default();
        let accounts = self.users.accounts();
        let Some(account) = accounts.iter().find(|a| a.username == username) else {
            async_resp
                .with_state(|state| {
                    state.status = StatusCode::NOT_FOUND;
                    state.set_json(redfish_data::resource_not_found("ManagerAccount", &username).to_error_body());
                })
                .await;
            return;
        };
        async_resp
            .with_state(|state| {
                state.set_json(json!({
                    "@odata.id": format!("/redfish/v1/AccountService/Accounts/{}", account.username),
                    "@odata.type": "#ManagerAccount.v1_10_0.ManagerAccount",
                    "Id": account.username,
                    "UserName": account.username,
                    "RoleId": account.role_id,
                    "Enabled": true,
                    "Links": {
                        "Role": { "@odata.id": format!("/redfish/v1/AccountService/Roles/{}", account.role_id) },
                    },
                }));
            })
            .await;
    }

    fn expected_params(&self) -> &'static [redfish_router::ParamType] {
        &[redfish_router::ParamType::Str]
    }
}

const ROLES: &[(&str, &[&str])] = &[
    (
        "Administrator",
        &["Login", "ConfigureManager", "ConfigureUsers", "ConfigureSelf", "ConfigureComponents"],
    ),
    ("Operator", &["Login", "ConfigureSelf", "ConfigureComponents"]),
    ("ReadOnly", &["Login", "ConfigureSelf"]),
];

pub struct Roles;

#[async_trait]
impl Handler for Roles {
    async fn handle(&self, async_resp: AsyncResp, _params: RouteParams, _bus: Arc<dyn Bus>) {
        let members: Vec<_> = ROLES
            .iter()
            .map(|(name, _)| json!({"@odata.id": format!("/redfish/v1/AccountService/Roles/{name}")}))
            .collect();
        async_resp
            .with_state(|state| {
                state.set_json(json!({
                    "@odata.id": "/redfish/v1/AccountService/Roles",
                    "@odata.type": "#RoleCollection.RoleCollection",
                    "Name": "Role Collection",
                    "Members@odata.count": members.len(),
                    "Members": members,
                }));
            })
            .await;
    }
}

pub struct RoleMember;

#[async_trait]
impl Handler for RoleMember {
    async fn handle(&self, async_resp: AsyncResp, params: RouteParams, _bus: Arc<dyn Bus>) {
        let id = params.get(0).map(|p| p.as_str().to_string()).unwrap_or_default();
        let Some((name, privileges)) = ROLES.iter().find(|(name, _)| *name == id) else {
            async_resp
                .with_state(|state| {
                    state.status = StatusCode::NOT_FOUND;
                    state.set_json(redfish_data::resource_not_found("Role", &id).to_error_body());
                })
                .await;
            return;
        };
        async_resp
            .with_state(|state| {
                state.set_json(json!({
                    "@odata.id": format!("/redfish/v1/AccountService/Roles/{name}"),
                    "@odata.type": "#Role.v1_3_1.Role",
                    "Id": name,
                    "RoleId": name,
                    "IsPredefined": true,
                    "AssignedPrivileges": privileges,
                }));
            })
            .await;
    }

    fn expected_params(&self) -> &'static [redfish_router::ParamType] {
        &[redfish_router::ParamType::Str]
    }
}
