//! `GET /redfish/v1`: the one resource every Redfish client starts from.
//!
//! Grounded in `get_mock_tree`'s `"/redfish/v1"` entry
//! (`main.rs`), whose `json!` body this handler reproduces in shape; the
//! difference is this handler builds the document fresh per request
//! instead of reading it out of a `Tree`, since there is no tree anymore.

use std::sync::Arc;

use async_trait::async_trait;
use redfish_core::async_resp::AsyncResp;
use redfish_core::bus::Bus;
use redfish_core::dispatch::Handler;
use redfish_router::RouteParams;
use serde_json::{json, Value};

/// Shared with [`crate::handlers::odata`], which derives the `/odata`
/// service document from the same set of top-level `@odata.id` members.
pub fn body() -> Value {
    json!({
        "@odata.id": "/redfish/v1",
        "@odata.type": "#ServiceRoot.v1_17_0.ServiceRoot",
        "Id": "RootService",
        "Name": "Root Service",
        "RedfishVersion": "1.17.0",
        "Chassis": { "@odata.id": "/redfish/v1/Chassis" },
        "Systems": { "@odata.id": "/redfish/v1/Systems" },
        "SessionService": { "@odata.id": "/redfish/v1/SessionService" },
        "AccountService": { "@odata.id": "/redfish/v1/AccountService" },
        "Links": {
            "Sessions": { "@odata.id": "/redfish/v1/SessionService/Sessions" },
        },
    })
}

pub struct ServiceRoot;

#[async_trait]
impl Handler for ServiceRoot {
    async fn handle(&self, async_resp: AsyncResp, _params: RouteParams, _bus: Arc<dyn Bus>) {
        async_resp.with_state(|state| state.set_json(body())).await;
    }
}
