//! `/redfish/v1/Chassis` and `/redfish/v1/Chassis/<str>`: the one real
//! bus-backed resource this demo ships, reading `PrettyName`/`Present` off
//! the mock object broker the way a production handler would read them
//! off a real one (C5's `get_property`/`get_associated_sub_tree`).

use std::sync::Arc;

use async_trait::async_trait;
use redfish_core::async_resp::AsyncResp;
use redfish_core::bus::Bus;
use redfish_core::dispatch::Handler;
use redfish_core::query::QueryCapabilities;
use redfish_router::RouteParams;
use serde_json::json;

use crate::fixture;

const CHASSIS_ID: &str = "chassis0";

pub struct ChassisCollection;

#[async_trait]
impl Handler for ChassisCollection {
    async fn handle(&self, async_resp: AsyncResp, _params: RouteParams, _bus: Arc<dyn Bus>) {
        async_resp
            .with_state(|state| {
                state.set_json(json!({
                    "@odata.id": "/redfish/v1/Chassis",
                    "@odata.type": "#ChassisCollection.ChassisCollection",
                    "Name": "Chassis Collection",
                    "Members@odata.count": 1,
                    "Members": [
                        { "@odata.id": format!("/redfish/v1/Chassis/{CHASSIS_ID}") },
                    ],
                }));
            })
            .await;
    }

    fn query_capabilities(&self) -> QueryCapabilities {
        QueryCapabilities::default()
    }
}

pub struct ChassisMember;

#[async_trait]
impl Handler for ChassisMember {
    async fn handle(&self, async_resp: AsyncResp, params: RouteParams, bus: Arc<dyn Bus>) {
        let id = params.get(0).map(|p| p.as_str().to_string()).unwrap_or_default();
        if id != CHASSIS_ID {
            async_resp
                .with_state(|state| {
                    state.status = http::StatusCode::NOT_FOUND;
                    state.set_json(redfish_data::resource_not_found("Chassis", &id).to_error_body());
                })
                .await;
            return;
        }

        let pretty_name = bus
            .get_property(
                fixture::CHASSIS_SERVICE,
                fixture::CHASSIS_PATH,
                "xyz.openbmc_project.Inventory.Item",
                "PrettyName",
            )
            .await
            .ok();
        let present = bus
            .get_property(
                fixture::CHASSIS_SERVICE,
                fixture::CHASSIS_PATH,
                "xyz.openbmc_project.Inventory.Item",
                "Present",
            )
            .await
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        async_resp
            .with_state(|state| {
                state.set_json(json!({
                    "@odata.id": format!("/redfish/v1/Chassis/{id}"),
                    "@odata.type": "#Chassis.v1_22_0.Chassis",
                    "Id": id,
                    "Name": pretty_name.unwrap_or_else(|| json!("Chassis")),
                    "ChassisType": "RackMount",
                    "Status": {
                        "State": if present { "Enabled" } else { "Absent" },
                    },
                    "Links": {
                        "Sessions": { "@odata.id": "/redfish/v1/SessionService/Sessions" },
                    },
                }));
            })
            .await;
    }

    fn expected_params(&self) -> &'static [redfish_router::ParamType] {
        &[redfish_router::ParamType::Str]
    }
}
