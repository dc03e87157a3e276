//! `/redfish/v1/Systems`: registered per §6's "named by the dispatcher's
//! route table structure but left as a documented extension point" —
//! an empty collection rather than a real `ComputerSystem`, since this
//! demo's `MockBus` fixture only populates a chassis and two sensors.

use std::sync::Arc;

use async_trait::async_trait;
use redfish_core::async_resp::AsyncResp;
use redfish_core::bus::Bus;
use redfish_core::dispatch::Handler;
use redfish_router::RouteParams;
use serde_json::json;

pub struct SystemsCollection;

#[async_trait]
impl Handler for SystemsCollection {
    async fn handle(&self, async_resp: AsyncResp, _params: RouteParams, _bus: Arc<dyn Bus>) {
        async_resp
            .with_state(|state| {
                state.set_json(json!({
                    "@odata.id": "/redfish/v1/Systems",
                    "@odata.type": "#ComputerSystemCollection.ComputerSystemCollection",
                    "Name": "Computer System Collection",
                    "Members@odata.count": 0,
                    "Members": [],
                }));
            })
            .await;
    }
}
