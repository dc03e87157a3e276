//! `GET /redfish/v1/$metadata`: the EDMX document listing every schema this
//! service references, built with `redfish_data::get_odata_metadata_document`
//! the way `ResourceType`/`CollectionType::to_xml` were
//! already headed — this handler is the first caller to actually assemble
//! the full reference list instead of one type at a time in a test.

use std::sync::Arc;

use async_trait::async_trait;
use redfish_core::async_resp::AsyncResp;
use redfish_core::bus::Bus;
use redfish_core::dispatch::Handler;
use redfish_data::{CollectionSchemaVersion, CollectionType, ResourceSchemaVersion, ResourceType};
use redfish_router::RouteParams;

pub struct Metadata;

#[async_trait]
impl Handler for Metadata {
    async fn handle(&self, async_resp: AsyncResp, _params: RouteParams, _bus: Arc<dyn Bus>) {
        let resources = [
            ResourceType::new_dmtf("ServiceRoot", ResourceSchemaVersion::new(1, 17, 0)),
            ResourceType::new_dmtf("Chassis", ResourceSchemaVersion::new(1, 22, 0)),
            ResourceType::new_dmtf("ComputerSystem", ResourceSchemaVersion::new(1, 20, 0)),
            ResourceType::new_dmtf("SessionService", ResourceSchemaVersion::new(1, 1, 9)),
            ResourceType::new_dmtf("Session", ResourceSchemaVersion::new(1, 6, 0)),
            ResourceType::new_dmtf("AccountService", ResourceSchemaVersion::new(1, 12, 0)),
            ResourceType::new_dmtf("ManagerAccount", ResourceSchemaVersion::new(1, 10, 0)),
            ResourceType::new_dmtf("Role", ResourceSchemaVersion::new(1, 3, 1)),
        ];
        let collections = [
            CollectionType::new_dmtf("ChassisCollection", CollectionSchemaVersion::new(1)),
            CollectionType::new_dmtf("ComputerSystemCollection", CollectionSchemaVersion::new(1)),
            CollectionType::new_dmtf("SessionCollection", CollectionSchemaVersion::new(1)),
            CollectionType::new_dmtf("ManagerAccountCollection", CollectionSchemaVersion::new(1)),
            CollectionType::new_dmtf("RoleCollection", CollectionSchemaVersion::new(1)),
        ];
        let document = redfish_data::get_odata_metadata_document(&resources, &collections);
        async_resp
            .with_state(|state| state.set_raw("application/xml", bytes::Bytes::from(document)))
            .await;
    }
}
