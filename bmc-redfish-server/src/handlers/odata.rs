//! `GET /redfish/v1/odata`: the OData service document, grounded in the
//! `get_odata_service_doc` test, which sources it from
//! `redfish_data::get_odata_service_document` over the service root body.

use std::sync::Arc;

use async_trait::async_trait;
use redfish_core::async_resp::AsyncResp;
use redfish_core::bus::Bus;
use redfish_core::dispatch::Handler;
use redfish_router::RouteParams;

use super::service_root;

pub struct ODataServiceDocument;

#[async_trait]
impl Handler for ODataServiceDocument {
    async fn handle(&self, async_resp: AsyncResp, _params: RouteParams, _bus: Arc<dyn Bus>) {
        let root = service_root::body();
        let doc = redfish_data::get_odata_service_document(root.as_object().unwrap());
        async_resp.with_state(|state| state.set_json(doc)).await;
    }
}
