//! Redfish schema descriptors, OData document generation, and the subset
//! of the `Base` message registry this server emits.
//!
//! Adapted from `redfish-axum`'s `redfish-data` crate (schema version types and
//! `$metadata` XML fragments) and expanded with the message registry from
//! `redfish-core/include/error_messages.hpp` in the original bmcweb source.

mod messages;
mod schema;

pub use messages::*;
pub use schema::{
    get_odata_metadata_document, get_odata_service_document, AllowedMethods,
    CollectionSchemaVersion, CollectionType, PrivilegeSet, ResourceSchemaVersion, ResourceType,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_schema_version_formats_as_v_major_minor_build() {
        let version = ResourceSchemaVersion::new(1, 15, 0);
        assert_eq!(version.to_str(), "v1_15_0");
    }

    #[test]
    fn collection_schema_version_formats_as_v_number() {
        let version = CollectionSchemaVersion::new(1);
        assert_eq!(version.to_str(), "v1");
    }

    #[test]
    fn resource_type_xml_includes_versioned_namespace() {
        let resource = ResourceType::new_dmtf("Chassis", ResourceSchemaVersion::new(1, 22, 0));
        let xml = resource.to_xml();
        assert!(xml.contains("Namespace=\"Chassis\""));
        assert!(xml.contains("Namespace=\"Chassis.v1_22_0\""));
        assert!(xml.contains("Chassis_v1.xml"));
    }

    #[test]
    fn allowed_methods_displays_comma_joined_in_declaration_order() {
        let methods = AllowedMethods::GET | AllowedMethods::HEAD | AllowedMethods::PATCH;
        assert_eq!(methods.to_string(), "GET,HEAD,PATCH");
    }

    #[test]
    fn privilege_set_contains_checks_subset() {
        let session = PrivilegeSet::LOGIN | PrivilegeSet::CONFIGURE_COMPONENTS;
        let required = PrivilegeSet::LOGIN;
        assert!(session.contains(required));
        assert!(!session.contains(PrivilegeSet::CONFIGURE_USERS));
    }

    #[test]
    fn odata_service_document_lists_only_odata_id_members() {
        let root = serde_json::json!({
            "@odata.id": "/redfish/v1",
            "@odata.type": "#ServiceRoot.v1_15_0.ServiceRoot",
            "Chassis": { "@odata.id": "/redfish/v1/Chassis" },
            "RedfishVersion": "1.15.0",
        });
        let doc = get_odata_service_document(root.as_object().unwrap());
        let values = doc["value"].as_array().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["name"], "Chassis");
        assert_eq!(values[0]["url"], "/redfish/v1/Chassis");
    }

    #[test]
    fn message_to_error_body_has_redfish_error_shape() {
        let msg = resource_not_found("Chassis", "chassis-1");
        let body = msg.to_error_body();
        assert_eq!(body["error"]["code"], "Base.1.13.0.ResourceNotFound");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("chassis-1"));
        assert_eq!(
            body["error"][MESSAGE_ANNOTATION].as_array().unwrap().len(),
            1
        );
    }
}
