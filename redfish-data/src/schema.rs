use std::fmt;

use bitflags::bitflags;
use serde_json::{Map, Value};

/// Version of a DMTF Redfish resource schema, e.g. `v1_15_0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceSchemaVersion {
    major: u32,
    minor: u32,
    build: u32,
}

impl ResourceSchemaVersion {
    pub fn new(major: u32, minor: u32, build: u32) -> Self {
        Self { major, minor, build }
    }

    pub fn to_str(&self) -> String {
        format!("v{}_{}_{}", self.major, self.minor, self.build)
    }
}

impl fmt::Display for ResourceSchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

/// Version of a DMTF Redfish collection schema, e.g. `v1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollectionSchemaVersion {
    version: u32,
}

impl CollectionSchemaVersion {
    pub fn new(version: u32) -> Self {
        Self { version }
    }

    pub fn to_str(&self) -> String {
        format!("v{}", self.version)
    }
}

/// A DMTF resource schema referenced from the `$metadata` document.
pub struct ResourceType {
    pub name: String,
    pub version: ResourceSchemaVersion,
    pub xml_schema_uri: String,
}

impl ResourceType {
    /// Construct for a DMTF-published schema of a Redfish resource.
    pub fn new_dmtf(name: impl Into<String>, version: ResourceSchemaVersion) -> Self {
        let name = name.into();
        Self {
            xml_schema_uri: format!(
                "http://redfish.dmtf.org/schemas/v1/{}_v{}.xml",
                name, version.major
            ),
            name,
            version,
        }
    }

    fn versioned_name(&self) -> String {
        format!("{}.{}", self.name, self.version.to_str())
    }

    pub fn to_xml(&self) -> String {
        format!(
            "  <edmx:Reference Uri=\"{}\">\n    <edmx:Include Namespace=\"{}\" />\n    <edmx:Include Namespace=\"{}\" />\n  </edmx:Reference>\n",
            self.xml_schema_uri, self.name, self.versioned_name()
        )
    }
}

/// A DMTF collection schema referenced from the `$metadata` document.
pub struct CollectionType {
    pub name: String,
    pub version: CollectionSchemaVersion,
    pub xml_schema_uri: String,
}

impl CollectionType {
    pub fn new_dmtf(name: impl Into<String>, version: CollectionSchemaVersion) -> Self {
        let name = name.into();
        Self {
            xml_schema_uri: format!(
                "http://redfish.dmtf.org/schemas/v1/{}_{}.xml",
                name,
                version.to_str()
            ),
            name,
            version,
        }
    }

    pub fn to_xml(&self) -> String {
        format!(
            "  <edmx:Reference Uri=\"{}\">\n    <edmx:Include Namespace=\"{}\" />\n  </edmx:Reference>\n",
            self.xml_schema_uri, self.name
        )
    }
}

bitflags! {
    /// Bitmask of HTTP methods a [`crate::schema`]-described resource answers to.
    ///
    /// Mirrors the source's `1 << (int)verb` bitfield, but keyed off a fixed
    /// set of Redfish-relevant verbs rather than the whole `boost::beast::http::verb`
    /// enumeration.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct AllowedMethods: u8 {
        const GET    = 0b0000_0001;
        const HEAD   = 0b0000_0010;
        const POST   = 0b0000_0100;
        const PUT    = 0b0000_1000;
        const PATCH  = 0b0001_0000;
        const DELETE = 0b0010_0000;
    }
}

impl fmt::Display for AllowedMethods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::GET, "GET"),
            (Self::HEAD, "HEAD"),
            (Self::POST, "POST"),
            (Self::PUT, "PUT"),
            (Self::PATCH, "PATCH"),
            (Self::DELETE, "DELETE"),
        ];
        let joined = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{joined}")
    }
}

bitflags! {
    /// Redfish privilege set, checked with [`PrivilegeSet::contains`] against
    /// a rule's required privileges (`session.privileges ⊇ rule.privileges`).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PrivilegeSet: u8 {
        const LOGIN                = 0b0000_0001;
        const CONFIGURE_MANAGER    = 0b0000_0010;
        const CONFIGURE_USERS      = 0b0000_0100;
        const CONFIGURE_COMPONENTS = 0b0000_1000;
        const CONFIGURE_SELF       = 0b0001_0000;
        const NO_AUTH              = 0b0010_0000;
    }
}

/// Build the `$metadata` OData document: an EDMX wrapper listing every
/// resource and collection schema this service exposes, in the style the
/// `redfish-axum`'s `RedfishResourceType::to_xml`/`RedfishCollectionType::to_xml`
/// were clearly headed towards.
pub fn get_odata_metadata_document(
    resource_types: &[ResourceType],
    collection_types: &[CollectionType],
) -> String {
    let mut body = String::new();
    body.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    body.push_str("<edmx:Edmx xmlns:edmx=\"http://docs.oasis-open.org/odata/ns/edmx\" Version=\"4.0\">\n");
    for resource_type in resource_types {
        body.push_str(&resource_type.to_xml());
    }
    for collection_type in collection_types {
        body.push_str(&collection_type.to_xml());
    }
    body.push_str("  <edmx:DataServices>\n  </edmx:DataServices>\n");
    body.push_str("</edmx:Edmx>\n");
    body
}

/// Build the `/redfish/v1/odata` OData service document: one entry per
/// top-level `@odata.id`-bearing member of the service root.
pub fn get_odata_service_document(service_root: &Map<String, Value>) -> Value {
    let mut values = Vec::new();
    for (name, value) in service_root {
        if name.starts_with('@') {
            continue;
        }
        let Some(odata_id) = value.get("@odata.id").and_then(Value::as_str) else {
            continue;
        };
        values.push(serde_json::json!({
            "name": name,
            "kind": "Singleton",
            "url": odata_id,
        }));
    }
    serde_json::json!({
        "@odata.context": "/redfish/v1/$metadata",
        "value": values,
    })
}
