//! Strongly-typed wrappers around the object-broker bus: `getProperty`,
//! `getSubTree`, `getManagedObjects`, and friends (C5).
//!
//! The original source issues these as `boost::asio` completion-callback
//! calls against a D-Bus connection. This crate is the bus's *client*, not
//! its implementation (out of scope per the purpose section), so `Bus` is a
//! trait: production code would implement it against a real object-broker
//! client crate, and [`MockBus`] implements it in-memory for handler and
//! query-engine tests, in the spirit of `redfish-axum`'s `MockTree`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// A D-Bus-style object path, e.g. `/xyz/openbmc_project/sensors/fan/fan0`.
pub type ObjectPath = String;
pub type ServiceName = String;
pub type InterfaceName = String;
pub type PropertyName = String;

/// Bus call failures. `NotFound` corresponds to the source's `EBADR`: most
/// handlers absorb it silently rather than treating it as an error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BusError {
    #[error("no such object, interface, or property")]
    NotFound,
    #[error("bus call timed out")]
    Timeout,
    #[error("bus returned a reply of the wrong shape: {0}")]
    TypeMismatch(String),
    #[error("bus transport error: {0}")]
    Transport(String),
}

/// One entry of a `GetSubTree` result: a path plus the services and
/// interfaces that implement it there.
#[derive(Clone, Debug, PartialEq)]
pub struct SubTreeEntry {
    pub path: ObjectPath,
    pub services: Vec<(ServiceName, Vec<InterfaceName>)>,
}

#[async_trait]
pub trait Bus: Send + Sync {
    async fn get_property(
        &self,
        service: &str,
        path: &str,
        interface: &str,
        property: &str,
    ) -> Result<Value, BusError>;

    async fn get_all_properties(
        &self,
        service: &str,
        path: &str,
        interface: &str,
    ) -> Result<Vec<(PropertyName, Value)>, BusError>;

    async fn set_property(
        &self,
        service: &str,
        path: &str,
        interface: &str,
        property: &str,
        value: Value,
    ) -> Result<(), BusError>;

    async fn get_sub_tree(
        &self,
        path: &str,
        depth: i32,
        interfaces: &[&str],
    ) -> Result<Vec<SubTreeEntry>, BusError>;

    async fn get_sub_tree_paths(
        &self,
        path: &str,
        depth: i32,
        interfaces: &[&str],
    ) -> Result<Vec<ObjectPath>, BusError>;

    async fn get_associated_sub_tree(
        &self,
        association_source: &str,
        root: &str,
        depth: i32,
        interfaces: &[&str],
    ) -> Result<Vec<SubTreeEntry>, BusError>;

    async fn get_associated_sub_tree_paths(
        &self,
        association_source: &str,
        root: &str,
        depth: i32,
        interfaces: &[&str],
    ) -> Result<Vec<ObjectPath>, BusError>;

    async fn get_associated_sub_tree_by_id(
        &self,
        leaf_name: &str,
        root: &str,
        source_interfaces: &[&str],
        association_name: &str,
        target_interfaces: &[&str],
    ) -> Result<Vec<SubTreeEntry>, BusError>;

    async fn get_dbus_object(
        &self,
        path: &str,
        interfaces: &[&str],
    ) -> Result<Vec<(ServiceName, Vec<InterfaceName>)>, BusError>;

    async fn get_association_end_points(
        &self,
        association_path: &str,
    ) -> Result<Vec<ObjectPath>, BusError>;

    async fn get_managed_objects(
        &self,
        service: &str,
        root: &str,
    ) -> Result<Vec<(ObjectPath, Vec<(InterfaceName, Vec<(PropertyName, Value)>)>)>, BusError>;

    async fn call_method(
        &self,
        service: &str,
        path: &str,
        interface: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, BusError>;
}

/// An in-memory bus fixture for tests: a flat map of
/// `(service, path, interface) -> { property -> value }`, plus a
/// `path -> [targets]` association table.
#[derive(Default)]
pub struct MockBus {
    properties: BTreeMap<(String, String, String), BTreeMap<String, Value>>,
    associations: BTreeMap<String, Vec<String>>,
    sub_tree: Vec<SubTreeEntry>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(
        mut self,
        service: &str,
        path: &str,
        interface: &str,
        property: &str,
        value: Value,
    ) -> Self {
        self.properties
            .entry((service.to_string(), path.to_string(), interface.to_string()))
            .or_default()
            .insert(property.to_string(), value);
        self
    }

    pub fn with_association(mut self, source: &str, targets: &[&str]) -> Self {
        self.associations.insert(
            source.to_string(),
            targets.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    pub fn with_sub_tree_entry(mut self, path: &str, services: &[(&str, &[&str])]) -> Self {
        self.sub_tree.push(SubTreeEntry {
            path: path.to_string(),
            services: services
                .iter()
                .map(|(service, interfaces)| {
                    (
                        service.to_string(),
                        interfaces.iter().map(|i| i.to_string()).collect(),
                    )
                })
                .collect(),
        });
        self
    }
}

#[async_trait]
impl Bus for MockBus {
    async fn get_property(
        &self,
        service: &str,
        path: &str,
        interface: &str,
        property: &str,
    ) -> Result<Value, BusError> {
        self.properties
            .get(&(service.to_string(), path.to_string(), interface.to_string()))
            .and_then(|props| props.get(property))
            .cloned()
            .ok_or(BusError::NotFound)
    }

    async fn get_all_properties(
        &self,
        service: &str,
        path: &str,
        interface: &str,
    ) -> Result<Vec<(PropertyName, Value)>, BusError> {
        self.properties
            .get(&(service.to_string(), path.to_string(), interface.to_string()))
            .map(|props| props.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .ok_or(BusError::NotFound)
    }

    async fn set_property(
        &self,
        _service: &str,
        _path: &str,
        _interface: &str,
        _property: &str,
        _value: Value,
    ) -> Result<(), BusError> {
        Err(BusError::Transport(
            "MockBus is read-only; construct a new one with the desired fixture".to_string(),
        ))
    }

    async fn get_sub_tree(
        &self,
        path: &str,
        _depth: i32,
        _interfaces: &[&str],
    ) -> Result<Vec<SubTreeEntry>, BusError> {
        Ok(self
            .sub_tree
            .iter()
            .filter(|entry| entry.path.starts_with(path))
            .cloned()
            .collect())
    }

    async fn get_sub_tree_paths(
        &self,
        path: &str,
        depth: i32,
        interfaces: &[&str],
    ) -> Result<Vec<ObjectPath>, BusError> {
        Ok(self
            .get_sub_tree(path, depth, interfaces)
            .await?
            .into_iter()
            .map(|entry| entry.path)
            .collect())
    }

    async fn get_associated_sub_tree(
        &self,
        association_source: &str,
        _root: &str,
        _depth: i32,
        interfaces: &[&str],
    ) -> Result<Vec<SubTreeEntry>, BusError> {
        let targets = self
            .associations
            .get(association_source)
            .cloned()
            .unwrap_or_default();
        Ok(self
            .sub_tree
            .iter()
            .filter(|entry| targets.contains(&entry.path))
            .filter(|entry| {
                interfaces.is_empty()
                    || entry
                        .services
                        .iter()
                        .any(|(_, ifaces)| ifaces.iter().any(|i| interfaces.contains(&i.as_str())))
            })
            .cloned()
            .collect())
    }

    async fn get_associated_sub_tree_paths(
        &self,
        association_source: &str,
        root: &str,
        depth: i32,
        interfaces: &[&str],
    ) -> Result<Vec<ObjectPath>, BusError> {
        Ok(self
            .get_associated_sub_tree(association_source, root, depth, interfaces)
            .await?
            .into_iter()
            .map(|entry| entry.path)
            .collect())
    }

    async fn get_associated_sub_tree_by_id(
        &self,
        leaf_name: &str,
        root: &str,
        source_interfaces: &[&str],
        _association_name: &str,
        target_interfaces: &[&str],
    ) -> Result<Vec<SubTreeEntry>, BusError> {
        let association_source = format!("{root}/{leaf_name}");
        self.get_associated_sub_tree(&association_source, root, 0, target_interfaces.iter().chain(source_interfaces).cloned().collect::<Vec<_>>().as_slice())
            .await
    }

    async fn get_dbus_object(
        &self,
        path: &str,
        interfaces: &[&str],
    ) -> Result<Vec<(ServiceName, Vec<InterfaceName>)>, BusError> {
        self.sub_tree
            .iter()
            .find(|entry| entry.path == path)
            .map(|entry| {
                entry
                    .services
                    .iter()
                    .filter(|(_, ifaces)| {
                        interfaces.is_empty() || ifaces.iter().any(|i| interfaces.contains(&i.as_str()))
                    })
                    .cloned()
                    .collect()
            })
            .ok_or(BusError::NotFound)
    }

    async fn get_association_end_points(
        &self,
        association_path: &str,
    ) -> Result<Vec<ObjectPath>, BusError> {
        self.associations
            .get(association_path)
            .cloned()
            .ok_or(BusError::NotFound)
    }

    async fn get_managed_objects(
        &self,
        service: &str,
        root: &str,
    ) -> Result<Vec<(ObjectPath, Vec<(InterfaceName, Vec<(PropertyName, Value)>)>)>, BusError> {
        let mut by_path: BTreeMap<String, Vec<(InterfaceName, Vec<(PropertyName, Value)>)>> =
            BTreeMap::new();
        for ((svc, path, interface), props) in &self.properties {
            if svc != service || !path.starts_with(root) {
                continue;
            }
            by_path.entry(path.clone()).or_default().push((
                interface.clone(),
                props.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ));
        }
        Ok(by_path.into_iter().collect())
    }

    async fn call_method(
        &self,
        _service: &str,
        _path: &str,
        _interface: &str,
        _method: &str,
        _args: Vec<Value>,
    ) -> Result<Value, BusError> {
        Err(BusError::Transport(
            "MockBus does not execute methods; assert on call arguments in test doubles instead".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_property_returns_not_found_for_unknown_key_like_ebadr() {
        let bus = MockBus::new().with_property(
            "xyz.openbmc_project.Foo",
            "/xyz/openbmc_project/foo",
            "xyz.openbmc_project.Foo",
            "Bar",
            Value::from(42),
        );
        let err = bus
            .get_property(
                "xyz.openbmc_project.Foo",
                "/xyz/openbmc_project/foo",
                "xyz.openbmc_project.Foo",
                "Missing",
            )
            .await
            .unwrap_err();
        assert_eq!(err, BusError::NotFound);
    }

    #[tokio::test]
    async fn get_associated_sub_tree_filters_by_association_targets() {
        let bus = MockBus::new()
            .with_sub_tree_entry("/xyz/openbmc_project/sensors/fan/fan0", &[("svc", &["xyz.openbmc_project.Sensor.Value"])])
            .with_sub_tree_entry("/xyz/openbmc_project/sensors/fan/fan1", &[("svc", &["xyz.openbmc_project.Sensor.Value"])])
            .with_association(
                "/xyz/openbmc_project/inventory/chassis0",
                &["/xyz/openbmc_project/sensors/fan/fan0"],
            );

        let result = bus
            .get_associated_sub_tree(
                "/xyz/openbmc_project/inventory/chassis0",
                "/xyz/openbmc_project/sensors",
                0,
                &[],
            )
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].path, "/xyz/openbmc_project/sensors/fan/fan0");
    }
}
