//! `$select` property-path trie (C6 data, C7 pruning pass).
//!
//! Grounded in §3's "Select trie" data model: a node per property name, a
//! "selected" bit meaning the whole subtree is retained, and a fixed set of
//! reserved OData properties that always survive pruning regardless of
//! what was selected.

use std::collections::HashMap;

use serde_json::Value;

fn is_reserved(key: &str) -> bool {
    matches!(
        key,
        "@odata.id" | "@odata.type" | "@odata.context" | "@odata.etag"
    ) || key.ends_with("@odata.count")
        || key.ends_with("@Message.ExtendedInfo")
}

#[derive(Default, Debug, Clone)]
struct SelectNode {
    selected: bool,
    children: HashMap<String, SelectNode>,
}

/// A parsed `$select` value: a set of `/`-joined property paths, descended
/// in parallel with the JSON tree during pruning.
#[derive(Default, Debug, Clone)]
pub struct SelectTrie {
    root: SelectNode,
}

impl SelectTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one comma-separated `$select` path, e.g. `Links/Sessions`.
    pub fn insert(&mut self, path: &str) {
        let mut node = &mut self.root;
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return;
        }
        for segment in &segments {
            node = node.children.entry(segment.to_string()).or_default();
        }
        node.selected = true;
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Prune `value` in place, keeping only reserved properties and
    /// properties reachable through this trie.
    pub fn prune(&self, value: &mut Value) {
        if self.is_empty() {
            return;
        }
        prune_node(&self.root, value);
    }
}

fn prune_node(node: &SelectNode, value: &mut Value) {
    if node.selected {
        return;
    }
    match value {
        Value::Object(map) => {
            map.retain(|key, child| {
                if is_reserved(key) {
                    return true;
                }
                match node.children.get(key) {
                    Some(child_node) => {
                        prune_node(child_node, child);
                        true
                    }
                    None => false,
                }
            });
        }
        Value::Array(items) => {
            for item in items {
                prune_node(node, item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn retains_selected_paths_and_reserved_keys() {
        let mut trie = SelectTrie::new();
        trie.insert("RedfishVersion");
        trie.insert("Links/Sessions");

        let mut body = json!({
            "@odata.id": "/redfish/v1",
            "@odata.type": "#ServiceRoot.v1_15_0.ServiceRoot",
            "RedfishVersion": "1.15.0",
            "UUID": "abc-123",
            "Links": {
                "Sessions": {"@odata.id": "/redfish/v1/SessionService/Sessions"},
                "ManagerForChassis": [{"@odata.id": "/redfish/v1/Chassis/1"}],
            },
        });
        trie.prune(&mut body);

        assert!(body.get("RedfishVersion").is_some());
        assert!(body.get("UUID").is_none());
        assert!(body["Links"].get("Sessions").is_some());
        assert!(body["Links"].get("ManagerForChassis").is_none());
        assert!(body.get("@odata.id").is_some());
    }

    #[test]
    fn selecting_a_parent_retains_its_whole_subtree() {
        let mut trie = SelectTrie::new();
        trie.insert("Links");

        let mut body = json!({
            "@odata.id": "/redfish/v1",
            "Links": {"Sessions": {"@odata.id": "x"}, "Other": {"@odata.id": "y"}},
            "RedfishVersion": "1.15.0",
        });
        trie.prune(&mut body);
        assert!(body["Links"].get("Sessions").is_some());
        assert!(body["Links"].get("Other").is_some());
        assert!(body.get("RedfishVersion").is_none());
    }

    #[test]
    fn empty_trie_is_a_no_op() {
        let trie = SelectTrie::new();
        let mut body = json!({"RedfishVersion": "1.15.0"});
        let before = body.clone();
        trie.prune(&mut body);
        assert_eq!(body, before);
    }

    #[test]
    fn pruning_an_already_pruned_tree_is_idempotent() {
        let mut trie = SelectTrie::new();
        trie.insert("RedfishVersion");
        let mut body = json!({
            "@odata.id": "/redfish/v1",
            "RedfishVersion": "1.15.0",
            "UUID": "abc",
        });
        trie.prune(&mut body);
        let once = body.clone();
        trie.prune(&mut body);
        assert_eq!(body, once);
    }
}
