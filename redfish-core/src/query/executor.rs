//! C7: runs the five query-parameter passes over a completed JSON response
//! in their fixed order, per §4.5.
//!
//! Grounded in `utils/query_param.hpp`'s `executeQueryParamAll` fixed pass
//! ordering, with the cycle-detection fix SPEC_FULL.md's design notes call
//! for: a per-request set of visited `@odata.id` values rather than the
//! source's "has `@odata.type`" heuristic.

use std::collections::HashSet;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use http::StatusCode;
use serde_json::Value;

use crate::error;
use crate::session::Session;

use super::{ExpandSpec, ExpandType, Query};

/// Overload-protection bound on how many `$expand` sub-fetches run at once
/// within one level: the fan-out from a single large collection expanding
/// into hundreds of members must not open hundreds of concurrent internal
/// requests against the bus.
const MAX_CONCURRENT_EXPAND: usize = 8;

/// A path into a JSON value as a sequence of object keys / array indices,
/// used instead of string JSON Pointers so re-descending to a recorded
/// location doesn't need re-parsing.
#[derive(Clone, Debug)]
enum Step {
    Key(String),
    Index(usize),
}

fn get_mut<'a>(root: &'a mut Value, path: &[Step]) -> Option<&'a mut Value> {
    let mut current = root;
    for step in path {
        current = match (step, current) {
            (Step::Key(key), Value::Object(map)) => map.get_mut(key)?,
            (Step::Index(index), Value::Array(items)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// How the executor fetches a sub-resource during `only`/`$expand`: a
/// recursive call back into the server's own routing table, carrying the
/// outer request's session so privileges re-apply. Implemented by the
/// dispatcher; kept as a trait here so the query engine does not depend on
/// the dispatcher module.
#[async_trait]
pub trait InternalFetch: Send + Sync {
    async fn fetch(&self, url: &str, session: Option<&Session>) -> (StatusCode, Value);
}

pub async fn run(
    query: &Query,
    status: &mut StatusCode,
    body: &mut Value,
    fetch: &dyn InternalFetch,
    session: Option<&Session>,
    top_skip_delegated: bool,
) {
    if query.is_only {
        apply_only(status, body, fetch, session).await;
    }
    if let Some(expand) = query.expand {
        let mut visited = HashSet::new();
        if let Some(Value::String(id)) = body.get("@odata.id") {
            visited.insert(id.clone());
        }
        apply_expand(expand.expand_type, expand.levels, status, body, fetch, session, &mut visited).await;
    }
    if !top_skip_delegated {
        apply_top_skip(query.top, query.skip, body);
    }
    if let Some(filter) = &query.filter {
        apply_filter(filter, body);
    }
    query.select.prune(body);
}

async fn apply_only(
    status: &mut StatusCode,
    body: &mut Value,
    fetch: &dyn InternalFetch,
    session: Option<&Session>,
) {
    let Some(first_member_url) = only_target(body) else {
        return;
    };
    let (inner_status, inner_body) = fetch.fetch(&first_member_url, session).await;
    *status = error::worst_status([*status, inner_status]);
    *body = inner_body;
}

fn only_target(body: &Value) -> Option<String> {
    let count = body.get("Members@odata.count")?.as_u64()?;
    if count != 1 {
        return None;
    }
    body.get("Members")?
        .as_array()?
        .first()?
        .get("@odata.id")?
        .as_str()
        .map(|s| s.to_string())
}

/// One bare `{"@odata.id": "..."}` reference found while scanning, plus
/// whether it sits under a `Links`/`Oem/*/Links` subtree (for
/// links-only/not-links filtering).
struct ExpandNode {
    path: Vec<Step>,
    url: String,
    under_links: bool,
}

fn is_expand_node(value: &Value) -> Option<&str> {
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object.get("@odata.id")?.as_str()
}

fn already_expanded(value: &Value) -> bool {
    value.get("@odata.type").is_some()
}

fn scan(value: &Value, path: Vec<Step>, under_links: bool, out: &mut Vec<ExpandNode>) {
    if let Some(url) = is_expand_node(value) {
        out.push(ExpandNode {
            path,
            url: url.to_string(),
            under_links,
        });
        return;
    }
    match value {
        Value::Object(map) => {
            if already_expanded(value) {
                // Still scan values, since a level-1-expanded node's own
                // fields may contain further bare references eligible for
                // deeper levels; we just don't treat the node itself as a
                // fresh expand target.
            }
            for (key, child) in map {
                let mut child_path = path.clone();
                child_path.push(Step::Key(key.clone()));
                let child_under_links = under_links || key == "Links" || key.starts_with("Oem");
                scan(child, child_path, child_under_links, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let mut child_path = path.clone();
                child_path.push(Step::Index(index));
                scan(child, child_path, under_links, out);
            }
        }
        _ => {}
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_expand<'a>(
    expand_type: ExpandType,
    levels: u8,
    status: &'a mut StatusCode,
    body: &'a mut Value,
    fetch: &'a dyn InternalFetch,
    session: Option<&'a Session>,
    visited: &'a mut HashSet<String>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        if levels == 0 {
            return;
        }
        let mut nodes = Vec::new();
        scan(body, Vec::new(), false, &mut nodes);

        let nodes: Vec<ExpandNode> = nodes
            .into_iter()
            .filter(|node| match expand_type {
                ExpandType::Both => true,
                ExpandType::NotLinks => !node.under_links,
                ExpandType::LinksOnly => node.under_links,
            })
            .filter(|node| !visited.contains(&node.url))
            .collect();

        if nodes.is_empty() {
            return;
        }

        for node in &nodes {
            visited.insert(node.url.clone());
        }

        let fetched: Vec<(ExpandNode, StatusCode, Value)> = stream::iter(nodes)
            .map(|node| async move {
                let (inner_status, inner_body) = fetch.fetch(&node.url, session).await;
                (node, inner_status, inner_body)
            })
            .buffer_unordered(MAX_CONCURRENT_EXPAND)
            .collect()
            .await;

        for (node, inner_status, inner_body) in fetched {
            *status = error::worst_status([*status, inner_status]);
            if let Some(slot) = get_mut(body, &node.path) {
                *slot = inner_body;
            }
        }

        apply_expand(expand_type, levels - 1, status, body, fetch, session, visited).await;
    })
}

fn apply_top_skip(top: Option<u32>, skip: Option<u32>, body: &mut Value) {
    let Some(members) = body.get_mut("Members").and_then(Value::as_array_mut) else {
        return;
    };
    let skip = skip.unwrap_or(0) as usize;
    let drained: Vec<Value> = members.drain(..).collect();
    let mut page: Vec<Value> = drained.into_iter().skip(skip).collect();
    if let Some(top) = top {
        page.truncate(top as usize);
    }
    *members = page;
}

fn apply_filter(filter: &crate::query::filter::FilterExpr, body: &mut Value) {
    let Some(members) = body.get_mut("Members").and_then(Value::as_array_mut) else {
        return;
    };
    let drained: Vec<Value> = members.drain(..).collect();
    let filtered: Vec<Value> = drained.into_iter().filter(|member| filter.eval(member)).collect();
    let count = filtered.len();
    *members = filtered;
    if let Some(count_field) = body.get_mut("Members@odata.count") {
        *count_field = Value::from(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StaticFetch(std::collections::HashMap<String, Value>);

    #[async_trait]
    impl InternalFetch for StaticFetch {
        async fn fetch(&self, url: &str, _session: Option<&Session>) -> (StatusCode, Value) {
            match self.0.get(url) {
                Some(body) => (StatusCode::OK, body.clone()),
                None => (StatusCode::NOT_FOUND, json!({"error": "not found"})),
            }
        }
    }

    #[tokio::test]
    async fn only_replaces_body_with_sole_member_when_count_is_one() {
        let fetch = StaticFetch(
            [("/redfish/v1/X".to_string(), json!({"@odata.id": "/redfish/v1/X", "Name": "x"}))]
                .into_iter()
                .collect(),
        );
        let mut body = json!({
            "Members@odata.count": 1,
            "Members": [{"@odata.id": "/redfish/v1/X"}],
        });
        let mut status = StatusCode::OK;
        let query = Query {
            is_only: true,
            ..Default::default()
        };
        run(&query, &mut status, &mut body, &fetch, None, false).await;
        assert_eq!(body["Name"], "x");
    }

    #[tokio::test]
    async fn only_is_a_no_op_when_count_is_not_one() {
        let fetch = StaticFetch(Default::default());
        let mut body = json!({
            "Members@odata.count": 2,
            "Members": [{"@odata.id": "/redfish/v1/X"}, {"@odata.id": "/redfish/v1/Y"}],
        });
        let before = body.clone();
        let mut status = StatusCode::OK;
        let query = Query {
            is_only: true,
            ..Default::default()
        };
        run(&query, &mut status, &mut body, &fetch, None, false).await;
        assert_eq!(body, before);
    }

    #[tokio::test]
    async fn expand_inlines_bare_references_and_recurses_into_them() {
        let fetch = StaticFetch(
            [(
                "/redfish/v1/Chassis/A".to_string(),
                json!({
                    "@odata.id": "/redfish/v1/Chassis/A",
                    "@odata.type": "#Chassis.v1_0_0.Chassis",
                    "Thermal": {"@odata.id": "/redfish/v1/Chassis/A/Thermal"},
                }),
            ), (
                "/redfish/v1/Chassis/A/Thermal".to_string(),
                json!({"@odata.id": "/redfish/v1/Chassis/A/Thermal", "@odata.type": "#Thermal.v1_0_0.Thermal"}),
            )]
            .into_iter()
            .collect(),
        );
        let mut body = json!({"Members": [{"@odata.id": "/redfish/v1/Chassis/A"}]});
        let mut status = StatusCode::OK;
        let query = Query {
            expand: Some(ExpandSpec { expand_type: ExpandType::NotLinks, levels: 2 }),
            ..Default::default()
        };
        run(&query, &mut status, &mut body, &fetch, None, false).await;
        assert_eq!(body["Members"][0]["@odata.type"], "#Chassis.v1_0_0.Chassis");
        assert_eq!(body["Members"][0]["Thermal"]["@odata.type"], "#Thermal.v1_0_0.Thermal");
    }

    struct ConcurrencyTrackingFetch {
        in_flight: std::sync::atomic::AtomicUsize,
        peak: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl InternalFetch for ConcurrencyTrackingFetch {
        async fn fetch(&self, url: &str, _session: Option<&Session>) -> (StatusCode, Value) {
            use std::sync::atomic::Ordering;
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            (StatusCode::OK, json!({"@odata.id": url, "@odata.type": "#Thing.v1_0_0.Thing"}))
        }
    }

    #[tokio::test]
    async fn expand_never_runs_more_than_max_concurrent_fetches_at_once() {
        let fetch = ConcurrencyTrackingFetch {
            in_flight: std::sync::atomic::AtomicUsize::new(0),
            peak: std::sync::atomic::AtomicUsize::new(0),
        };
        let members: Vec<Value> = (0..20)
            .map(|i| json!({"@odata.id": format!("/redfish/v1/Chassis/{i}")}))
            .collect();
        let mut body = json!({"Members": members});
        let mut status = StatusCode::OK;
        let query = Query {
            expand: Some(ExpandSpec { expand_type: ExpandType::NotLinks, levels: 1 }),
            ..Default::default()
        };
        run(&query, &mut status, &mut body, &fetch, None, false).await;
        assert!(
            fetch.peak.load(std::sync::atomic::Ordering::SeqCst) <= MAX_CONCURRENT_EXPAND,
            "expand fan-out must stay within the concurrency bound"
        );
        for member in body["Members"].as_array().unwrap() {
            assert_eq!(member["@odata.type"], "#Thing.v1_0_0.Thing");
        }
    }

    #[tokio::test]
    async fn top_and_skip_page_the_members_array() {
        let fetch = StaticFetch(Default::default());
        let mut body = json!({"Members": [1, 2, 3, 4, 5]});
        let mut status = StatusCode::OK;
        let query = Query {
            top: Some(2),
            skip: Some(1),
            ..Default::default()
        };
        run(&query, &mut status, &mut body, &fetch, None, false).await;
        assert_eq!(body["Members"], json!([2, 3]));
    }

    #[tokio::test]
    async fn top_skip_is_skipped_when_delegated() {
        let fetch = StaticFetch(Default::default());
        let mut body = json!({"Members": [1, 2, 3]});
        let before = body.clone();
        let mut status = StatusCode::OK;
        let query = Query {
            top: Some(1),
            ..Default::default()
        };
        run(&query, &mut status, &mut body, &fetch, None, true).await;
        assert_eq!(body, before);
    }

    #[tokio::test]
    async fn filter_retains_matching_members_and_updates_count() {
        let fetch = StaticFetch(Default::default());
        let mut body = json!({
            "Members@odata.count": 2,
            "Members": [{"Health": "OK"}, {"Health": "Warning"}],
        });
        let mut status = StatusCode::OK;
        let query = Query {
            filter: Some(crate::query::filter::parse("Health eq 'OK'").unwrap()),
            ..Default::default()
        };
        run(&query, &mut status, &mut body, &fetch, None, false).await;
        assert_eq!(body["Members"].as_array().unwrap().len(), 1);
        assert_eq!(body["Members@odata.count"], 1);
    }
}
