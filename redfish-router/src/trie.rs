//! The parameter trie itself: a node per path segment, literal children
//! keyed by exact text and up to one child per [`ParamType`] per node.
//!
//! Grounded in `crow::Trie` (`routing.h`): `Node::children`/`paramChildrens`,
//! `Trie::add`, and the backtracking `Trie::find` that tries a literal match
//! before each typed placeholder in turn and keeps the lowest rule id among
//! every branch that reaches a terminal node. The source's five
//! `find_child_node` pointer fields become a fixed-size `[Option<usize>; 5]`
//! array indexed by `ParamType as usize`.

use std::collections::HashMap;

use crate::error::RouterError;
use crate::id::RuleId;
use crate::param::{ParamType, RouteParams};
use crate::pattern::Segment;

/// What a terminal trie node resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrieTarget {
    Rule(RuleId),
    /// The URL matched a registered pattern's trailing-slash-stripped form;
    /// the caller should issue a 301 to the slash-terminated URL rather than
    /// dispatch directly.
    RedirectSlash(RuleId),
}

impl TrieTarget {
    fn tie_break_id(&self) -> usize {
        match self {
            TrieTarget::Rule(id) | TrieTarget::RedirectSlash(id) => id.get(),
        }
    }
}

#[derive(Debug, Default)]
struct Node {
    literal_children: HashMap<String, usize>,
    param_children: [Option<usize>; 5],
    target: Option<TrieTarget>,
}

/// A typed radix trie over `/`-delimited URL paths.
#[derive(Debug)]
pub struct Trie {
    nodes: Vec<Node>,
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl Trie {
    pub fn new() -> Self {
        Trie {
            nodes: vec![Node::default()],
        }
    }

    fn ensure_literal_child(&mut self, node_idx: usize, literal: &str) -> usize {
        if let Some(&idx) = self.nodes[node_idx].literal_children.get(literal) {
            return idx;
        }
        let new_idx = self.nodes.len();
        self.nodes.push(Node::default());
        self.nodes[node_idx]
            .literal_children
            .insert(literal.to_string(), new_idx);
        new_idx
    }

    fn ensure_param_child(&mut self, node_idx: usize, param_type: ParamType) -> usize {
        let slot = param_type as usize;
        if let Some(idx) = self.nodes[node_idx].param_children[slot] {
            return idx;
        }
        let new_idx = self.nodes.len();
        self.nodes.push(Node::default());
        self.nodes[node_idx].param_children[slot] = Some(new_idx);
        new_idx
    }

    /// Register `segments` (as already parsed from `pattern_text`, used only
    /// for the error message) pointing at `target`. Fails if a route already
    /// terminates at that exact node.
    pub fn add(
        &mut self,
        pattern_text: &str,
        segments: &[Segment],
        target: TrieTarget,
    ) -> Result<(), RouterError> {
        let mut node_idx = 0;
        for segment in segments {
            node_idx = match segment {
                Segment::Literal(lit) => self.ensure_literal_child(node_idx, lit),
                Segment::Param(param_type) => self.ensure_param_child(node_idx, *param_type),
            };
        }
        if self.nodes[node_idx].target.is_some() {
            return Err(RouterError::DuplicateRoute(pattern_text.to_string()));
        }
        self.nodes[node_idx].target = Some(target);
        Ok(())
    }

    /// Find the best match for `path`, a request path with no query string.
    /// Among every trie branch whose segments all match, the one whose
    /// target carries the lowest [`RuleId`] wins.
    pub fn find(&self, path: &str) -> (Option<TrieTarget>, RouteParams) {
        let trimmed = path.trim_start_matches('/');
        let segments: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };
        let mut best: Option<(usize, TrieTarget, RouteParams)> = None;
        self.find_rec(0, &segments, 0, &RouteParams::new(), &mut best);
        match best {
            Some((_, target, params)) => (Some(target), params),
            None => (None, RouteParams::new()),
        }
    }

    fn find_rec(
        &self,
        node_idx: usize,
        segments: &[&str],
        depth: usize,
        params: &RouteParams,
        best: &mut Option<(usize, TrieTarget, RouteParams)>,
    ) {
        let node = &self.nodes[node_idx];
        if depth == segments.len() {
            if let Some(target) = node.target {
                consider(best, target, params.clone());
            }
            return;
        }

        let segment = segments[depth];

        if let Some(&child_idx) = node.literal_children.get(segment) {
            self.find_rec(child_idx, segments, depth + 1, params, best);
        }

        for &param_type in ParamType::ORDER.iter() {
            let slot = param_type as usize;
            let Some(child_idx) = node.param_children[slot] else {
                continue;
            };

            if param_type == ParamType::Path {
                let remainder = segments[depth..].join("/");
                if remainder.is_empty() {
                    continue;
                }
                let mut extended = params.clone();
                extended.push(ParamType::Path, &remainder);
                if let Some(target) = self.nodes[child_idx].target {
                    consider(best, target, extended);
                }
                continue;
            }

            if !param_type.matches(segment) {
                continue;
            }
            let mut extended = params.clone();
            extended.push(param_type, segment);
            self.find_rec(child_idx, segments, depth + 1, &extended, best);
        }
    }
}

fn consider(
    best: &mut Option<(usize, TrieTarget, RouteParams)>,
    target: TrieTarget,
    params: RouteParams,
) {
    let id = target.tie_break_id();
    match best {
        Some((best_id, _, _)) if *best_id <= id => {}
        _ => *best = Some((id, target, params)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::parse;

    fn rule(id: usize) -> TrieTarget {
        TrieTarget::Rule(RuleId(id))
    }

    #[test]
    fn matches_literal_over_param_when_both_registered() {
        let mut trie = Trie::new();
        let literal = parse("/redfish/v1/Chassis/special").unwrap();
        let typed = parse("/redfish/v1/Chassis/<str>").unwrap();
        trie.add("/redfish/v1/Chassis/special", &literal.segments, rule(1)).unwrap();
        trie.add("/redfish/v1/Chassis/<str>", &typed.segments, rule(2)).unwrap();

        let (target, params) = trie.find("/redfish/v1/Chassis/special");
        assert_eq!(target, Some(rule(1)));
        assert!(params.is_empty());

        let (target, params) = trie.find("/redfish/v1/Chassis/other");
        assert_eq!(target, Some(rule(2)));
        assert_eq!(params.get(0).unwrap().as_str(), "other");
    }

    #[test]
    fn picks_lowest_rule_id_among_ambiguous_typed_branches() {
        let mut trie = Trie::new();
        let as_uint = parse("/redfish/v1/Systems/<uint>").unwrap();
        let as_str = parse("/redfish/v1/Systems/<str>").unwrap();
        // Register the string rule first with a lower id; a numeric segment
        // matches both branches, so the lower id must win regardless of
        // which placeholder type is more specific.
        trie.add("/redfish/v1/Systems/<str>", &as_str.segments, rule(1)).unwrap();
        trie.add("/redfish/v1/Systems/<uint>", &as_uint.segments, rule(2)).unwrap();

        let (target, _) = trie.find("/redfish/v1/Systems/1");
        assert_eq!(target, Some(rule(1)));
    }

    #[test]
    fn typed_segment_rejects_wrong_shaped_text() {
        let mut trie = Trie::new();
        let as_uint = parse("/redfish/v1/Systems/<uint>").unwrap();
        trie.add("/redfish/v1/Systems/<uint>", &as_uint.segments, rule(1)).unwrap();

        let (target, _) = trie.find("/redfish/v1/Systems/-5");
        assert_eq!(target, None);
    }

    #[test]
    fn path_placeholder_captures_remaining_segments() {
        let mut trie = Trie::new();
        let as_path = parse("/redfish/v1/JsonSchemas/<path>").unwrap();
        trie.add("/redfish/v1/JsonSchemas/<path>", &as_path.segments, rule(1))
            .unwrap();

        let (target, params) = trie.find("/redfish/v1/JsonSchemas/Chassis/v1/Chassis.json");
        assert_eq!(target, Some(rule(1)));
        assert_eq!(params.get(0).unwrap().as_str(), "Chassis/v1/Chassis.json");
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut trie = Trie::new();
        let segments = parse("/redfish/v1/Chassis").unwrap();
        trie.add("/redfish/v1/Chassis", &segments.segments, rule(1)).unwrap();
        let err = trie.add("/redfish/v1/Chassis", &segments.segments, rule(2)).unwrap_err();
        assert!(matches!(err, RouterError::DuplicateRoute(_)));
    }

    #[test]
    fn unmatched_path_returns_none() {
        let mut trie = Trie::new();
        let segments = parse("/redfish/v1/Chassis").unwrap();
        trie.add("/redfish/v1/Chassis", &segments.segments, rule(1)).unwrap();
        let (target, _) = trie.find("/redfish/v1/Systems");
        assert_eq!(target, None);
    }
}
