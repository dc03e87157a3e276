//! A compile-time-parameterized URL matcher built on a typed radix trie.
//!
//! This crate is deliberately transport-agnostic: it knows nothing about
//! HTTP requests, JSON bodies, or async handler invocation. It answers one
//! question — "which registered rule, if any, does this path and method
//! resolve to, and what typed values did the URL's placeholders capture?" —
//! the way `crow::Router`/`crow::Trie` do in the original source this
//! design is adapted from.

mod error;
mod id;
mod param;
mod pattern;
mod rule;
mod trie;

pub mod router;

pub use error::RouterError;
pub use id::RuleId;
pub use param::{ParamType, ParamValue, RouteParams};
pub use pattern::Segment;
pub use router::{MatchOutcome, Router};
pub use rule::Rule;

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;
    use redfish_data::{AllowedMethods, PrivilegeSet};

    use crate::router::{MatchOutcome, Router};

    fn ident() -> impl Strategy<Value = String> {
        "[a-zA-Z][a-zA-Z0-9]{0,8}"
    }

    proptest! {
        /// Resolving the same path and method against the same validated
        /// router always returns the same outcome: the trie carries no
        /// hidden mutable state that `find` could observe.
        #[test]
        fn find_is_deterministic(segment_a in ident(), segment_b in ident(), query in ident()) {
            let mut router: Router<()> = Router::new();
            router
                .add(&format!("/redfish/v1/{segment_a}/{segment_b}/<str>"), AllowedMethods::GET, PrivilegeSet::LOGIN, ())
                .unwrap();
            router.validate().unwrap();

            let path = format!("/redfish/v1/{segment_a}/{segment_b}/{query}");
            let first = router.find(&path, AllowedMethods::GET).unwrap();
            let second = router.find(&path, AllowedMethods::GET).unwrap();
            prop_assert_eq!(first, second);
        }

        /// A `<uint>` placeholder only ever captures text that parses as a
        /// non-negative integer; anything else either falls through to a
        /// sibling rule or reports NotFound, never a bogus capture.
        #[test]
        fn uint_placeholder_only_captures_valid_uints(raw in "[0-9]{1,6}|-[0-9]{1,3}|[a-z]{1,6}") {
            let mut router: Router<()> = Router::new();
            router
                .add("/redfish/v1/Systems/<uint>", AllowedMethods::GET, PrivilegeSet::LOGIN, ())
                .unwrap();
            router.validate().unwrap();

            let outcome = router
                .find(&format!("/redfish/v1/Systems/{raw}"), AllowedMethods::GET)
                .unwrap();
            match outcome {
                MatchOutcome::Matched(_, params) => {
                    prop_assert!(params.get(0).unwrap().as_uint().is_some());
                    prop_assert!(raw.parse::<u64>().is_ok());
                }
                MatchOutcome::NotFound => {
                    prop_assert!(raw.parse::<u64>().is_err());
                }
                other => prop_assert!(false, "unexpected outcome {other:?}"),
            }
        }

        /// Registering `<pattern>/` and requesting the slash-stripped form
        /// always redirects, regardless of what the literal prefix is.
        #[test]
        fn trailing_slash_pattern_always_redirects_slashless_request(segment in ident()) {
            let mut router: Router<()> = Router::new();
            router
                .add(&format!("/redfish/v1/{segment}/"), AllowedMethods::GET, PrivilegeSet::LOGIN, ())
                .unwrap();
            router.validate().unwrap();

            let outcome = router
                .find(&format!("/redfish/v1/{segment}"), AllowedMethods::GET)
                .unwrap();
            prop_assert_eq!(outcome, MatchOutcome::RedirectSlash);
        }
    }
}
