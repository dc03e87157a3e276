//! The route table: registers [`Rule`]s into a [`Trie`], validates the
//! table once at startup, and resolves one request at a time into a
//! [`MatchOutcome`].
//!
//! Grounded in `crow::Router` (`routing.h`): `internalAddRuleObject`'s
//! trailing-slash double-registration, `Router::validate()`'s rule sanity
//! pass, and `Router::handle()`'s match-then-method-check sequence that
//! this crate's dispatcher-facing crate turns into a concrete HTTP
//! response.

use redfish_data::{AllowedMethods, PrivilegeSet};

use crate::error::RouterError;
use crate::id::RuleId;
use crate::param::RouteParams;
use crate::pattern::{self, Segment};
use crate::rule::Rule;
use crate::trie::{Trie, TrieTarget};

/// The result of resolving a request path and method against the route
/// table.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// `rule` accepts this method; `params` are the typed values extracted
    /// from the URL in pattern order.
    Matched(RuleId, RouteParams),
    /// The path matched a registered pattern, but not with this method.
    /// Callers should answer 405 with an `Allow` header built from the
    /// carried [`AllowedMethods`].
    MethodNotAllowed(RuleId, AllowedMethods),
    /// The path matched a registered pattern's trailing slash stripped;
    /// callers should answer 301 to the path with `/` appended.
    RedirectSlash,
    NotFound,
}

/// A typed-trie route table, generic over the handler type `H` stored per
/// [`Rule`].
pub struct Router<H> {
    trie: Trie,
    rules: Vec<Rule<H>>,
    validated: bool,
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Router<H> {
    pub fn new() -> Self {
        Router {
            trie: Trie::new(),
            rules: Vec::new(),
            validated: false,
        }
    }

    /// Register a route. If `pattern` ends in `/`, the slash-stripped form
    /// is also registered, resolving to [`MatchOutcome::RedirectSlash`].
    ///
    /// The handler isn't asked to declare an expected parameter list here,
    /// so [`Router::validate`] checks the route against itself (always
    /// passes); use [`Router::add_with_params`] to get a real cross-check.
    pub fn add(
        &mut self,
        pattern: &str,
        methods: AllowedMethods,
        privileges: PrivilegeSet,
        handler: H,
    ) -> Result<RuleId, RouterError> {
        self.add_named(pattern, methods, privileges, None, handler)
    }

    pub fn add_named(
        &mut self,
        pattern: &str,
        methods: AllowedMethods,
        privileges: PrivilegeSet,
        name: Option<String>,
        handler: H,
    ) -> Result<RuleId, RouterError> {
        self.add_named_with_params(pattern, methods, privileges, name, None, handler)
    }

    /// Register a route whose handler declares the parameter types it
    /// expects, independently of the pattern's own placeholders.
    /// [`Router::validate`] cross-checks the two lists and fails the whole
    /// table if they disagree, catching a handler wired to the wrong
    /// pattern before the first request is served.
    pub fn add_with_params(
        &mut self,
        pattern: &str,
        methods: AllowedMethods,
        privileges: PrivilegeSet,
        expected_params: &[crate::param::ParamType],
        handler: H,
    ) -> Result<RuleId, RouterError> {
        self.add_named_with_params(pattern, methods, privileges, None, Some(expected_params.to_vec()), handler)
    }

    fn add_named_with_params(
        &mut self,
        pattern: &str,
        methods: AllowedMethods,
        privileges: PrivilegeSet,
        name: Option<String>,
        expected_params: Option<Vec<crate::param::ParamType>>,
        handler: H,
    ) -> Result<RuleId, RouterError> {
        let parsed = pattern::parse(pattern)?;
        let param_types = pattern::param_types(&parsed.segments);
        let id = RuleId(self.rules.len() + 1);

        let mut full_segments = parsed.segments.clone();
        if parsed.has_trailing_slash {
            full_segments.push(Segment::Literal(String::new()));
        }
        self.trie.add(pattern, &full_segments, TrieTarget::Rule(id))?;

        if parsed.has_trailing_slash {
            let trimmed_pattern = pattern.trim_end_matches('/');
            self.trie
                .add(trimmed_pattern, &parsed.segments, TrieTarget::RedirectSlash(id))?;
        }

        let expected_params = expected_params.unwrap_or_else(|| param_types.clone());
        self.rules.push(Rule {
            id,
            pattern: pattern.to_string(),
            methods,
            privileges,
            param_types,
            expected_params,
            name,
            handler,
        });
        self.validated = false;
        Ok(id)
    }

    /// Must be called once, after every route is registered and before the
    /// first [`Router::find`]. Fails if any rule was registered with no
    /// methods bound to it (which would otherwise be an unreachable route
    /// that always answers 405), or if a handler's declared parameter list
    /// doesn't match the arity/type order its pattern actually produces.
    pub fn validate(&mut self) -> Result<(), RouterError> {
        for rule in &self.rules {
            if rule.methods.is_empty() {
                return Err(RouterError::MissingHandler(rule.pattern.clone()));
            }
            if rule.expected_params.len() != rule.param_types.len() {
                return Err(RouterError::HandlerArityMismatch(
                    rule.pattern.clone(),
                    rule.expected_params.len(),
                    rule.param_types.len(),
                ));
            }
            for (index, (expected, actual)) in rule.expected_params.iter().zip(&rule.param_types).enumerate() {
                if expected != actual {
                    return Err(RouterError::HandlerTypeMismatch(
                        rule.pattern.clone(),
                        index,
                        *expected,
                        *actual,
                    ));
                }
            }
        }
        self.validated = true;
        Ok(())
    }

    pub fn find(&self, path: &str, method: AllowedMethods) -> Result<MatchOutcome, RouterError> {
        if !self.validated {
            return Err(RouterError::NotValidated);
        }
        let (target, params) = self.trie.find(path);
        Ok(match target {
            None => MatchOutcome::NotFound,
            Some(TrieTarget::RedirectSlash(_)) => MatchOutcome::RedirectSlash,
            Some(TrieTarget::Rule(id)) => {
                let rule = self.rule(id);
                if rule.matches_method(method) {
                    MatchOutcome::Matched(id, params)
                } else {
                    MatchOutcome::MethodNotAllowed(id, rule.methods)
                }
            }
        })
    }

    pub fn rule(&self, id: RuleId) -> &Rule<H> {
        &self.rules[id.get() - 1]
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule<H>> {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router_with(patterns: &[(&str, AllowedMethods)]) -> Router<&'static str> {
        let mut router = Router::new();
        for (pattern, methods) in patterns {
            router
                .add(pattern, *methods, PrivilegeSet::LOGIN, "handler")
                .unwrap();
        }
        router.validate().unwrap();
        router
    }

    #[test]
    fn unvalidated_router_rejects_find() {
        let mut router: Router<&'static str> = Router::new();
        router
            .add("/redfish/v1/Chassis", AllowedMethods::GET, PrivilegeSet::LOGIN, "h")
            .unwrap();
        let err = router.find("/redfish/v1/Chassis", AllowedMethods::GET).unwrap_err();
        assert_eq!(err, RouterError::NotValidated);
    }

    #[test]
    fn matched_route_returns_rule_id_and_params() {
        let router = router_with(&[("/redfish/v1/Chassis/<str>", AllowedMethods::GET)]);
        let outcome = router.find("/redfish/v1/Chassis/1U", AllowedMethods::GET).unwrap();
        match outcome {
            MatchOutcome::Matched(id, params) => {
                assert_eq!(router.rule(id).pattern, "/redfish/v1/Chassis/<str>");
                assert_eq!(params.get(0).unwrap().as_str(), "1U");
            }
            other => panic!("expected Matched, got {other:?}"),
        }
    }

    #[test]
    fn wrong_method_is_reported_as_method_not_allowed() {
        let router = router_with(&[(
            "/redfish/v1/Chassis",
            AllowedMethods::GET | AllowedMethods::HEAD,
        )]);
        let outcome = router.find("/redfish/v1/Chassis", AllowedMethods::POST).unwrap();
        match outcome {
            MatchOutcome::MethodNotAllowed(_, allowed) => {
                assert_eq!(allowed, AllowedMethods::GET | AllowedMethods::HEAD);
            }
            other => panic!("expected MethodNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn trailing_slash_pattern_redirects_slashless_request() {
        let router = router_with(&[("/redfish/v1/Chassis/", AllowedMethods::GET)]);
        let outcome = router.find("/redfish/v1/Chassis", AllowedMethods::GET).unwrap();
        assert_eq!(outcome, MatchOutcome::RedirectSlash);

        let outcome = router.find("/redfish/v1/Chassis/", AllowedMethods::GET).unwrap();
        assert!(matches!(outcome, MatchOutcome::Matched(_, _)));
    }

    #[test]
    fn unknown_path_is_not_found() {
        let router = router_with(&[("/redfish/v1/Chassis", AllowedMethods::GET)]);
        let outcome = router.find("/redfish/v1/Systems", AllowedMethods::GET).unwrap();
        assert_eq!(outcome, MatchOutcome::NotFound);
    }

    #[test]
    fn validate_rejects_rule_with_no_methods() {
        let mut router: Router<&'static str> = Router::new();
        router
            .add("/redfish/v1/Chassis", AllowedMethods::empty(), PrivilegeSet::LOGIN, "h")
            .unwrap();
        let err = router.validate().unwrap_err();
        assert!(matches!(err, RouterError::MissingHandler(_)));
    }

    #[test]
    fn validate_rejects_handler_declaring_the_wrong_arity() {
        let mut router: Router<&'static str> = Router::new();
        router
            .add_with_params(
                "/redfish/v1/Chassis/<str>",
                AllowedMethods::GET,
                PrivilegeSet::LOGIN,
                &[],
                "h",
            )
            .unwrap();
        let err = router.validate().unwrap_err();
        assert_eq!(err, RouterError::HandlerArityMismatch("/redfish/v1/Chassis/<str>".into(), 0, 1));
    }

    #[test]
    fn validate_rejects_handler_declaring_the_wrong_type() {
        use crate::param::ParamType;

        let mut router: Router<&'static str> = Router::new();
        router
            .add_with_params(
                "/redfish/v1/Chassis/<uint>",
                AllowedMethods::GET,
                PrivilegeSet::LOGIN,
                &[ParamType::Str],
                "h",
            )
            .unwrap();
        let err = router.validate().unwrap_err();
        assert_eq!(
            err,
            RouterError::HandlerTypeMismatch("/redfish/v1/Chassis/<uint>".into(), 0, ParamType::Str, ParamType::Uint)
        );
    }

    #[test]
    fn validate_accepts_handler_declaring_matching_params() {
        use crate::param::ParamType;

        let mut router: Router<&'static str> = Router::new();
        router
            .add_with_params(
                "/redfish/v1/Chassis/<str>",
                AllowedMethods::GET,
                PrivilegeSet::LOGIN,
                &[ParamType::Str],
                "h",
            )
            .unwrap();
        router.validate().unwrap();
    }
}
