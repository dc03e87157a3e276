//! A registered route: its pattern, allowed methods, required privileges,
//! and the handler it dispatches to.
//!
//! Grounded in `crow::DynamicRule`/`TaggedRule` (`routing.h`), which bundle
//! a URL rule with its HTTP method bitmask and a type-erased handler; we
//! drop the compile-time `TaggedRule<Args...>` split since Rust handlers are
//! driven by a single [`crate::param::RouteParams`] value at the dispatch
//! boundary instead of a template parameter pack.

use redfish_data::{AllowedMethods, PrivilegeSet};

use crate::id::RuleId;
use crate::param::ParamType;

/// One registered route, generic over the handler type the embedding crate
/// chooses (typically a boxed `dyn Fn`/`dyn Handler` trait object).
pub struct Rule<H> {
    pub id: RuleId,
    pub pattern: String,
    pub methods: AllowedMethods,
    pub privileges: PrivilegeSet,
    pub param_types: Vec<ParamType>,
    /// What the handler itself declared it expects, checked against
    /// `param_types` at [`crate::router::Router::validate`] time. Equal to
    /// `param_types` for routes registered through `add`/`add_named`, which
    /// don't ask the handler to declare anything.
    pub expected_params: Vec<ParamType>,
    pub name: Option<String>,
    pub handler: H,
}

impl<H> Rule<H> {
    pub fn matches_method(&self, method: AllowedMethods) -> bool {
        self.methods.contains(method)
    }
}
