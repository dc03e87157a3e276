//! Builds the route table every incoming request is resolved against.
//!
//! One `router.add_with_params(...)` per endpoint, grounded in the
//! `get_mock_tree()` registration list (`example/src/main.rs`) but against
//! a typed trie instead of a `Tree` of `Node`s, and carrying the
//! `AllowedMethods`/`PrivilegeSet` pair each rule needs for C8's privilege
//! check instead of leaving authorization to the handler body. Each
//! handler's [`redfish_core::dispatch::Handler::expected_params`] is cross-
//! checked against its pattern's own placeholders at `validate()` time.

use std::sync::Arc;

use redfish_core::dispatch::Handler;
use redfish_core::session::SessionStore;
use redfish_data::{AllowedMethods, PrivilegeSet};
use redfish_router::Router;
use tokio::sync::RwLock;

use crate::handlers::{account_service, chassis, metadata, odata, service_root, session_service, systems};
use crate::users::UserStore;

const READ: AllowedMethods = AllowedMethods::GET.union(AllowedMethods::HEAD);

pub fn build(sessions: Arc<RwLock<SessionStore>>, users: Arc<dyn UserStore>) -> Router<Arc<dyn Handler>> {
    let mut router = Router::new();

    let mut add = |pattern: &str, methods: AllowedMethods, privileges: PrivilegeSet, handler: Arc<dyn Handler>| {
        let expected_params = handler.expected_params();
        router
            .add_with_params(pattern, methods, privileges, expected_params, handler)
            .unwrap_or_else(|err| panic!("invalid route {pattern}: {err}"));
    };

    add("/redfish/v1/", READ, PrivilegeSet::LOGIN, Arc::new(service_root::ServiceRoot));
    add("/redfish/v1/odata", READ, PrivilegeSet::LOGIN, Arc::new(odata::ODataServiceDocument));
    add("/redfish/v1/$metadata", READ, PrivilegeSet::LOGIN, Arc::new(metadata::Metadata));

    add("/redfish/v1/Chassis", READ, PrivilegeSet::LOGIN, Arc::new(chassis::ChassisCollection));
    add("/redfish/v1/Chassis/<str>", READ, PrivilegeSet::LOGIN, Arc::new(chassis::ChassisMember));

    add("/redfish/v1/Systems", READ, PrivilegeSet::LOGIN, Arc::new(systems::SystemsCollection));

    add(
        "/redfish/v1/SessionService",
        READ,
        PrivilegeSet::LOGIN,
        Arc::new(session_service::SessionServiceRoot),
    );
    add(
        "/redfish/v1/SessionService/Sessions",
        READ.union(AllowedMethods::POST),
        PrivilegeSet::empty(),
        Arc::new(session_service::Sessions::new(sessions.clone(), users.clone())),
    );
    add(
        "/redfish/v1/SessionService/Sessions/<str>",
        READ.union(AllowedMethods::DELETE),
        PrivilegeSet::LOGIN,
        Arc::new(session_service::SessionMember::new(sessions.clone())),
    );

    add(
        "/redfish/v1/AccountService",
        READ,
        PrivilegeSet::CONFIGURE_USERS,
        Arc::new(account_service::AccountServiceRoot),
    );
    add(
        "/redfish/v1/AccountService/Accounts",
        READ,
        PrivilegeSet::CONFIGURE_USERS,
        Arc::new(account_service::Accounts::new(users.clone())),
    );
    add(
        "/redfish/v1/AccountService/Accounts/<str>",
        READ,
        PrivilegeSet::CONFIGURE_USERS,
        Arc::new(account_service::AccountMember::new(users.clone())),
    );
    add(
        "/redfish/v1/AccountService/Roles",
        READ,
        PrivilegeSet::CONFIGURE_USERS,
        Arc::new(account_service::Roles),
    );
    add(
        "/redfish/v1/AccountService/Roles/<str>",
        READ,
        PrivilegeSet::CONFIGURE_USERS,
        Arc::new(account_service::RoleMember),
    );

    router.validate().expect("route table must validate at startup");
    router
}
