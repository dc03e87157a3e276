//! The representative C9 handler set this demo registers: enough of a
//! route table to exercise every `redfish-core` pipeline stage end to end
//! (routing, privilege checks, conditional requests, `$expand`/`$select`,
//! session auth) without reimplementing the whole Redfish schema surface.

pub mod account_service;
pub mod chassis;
pub mod metadata;
pub mod odata;
pub mod service_root;
pub mod session_service;
pub mod systems;
