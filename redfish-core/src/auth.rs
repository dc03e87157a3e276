//! The credential check `Dispatcher::session_for` needs for `Authorization:
//! Basic` requests. A full account/role model (usernames, role IDs, account
//! listings for `AccountService`) belongs to the binary crate that owns the
//! roster; this is deliberately the narrow seam the dispatcher needs out of
//! it — turn a username/password pair into the privileges they grant, or
//! `None`.

use redfish_data::PrivilegeSet;

pub trait CredentialStore: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> Option<PrivilegeSet>;
}
