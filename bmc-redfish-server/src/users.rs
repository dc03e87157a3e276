//! Local account store backing `SessionService`'s login endpoint.
//!
//! Out of scope per `redfish-core`'s bus facade: `Bus` only reads/writes
//! object-broker state, so something has to own credential verification.
//! This is a minimal in-memory/dev stand-in — a production deployment
//! would back `UserStore` with the same account data `AccountService`
//! exposes over the bus instead of a process-local map.

use std::collections::HashMap;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use redfish_data::PrivilegeSet;

pub struct Account {
    pub username: String,
    pub password_hash: String,
    pub role_id: String,
    pub privileges: PrivilegeSet,
}

pub trait UserStore: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> Option<&Account>;
    fn accounts(&self) -> Vec<&Account>;
}

/// A fixed set of accounts, hashed once at startup. Good enough for the
/// demo service this crate ships; a persistent store would load these
/// from disk or from the bus instead of `new()`'s hardcoded roster.
pub struct InMemoryUserStore {
    accounts: HashMap<String, Account>,
}

impl InMemoryUserStore {
    pub fn new(roster: &[(&str, &str, &str, PrivilegeSet)]) -> Self {
        let hasher = Argon2::default();
        let mut accounts = HashMap::new();
        for (username, password, role_id, privileges) in roster {
            let salt = SaltString::generate(&mut rand_core_from_username(username));
            let password_hash = hasher
                .hash_password(password.as_bytes(), &salt)
                .expect("argon2 hashing a bounded-length demo password never fails")
                .to_string();
            accounts.insert(
                username.to_string(),
                Account {
                    username: username.to_string(),
                    password_hash,
                    role_id: role_id.to_string(),
                    privileges: *privileges,
                },
            );
        }
        InMemoryUserStore { accounts }
    }

    /// The default roster this demo ships: one administrator account.
    pub fn default_roster() -> Self {
        Self::new(&[(
            "admin",
            "admin-password",
            "Administrator",
            PrivilegeSet::LOGIN
                | PrivilegeSet::CONFIGURE_MANAGER
                | PrivilegeSet::CONFIGURE_USERS
                | PrivilegeSet::CONFIGURE_COMPONENTS
                | PrivilegeSet::CONFIGURE_SELF,
        )])
    }
}

impl UserStore for InMemoryUserStore {
    fn authenticate(&self, username: &str, password: &str) -> Option<&Account> {
        let account = self.accounts.get(username)?;
        let parsed = PasswordHash::new(&account.password_hash).ok()?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .ok()?;
        Some(account)
    }

    fn accounts(&self) -> Vec<&Account> {
        self.accounts.values().collect()
    }
}

/// Backs `Dispatcher::session_for`'s `Authorization: Basic` path with the
/// same roster `SessionService`'s token login already checks against.
impl redfish_core::auth::CredentialStore for InMemoryUserStore {
    fn verify(&self, username: &str, password: &str) -> Option<PrivilegeSet> {
        UserStore::authenticate(self, username, password).map(|account| account.privileges)
    }
}

/// `SaltString::generate` wants an `rand_core::CryptoRngCore`; seeding
/// deterministically from the username would weaken the salt, so this
/// pulls entropy from the OS exactly like `SaltString::generate`'s own
/// documented default, just without requiring the caller to thread a
/// shared RNG through `new`'s per-account loop.
fn rand_core_from_username(_username: &str) -> impl argon2::password_hash::rand_core::CryptoRngCore {
    argon2::password_hash::rand_core::OsRng
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticate_accepts_correct_password_and_rejects_wrong_one() {
        let store = InMemoryUserStore::new(&[("admin", "hunter2", "Administrator", PrivilegeSet::LOGIN)]);
        assert!(store.authenticate("admin", "hunter2").is_some());
        assert!(store.authenticate("admin", "wrong").is_none());
        assert!(store.authenticate("nobody", "hunter2").is_none());
    }
}
