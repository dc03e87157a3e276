//! The session store: authenticated tokens and the privileges they carry.
//!
//! Grounded in `redfish-axum`'s `Session`/`AppState.sessions`
//! (`Vec<Session>` behind a `std::sync::RwLock`), generalized to a
//! `HashMap` keyed by token and to carry a [`PrivilegeSet`] rather than just
//! a username, since C8's privilege check (§4.6) needs it. Persistence to a
//! newline-delimited JSON file is new: `redfish-axum` never wrote sessions to
//! disk, but §6 calls out a session store that survives a restart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use redfish_data::PrivilegeSet;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub privileges: PrivilegeSetWire,
    pub uri: String,
    pub client_ip: String,
}

/// [`PrivilegeSet`] has no serde impl of its own (it's a bitflags type from
/// another crate); store its bits and convert at the edges.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivilegeSetWire(pub u8);

impl From<PrivilegeSet> for PrivilegeSetWire {
    fn from(value: PrivilegeSet) -> Self {
        PrivilegeSetWire(value.bits())
    }
}

impl From<PrivilegeSetWire> for PrivilegeSet {
    fn from(value: PrivilegeSetWire) -> Self {
        PrivilegeSet::from_bits_truncate(value.0)
    }
}

/// All live sessions, persisted as one JSON object per line in
/// `path` so a restart doesn't log every user out.
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    path: Option<PathBuf>,
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore {
            sessions: HashMap::new(),
            path: None,
        }
    }

    /// Load existing sessions from `path` (if it exists) and remember the
    /// path so future mutations persist back to it.
    pub async fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut sessions = HashMap::new();
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                for line in contents.lines().filter(|l| !l.trim().is_empty()) {
                    if let Ok(session) = serde_json::from_str::<Session>(line) {
                        sessions.insert(session.token.clone(), session);
                    } else {
                        tracing::warn!(path = %path.display(), "ignoring malformed session store line");
                    }
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        Ok(SessionStore {
            sessions,
            path: Some(path),
        })
    }

    pub fn create(
        &mut self,
        username: impl Into<String>,
        privileges: PrivilegeSet,
        uri: impl Into<String>,
        client_ip: impl Into<String>,
    ) -> Session {
        let session = Session {
            token: Uuid::new_v4().as_simple().to_string(),
            username: username.into(),
            privileges: privileges.into(),
            uri: uri.into(),
            client_ip: client_ip.into(),
        };
        self.sessions.insert(session.token.clone(), session.clone());
        session
    }

    pub fn get(&self, token: &str) -> Option<&Session> {
        self.sessions.get(token)
    }

    pub fn all(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn uris(&self) -> Vec<String> {
        self.sessions.values().map(|session| session.uri.clone()).collect()
    }

    pub fn remove_by_uri(&mut self, uri: &str) -> Option<Session> {
        let token = self
            .sessions
            .values()
            .find(|session| session.uri == uri)
            .map(|session| session.token.clone())?;
        self.sessions.remove(&token)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Append-only rewrite of the backing file: the store is small enough
    /// (bounded by `SessionService.MaxSessions`) that a full rewrite per
    /// mutation is simpler than maintaining a true append log.
    ///
    /// Each line is a live `X-Auth-Token` in the clear, so the file is
    /// created `0600` rather than inheriting the process umask — a reader
    /// of this file can replay every session in it.
    pub async fn persist(&self) -> std::io::Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        let mut contents = String::new();
        for session in self.sessions.values() {
            contents.push_str(&serde_json::to_string(session)?);
            contents.push('\n');
        }
        let mut open_options = tokio::fs::OpenOptions::new();
        open_options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        open_options.mode(0o600);
        let mut file = open_options.open(path).await?;
        file.write_all(contents.as_bytes()).await?;
        Ok(())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get_round_trips_privileges() {
        let mut store = SessionStore::new();
        let session = store.create(
            "admin",
            PrivilegeSet::LOGIN | PrivilegeSet::CONFIGURE_MANAGER,
            "/redfish/v1/SessionService/Sessions/1",
            "127.0.0.1",
        );
        let fetched = store.get(&session.token).unwrap();
        let privileges: PrivilegeSet = fetched.privileges.into();
        assert!(privileges.contains(PrivilegeSet::CONFIGURE_MANAGER));
    }

    #[tokio::test]
    async fn persist_and_reload_round_trips_sessions() {
        let dir = std::env::temp_dir().join(format!("redfish-session-test-{}", Uuid::new_v4()));
        let mut store = SessionStore::new();
        store.create("admin", PrivilegeSet::LOGIN, "/redfish/v1/SessionService/Sessions/1", "127.0.0.1");
        store.path = Some(dir.clone());
        store.persist().await.unwrap();

        let reloaded = SessionStore::load(&dir).await.unwrap();
        assert_eq!(reloaded.len(), 1);
        let _ = tokio::fs::remove_file(&dir).await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn persisted_store_is_not_world_or_group_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("redfish-session-perms-test-{}", Uuid::new_v4()));
        let mut store = SessionStore::new();
        store.create("admin", PrivilegeSet::LOGIN, "/redfish/v1/SessionService/Sessions/1", "127.0.0.1");
        store.path = Some(dir.clone());
        store.persist().await.unwrap();

        let mode = tokio::fs::metadata(&dir).await.unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600, "session store must not be group/world readable");
        let _ = tokio::fs::remove_file(&dir).await;
    }
}
