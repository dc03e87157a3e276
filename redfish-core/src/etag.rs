//! ETag computation: a SHA-256 hash of the canonical JSON body, rendered as
//! a weak-free quoted entity tag via the `etag` crate `redfish-axum` already
//! depended on (its `Cargo.toml` pulls it in but the snapshotted `lib.rs`
//! never used it — we give it a job).

use etag::EntityTag;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Keys whose values change on every read (timestamps, uptime counters) and
/// so are excluded from the hash; otherwise a resource's ETag would never
/// stabilize. Grounded in §6: "optionally excluding volatile keys (e.g.
/// `DateTime`)".
const VOLATILE_KEYS: &[&str] = &["DateTime", "Oem.CurrentTime"];

fn hash_stable(value: &Value, hasher: &mut Sha256) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                if VOLATILE_KEYS.contains(&key.as_str()) {
                    continue;
                }
                hasher.update(key.as_bytes());
                hash_stable(val, hasher);
            }
        }
        Value::Array(items) => {
            for item in items {
                hash_stable(item, hasher);
            }
        }
        other => {
            hasher.update(other.to_string().as_bytes());
        }
    }
}

/// Compute the ETag for `body`, quoted per RFC 7232.
pub fn compute(body: &Value) -> String {
    let mut hasher = Sha256::new();
    hash_stable(body, &mut hasher);
    let digest = hasher.finalize();
    EntityTag::new(false, &format!("{:x}", digest)).to_string()
}

/// Compare a client-supplied `If-Match`/`If-None-Match` value against a
/// computed ETag. `*` always matches an existing resource.
pub fn matches(client_value: &str, computed: &str) -> bool {
    client_value.trim() == "*" || client_value.trim() == computed
}
