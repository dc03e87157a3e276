//! Self-signed TLS bootstrap and the hostname-watch task that regenerates
//! the certificate when the system hostname changes.
//!
//! Grounded in §6's "TLS key/cert files... auto-generated on first boot if
//! absent" and "hostname-watch task... regenerates the server cert when the
//! system hostname changes": `rcgen` generates the keypair, `axum-server`'s
//! `RustlsConfig` serves it and exposes `reload_from_pem_file` for the watch
//! task to call without restarting the listener.

use std::path::{Path, PathBuf};
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;

const HOSTNAME_FILE: &str = "/etc/hostname";
const HOSTNAME_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Write a fresh self-signed ECDSA certificate for `hostname` to `cert_path`/`key_path`.
fn generate_cert(hostname: &str, cert_path: &Path, key_path: &Path) -> std::io::Result<()> {
    let subject_alt_names = vec![hostname.to_string(), "localhost".to_string()];
    let cert = rcgen::generate_simple_self_signed(subject_alt_names)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;
    if let Some(parent) = cert_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(cert_path, cert.serialize_pem().map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?)?;
    std::fs::write(key_path, cert.serialize_private_key_pem())?;
    Ok(())
}

async fn read_hostname() -> String {
    tokio::fs::read_to_string(HOSTNAME_FILE)
        .await
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "localhost".to_string())
}

/// Load `RustlsConfig` from `cert_path`/`key_path`, generating a self-signed
/// pair first if neither file exists yet.
pub async fn bootstrap(cert_path: &Path, key_path: &Path) -> std::io::Result<RustlsConfig> {
    if !cert_path.exists() || !key_path.exists() {
        let hostname = read_hostname().await;
        tracing::info!(%hostname, cert = %cert_path.display(), "generating self-signed TLS certificate");
        generate_cert(&hostname, cert_path, key_path)?;
    }
    RustlsConfig::from_pem_file(cert_path, key_path).await
}

/// Poll `/etc/hostname` and regenerate the certificate in place (via
/// [`RustlsConfig::reload_from_pem_file`], so the listener never restarts)
/// whenever it changes from the value baked into the current certificate.
pub fn spawn_hostname_watch(config: RustlsConfig, cert_path: PathBuf, key_path: PathBuf) {
    tokio::spawn(async move {
        let mut current = read_hostname().await;
        let mut interval = tokio::time::interval(HOSTNAME_POLL_INTERVAL);
        loop {
            interval.tick().await;
            let hostname = read_hostname().await;
            if hostname == current {
                continue;
            }
            tracing::info!(old = %current, new = %hostname, "hostname changed, regenerating TLS certificate");
            if let Err(error) = generate_cert(&hostname, &cert_path, &key_path) {
                tracing::warn!(%error, "failed to regenerate TLS certificate for new hostname");
                continue;
            }
            if let Err(error) = config.reload_from_pem_file(&cert_path, &key_path).await {
                tracing::warn!(%error, "failed to reload TLS certificate after hostname change");
                continue;
            }
            current = hostname;
        }
    });
}
