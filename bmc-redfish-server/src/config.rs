//! Startup configuration: command-line flags layered over an optional TOML
//! file, the way a small service config usually looks once it outgrows
//! "just flags" — flags always win so an operator can override one knob
//! without editing the file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "bmc-redfish-server")]
#[command(about = "Redfish-conformant BMC management service", long_about = None)]
pub struct Cli {
    /// Path to a TOML config file; missing fields fall back to defaults.
    #[arg(long, default_value = "bmc-redfish-server.toml")]
    pub config: PathBuf,

    #[arg(long)]
    pub listen: Option<SocketAddr>,

    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    #[arg(long)]
    pub tls_key: Option<PathBuf>,

    #[arg(long)]
    pub session_store: Option<PathBuf>,

    /// Disable the `$expand` query parameter, matching `redfish-core`'s
    /// `expand` cargo feature gate.
    #[arg(long)]
    pub no_expand: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct FileConfig {
    listen: Option<SocketAddr>,
    tls_cert: Option<PathBuf>,
    tls_key: Option<PathBuf>,
    session_store: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub tls_cert: PathBuf,
    pub tls_key: PathBuf,
    pub session_store: PathBuf,
    pub expand_enabled: bool,
}

impl Config {
    pub async fn load(cli: Cli) -> std::io::Result<Config> {
        let file = read_file_config(&cli.config).await?;
        Ok(Config {
            listen: cli
                .listen
                .or(file.listen)
                .unwrap_or_else(|| "0.0.0.0:8443".parse().unwrap()),
            tls_cert: cli
                .tls_cert
                .or(file.tls_cert)
                .unwrap_or_else(|| PathBuf::from("tls/server.crt")),
            tls_key: cli
                .tls_key
                .or(file.tls_key)
                .unwrap_or_else(|| PathBuf::from("tls/server.key")),
            session_store: cli
                .session_store
                .or(file.session_store)
                .unwrap_or_else(|| PathBuf::from("sessions.jsonl")),
            expand_enabled: !cli.no_expand,
        })
    }
}

async fn read_file_config(path: &Path) -> std::io::Result<FileConfig> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => {
            toml::from_str(&contents).map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(err) => Err(err),
    }
}
