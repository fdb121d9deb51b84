//! # rendezvous
//!
//! Signaling server binary: loads configuration, installs logging and
//! metrics, and serves until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rendezvous_server::config::ServerConfig;
use rendezvous_server::logging::{LogFormat, init_subscriber};
use rendezvous_server::server::SignalServer;

/// Two-party WebRTC signaling server.
#[derive(Parser, Debug)]
#[command(name = "rendezvous", about = "Two-party WebRTC signaling server")]
struct Cli {
    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides config).
    #[arg(long)]
    port: Option<u16>,

    /// Maximum concurrent connections (overrides config).
    #[arg(long)]
    max_connections: Option<usize>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    /// Serve Prometheus metrics at `/metrics`.
    #[arg(long)]
    metrics: bool,
}

impl Cli {
    fn log_format(&self) -> LogFormat {
        if self.log_json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        }
    }

    /// Load the config file and environment, then apply flags on top.
    fn resolve_config(&self) -> Result<ServerConfig> {
        let mut config = ServerConfig::load(self.config.as_deref()).with_context(|| {
            match &self.config {
                Some(path) => format!("Failed to load config from {}", path.display()),
                None => "Failed to load config".to_string(),
            }
        })?;
        self.apply_to(&mut config);
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn apply_to(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(max) = self.max_connections {
            config.max_connections = max;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_subscriber(&args.log_level, args.log_format());

    let config = args.resolve_config()?;
    let mut server = SignalServer::new(config).context("Failed to start server")?;
    if args.metrics {
        let handle = rendezvous_server::metrics::install_recorder()
            .context("Failed to install metrics recorder")?;
        server = server.with_metrics(handle);
    }

    let addr = server.listen().await.context("Failed to bind server")?;
    tracing::info!("Signaling server listening on ws://{addr}/ws");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.shutdown_gracefully().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_flags() {
        let cli = Cli::try_parse_from(["rendezvous"]).unwrap();
        assert!(cli.config.is_none());
        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.log_format(), LogFormat::Compact);
        assert!(!cli.metrics);
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "rendezvous",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--max-connections",
            "5",
            "--log-json",
        ])
        .unwrap();
        let mut config = ServerConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_connections, 5);
        assert_eq!(cli.log_format(), LogFormat::Json);
    }

    #[test]
    fn absent_flags_keep_config() {
        let cli = Cli::try_parse_from(["rendezvous"]).unwrap();
        let mut config = ServerConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(config.port, 5000);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(Cli::try_parse_from(["rendezvous", "--port", "99999"]).is_err());
    }

    #[test]
    fn config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rendezvous.json");
        let body = serde_json::json!({"port": 7000, "max_connections": 3});
        std::fs::write(&path, body.to_string()).unwrap();

        let cli = Cli::try_parse_from([
            "rendezvous",
            "--config",
            path.to_str().unwrap(),
            "--max-connections",
            "4",
        ])
        .unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.max_connections, 4);
    }

    #[test]
    fn invalid_flag_value_fails_validation() {
        let cli = Cli::try_parse_from(["rendezvous", "--max-connections", "0"]).unwrap();
        let err = cli.resolve_config().unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn missing_config_file_is_reported() {
        let cli = Cli::try_parse_from(["rendezvous", "--config", "/nonexistent/r.json"]).unwrap();
        let err = cli.resolve_config().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/r.json"));
    }
}
