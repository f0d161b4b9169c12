//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── server: ServerConfig         # Host, port, shutdown
//! ├── middleware: MiddlewareConfig # CORS, body limit, timeouts
//! ├── service: ServiceConfig       # Content root and engine tuning
//! └── log_format: LogFormat        # Text or JSON logs
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.

mod middleware;
mod server;

use std::process;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use contree_server::service::ServiceConfig;
pub use middleware::MiddlewareConfig;
use serde::{Deserialize, Serialize};
pub use server::ServerConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "contree")]
#[command(about = "Filesystem-backed content tree server")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// HTTP middleware configuration (CORS, body limit, timeouts).
    #[clap(flatten)]
    pub middleware: MiddlewareConfig,

    /// Content tree configuration.
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded first so that clap's `env` fallbacks see it.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with `RUST_LOG` filtering, defaulting to `info`.
    pub fn init_tracing(&self) -> anyhow::Result<()> {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(filter);

        match self.log_format {
            LogFormat::Text => registry.with(fmt::layer()).try_init(),
            LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        }
        .context("failed to initialize tracing")
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;
        self.middleware
            .validate()
            .context("invalid middleware configuration")?;
        self.service
            .validate()
            .context("invalid service configuration")?;
        Ok(())
    }

    /// Logs configuration at startup.
    pub fn log(&self) {
        Self::log_build_info();
        self.server.log();
        self.middleware.log();

        let content = &self.service.content;
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            root = %content.root.display(),
            backup_on_update = content.backup_on_update,
            max_walk_depth = content.max_walk_depth,
            walk_error_policy = %content.walk_error_policy,
            lock_stripes = content.lock_stripes,
            "Content tree configuration"
        );
    }

    fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::path::Path;

    use contree_core::WalkErrorPolicy;

    use super::*;

    #[test]
    fn defaults_parse_and_validate() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["contree"])?;

        assert_eq!(cli.server.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(cli.server.port, 3000);
        assert_eq!(cli.service.content.root, Path::new("./content"));
        assert!(cli.service.content.backup_on_update);
        assert_eq!(cli.log_format, LogFormat::Text);
        cli.validate()?;
        Ok(())
    }

    #[test]
    fn flags_reach_every_group() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "contree",
            "--port",
            "8080",
            "--content-root",
            "/srv/site",
            "--backup-on-update",
            "false",
            "--walk-error-policy",
            "abort",
            "--request-timeout",
            "5",
            "--log-format",
            "json",
        ])?;

        assert_eq!(cli.server.port, 8080);
        assert_eq!(cli.service.content.root, Path::new("/srv/site"));
        assert!(!cli.service.content.backup_on_update);
        assert_eq!(cli.service.content.walk_error_policy, WalkErrorPolicy::Abort);
        assert_eq!(cli.middleware.recovery.request_timeout, 5);
        assert_eq!(cli.log_format, LogFormat::Json);
        Ok(())
    }

    #[test]
    fn invalid_groups_fail_validation() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["contree", "--max-walk-depth", "0"])?;
        assert!(cli.validate().is_err());

        let cli = Cli::try_parse_from(["contree", "--port", "80"])?;
        assert!(cli.validate().is_err());
        Ok(())
    }
}
