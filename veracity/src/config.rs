//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The file path defaults to `config.yaml` but can be specified via
//! the `-f` flag or the `VERACITY_CONFIG` environment variable.
//!
//! Sources are merged in order (later overrides earlier):
//!
//! 1. YAML config file
//! 2. Environment variables prefixed with `VERACITY_` (nested values use
//!    double underscores, e.g. `VERACITY_WORKER__BUDGET_SECS=50`)
//! 3. `DATABASE_URL` - special case, overrides `database_url` if set

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "VERACITY_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// PostgreSQL connection string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Secret key for JWT session verification (required in production)
    pub secret_key: Option<String>,
    /// External detection service configuration
    pub detector: DetectorConfig,
    /// URL ingestion safety configuration
    pub safety: SafetyConfig,
    /// Background worker configuration
    pub worker: WorkerConfig,
    /// Session authentication configuration
    pub auth: AuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            secret_key: None,
            detector: DetectorConfig::default(),
            safety: SafetyConfig::default(),
            worker: WorkerConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

/// Connection settings for the external ml-service that produces composite
/// scores. The scoring algorithm itself is opaque to this layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Base URL of the detection service
    pub url: Url,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8100"
                .parse()
                .expect("default detector URL is valid"),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SafetyConfig {
    /// Maximum redirect hops followed during URL resolution
    pub max_redirect_hops: usize,
    /// Per-hop HEAD probe timeout in seconds
    pub probe_timeout_secs: u64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            max_redirect_hops: 5,
            probe_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// Run the scheduled submission pass inside the server process
    pub enabled: bool,
    /// Seconds between scheduled submission passes
    pub interval_secs: u64,
    /// Default batch size for the live submission pass (hard cap 10)
    pub submission_batch_size: usize,
    /// Default batch size for the explainability backfill pass (hard cap 50)
    pub backfill_batch_size: usize,
    /// Wall-clock budget per worker pass, in seconds. Checked before claiming
    /// each item; an in-flight item is always allowed to finish.
    pub budget_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            submission_batch_size: 5,
            backfill_batch_size: 10,
            budget_secs: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Name of the session cookie carrying the JWT
    pub session_cookie_name: String,
    /// Session token lifetime in seconds
    pub jwt_expiry_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "veracity_session".to_string(),
            jwt_expiry_secs: 24 * 3600,
        }
    }
}

impl Config {
    /// Load configuration from the YAML file and environment overrides.
    pub fn load(args: &Args) -> Result<Self, Error> {
        let mut config: Config = Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("VERACITY_").split("__"))
            .extract()
            .map_err(|e| Error::Internal {
                operation: format!("load configuration: {e}"),
            })?;

        // DATABASE_URL wins over everything for the connection string
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = Some(url);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.safety.max_redirect_hops == 0 {
            return Err(Error::BadRequest {
                message: "safety.max_redirect_hops must be at least 1".to_string(),
            });
        }
        if self.worker.budget_secs == 0 {
            return Err(Error::BadRequest {
                message: "worker.budget_secs must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.safety.max_redirect_hops, 5);
        assert_eq!(config.safety.probe_timeout_secs, 10);
        assert_eq!(config.worker.submission_batch_size, 5);
        assert_eq!(config.worker.backfill_batch_size, 10);
    }

    #[test]
    fn zero_hop_ceiling_is_rejected() {
        let config = Config {
            safety: SafetyConfig {
                max_redirect_hops: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
