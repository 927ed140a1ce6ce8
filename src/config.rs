//! Configuration module for Wavegate.
//!
//! Loads configuration from environment variables and validates it once at
//! startup. Handlers never re-read the environment.

use std::env;

use thiserror::Error;
use url::Url;

use crate::directory::ShufflePolicy;

/// Well-known SRV name advertising the directory API replicas.
pub const DEFAULT_DIRECTORY_SERVICE: &str = "_api._tcp.radio-browser.info";

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {name}: {value:?} is not a valid URL")]
    InvalidUrl { name: &'static str, value: String },
    #[error("invalid {name}: {value:?} (expected \"random\" or \"tiered\")")]
    InvalidPolicy { name: &'static str, value: String },
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Base URL of the upstream operations service, if configured.
    ///
    /// Routes that need it answer with a 500 error envelope when absent.
    pub ops_base_url: Option<Url>,
    /// Bearer token for admin-gated upstream endpoints.
    pub ops_admin_token: Option<String>,
    /// SRV service name used to discover directory replicas.
    pub directory_service: String,
    /// How discovered replicas are ordered before failover.
    pub shuffle_policy: ShufflePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            ops_base_url: None,
            ops_admin_token: None,
            directory_service: DEFAULT_DIRECTORY_SERVICE.to_string(),
            shuffle_policy: ShufflePolicy::FullyRandom,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `WAVEGATE_HTTP_PORT`: HTTP port (default: 8080)
    /// - `WAVEGATE_OPS_BASE_URL`: upstream operations service base URL
    /// - `WAVEGATE_OPS_ADMIN_TOKEN`: bearer token for admin-gated endpoints
    /// - `WAVEGATE_DIRECTORY_SERVICE`: SRV name for directory discovery
    /// - `WAVEGATE_SHUFFLE_POLICY`: "random" (default) or "tiered"
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Ok(port_str) = env::var("WAVEGATE_HTTP_PORT") {
            if let Ok(port) = port_str.parse() {
                cfg.http_port = port;
            }
        }

        if let Ok(base) = env::var("WAVEGATE_OPS_BASE_URL") {
            let parsed = Url::parse(&base).map_err(|_| ConfigError::InvalidUrl {
                name: "WAVEGATE_OPS_BASE_URL",
                value: base.clone(),
            })?;
            cfg.ops_base_url = Some(parsed);
        }

        if let Ok(token) = env::var("WAVEGATE_OPS_ADMIN_TOKEN") {
            if !token.is_empty() {
                cfg.ops_admin_token = Some(token);
            }
        }

        if let Ok(service) = env::var("WAVEGATE_DIRECTORY_SERVICE") {
            if !service.is_empty() {
                cfg.directory_service = service;
            }
        }

        if let Ok(policy) = env::var("WAVEGATE_SHUFFLE_POLICY") {
            cfg.shuffle_policy = match policy.as_str() {
                "random" => ShufflePolicy::FullyRandom,
                "tiered" => ShufflePolicy::PriorityTiers,
                other => {
                    return Err(ConfigError::InvalidPolicy {
                        name: "WAVEGATE_SHUFFLE_POLICY",
                        value: other.to_string(),
                    })
                }
            };
        }

        Ok(cfg)
    }
}
