//! Server configuration read from the environment.

use std::net::{IpAddr, Ipv4Addr};

use thiserror::Error;

const DEFAULT_PORT: u16 = 8085;
const DEFAULT_DATABASE_URL: &str = "sqlite://tracker.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Runtime configuration for the API server.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
    /// Origin allowed to call the API (the SPA dev server), if any.
    pub client_origin: Option<String>,
}

impl Config {
    /// Build a config from `HOST`, `PORT`, `DATABASE_URL`, and
    /// `CLIENT_ORIGIN`, falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = match std::env::var("HOST") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "HOST",
                value: raw,
            })?,
            Err(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };

        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value: raw,
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let client_origin = std::env::var("CLIENT_ORIGIN").ok();

        Ok(Self {
            host,
            port,
            database_url,
            client_origin,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            client_origin: None,
        }
    }
}
