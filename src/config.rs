//! Configuration management for the CyberDeejay player.
//!
//! Values are read from environment variables, optionally seeded from a
//! `.env` file in the local data directory:
//!
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (endpoint URLs and the server address only)
//!
//! The client id, redirect URI and scope set have no defaults. Missing any of
//! them is a [`ConfigError`] raised before a login is ever offered.

use std::{env, net::SocketAddr, path::PathBuf};

use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("cannot load .env file: {0}")]
    EnvFile(String),
}

/// Runtime configuration shared by the client commands and the server.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    /// Only the token exchange endpoint needs the secret.
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub api_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub server_addr: SocketAddr,
    pub exchange_url: String,
    pub device_name: Option<String>,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let client_id = require("SPOTIFY_CLIENT_ID")?;
        let redirect_uri = require("SPOTIFY_REDIRECT_URI")?;
        let scopes: Vec<String> = require("SPOTIFY_SCOPE")?
            .split_whitespace()
            .map(str::to_string)
            .collect();

        url::Url::parse(&redirect_uri).map_err(|e| ConfigError::Invalid {
            var: "SPOTIFY_REDIRECT_URI",
            reason: e.to_string(),
        })?;

        let server_addr: SocketAddr = get("SERVER_ADDRESS")
            .unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "SERVER_ADDRESS",
                reason: e.to_string(),
            })?;

        let exchange_url = get("TOKEN_EXCHANGE_URL")
            .unwrap_or_else(|| format!("http://{}/api/token", server_addr));

        Ok(Config {
            client_id,
            client_secret: get("SPOTIFY_CLIENT_SECRET"),
            redirect_uri,
            scopes,
            api_url: trim_slash(get("SPOTIFY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into())),
            auth_url: get("SPOTIFY_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.into()),
            token_url: get("SPOTIFY_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.into()),
            server_addr,
            exchange_url,
            device_name: get("PLAYER_DEVICE_NAME"),
        })
    }

    /// Space separated scope string as sent to the authorization endpoint.
    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Returns the application's local data directory.
///
/// - Linux: `~/.local/share/cyberdeejay`
/// - macOS: `~/Library/Application Support/cyberdeejay`
/// - Windows: `%LOCALAPPDATA%/cyberdeejay`
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("cyberdeejay");
    path
}

/// Loads environment variables from the `.env` file in the local data
/// directory, creating the directory if needed.
///
/// A missing `.env` file is fine: everything can come from the real
/// environment. A file that exists but cannot be parsed is an error.
pub async fn load_env() -> Result<(), ConfigError> {
    let dir = data_dir();
    async_fs::create_dir_all(&dir)
        .await
        .map_err(|e| ConfigError::EnvFile(e.to_string()))?;

    let path = dir.join(".env");
    if !path.is_file() {
        return Ok(());
    }

    dotenv::from_path(&path)
        .map(|_| ())
        .map_err(|e| ConfigError::EnvFile(e.to_string()))
}
