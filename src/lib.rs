//! CyberDeejay Spotify player library
//!
//! This library drives a Spotify playback session: it runs the OAuth
//! authorization-code flow against a confidential token exchange endpoint,
//! keeps the resulting bearer credential alive across restarts, and
//! bootstraps a playback engine once per valid credential. Engine events
//! are folded into a single "now playing" view that front ends render.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints (token exchange, redirect return, login, landing)
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration loading from `.env` files and the environment
//! - `management` - Credential persistence and validation
//! - `playback` - Playback engine capability and its adapter
//! - `server` - Local HTTP server wiring
//! - `session` - The playback session state machine
//! - `spotify` - Spotify Web API client and authorization flow
//! - `types` - Data structures shared across modules
//!
//! # Example
//!
//! ```ignore
//! use cyberdeejay::{config, cli};
//!
//! #[tokio::main]
//! async fn main() -> cyberdeejay::Res<()> {
//!     config::load_env().await?;
//!     let config = config::Config::from_env()?;
//!     cli::status(config).await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod management;
pub mod playback;
pub mod server;
pub mod session;
pub mod spotify;
pub mod types;

/// A convenient Result type alias for operations that may fail.
///
/// Used by the command-line glue where errors are only reported, never
/// matched on. Library modules return their own typed errors.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```ignore
/// info!("Waiting for the Spotify callback...");
/// info!("Listening on {}", addr);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```ignore
/// success!("Authentication successful!");
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only the command-line layer uses this. The session, token store and
/// adapter never terminate the process.
///
/// # Example
///
/// ```ignore
/// error!("Missing required environment variable: {}", var_name);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// # Example
///
/// ```ignore
/// warning!("Failed to open browser, open this URL manually: {}", url);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
