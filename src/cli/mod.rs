//! # CLI Module
//!
//! Command-line front end of CyberDeejay. Each command builds what it needs
//! from the [`Config`] and reports to the terminal with the crate's colored
//! output macros.
//!
//! ## Commands
//!
//! ### Authentication
//!
//! - [`auth`] - runs the browser login against the local server and waits
//!   for the redirect-return page to store a credential
//! - [`logout`] - forgets the stored credential
//! - [`status`] - checks the stored credential against the provider
//!
//! ### Playback
//!
//! - [`player`] - starts a session, waits for the device to become ready
//!   and applies one [`PlayerCommand`]
//!
//! ### Library
//!
//! - [`library`] - lists playlists, liked tracks, saved albums, followed
//!   artists or track search results, each row with a playable URI
//!
//! ### Server
//!
//! - [`serve`] - runs the local server with a long-lived session behind it
//!
//! ```bash
//! cyberdeejay auth
//! cyberdeejay search "daft punk"
//! cyberdeejay play spotify:track:4uLU6hMCjMI75M1A2tKUQC
//! cyberdeejay volume 40
//! cyberdeejay now
//! ```

mod auth;
mod library;
mod player;
mod serve;

use std::sync::Arc;

use crate::{
    config::Config,
    management::TokenStore,
    spotify::{ProviderApi, SpotifyApi},
};

pub use auth::{auth, logout, status};
pub use library::{LibraryCommand, library};
pub use player::{PlayerCommand, player};
pub use serve::serve;

/// Collaborators shared by every command.
pub(crate) struct Context {
    pub config: Config,
    pub api: SpotifyApi,
    pub provider: Arc<dyn ProviderApi>,
    pub store: TokenStore,
}

impl Context {
    pub fn new(config: Config) -> Self {
        let api = SpotifyApi::new(config.api_url.clone());
        let provider: Arc<dyn ProviderApi> = Arc::new(api.clone());
        let store = TokenStore::new(Arc::clone(&provider));
        Context {
            config,
            api,
            provider,
            store,
        }
    }
}
