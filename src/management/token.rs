use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use thiserror::Error;

use crate::{config, spotify::ProviderApi, types::Credential};

/// Well-known key the credential is persisted under.
pub const CREDENTIAL_KEY: &str = "spotify_token";

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("credential storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential storage lock poisoned")]
    Poisoned,
}

#[derive(Clone)]
enum Backend {
    File(PathBuf),
    Memory(Arc<Mutex<Option<String>>>),
}

/// Persists the single live credential and checks it against the provider.
///
/// The store is the only durable shared state of the player. The auth flow
/// writes it after a successful exchange, the session clears it on logout
/// and invalidation. Nobody else touches it.
#[derive(Clone)]
pub struct TokenStore {
    backend: Backend,
    provider: Arc<dyn ProviderApi>,
}

impl TokenStore {
    /// Store backed by `<data dir>/cache/spotify_token`.
    pub fn new(provider: Arc<dyn ProviderApi>) -> Self {
        let mut path = config::data_dir();
        path.push("cache");
        path.push(CREDENTIAL_KEY);
        Self::at_path(path, provider)
    }

    pub fn at_path(path: impl Into<PathBuf>, provider: Arc<dyn ProviderApi>) -> Self {
        TokenStore {
            backend: Backend::File(path.into()),
            provider,
        }
    }

    pub fn in_memory(provider: Arc<dyn ProviderApi>) -> Self {
        TokenStore {
            backend: Backend::Memory(Arc::new(Mutex::new(None))),
            provider,
        }
    }

    /// Reads the persisted credential without validating it.
    ///
    /// Unreadable storage counts as "no credential".
    pub async fn load(&self) -> Option<Credential> {
        let raw = match &self.backend {
            Backend::File(path) => match async_fs::read_to_string(path).await {
                Ok(content) => Some(content),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => {
                    log::warn!("cannot read stored credential at {}: {}", path.display(), e);
                    None
                }
            },
            Backend::Memory(slot) => read_slot(slot),
        };

        raw.map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(Credential::new)
    }

    pub async fn save(&self, credential: &Credential) -> Result<(), TokenStoreError> {
        match &self.backend {
            Backend::File(path) => {
                if let Some(parent) = path.parent() {
                    async_fs::create_dir_all(parent).await?;
                }
                async_fs::write(path, credential.as_str()).await?;
            }
            Backend::Memory(slot) => {
                let mut slot = slot.lock().map_err(|_| TokenStoreError::Poisoned)?;
                *slot = Some(credential.as_str().to_string());
            }
        }
        Ok(())
    }

    /// Removes the persisted credential. Clearing an empty store is fine.
    pub async fn clear(&self) -> Result<(), TokenStoreError> {
        match &self.backend {
            Backend::File(path) => match async_fs::remove_file(path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            },
            Backend::Memory(slot) => {
                let mut slot = slot.lock().map_err(|_| TokenStoreError::Poisoned)?;
                *slot = None;
                Ok(())
            }
        }
    }

    /// Removes the persisted credential only while it still is `expected`.
    ///
    /// Returns whether anything was removed. A credential saved after
    /// `expected` went stale stays in place.
    pub async fn clear_if(&self, expected: &Credential) -> Result<bool, TokenStoreError> {
        match &self.backend {
            Backend::File(_) => {
                if self.load().await.as_ref() != Some(expected) {
                    return Ok(false);
                }
                self.clear().await?;
                Ok(true)
            }
            Backend::Memory(slot) => {
                let mut slot = slot.lock().map_err(|_| TokenStoreError::Poisoned)?;
                let matches = slot
                    .as_deref()
                    .map(str::trim)
                    .is_some_and(|stored| stored == expected.as_str());
                if matches {
                    *slot = None;
                }
                Ok(matches)
            }
        }
    }

    /// Single best-effort check against the provider's identity endpoint.
    ///
    /// Fail-closed: network failures and non-success statuses are `false`.
    pub async fn validate(&self, credential: &Credential) -> bool {
        match self.provider.current_user(credential).await {
            Ok(()) => true,
            Err(e) => {
                log::debug!("credential rejected: {}", e);
                false
            }
        }
    }
}

fn read_slot(slot: &Mutex<Option<String>>) -> Option<String> {
    slot.lock().ok().and_then(|s| s.clone())
}
