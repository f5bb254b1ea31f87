//! # Spotify Integration Module
//!
//! HTTP layer between the player and the Spotify Web API.
//!
//! ```text
//! Session / Playback adapter / Token store
//!          ↓
//! ProviderApi (trait, injected)
//!          ↓
//! SpotifyApi (reqwest)
//!          ↓
//! Spotify Web API
//! ```
//!
//! The core only needs three calls, captured by [`ProviderApi`]:
//! `GET /me` (credential validation), `PUT /me/player` (device transfer) and
//! `PUT /me/player/play` (start playback by URI). [`SpotifyApi`] implements
//! them and additionally exposes the remote-control endpoints used by the
//! Web API playback engine.
//!
//! The library endpoints (playlists, liked tracks, saved albums, followed
//! artists and track search) return one page of at most
//! [`MAX_PAGE_SIZE`] items each. Every item carries the URI that
//! [`ProviderApi::start_playback`] accepts.
//!
//! Every request carries `Authorization: Bearer <credential>`. Non-success
//! responses become [`ApiError::Status`] with the response body preserved,
//! so callers can recognize provider quirks such as the transient cloud
//! playback error.

pub mod auth;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::types::{
    Album, ApiPlaylist, Artist, Credential, CurrentPlayback, Device, DevicesResponse,
    FollowedArtistsResponse, Page, Playlist, SavedAlbum, SavedTrack, StartPlaybackRequest,
    Track, TrackSearchResponse, TransferPlaybackRequest,
};

/// Largest page the library endpoints hand out.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Marker the provider puts in the transient "cloud playback" error class.
pub const CLOUD_PLAYBACK_ERROR: &str = "CloudPlaybackClientError";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// True for the provider's transient cloud playback error, which is
    /// routinely returned on otherwise successful playback requests.
    pub fn is_cloud_playback(&self) -> bool {
        self.to_string().contains(CLOUD_PLAYBACK_ERROR)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) => None,
        }
    }
}

/// Provider calls the playback core depends on.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// `GET /me`. Succeeds only when the provider accepts the credential.
    async fn current_user(&self, credential: &Credential) -> Result<(), ApiError>;

    /// `PUT /me/player`: make `device_id` the active playback target.
    async fn transfer_playback(
        &self,
        credential: &Credential,
        device_id: &str,
        play: bool,
    ) -> Result<(), ApiError>;

    /// `PUT /me/player/play`. Track URIs are played directly, album,
    /// playlist and artist URIs start that context.
    async fn start_playback(
        &self,
        credential: &Credential,
        uri: &str,
        device_id: Option<&str>,
    ) -> Result<(), ApiError>;
}

/// reqwest-backed Spotify Web API client.
#[derive(Debug, Clone)]
pub struct SpotifyApi {
    client: Client,
    base_url: String,
}

impl SpotifyApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        SpotifyApi {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = Self::send(request).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn page_size(limit: u32) -> String {
        limit.clamp(1, MAX_PAGE_SIZE).to_string()
    }

    fn with_device(request: RequestBuilder, device_id: Option<&str>) -> RequestBuilder {
        match device_id {
            Some(id) => request.query(&[("device_id", id)]),
            None => request,
        }
    }

    /// `GET /me/player/devices`.
    pub async fn devices(&self, credential: &Credential) -> Result<Vec<Device>, ApiError> {
        let request = self
            .client
            .get(self.url("/me/player/devices"))
            .bearer_auth(credential.as_str());
        let response = Self::send(request).await?;
        let devices: DevicesResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(devices.devices)
    }

    /// `GET /me/player`. `None` when nothing is playing anywhere (204).
    pub async fn playback_state(
        &self,
        credential: &Credential,
    ) -> Result<Option<CurrentPlayback>, ApiError> {
        let request = self
            .client
            .get(self.url("/me/player"))
            .bearer_auth(credential.as_str());
        let response = Self::send(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// `PUT /me/player/pause`.
    pub async fn pause(
        &self,
        credential: &Credential,
        device_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .put(self.url("/me/player/pause"))
            .bearer_auth(credential.as_str())
            .header(reqwest::header::CONTENT_LENGTH, 0);
        Self::send(Self::with_device(request, device_id)).await?;
        Ok(())
    }

    /// `PUT /me/player/play` without a body resumes the current context.
    pub async fn resume(
        &self,
        credential: &Credential,
        device_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .put(self.url("/me/player/play"))
            .bearer_auth(credential.as_str())
            .header(reqwest::header::CONTENT_LENGTH, 0);
        Self::send(Self::with_device(request, device_id)).await?;
        Ok(())
    }

    /// `POST /me/player/next`.
    pub async fn next(
        &self,
        credential: &Credential,
        device_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .post(self.url("/me/player/next"))
            .bearer_auth(credential.as_str())
            .header(reqwest::header::CONTENT_LENGTH, 0);
        Self::send(Self::with_device(request, device_id)).await?;
        Ok(())
    }

    /// `POST /me/player/previous`.
    pub async fn previous(
        &self,
        credential: &Credential,
        device_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .post(self.url("/me/player/previous"))
            .bearer_auth(credential.as_str())
            .header(reqwest::header::CONTENT_LENGTH, 0);
        Self::send(Self::with_device(request, device_id)).await?;
        Ok(())
    }

    /// `GET /me/playlists`.
    pub async fn playlists(
        &self,
        credential: &Credential,
        limit: u32,
    ) -> Result<Vec<Playlist>, ApiError> {
        let request = self
            .client
            .get(self.url("/me/playlists"))
            .bearer_auth(credential.as_str())
            .query(&[("limit", Self::page_size(limit))]);
        let page: Page<ApiPlaylist> = Self::get_json(request).await?;
        Ok(page.items.into_iter().map(Playlist::from).collect())
    }

    /// `GET /me/tracks`. Entries without a playable track are skipped.
    pub async fn saved_tracks(
        &self,
        credential: &Credential,
        limit: u32,
    ) -> Result<Vec<Track>, ApiError> {
        let request = self
            .client
            .get(self.url("/me/tracks"))
            .bearer_auth(credential.as_str())
            .query(&[("limit", Self::page_size(limit))]);
        let page: Page<SavedTrack> = Self::get_json(request).await?;
        Ok(page
            .items
            .into_iter()
            .filter_map(|saved| saved.track)
            .map(Track::from)
            .collect())
    }

    /// `GET /me/albums`.
    pub async fn saved_albums(
        &self,
        credential: &Credential,
        limit: u32,
    ) -> Result<Vec<Album>, ApiError> {
        let request = self
            .client
            .get(self.url("/me/albums"))
            .bearer_auth(credential.as_str())
            .query(&[("limit", Self::page_size(limit))]);
        let page: Page<SavedAlbum> = Self::get_json(request).await?;
        Ok(page.items.into_iter().map(|s| Album::from(s.album)).collect())
    }

    /// `GET /me/following?type=artist`.
    pub async fn followed_artists(
        &self,
        credential: &Credential,
        limit: u32,
    ) -> Result<Vec<Artist>, ApiError> {
        let request = self
            .client
            .get(self.url("/me/following"))
            .bearer_auth(credential.as_str())
            .query(&[("type", "artist".to_string()), ("limit", Self::page_size(limit))]);
        let response: FollowedArtistsResponse = Self::get_json(request).await?;
        Ok(response
            .artists
            .items
            .into_iter()
            .map(Artist::from)
            .collect())
    }

    /// `GET /search?type=track`. A blank query returns no tracks without
    /// asking the provider.
    pub async fn search_tracks(
        &self,
        credential: &Credential,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Track>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let request = self
            .client
            .get(self.url("/search"))
            .bearer_auth(credential.as_str())
            .query(&[
                ("q", query.to_string()),
                ("type", "track".to_string()),
                ("limit", Self::page_size(limit)),
            ]);
        let response: TrackSearchResponse = Self::get_json(request).await?;
        Ok(response.tracks.items.into_iter().map(Track::from).collect())
    }

    /// `PUT /me/player/volume?volume_percent=N`.
    pub async fn set_volume(
        &self,
        credential: &Credential,
        percent: u8,
        device_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .put(self.url("/me/player/volume"))
            .bearer_auth(credential.as_str())
            .query(&[("volume_percent", percent.min(100).to_string())])
            .header(reqwest::header::CONTENT_LENGTH, 0);
        Self::send(Self::with_device(request, device_id)).await?;
        Ok(())
    }
}

#[async_trait]
impl ProviderApi for SpotifyApi {
    async fn current_user(&self, credential: &Credential) -> Result<(), ApiError> {
        let request = self
            .client
            .get(self.url("/me"))
            .bearer_auth(credential.as_str());
        Self::send(request).await?;
        Ok(())
    }

    async fn transfer_playback(
        &self,
        credential: &Credential,
        device_id: &str,
        play: bool,
    ) -> Result<(), ApiError> {
        let body = TransferPlaybackRequest {
            device_ids: vec![device_id.to_string()],
            play,
        };
        let request = self
            .client
            .put(self.url("/me/player"))
            .bearer_auth(credential.as_str())
            .json(&body);
        Self::send(request).await?;
        Ok(())
    }

    async fn start_playback(
        &self,
        credential: &Credential,
        uri: &str,
        device_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let body = StartPlaybackRequest::for_uri(uri);
        let request = self
            .client
            .put(self.url("/me/player/play"))
            .bearer_auth(credential.as_str())
            .json(&body);
        Self::send(Self::with_device(request, device_id)).await?;
        Ok(())
    }
}
