use std::fmt;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Opaque bearer credential issued by the provider.
///
/// Only one credential is live per process. The token text never shows up
/// in `Debug` output.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Credential(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Album snapshot attached to a [`Track`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumInfo {
    pub name: String,
    pub image_url: Option<String>,
}

/// Immutable snapshot of the track the engine reports as current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: AlbumInfo,
    pub duration_ms: u64,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub current_track: Option<Track>,
    pub is_playing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Ready(String),
    Failed(String),
}

impl ConnectionStatus {
    pub fn device_id(&self) -> Option<&str> {
        match self {
            ConnectionStatus::Ready(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => f.write_str("disconnected"),
            ConnectionStatus::Connecting => f.write_str("connecting"),
            ConnectionStatus::Ready(id) => write!(f, "ready ({})", id),
            ConnectionStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Tabled)]
pub struct TrackTableRow {
    pub state: String,
    pub name: String,
    pub artists: String,
    pub album: String,
    pub length: String,
}

impl TrackTableRow {
    pub fn new(track: &Track, is_playing: bool) -> Self {
        TrackTableRow {
            state: if is_playing { "playing" } else { "paused" }.to_string(),
            name: track.name.clone(),
            artists: track.artists.join(", "),
            album: track.album.name.clone(),
            length: format_duration(track.duration_ms),
        }
    }
}

/// `m:ss` rendering of a track length.
pub fn format_duration(duration_ms: u64) -> String {
    let seconds = duration_ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Playlist owned or followed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub owner: Option<String>,
    pub track_count: u32,
}

/// Album saved in the user's library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub artists: Vec<String>,
    pub release_date: Option<String>,
    pub total_tracks: u32,
}

/// Artist the user follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub genres: Vec<String>,
    pub followers: u64,
}

#[derive(Tabled)]
pub struct PlaylistTableRow {
    pub name: String,
    pub owner: String,
    pub tracks: u32,
    pub uri: String,
}

impl From<&Playlist> for PlaylistTableRow {
    fn from(playlist: &Playlist) -> Self {
        PlaylistTableRow {
            name: playlist.name.clone(),
            owner: playlist.owner.clone().unwrap_or_default(),
            tracks: playlist.track_count,
            uri: playlist.uri.clone(),
        }
    }
}

/// Row of a track listing (liked tracks, search results).
#[derive(Tabled)]
pub struct TrackListRow {
    pub name: String,
    pub artists: String,
    pub album: String,
    pub length: String,
    pub uri: String,
}

impl From<&Track> for TrackListRow {
    fn from(track: &Track) -> Self {
        TrackListRow {
            name: track.name.clone(),
            artists: track.artists.join(", "),
            album: track.album.name.clone(),
            length: format_duration(track.duration_ms),
            uri: track.uri.clone(),
        }
    }
}

#[derive(Tabled)]
pub struct AlbumTableRow {
    pub name: String,
    pub artists: String,
    pub released: String,
    pub tracks: u32,
    pub uri: String,
}

impl From<&Album> for AlbumTableRow {
    fn from(album: &Album) -> Self {
        AlbumTableRow {
            name: album.name.clone(),
            artists: album.artists.join(", "),
            released: album.release_date.clone().unwrap_or_default(),
            tracks: album.total_tracks,
            uri: album.uri.clone(),
        }
    }
}

#[derive(Tabled)]
pub struct ArtistTableRow {
    pub name: String,
    pub genres: String,
    pub followers: u64,
    pub uri: String,
}

impl From<&Artist> for ArtistTableRow {
    fn from(artist: &Artist) -> Self {
        ArtistTableRow {
            name: artist.name.clone(),
            genres: artist
                .genres
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(","),
            followers: artist.followers,
            uri: artist.uri.clone(),
        }
    }
}

/// Body accepted by the confidential exchange endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub code: Option<String>,
    #[serde(rename = "redirectUri")]
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferPlaybackRequest {
    pub device_ids: Vec<String>,
    pub play: bool,
}

/// Body of `PUT /me/player/play`.
///
/// Tracks go into `uris`. Albums, playlists and artists are contexts and
/// go into `context_uri`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPlaybackRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uris: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_uri: Option<String>,
}

impl StartPlaybackRequest {
    pub fn for_uri(uri: &str) -> Self {
        if is_track_uri(uri) {
            StartPlaybackRequest {
                uris: Some(vec![uri.to_string()]),
                context_uri: None,
            }
        } else {
            StartPlaybackRequest {
                uris: None,
                context_uri: Some(uri.to_string()),
            }
        }
    }
}

/// Track and episode URIs are played directly, everything else is a context.
pub fn is_track_uri(uri: &str) -> bool {
    uri.starts_with("spotify:track:") || uri.starts_with("spotify:episode:")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    pub volume_percent: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiImage {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiArtist {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<ApiImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTrack {
    pub id: Option<String>,
    pub name: String,
    pub uri: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<ApiArtist>,
    pub album: ApiAlbum,
}

impl From<ApiTrack> for Track {
    fn from(track: ApiTrack) -> Self {
        Track {
            id: track.id.unwrap_or_default(),
            name: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            album: AlbumInfo {
                name: track.album.name,
                image_url: track.album.images.into_iter().next().map(|i| i.url),
            },
            duration_ms: track.duration_ms,
            uri: track.uri,
        }
    }
}

/// Response of `GET /me/player`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentPlayback {
    pub device: Option<Device>,
    #[serde(default)]
    pub is_playing: bool,
    pub item: Option<ApiTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next: Option<String>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiOwner {
    pub display_name: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTrackCount {
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiPlaylist {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub owner: Option<ApiOwner>,
    pub tracks: Option<ApiTrackCount>,
}

impl From<ApiPlaylist> for Playlist {
    fn from(playlist: ApiPlaylist) -> Self {
        Playlist {
            id: playlist.id,
            name: playlist.name,
            uri: playlist.uri,
            owner: playlist.owner.and_then(|o| o.display_name.or(o.id)),
            track_count: playlist.tracks.map(|t| t.total).unwrap_or_default(),
        }
    }
}

/// Item of `GET /me/tracks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedTrack {
    pub track: Option<ApiTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSavedAlbum {
    pub id: String,
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub artists: Vec<ApiArtist>,
    pub release_date: Option<String>,
    pub total_tracks: Option<u32>,
}

impl From<ApiSavedAlbum> for Album {
    fn from(album: ApiSavedAlbum) -> Self {
        Album {
            id: album.id,
            name: album.name,
            uri: album.uri,
            artists: album.artists.into_iter().map(|a| a.name).collect(),
            release_date: album.release_date,
            total_tracks: album.total_tracks.unwrap_or_default(),
        }
    }
}

/// Item of `GET /me/albums`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedAlbum {
    pub album: ApiSavedAlbum,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiFollowers {
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiFollowedArtist {
    pub id: String,
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub genres: Vec<String>,
    pub followers: Option<ApiFollowers>,
}

impl From<ApiFollowedArtist> for Artist {
    fn from(artist: ApiFollowedArtist) -> Self {
        Artist {
            id: artist.id,
            name: artist.name,
            uri: artist.uri,
            genres: artist.genres,
            followers: artist.followers.map(|f| f.total).unwrap_or_default(),
        }
    }
}

/// Response of `GET /me/following?type=artist`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowedArtistsResponse {
    pub artists: Page<ApiFollowedArtist>,
}

/// Response of `GET /search?type=track`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSearchResponse {
    pub tracks: Page<ApiTrack>,
}
