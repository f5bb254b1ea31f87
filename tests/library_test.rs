mod common;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use common::spawn_server;
use cyberdeejay::{
    spotify::{ApiError, ProviderApi, SpotifyApi},
    types::{
        AlbumTableRow, ArtistTableRow, Credential, PlaylistTableRow, StartPlaybackRequest,
        TrackListRow, is_track_uri,
    },
};
use serde_json::{Value, json};

#[derive(Default)]
struct Library {
    queries: Mutex<Vec<(String, HashMap<String, String>)>>,
    play_bodies: Mutex<Vec<Value>>,
}

type Shared = Arc<Library>;

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer tok1")
}

fn record(library: &Library, path: &str, query: HashMap<String, String>) {
    library
        .queries
        .lock()
        .unwrap()
        .push((path.to_string(), query));
}

fn track(name: &str) -> Value {
    json!({
        "id": format!("{}-id", name),
        "name": name,
        "uri": format!("spotify:track:{}", name),
        "duration_ms": 185000,
        "artists": [{"name": "Artist"}, {"name": "Guest"}],
        "album": {"name": "Album", "images": []}
    })
}

async fn playlists(
    State(library): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "{\"error\":\"invalid token\"}").into_response();
    }
    record(&library, "/me/playlists", query);
    Json(json!({
        "items": [
            {
                "id": "pl1",
                "name": "Road Trip",
                "uri": "spotify:playlist:pl1",
                "owner": {"id": "user-1", "display_name": "Dee"},
                "tracks": {"total": 42}
            },
            {
                "id": "pl2",
                "name": "Untitled",
                "uri": "spotify:playlist:pl2",
                "owner": {"id": "user-2", "display_name": null}
            }
        ],
        "next": null,
        "total": 2
    }))
    .into_response()
}

async fn saved_tracks(
    State(library): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&library, "/me/tracks", query);
    Json(json!({
        "items": [
            {"added_at": "2024-01-01T00:00:00Z", "track": track("one")},
            {"added_at": "2024-01-02T00:00:00Z", "track": null},
            {"added_at": "2024-01-03T00:00:00Z", "track": track("two")}
        ],
        "next": "http://next"
    }))
}

async fn saved_albums(
    State(library): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&library, "/me/albums", query);
    Json(json!({
        "items": [{
            "added_at": "2024-01-01T00:00:00Z",
            "album": {
                "id": "al1",
                "name": "Discovery",
                "uri": "spotify:album:al1",
                "artists": [{"name": "Daft Punk"}],
                "release_date": "2001-03-12",
                "total_tracks": 14
            }
        }]
    }))
}

async fn following(
    State(library): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&library, "/me/following", query);
    Json(json!({
        "artists": {
            "items": [{
                "id": "ar1",
                "name": "Daft Punk",
                "uri": "spotify:artist:ar1",
                "genres": ["french house", "electro", "filter house", "disco"],
                "followers": {"total": 9000000}
            }],
            "cursors": {"after": null},
            "next": null
        }
    }))
}

async fn search(
    State(library): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&library, "/search", query);
    Json(json!({"tracks": {"items": [track("found")], "next": null, "total": 1}}))
}

async fn play(State(library): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    library.play_bodies.lock().unwrap().push(body);
    StatusCode::NO_CONTENT
}

async fn library() -> (Shared, SpotifyApi) {
    let library: Shared = Arc::new(Library::default());
    let router = Router::new()
        .route("/me/playlists", get(playlists))
        .route("/me/tracks", get(saved_tracks))
        .route("/me/albums", get(saved_albums))
        .route("/me/following", get(following))
        .route("/search", get(search))
        .route("/me/player/play", put(play))
        .with_state(Arc::clone(&library));
    let addr = spawn_server(router).await;
    (library, SpotifyApi::new(format!("http://{}", addr)))
}

fn last_query(library: &Library) -> (String, HashMap<String, String>) {
    library.queries.lock().unwrap().last().cloned().unwrap()
}

#[tokio::test]
async fn test_playlists_list_with_playable_uris() {
    let (library, api) = library().await;
    let playlists = api.playlists(&Credential::new("tok1"), 50).await.unwrap();

    assert_eq!(playlists.len(), 2);
    assert_eq!(playlists[0].name, "Road Trip");
    assert_eq!(playlists[0].owner.as_deref(), Some("Dee"));
    assert_eq!(playlists[0].track_count, 42);
    assert_eq!(playlists[1].owner.as_deref(), Some("user-2"));
    assert_eq!(playlists[1].track_count, 0);

    let row = PlaylistTableRow::from(&playlists[0]);
    assert_eq!(row.uri, "spotify:playlist:pl1");

    let (path, query) = last_query(&library);
    assert_eq!(path, "/me/playlists");
    assert_eq!(query["limit"], "50");
}

#[tokio::test]
async fn test_rejected_credential_surfaces_status() {
    let (_, api) = library().await;
    let err = api.playlists(&Credential::new("wrong"), 10).await.unwrap_err();

    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_liked_tracks_skip_missing_entries() {
    let (library, api) = library().await;
    let tracks = api
        .saved_tracks(&Credential::new("tok1"), 500)
        .await
        .unwrap();

    let names: Vec<&str> = tracks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["one", "two"]);

    let row = TrackListRow::from(&tracks[0]);
    assert_eq!(row.artists, "Artist, Guest");
    assert_eq!(row.length, "3:05");
    assert_eq!(row.uri, "spotify:track:one");

    // Page size is capped at what the provider allows
    assert_eq!(last_query(&library).1["limit"], "50");
}

#[tokio::test]
async fn test_saved_albums() {
    let (_, api) = library().await;
    let albums = api
        .saved_albums(&Credential::new("tok1"), 20)
        .await
        .unwrap();

    let row = AlbumTableRow::from(&albums[0]);
    assert_eq!(row.name, "Discovery");
    assert_eq!(row.artists, "Daft Punk");
    assert_eq!(row.released, "2001-03-12");
    assert_eq!(row.tracks, 14);
    assert_eq!(row.uri, "spotify:album:al1");
}

#[tokio::test]
async fn test_followed_artists() {
    let (library, api) = library().await;
    let artists = api
        .followed_artists(&Credential::new("tok1"), 0)
        .await
        .unwrap();

    let row = ArtistTableRow::from(&artists[0]);
    assert_eq!(row.genres, "french house,electro,filter house");
    assert_eq!(row.followers, 9000000);
    assert_eq!(row.uri, "spotify:artist:ar1");

    let (_, query) = last_query(&library);
    assert_eq!(query["type"], "artist");
    assert_eq!(query["limit"], "1");
}

#[tokio::test]
async fn test_track_search() {
    let (library, api) = library().await;
    let tracks = api
        .search_tracks(&Credential::new("tok1"), "  daft punk ", 20)
        .await
        .unwrap();

    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].uri, "spotify:track:found");

    let (path, query) = last_query(&library);
    assert_eq!(path, "/search");
    assert_eq!(query["q"], "daft punk");
    assert_eq!(query["type"], "track");
    assert_eq!(query["limit"], "20");
}

#[tokio::test]
async fn test_blank_search_asks_nobody() {
    let (library, api) = library().await;
    let tracks = api
        .search_tracks(&Credential::new("tok1"), "   ", 20)
        .await
        .unwrap();

    assert!(tracks.is_empty());
    assert!(library.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_start_playback_sends_tracks_and_contexts_differently() {
    let (library, api) = library().await;
    let credential = Credential::new("tok1");

    api.start_playback(&credential, "spotify:track:t1", Some("dev1"))
        .await
        .unwrap();
    api.start_playback(&credential, "spotify:album:al1", None)
        .await
        .unwrap();
    api.start_playback(&credential, "spotify:playlist:pl1", None)
        .await
        .unwrap();

    assert_eq!(
        *library.play_bodies.lock().unwrap(),
        vec![
            json!({"uris": ["spotify:track:t1"]}),
            json!({"context_uri": "spotify:album:al1"}),
            json!({"context_uri": "spotify:playlist:pl1"}),
        ]
    );
}

#[test]
fn test_uri_classification() {
    assert!(is_track_uri("spotify:track:t1"));
    assert!(is_track_uri("spotify:episode:e1"));
    assert!(!is_track_uri("spotify:artist:ar1"));

    assert_eq!(
        StartPlaybackRequest::for_uri("spotify:artist:ar1").context_uri.as_deref(),
        Some("spotify:artist:ar1")
    );
}

#[tokio::test]
async fn test_undecodable_page_is_a_decode_error() {
    let router = Router::new().route("/me/albums", get(|| async { "not json" }));
    let api = SpotifyApi::new(format!("http://{}", spawn_server(router).await));

    let err = api
        .saved_albums(&Credential::new("tok1"), 10)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}
