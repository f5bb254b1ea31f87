mod common;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Form, Json, Router,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use common::{MockEngineFactory, MockProvider, config_with, dead_addr, spawn_server};
use cyberdeejay::{
    api::AppState,
    management::TokenStore,
    server,
    session::{NoNavigation, Session, SessionPhase},
    spotify::SpotifyApi,
    types::Credential,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Default, Clone)]
struct Seen {
    authorization: Option<String>,
    form: HashMap<String, String>,
}

// Provider token endpoint that records what it was sent
async fn token_endpoint(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Seen>>) {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let record = Arc::clone(&seen);
    let router = Router::new()
        .route(
            "/api/token",
            post(
                move |headers: HeaderMap, Form(form): Form<HashMap<String, String>>| {
                    let record = Arc::clone(&record);
                    let reply = reply.clone();
                    async move {
                        *record.lock().unwrap() = Seen {
                            authorization: headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string),
                            form,
                        };
                        (status, Json(reply))
                    }
                },
            ),
        )
        .route(
            "/me",
            get(|headers: HeaderMap| async move {
                match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                    Some("Bearer tok1") => StatusCode::OK,
                    _ => StatusCode::UNAUTHORIZED,
                }
            }),
        );
    let base = format!("http://{}", spawn_server(router).await);
    (base, seen)
}

/// Starts the player server against `token_base` and returns its base URL.
async fn player_server(
    token_base: &str,
    secret: Option<&str>,
) -> (String, Arc<AppState>, TokenStore) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let token_url = format!("{}/api/token", token_base);
    let exchange_url = format!("http://{}/api/token", addr);
    let mut config = config_with(&[
        ("SPOTIFY_TOKEN_URL", token_url.as_str()),
        ("TOKEN_EXCHANGE_URL", exchange_url.as_str()),
    ]);
    config.client_secret = secret.map(str::to_string);

    let store = TokenStore::in_memory(Arc::new(SpotifyApi::new(token_base.to_string())));
    let state = Arc::new(AppState::new(config, store.clone(), None));
    let serving = Arc::clone(&state);
    tokio::spawn(async move {
        server::serve(listener, serving).await.unwrap();
    });
    (format!("http://{}", addr), state, store)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (base, _, _) = player_server("http://127.0.0.1:9", Some("secret-1")).await;
    let body: Value = client()
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_exchange_rejects_other_methods() {
    let (base, _, _) = player_server("http://127.0.0.1:9", Some("secret-1")).await;
    let response = client()
        .get(format!("{}/api/token", base))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 405);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"error": "Method not allowed"}));
}

#[tokio::test]
async fn test_exchange_requires_code_and_redirect() {
    let (base, _, _) = player_server("http://127.0.0.1:9", Some("secret-1")).await;

    for body in [
        json!({"redirectUri": "http://127.0.0.1:8888/callback"}),
        json!({"code": "abc123"}),
        json!({}),
    ] {
        let response = client()
            .post(format!("{}/api/token", base))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"error": "Missing required parameters"}));
    }
}

#[tokio::test]
async fn test_exchange_requires_client_secret() {
    let (base, _, _) = player_server("http://127.0.0.1:9", None).await;
    let response = client()
        .post(format!("{}/api/token", base))
        .json(&json!({"code": "abc123", "redirectUri": "http://127.0.0.1:8888/callback"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_exchange_forwards_provider_success() {
    let reply = json!({"access_token": "tok1", "token_type": "Bearer", "expires_in": 3600});
    let (token_base, seen) = token_endpoint(StatusCode::OK, reply.clone()).await;
    let (base, _, _) = player_server(&token_base, Some("secret-1")).await;

    let response = client()
        .post(format!("{}/api/token", base))
        .json(&json!({"code": "abc123", "redirectUri": "http://127.0.0.1:8888/callback"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), reply);

    let seen = seen.lock().unwrap().clone();
    // base64("client-1:secret-1")
    assert_eq!(
        seen.authorization.as_deref(),
        Some("Basic Y2xpZW50LTE6c2VjcmV0LTE=")
    );
    assert_eq!(seen.form["grant_type"], "authorization_code");
    assert_eq!(seen.form["code"], "abc123");
    assert_eq!(seen.form["redirect_uri"], "http://127.0.0.1:8888/callback");
}

#[tokio::test]
async fn test_exchange_forwards_provider_failure() {
    let reply = json!({
        "error": "invalid_grant",
        "error_description": "Invalid authorization code"
    });
    let (token_base, _) = token_endpoint(StatusCode::BAD_REQUEST, reply.clone()).await;
    let (base, _, _) = player_server(&token_base, Some("secret-1")).await;

    let response = client()
        .post(format!("{}/api/token", base))
        .json(&json!({"code": "bad", "redirectUri": "http://127.0.0.1:8888/callback"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(response.json::<Value>().await.unwrap(), reply);
}

#[tokio::test]
async fn test_exchange_reports_unreachable_provider() {
    let dead = format!("http://{}", dead_addr().await);
    let (base, _, _) = player_server(&dead, Some("secret-1")).await;

    let response = client()
        .post(format!("{}/api/token", base))
        .json(&json!({"code": "abc123", "redirectUri": "http://127.0.0.1:8888/callback"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"error": "Internal server error"}));
}

#[tokio::test]
async fn test_login_redirects_to_consent_page() {
    let (base, state, store) = player_server("http://127.0.0.1:9", Some("secret-1")).await;
    store.save(&Credential::new("old")).await.unwrap();

    let response = client().get(format!("{}/login", base)).send().await.unwrap();

    assert!(response.status().is_redirection());
    let location = response.headers()["location"].to_str().unwrap().to_string();
    assert!(location.starts_with("https://accounts.spotify.com/authorize?"));

    let pending = state.pending_state.lock().await.clone().unwrap();
    assert!(location.contains(&format!("state={}", pending)));
    assert!(store.load().await.is_none());
}

#[tokio::test]
async fn test_callback_completes_login() {
    let (token_base, _) = token_endpoint(StatusCode::OK, json!({"access_token": "tok1"})).await;
    let (base, state, store) = player_server(&token_base, Some("secret-1")).await;
    let mut issued = state.issued.subscribe();
    state.expect_state("s1".into()).await;

    let response = client()
        .get(format!("{}/callback?code=abc123&state=s1", base))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let page = response.text().await.unwrap();
    assert!(page.contains("http-equiv=\"refresh\""));
    assert!(page.contains("url=/"));

    assert_eq!(store.load().await, Some(Credential::new("tok1")));
    issued.changed().await.unwrap();
    assert_eq!(*issued.borrow(), Some(Credential::new("tok1")));
}

#[tokio::test]
async fn test_callback_with_denied_consent() {
    let (token_base, seen) = token_endpoint(StatusCode::OK, json!({"access_token": "tok1"})).await;
    let (base, state, store) = player_server(&token_base, Some("secret-1")).await;
    state.expect_state("s1".into()).await;

    let response = client()
        .get(format!("{}/callback?error=access_denied&state=s1", base))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert!(response.text().await.unwrap().contains("url=/"));
    assert!(seen.lock().unwrap().authorization.is_none());
    assert!(store.load().await.is_none());
    assert!(state.issued.borrow().is_none());
}

#[tokio::test]
async fn test_callback_hands_credential_to_session() {
    let (token_base, _) = token_endpoint(StatusCode::OK, json!({"access_token": "tok1"})).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let token_url = format!("{}/api/token", token_base);
    let exchange_url = format!("http://{}/api/token", addr);
    let config = config_with(&[
        ("SPOTIFY_TOKEN_URL", token_url.as_str()),
        ("TOKEN_EXCHANGE_URL", exchange_url.as_str()),
    ]);

    let store = TokenStore::in_memory(Arc::new(SpotifyApi::new(token_base.clone())));
    let session = Session::new(
        config.clone(),
        store.clone(),
        MockProvider::accepting(&["tok1"]),
        MockEngineFactory::new(),
        Arc::new(NoNavigation),
    );
    let handle = session.handle();
    let mut view = handle.subscribe();
    tokio::spawn(session.run());

    let state = Arc::new(AppState::new(config, store, Some(handle.clone())));
    tokio::spawn(server::serve(listener, Arc::clone(&state)));
    state.expect_state("s1".into()).await;

    client()
        .get(format!("http://{}/callback?code=abc123&state=s1", addr))
        .send()
        .await
        .unwrap();

    tokio::time::timeout(
        std::time::Duration::from_secs(2),
        view.wait_for(|v| v.phase == SessionPhase::AwaitingEngine),
    )
    .await
    .unwrap()
    .unwrap();

    handle.shutdown();
}
