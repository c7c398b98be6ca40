#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;

use copytrade_portal::app::{self, AppState};
use copytrade_portal::auth::TokenVerifier;
use copytrade_portal::config::AppConfig;
use copytrade_portal::identity::MemoryIdentityStore;
use copytrade_portal::media::MemoryMediaStore;
use copytrade_portal::models::User;
use copytrade_portal::session::CancelHandle;

pub const SERVICE_KEY: &str = "test-service-key";
pub const ADMIN_UID: &str = "admin-1";
pub const MEMBER_UID: &str = "member-1";

/// A portal instance on a loopback port, backed by in-memory stores.
pub struct TestApp {
    pub base_url: String,
    pub identity: MemoryIdentityStore,
    pub media: MemoryMediaStore,
    pub verifier: TokenVerifier,
    pub client: reqwest::Client,
    pub shutdown: CancelHandle,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Session token for `uid`. The admin hint is deliberately left unset so
    /// the store's record is the only source of privilege.
    pub fn token_for(&self, uid: &str) -> String {
        self.verifier.issue(uid, false).expect("failed to issue token")
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.server.log_level = "warn".to_string();
    config.session.secret = "integration-test-secret".to_string();
    config.session.gate_timeout_ms = 2_000;
    config.security.admin_service_key = Some(SERVICE_KEY.to_string());
    config
}

pub fn seed_users() -> Vec<User> {
    let mut member = User::new(MEMBER_UID, "Morgan Member");
    member.balance = 1_250.0;
    member.kyc_verified = true;
    vec![User::new(ADMIN_UID, "Avery Admin").with_admin(true), member]
}

pub async fn spawn_app() -> Result<TestApp> {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: AppConfig) -> Result<TestApp> {
    let identity = MemoryIdentityStore::with_users(seed_users());
    let media = MemoryMediaStore::new();
    let verifier = TokenVerifier::from_config(&config.session);
    let (shutdown, token) = CancelHandle::new();

    let state = Arc::new(AppState::new(
        config,
        Arc::new(identity.clone()),
        Arc::new(media.clone()),
        token,
    ));

    let base_url = serve(app::router(state)).await?;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(10))
        .build()?;

    Ok(TestApp {
        base_url,
        identity,
        media,
        verifier,
        client,
        shutdown,
    })
}

/// Serve `router` on an unused loopback port and return its base URL.
pub async fn serve(router: Router) -> Result<String> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Ok(format!("http://127.0.0.1:{}", port))
}

/// Stand-in upload endpoint that always answers with `status` and `body`.
pub struct MockUpload {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl MockUpload {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub async fn spawn_mock_upload(status: StatusCode, body: Value) -> Result<MockUpload> {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let router = Router::new().route(
        "/api/upload",
        post(move || {
            let counter = Arc::clone(&counter);
            let body = body.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (status, Json(body)).into_response()
            }
        }),
    );

    let base_url = serve(router).await?;
    Ok(MockUpload { base_url, hits })
}
