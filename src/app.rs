//! Shared state and route table for the portal server.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{TokenVerifier, SERVICE_KEY_HEADER};
use crate::config::{AppConfig, SecurityConfig};
use crate::handlers::{elevated, protected, public};
use crate::identity::IdentityStore;
use crate::media::MediaStore;
use crate::middleware::{admin_page_gate, member_api_gate, member_page_gate};
use crate::session::{AuthContext, CancelToken};

/// Everything handlers need, built once at startup and passed explicitly.
pub struct AppState {
    pub config: AppConfig,
    pub identity: Arc<dyn IdentityStore>,
    pub media: Arc<dyn MediaStore>,
    pub verifier: TokenVerifier,
    /// Fires on shutdown and aborts in-flight subject resolution.
    pub shutdown: CancelToken,
}

pub type SharedState = Arc<AppState>;

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("identity", &self.identity.name())
            .field("media", &self.media.name())
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        config: AppConfig,
        identity: Arc<dyn IdentityStore>,
        media: Arc<dyn MediaStore>,
        shutdown: CancelToken,
    ) -> Self {
        let verifier = TokenVerifier::from_config(&config.session);
        Self {
            config,
            identity,
            media,
            verifier,
            shutdown,
        }
    }

    /// Fresh, unresolved context for one session token.
    pub fn auth_context(&self, token: Option<String>) -> AuthContext {
        AuthContext::new(Arc::clone(&self.identity), self.verifier.clone(), token)
    }

    pub fn gate_timeout(&self) -> Duration {
        self.config.gate_timeout()
    }
}

pub fn router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.security);

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Gated views
        .merge(member_pages(&state))
        .merge(admin_pages(&state))
        .merge(member_api(&state))
        // Privileged claim API (authorizes the caller itself)
        .merge(claim_routes())
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn member_pages(state: &SharedState) -> Router<SharedState> {
    Router::new()
        .route("/dashboard", get(protected::dashboard))
        .route_layer(from_fn_with_state(Arc::clone(state), member_page_gate))
}

fn admin_pages(state: &SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin", get(elevated::overview))
        .route_layer(from_fn_with_state(Arc::clone(state), admin_page_gate))
}

fn member_api(state: &SharedState) -> Router<SharedState> {
    // Multipart framing on top of the file itself
    let body_limit = state.config.media.max_upload_bytes + 64 * 1024;

    Router::new()
        .route("/api/me", get(protected::me))
        .route("/api/upload", post(protected::upload).layer(DefaultBodyLimit::max(body_limit)))
        .route_layer(from_fn_with_state(Arc::clone(state), member_api_gate))
}

fn claim_routes() -> Router<SharedState> {
    Router::new().route(
        "/api/admin/claim",
        post(elevated::grant_admin).delete(elevated::revoke_admin),
    )
}

fn cors_layer(config: &SecurityConfig) -> CorsLayer {
    if !config.enable_cors {
        return CorsLayer::new();
    }
    if config.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(SERVICE_KEY_HEADER),
        ])
        .allow_credentials(true)
}
