use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde_json::json;
use tracing::debug;

use crate::app::SharedState;
use crate::auth::session_token;
use crate::error::ApiError;
use crate::gate::{AuthGate, DenyReason, GateDecision, Predicate};
use crate::models::User;

/// Subject that passed the gate, injected into request extensions.
#[derive(Clone, Debug)]
pub struct Subject(pub User);

/// How a denied gate is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateMode {
    /// Browser views: redirect to the public fallback route.
    Page,
    /// JSON endpoints: 401 / 403.
    Api,
}

/// Any signed-in subject, browser view.
pub async fn member_page_gate(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    enforce(&state, Predicate::Authenticated, GateMode::Page, request, next).await
}

/// Admin subject, browser view.
pub async fn admin_page_gate(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    enforce(&state, Predicate::Admin, GateMode::Page, request, next).await
}

/// Any signed-in subject, JSON endpoint.
pub async fn member_api_gate(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    enforce(&state, Predicate::Authenticated, GateMode::Api, request, next).await
}

async fn enforce(
    state: &SharedState,
    predicate: Predicate,
    mode: GateMode,
    mut request: Request,
    next: Next,
) -> Response {
    let token = session_token(request.headers(), &state.config.session.cookie_name);
    let mut context = state.auth_context(token);
    let mut gate = AuthGate::new(predicate);

    let decision = gate
        .run(context.resolve(), state.gate_timeout(), &state.shutdown)
        .await;

    match decision {
        GateDecision::Render(user) => {
            debug!("Gate {:?} authorized {} for {}", predicate, user.uid, request.uri().path());
            let subject = Subject(user.clone());
            request.extensions_mut().insert(subject);
            next.run(request).await
        }
        GateDecision::Loading => loading_response(),
        GateDecision::Redirect { to, reason } => {
            debug!("Gate {:?} denied {} ({:?})", predicate, request.uri().path(), reason);
            match mode {
                GateMode::Page => Redirect::to(to).into_response(),
                GateMode::Api => denied_error(reason).into_response(),
            }
        }
    }
}

fn denied_error(reason: DenyReason) -> ApiError {
    match reason {
        DenyReason::NoSubject => ApiError::unauthorized("Authentication required"),
        DenyReason::TimedOut => ApiError::unauthorized("Session could not be verified in time"),
        DenyReason::PredicateFailed => ApiError::forbidden("Insufficient privileges"),
    }
}

/// Still resolving: tell the client to come back, never render protected content.
fn loading_response() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::RETRY_AFTER, "1")],
        Json(json!({ "status": "resolving" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_denials_distinguish_missing_and_insufficient() {
        assert_eq!(denied_error(DenyReason::NoSubject).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(denied_error(DenyReason::TimedOut).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(denied_error(DenyReason::PredicateFailed).status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn loading_response_asks_for_retry() {
        let response = loading_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "1");
    }
}
