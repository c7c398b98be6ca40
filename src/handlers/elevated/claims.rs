// handlers/elevated/claims.rs - POST/DELETE /api/admin/claim handlers
//
// Grant or revoke the admin flag on one user record. Order of checks:
// 1. body carries a non-empty uid (no provider call otherwise)
// 2. caller is a trusted service or an admin subject
// 3. mutate the record

use axum::{body::Bytes, extract::State, http::HeaderMap};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use crate::app::{AppState, SharedState};
use crate::auth::{service_key_matches, session_token, SERVICE_KEY_HEADER};
use crate::error::ApiError;
use crate::gate::{AuthGate, DenyReason, GateDecision, Predicate};
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    #[serde(default)]
    pub uid: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimOutcome {
    pub uid: String,
    pub is_admin: bool,
}

/// Who asked for the mutation, for the audit log line.
#[derive(Debug, Clone, PartialEq)]
pub enum Actor {
    Service,
    Admin(String),
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Service => write!(f, "service"),
            Actor::Admin(uid) => write!(f, "admin:{}", uid),
        }
    }
}

/// POST /api/admin/claim - Set isAdmin = true
pub async fn grant_admin(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<ClaimOutcome> {
    set_claim(&state, &headers, &body, true).await
}

/// DELETE /api/admin/claim - Set isAdmin = false
pub async fn revoke_admin(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<ClaimOutcome> {
    set_claim(&state, &headers, &body, false).await
}

async fn set_claim(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
    is_admin: bool,
) -> ApiResult<ClaimOutcome> {
    let uid = required_uid(body)?;
    let actor = authorize_caller(state, headers).await?;

    state.identity.set_admin(&uid, is_admin).await?;

    info!("Admin claim set to {} for {} by {}", is_admin, uid, actor);
    Ok(ApiResponse::success(ClaimOutcome { uid, is_admin }))
}

/// The uid is used verbatim; an absent body counts as an absent uid.
fn required_uid(body: &[u8]) -> Result<String, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::missing_parameter("uid"));
    }

    let request: ClaimRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::invalid_json(format!("Failed to parse the request body as JSON: {}", e)))?;

    request
        .uid
        .filter(|uid| !uid.trim().is_empty())
        .ok_or_else(|| ApiError::missing_parameter("uid"))
}

async fn authorize_caller(state: &AppState, headers: &HeaderMap) -> Result<Actor, ApiError> {
    if let Some(presented) = headers.get(SERVICE_KEY_HEADER) {
        let presented = presented.to_str().unwrap_or_default();
        return match state.config.security.admin_service_key.as_deref() {
            Some(expected) if service_key_matches(presented, expected) => Ok(Actor::Service),
            _ => {
                warn!("Rejected admin claim call with invalid service key");
                Err(ApiError::unauthorized("Invalid service key"))
            }
        };
    }

    let Some(token) = session_token(headers, &state.config.session.cookie_name) else {
        return Err(ApiError::unauthorized("Authentication required"));
    };

    let mut context = state.auth_context(Some(token));
    let mut gate = AuthGate::new(Predicate::Admin);
    let decision = gate
        .run(context.resolve(), state.gate_timeout(), &state.shutdown)
        .await;

    match decision {
        GateDecision::Render(user) => Ok(Actor::Admin(user.uid.clone())),
        GateDecision::Loading => Err(ApiError::service_unavailable("Caller could not be verified")),
        GateDecision::Redirect { reason: DenyReason::PredicateFailed, .. } => {
            warn!("Non-admin caller attempted to change admin claims");
            Err(ApiError::forbidden("Admin privileges required"))
        }
        GateDecision::Redirect { .. } => Err(ApiError::unauthorized("Authentication required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_must_be_present_and_non_empty() {
        let bodies: [&[u8]; 5] = [b"", b"  \n", b"{}", br#"{"uid":null}"#, br#"{"uid":"  "}"#];
        for body in bodies {
            assert!(
                matches!(required_uid(body), Err(ApiError::MissingParameter(_))),
                "body {:?}",
                String::from_utf8_lossy(body)
            );
        }

        assert!(matches!(required_uid(br#"{"uid":"#), Err(ApiError::InvalidJson(_))));
        assert_eq!(required_uid(br#"{"uid":"user-1"}"#).unwrap(), "user-1");
    }

    #[test]
    fn uid_is_not_normalised() {
        assert_eq!(required_uid(br#"{"uid":" user-1 "}"#).unwrap(), " user-1 ");
    }

    #[test]
    fn actor_display() {
        assert_eq!(Actor::Service.to_string(), "service");
        assert_eq!(Actor::Admin("a1".into()).to_string(), "admin:a1");
    }
}
