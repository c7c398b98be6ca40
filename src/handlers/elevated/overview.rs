// handlers/elevated/overview.rs - GET /admin handler

use axum::{extract::State, Extension};
use serde::Serialize;

use crate::app::SharedState;
use crate::middleware::{ApiResponse, ApiResult, Subject};
use crate::models::User;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    pub viewer: String,
    pub total_users: usize,
    pub admin_count: usize,
    pub kyc_pending: usize,
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub uid: String,
    pub name: String,
    pub is_admin: bool,
    pub kyc_verified: bool,
    pub balance: f64,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            uid: user.uid.clone(),
            name: user.name.clone(),
            is_admin: user.is_admin,
            kyc_verified: user.kyc_verified,
            balance: user.balance,
        }
    }
}

/// GET /admin - User roster for the admin shell
pub async fn overview(
    State(state): State<SharedState>,
    Extension(Subject(viewer)): Extension<Subject>,
) -> ApiResult<AdminOverview> {
    let users = state.identity.list_users().await?;

    Ok(ApiResponse::success(AdminOverview {
        viewer: viewer.uid,
        total_users: users.len(),
        admin_count: users.iter().filter(|u| u.is_admin).count(),
        kyc_pending: users.iter().filter(|u| !u.kyc_verified).count(),
        users: users.iter().map(UserSummary::from).collect(),
    }))
}
