use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use url::Url;

use super::{accept_record, IdentityError, IdentityStore};
use crate::models::User;

/// Privileged REST binding to the hosted identity provider.
///
/// Routes, relative to the configured base URL:
/// - `GET users` / `GET users/{uid}`
/// - `PATCH users/{uid}` with `{"isAdmin": bool}`
/// - `GET health`
pub struct HttpIdentityStore {
    base_url: Url,
    service_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UserList {
    Wrapped { users: Vec<User> },
    Bare(Vec<User>),
}

impl HttpIdentityStore {
    pub fn new(base_url: &str, service_key: Option<String>, timeout_ms: u64) -> Result<Self, IdentityError> {
        // Url::join drops the last segment unless the base ends with '/'
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| IdentityError::Malformed(format!("invalid identity base url: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(concat!("copytrade-portal/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { base_url, service_key, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        self.base_url
            .join(path)
            .map_err(|e| IdentityError::Malformed(format!("invalid identity path '{}': {}", path, e)))
    }

    fn user_endpoint(&self, uid: &str) -> Result<Url, IdentityError> {
        let mut url = self.endpoint("users/")?;
        url.path_segments_mut()
            .map_err(|_| IdentityError::Malformed("identity base url cannot be a base".to_string()))?
            .pop_if_empty()
            .push(uid);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.service_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn rejected(response: reqwest::Response) -> IdentityError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(512)
            .collect();
        IdentityError::Rejected { status, message }
    }
}

#[async_trait]
impl IdentityStore for HttpIdentityStore {
    async fn fetch_user(&self, uid: &str) -> Result<Option<User>, IdentityError> {
        let url = self.user_endpoint(uid)?;
        let response = self.authorize(self.client.get(url)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let user: User = response
                    .json()
                    .await
                    .map_err(|e| IdentityError::Malformed(e.to_string()))?;
                accept_record(uid, user).map(Some)
            }
            _ => Err(Self::rejected(response).await),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, IdentityError> {
        let url = self.endpoint("users")?;
        let response = self.authorize(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let users = match response
            .json::<UserList>()
            .await
            .map_err(|e| IdentityError::Malformed(e.to_string()))?
        {
            UserList::Wrapped { users } | UserList::Bare(users) => users,
        };

        users
            .into_iter()
            .map(|user| {
                let uid = user.uid.clone();
                accept_record(&uid, user)
            })
            .collect()
    }

    async fn set_admin(&self, uid: &str, is_admin: bool) -> Result<(), IdentityError> {
        let url = self.user_endpoint(uid)?;
        let response = self
            .authorize(self.client.patch(url))
            .json(&json!({ "isAdmin": is_admin }))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(IdentityError::NotFound(uid.to_string())),
            status if status.is_success() => Ok(()),
            _ => Err(Self::rejected(response).await),
        }
    }

    async fn health_check(&self) -> Result<(), IdentityError> {
        let url = self.endpoint("health")?;
        let response = self.authorize(self.client.get(url)).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::rejected(response).await)
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
