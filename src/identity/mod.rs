//! Bindings to the external identity provider that owns user records.
//!
//! The rest of the crate only sees [`IdentityStore`]. [`HttpIdentityStore`]
//! talks to the hosted provider with a privileged service key;
//! [`MemoryIdentityStore`] backs development and tests.

mod http;
mod memory;

pub use http::HttpIdentityStore;
pub use memory::MemoryIdentityStore;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::IdentityConfig;
use crate::models::{User, UserValidationError};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Identity provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid user record for '{uid}': {source}")]
    InvalidRecord {
        uid: String,
        #[source]
        source: UserValidationError,
    },

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Failed to load fixture: {0}")]
    Fixture(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Read/write access to user records held by the identity provider.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fetch one record. `Ok(None)` when the provider has no such user.
    async fn fetch_user(&self, uid: &str) -> Result<Option<User>, IdentityError>;

    async fn list_users(&self) -> Result<Vec<User>, IdentityError>;

    /// Set the elevated-privilege flag. The only writer of `isAdmin`.
    async fn set_admin(&self, uid: &str, is_admin: bool) -> Result<(), IdentityError>;

    async fn health_check(&self) -> Result<(), IdentityError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Validate a record arriving from the provider and pin its uid.
pub(crate) fn accept_record(uid: &str, mut user: User) -> Result<User, IdentityError> {
    if user.uid.is_empty() {
        user.uid = uid.to_string();
    }
    user.validate().map_err(|source| IdentityError::InvalidRecord {
        uid: uid.to_string(),
        source,
    })?;
    Ok(user)
}

/// Build the store selected by configuration.
pub async fn from_config(config: &IdentityConfig) -> Result<Arc<dyn IdentityStore>, IdentityError> {
    if let Some(base_url) = &config.base_url {
        let store = HttpIdentityStore::new(base_url, config.service_key.clone(), config.request_timeout_ms)?;
        tracing::info!("Using identity provider at {}", base_url);
        return Ok(Arc::new(store));
    }

    let store = match &config.fixture_path {
        Some(path) => {
            let store = MemoryIdentityStore::from_fixture(path).await?;
            tracing::info!("Using in-memory identity store seeded from {}", path);
            store
        }
        None => {
            tracing::warn!("No identity provider configured, using empty in-memory store");
            MemoryIdentityStore::new()
        }
    };
    Ok(Arc::new(store))
}
