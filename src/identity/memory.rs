use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use super::{accept_record, IdentityError, IdentityStore};
use crate::models::User;

/// In-process stand-in for the identity provider.
///
/// Counts every store call so callers can assert that validation failures
/// never reach the provider. Latency and outages can be simulated.
#[derive(Clone, Default)]
pub struct MemoryIdentityStore {
    users: Arc<RwLock<HashMap<String, User>>>,
    calls: Arc<AtomicUsize>,
    latency_ms: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let map = users.into_iter().map(|u| (u.uid.clone(), u)).collect();
        Self {
            users: Arc::new(RwLock::new(map)),
            ..Self::default()
        }
    }

    /// Load a JSON array of user records.
    pub async fn from_fixture(path: &str) -> Result<Self, IdentityError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| IdentityError::Fixture(format!("{}: {}", path, e)))?;
        let users: Vec<User> = serde_json::from_str(&raw)
            .map_err(|e| IdentityError::Fixture(format!("{}: {}", path, e)))?;

        let mut accepted = Vec::with_capacity(users.len());
        for user in users {
            if user.uid.is_empty() {
                return Err(IdentityError::Fixture(format!("{}: record without uid", path)));
            }
            let uid = user.uid.clone();
            accepted.push(accept_record(&uid, user)?);
        }
        Ok(Self::with_users(accepted))
    }

    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.uid.clone(), user);
    }

    /// Number of store operations served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Delay every operation, to exercise resolution timeouts.
    pub fn set_latency(&self, latency: Duration) {
        let ms = usize::try_from(latency.as_millis()).unwrap_or(usize::MAX);
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Make every operation fail as if the provider were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    async fn enter(&self) -> Result<(), IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency as u64)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityError::Rejected {
                status: 503,
                message: "identity store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn fetch_user(&self, uid: &str) -> Result<Option<User>, IdentityError> {
        self.enter().await?;
        Ok(self.users.read().await.get(uid).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, IdentityError> {
        self.enter().await?;
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.uid.cmp(&b.uid));
        Ok(users)
    }

    async fn set_admin(&self, uid: &str, is_admin: bool) -> Result<(), IdentityError> {
        self.enter().await?;
        let mut users = self.users.write().await;
        let user = users
            .get_mut(uid)
            .ok_or_else(|| IdentityError::NotFound(uid.to_string()))?;
        user.is_admin = is_admin;
        debug!("Set isAdmin={} for {}", is_admin, uid);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), IdentityError> {
        self.enter().await
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
