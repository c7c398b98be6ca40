//! Per-session view of the current subject.
//!
//! An [`AuthContext`] is built explicitly from the shared identity store and
//! token verifier and handed to whoever needs the subject. It starts out
//! loading and flips exactly once, when resolution succeeds.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::auth::TokenVerifier;
use crate::identity::{IdentityError, IdentityStore};
use crate::models::User;

/// Read-only snapshot of an [`AuthContext`].
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub loading: bool,
}

pub struct AuthContext {
    store: Arc<dyn IdentityStore>,
    verifier: TokenVerifier,
    token: Option<String>,
    user: Option<User>,
    loading: bool,
}

impl AuthContext {
    pub fn new(store: Arc<dyn IdentityStore>, verifier: TokenVerifier, token: Option<String>) -> Self {
        Self {
            store,
            verifier,
            token,
            user: None,
            loading: true,
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            user: self.user.clone(),
            loading: self.loading,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Resolve the subject behind the session token.
    ///
    /// Missing, invalid or expired tokens and unknown uids all resolve to
    /// `Ok(None)`. Only provider failures are errors, and they leave the
    /// context loading.
    pub async fn resolve(&mut self) -> Result<Option<User>, IdentityError> {
        let subject = match self.token.as_deref() {
            None => None,
            Some(token) => match self.verifier.verify(token) {
                Ok(claims) => self.store.fetch_user(&claims.sub).await?,
                Err(e) => {
                    debug!("Session token rejected: {}", e);
                    None
                }
            },
        };

        self.user = subject.clone();
        self.loading = false;
        Ok(subject)
    }

    /// Drop the cached subject and resolve again, picking up claim changes.
    pub async fn refresh(&mut self) -> Result<Option<User>, IdentityError> {
        self.user = None;
        self.loading = true;
        self.resolve().await
    }
}

/// Owner side of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observer side of a cancellation signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelHandle {
    pub fn new() -> (Self, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancelToken { rx })
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken { rx: self.tx.subscribe() }
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once cancelled. Pends forever if the handle is dropped
    /// without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryIdentityStore;
    use std::time::Duration;

    fn context(store: &MemoryIdentityStore, token: Option<String>) -> AuthContext {
        AuthContext::new(Arc::new(store.clone()), TokenVerifier::new("secret", 1), token)
    }

    #[tokio::test]
    async fn starts_loading_then_resolves_subject() {
        let store = MemoryIdentityStore::with_users([User::new("user-1", "Ada")]);
        let token = TokenVerifier::new("secret", 1).issue("user-1", false).unwrap();
        let mut ctx = context(&store, Some(token));

        assert!(ctx.is_loading());
        assert!(ctx.user().is_none());

        let user = ctx.resolve().await.unwrap();
        assert_eq!(user.map(|u| u.uid), Some("user-1".to_string()));
        assert!(!ctx.is_loading());
    }

    #[tokio::test]
    async fn missing_or_bad_token_resolves_to_none_without_store_call() {
        let store = MemoryIdentityStore::with_users([User::new("user-1", "Ada")]);

        let mut ctx = context(&store, None);
        assert_eq!(ctx.resolve().await.unwrap(), None);

        let mut ctx = context(&store, Some("garbage".into()));
        assert_eq!(ctx.resolve().await.unwrap(), None);
        assert_eq!(ctx.snapshot(), AuthSnapshot { user: None, loading: false });
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn provider_failure_keeps_loading() {
        let store = MemoryIdentityStore::with_users([User::new("user-1", "Ada")]);
        store.set_unavailable(true);
        let token = TokenVerifier::new("secret", 1).issue("user-1", false).unwrap();
        let mut ctx = context(&store, Some(token));

        assert!(ctx.resolve().await.is_err());
        assert!(ctx.is_loading());
    }

    #[tokio::test]
    async fn claim_change_visible_only_after_refresh() {
        let store = MemoryIdentityStore::with_users([User::new("user-1", "Ada")]);
        let token = TokenVerifier::new("secret", 1).issue("user-1", false).unwrap();
        let mut ctx = context(&store, Some(token));
        ctx.resolve().await.unwrap();

        store.set_admin("user-1", true).await.unwrap();
        assert!(!ctx.user().unwrap().is_admin);

        ctx.refresh().await.unwrap();
        assert!(ctx.user().unwrap().is_admin);
    }

    #[tokio::test]
    async fn cancel_token_fires() {
        let (handle, token) = CancelHandle::new();
        assert!(!token.is_cancelled());

        let waiter = tokio::spawn(async move { token.cancelled().await });
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(handle.token().is_cancelled());
    }
}
