//! Authorization gate for protected views.
//!
//! A gate starts in [`GateState::Resolving`] and moves exactly once, to
//! `Authorized` or `Denied`. There is no way back out of a terminal state;
//! re-checking a subject means building a new gate.
//!
//! Resolution is bounded: if the subject is not known within the timeout the
//! gate denies. Provider errors and cancellation leave it resolving, so the
//! caller keeps showing a loading state and never renders protected content.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::identity::IdentityError;
use crate::models::User;
use crate::session::CancelToken;

/// Public route a denied gate sends the visitor to.
pub const DEFAULT_FALLBACK_ROUTE: &str = "/";

/// What a protected tree demands of the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Any resolved subject.
    Authenticated,
    /// A resolved subject whose `isAdmin` flag is set.
    Admin,
}

impl Predicate {
    /// Pure check of the resolved subject. Absence always fails.
    pub fn evaluate(self, subject: Option<&User>) -> bool {
        match (self, subject) {
            (_, None) => false,
            (Predicate::Authenticated, Some(_)) => true,
            (Predicate::Admin, Some(user)) => user.is_admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Resolution finished without a subject.
    NoSubject,
    /// A subject was resolved but failed the predicate.
    PredicateFailed,
    /// Resolution did not finish in time.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateState {
    Resolving,
    Authorized(User),
    Denied(DenyReason),
}

/// What the caller should render for the current state.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision<'a> {
    /// Show a loading indicator, nothing protected.
    Loading,
    /// Render the protected tree for this subject.
    Render(&'a User),
    /// Navigate away to the fallback route.
    Redirect { to: &'a str, reason: DenyReason },
}

#[derive(Debug, Clone)]
pub struct AuthGate {
    predicate: Predicate,
    fallback: String,
    state: GateState,
}

impl AuthGate {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            fallback: DEFAULT_FALLBACK_ROUTE.to_string(),
            state: GateState::Resolving,
        }
    }

    pub fn with_fallback(mut self, route: impl Into<String>) -> Self {
        self.fallback = route.into();
        self
    }

    pub fn predicate(&self) -> Predicate {
        self.predicate
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_resolving(&self) -> bool {
        matches!(self.state, GateState::Resolving)
    }

    /// Record the outcome of resolution. Ignored once terminal.
    pub fn complete(&mut self, subject: Option<User>) -> &GateState {
        if !self.is_resolving() {
            return &self.state;
        }

        let allowed = self.predicate.evaluate(subject.as_ref());
        self.state = match (allowed, subject) {
            (true, Some(user)) => GateState::Authorized(user),
            (_, None) => GateState::Denied(DenyReason::NoSubject),
            (false, Some(_)) => GateState::Denied(DenyReason::PredicateFailed),
        };
        &self.state
    }

    /// Deny because resolution ran out of time. Ignored once terminal.
    pub fn time_out(&mut self) -> &GateState {
        if self.is_resolving() {
            self.state = GateState::Denied(DenyReason::TimedOut);
        }
        &self.state
    }

    pub fn decision(&self) -> GateDecision<'_> {
        match &self.state {
            GateState::Resolving => GateDecision::Loading,
            GateState::Authorized(user) => GateDecision::Render(user),
            GateState::Denied(reason) => GateDecision::Redirect {
                to: &self.fallback,
                reason: *reason,
            },
        }
    }

    /// Drive a resolution future to a decision.
    ///
    /// - resolves in time: `complete` with the subject
    /// - errors: stays resolving
    /// - exceeds `timeout`: denied with [`DenyReason::TimedOut`]
    /// - `cancel` fires first: stays resolving
    pub async fn run<F>(&mut self, resolution: F, timeout: Duration, cancel: &CancelToken) -> GateDecision<'_>
    where
        F: Future<Output = Result<Option<User>, IdentityError>>,
    {
        if !self.is_resolving() {
            return self.decision();
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Gate resolution cancelled");
            }
            outcome = tokio::time::timeout(timeout, resolution) => match outcome {
                Ok(Ok(subject)) => {
                    self.complete(subject);
                }
                Ok(Err(e)) => {
                    warn!("Subject resolution failed, gate stays resolving: {}", e);
                }
                Err(_) => {
                    warn!("Subject resolution exceeded {:?}, denying", timeout);
                    self.time_out();
                }
            },
        }

        self.decision()
    }
}
