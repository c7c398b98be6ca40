use axum::http::{header, HeaderMap};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::SessionConfig;

/// Header carrying the trusted server-side key for privileged calls.
pub const SERVICE_KEY_HEADER: &str = "x-service-key";

/// Longest session lifetime a token may be issued for (one year).
pub const MAX_EXPIRY_HOURS: u64 = 24 * 366;

/// Session token claims as issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject uid.
    pub sub: String,
    /// Admin claim as of issuance. Informational only: gates read the
    /// store's `isAdmin`, which may have changed since.
    #[serde(default)]
    pub admin: bool,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: impl Into<String>, admin: bool, expiry_hours: u64) -> Result<Self, JwtError> {
        let now = Utc::now();
        let exp = i64::try_from(expiry_hours)
            .ok()
            .and_then(TimeDelta::try_hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                JwtError::TokenGeneration(format!("expiry of {} hours is out of range", expiry_hours))
            })?;

        Ok(Self {
            sub: sub.into(),
            admin,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        })
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,
}

/// Signs and verifies HS256 session tokens with the shared session secret.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: String,
    expiry_hours: u64,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("expiry_hours", &self.expiry_hours)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(secret: impl Into<String>, expiry_hours: u64) -> Self {
        Self {
            secret: secret.into(),
            expiry_hours,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.secret.clone(), config.expiry_hours)
    }

    pub fn issue(&self, uid: &str, admin: bool) -> Result<String, JwtError> {
        self.sign(&Claims::new(uid, admin, self.expiry_hours)?)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        if self.secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }

        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    /// Validate signature and expiry and return the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        if self.secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| JwtError::InvalidToken(e.to_string()))
    }
}

/// Extract Bearer token from Authorization header
///
/// Parses "Bearer <token>" format and returns the token portion.
pub fn extract_bearer_token(auth_header: &str) -> Result<String, String> {
    const BEARER_PREFIX: &str = "Bearer ";

    let Some(token) = auth_header.strip_prefix(BEARER_PREFIX) else {
        return Err("Authorization header must start with 'Bearer '".to_string());
    };

    let token = token.trim();
    if token.is_empty() {
        return Err("Bearer token is empty".to_string());
    }

    Ok(token.to_string())
}

/// Session token from the Authorization header, falling back to the session cookie.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return extract_bearer_token(value).ok();
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Compare a presented service key against the configured one.
///
/// Both sides are hashed first so the comparison length is fixed.
pub fn service_key_matches(presented: &str, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.as_slice().ct_eq(b.as_slice()).into()
}
