//! Bearer-token admin guard, grounded in `auth_service.AuthService`: a single
//! shared operator secret (`admin_token`) exchanged at `/login` for a random
//! per-process session token, compared in constant time.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rand::Rng;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use room_allocator_domain::ApiError;

use crate::AppState;

/// Holds the configured admin token and the current login session, if any.
/// `admin_token` empty means the guard is disabled entirely (spec.md §6).
pub struct AdminAuth {
    admin_token: String,
    session_token: RwLock<Option<String>>,
}

impl AdminAuth {
    pub fn new(admin_token: String) -> Self {
        Self {
            admin_token,
            session_token: RwLock::new(None),
        }
    }

    pub fn auth_enabled(&self) -> bool {
        !self.admin_token.is_empty()
    }

    /// Validates `provided` against the configured admin token and mints a
    /// fresh session token, overwriting any previous session.
    pub async fn login(&self, provided: &str) -> Result<String, ApiError> {
        if self.admin_token.is_empty() {
            return Err(ApiError::Unauthorized(
                "ADMIN_TOKEN is not configured".to_string(),
            ));
        }
        if !constant_time_eq(provided, &self.admin_token) {
            return Err(ApiError::Unauthorized("invalid admin token".to_string()));
        }
        let token = generate_session_token();
        let mut session = self.session_token.write().await;
        *session = Some(token.clone());
        Ok(token)
    }

    /// Validates a bearer token against the active session. A no-op when
    /// auth is disabled.
    pub async fn validate_bearer(&self, bearer_token: &str) -> Result<(), ApiError> {
        if !self.auth_enabled() {
            return Ok(());
        }
        let session = self.session_token.read().await;
        match session.as_deref() {
            Some(expected) if constant_time_eq(bearer_token, expected) => Ok(()),
            Some(_) => Err(ApiError::Unauthorized("invalid bearer token".to_string())),
            None => Err(ApiError::Unauthorized(
                "no active session; login first".to_string(),
            )),
        }
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn generate_session_token() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..43).map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char).collect()
}

/// Extractor that enforces the bearer-token guard on protected routes.
/// Transparently succeeds when `ADMIN_TOKEN` is unset.
pub struct RequireAdmin;

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        if !state.auth.auth_enabled() {
            return Ok(Self);
        }
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Authorization header must be a Bearer token".to_string()))?;
        state.auth.validate_bearer(token).await?;
        Ok(Self)
    }
}
