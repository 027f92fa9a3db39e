//! `/login`, grounded in `dashboard_controller.login` / `auth_service.AuthService`.

use std::sync::Arc;

use axum::{Json, extract::State};
use validator::Validate;

use room_allocator_domain::{ApiError, LoginRequest, LoginResponse};

use crate::AppState;

use super::validation_err;

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    payload.validate().map_err(validation_err)?;
    let token = state.auth.login(&payload.admin_token).await?;
    Ok(Json(LoginResponse::bearer(token)))
}
