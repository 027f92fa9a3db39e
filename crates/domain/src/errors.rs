//! Closed error sum types, one per component, each with an HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// Predictor errors (spec.md §7).
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("{0}")]
    Validation(String),
    #[error("room {0} not found")]
    RoomNotFound(i64),
    #[error("prediction model is not ready: {0}")]
    ModelNotReady(String),
    #[error("database error: {0}")]
    Database(String),
}

/// Allocator errors (spec.md §7).
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("{0}")]
    Validation(String),
    #[error("solver unavailable: {0}")]
    SolverUnavailable(String),
    #[error("database error: {0}")]
    Database(String),
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

/// Simulator errors (spec.md §7).
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(String),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

/// Workflow errors (spec.md §7).
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("no allocation draft is pending approval")]
    AllocationDraftNotFound,
    #[error(transparent)]
    Prediction(#[from] PredictionError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Top-level error returned by HTTP handlers; implements [`IntoResponse`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if matches!(self, ApiError::Internal(_)) {
            tracing::error!("internal error: {}", self);
        }
        let body = ErrorResponse {
            error: self.to_string(),
            details: None,
        };
        (status, Json(body)).into_response()
    }
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        match err {
            PredictionError::Validation(msg) => ApiError::Validation(msg),
            PredictionError::RoomNotFound(id) => {
                ApiError::NotFound(format!("room {id} not found"))
            }
            PredictionError::ModelNotReady(msg) => ApiError::ServiceUnavailable(msg),
            PredictionError::Database(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::Validation(msg) => ApiError::Validation(msg),
            AllocationError::SolverUnavailable(msg) => ApiError::ServiceUnavailable(msg),
            AllocationError::Database(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
            AllocationError::Prediction(inner) => inner.into(),
        }
    }
}

impl From<SimulationError> for ApiError {
    fn from(err: SimulationError) -> Self {
        match err {
            SimulationError::Validation(msg) => ApiError::Validation(msg),
            SimulationError::Database(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
            SimulationError::Allocation(inner) => inner.into(),
            SimulationError::Prediction(inner) => inner.into(),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::AllocationDraftNotFound => {
                ApiError::Validation("no allocation draft is pending approval".to_string())
            }
            WorkflowError::Prediction(inner) => inner.into(),
            WorkflowError::Allocation(inner) => inner.into(),
            WorkflowError::Simulation(inner) => inner.into(),
        }
    }
}

impl From<sqlx::Error> for PredictionError {
    fn from(err: sqlx::Error) -> Self {
        PredictionError::Database(err.to_string())
    }
}

impl From<sqlx::Error> for AllocationError {
    fn from(err: sqlx::Error) -> Self {
        AllocationError::Database(err.to_string())
    }
}

impl From<sqlx::Error> for SimulationError {
    fn from(err: sqlx::Error) -> Self {
        SimulationError::Database(err.to_string())
    }
}
