//! Domain types for the room allocation service.

pub mod dto;
pub mod entities;
pub mod errors;

use serde::Serialize;

pub use dto::*;
pub use entities::*;
pub use errors::*;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub build_sha: String,
    pub uptime_seconds: u64,
}

/// Ready check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub database: String,
}
