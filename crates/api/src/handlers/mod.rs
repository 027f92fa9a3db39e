pub mod allocation;
pub mod login;
pub mod prediction;
pub mod simulation;
pub mod workflow;

use room_allocator_domain::ApiError;

/// Flattens `validator::ValidationErrors` into a single 400 response.
pub(crate) fn validation_err(errors: validator::ValidationErrors) -> ApiError {
    ApiError::Validation(errors.to_string())
}
