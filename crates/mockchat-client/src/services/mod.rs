//! Input validation in front of the coordinator.
//!
//! The UI calls these instead of the raw mutation methods. Each function
//! trims and checks its arguments, logs a rejection, and only then applies
//! the change.

pub mod characters;
pub mod messages;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Character name cannot be empty")]
    EmptyName,

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Message text cannot be empty")]
    EmptyText,

    #[error("A user id is required")]
    MissingUser,

    #[error("Invalid image data")]
    InvalidImage,
}

/// Log a rejected request and hand the error back.
fn rejected(action: &'static str, error: ServiceError) -> ServiceError {
    tracing::warn!(action, error = %error, "rejected invalid input");
    error
}
