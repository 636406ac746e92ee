//! Shared helpers

pub mod error;
pub mod format;

pub use error::{AppError, AppResult, ErrorResponse};
