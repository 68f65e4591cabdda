//! Convenience result type alias for Tavern.

use crate::error::AppError;

/// A specialized `Result` type for Tavern operations.
pub type AppResult<T> = Result<T, AppError>;
