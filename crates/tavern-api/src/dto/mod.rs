//! Request and response DTOs.

pub mod request;
pub mod response;

use validator::Validate;

use tavern_core::error::AppError;

/// Run `validator` rules and map failures to a 400.
pub fn validated<T: Validate>(req: T) -> Result<T, AppError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    Ok(req)
}
