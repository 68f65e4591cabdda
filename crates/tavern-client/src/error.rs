//! Client error type.

use thiserror::Error;

/// Errors surfaced by the client library.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error body.
    #[error("{code} ({status}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// A response or event could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The event stream broke mid-flight.
    #[error("stream error: {0}")]
    Stream(String),

    /// Invalid client-side configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether this is an API error with the given HTTP status.
    pub fn is_status(&self, status: u16) -> bool {
        matches!(self, ClientError::Api { status: s, .. } if *s == status)
    }
}

impl From<ClientError> for tavern_core::AppError {
    fn from(err: ClientError) -> Self {
        use tavern_core::AppError;

        match err {
            ClientError::Api {
                status, message, ..
            } => match status {
                400 | 422 => AppError::validation(message),
                401 => AppError::authentication(message),
                403 => AppError::authorization(message),
                404 => AppError::not_found(message),
                409 => AppError::conflict(message),
                503 => AppError::service_unavailable(message),
                _ => AppError::internal(format!("server error {status}: {message}")),
            },
            ClientError::Config(message) => AppError::configuration(message),
            other => AppError::service_unavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tavern_core::AppError;
    use tavern_core::error::ErrorKind;

    use super::*;

    #[test]
    fn test_api_status_maps_to_error_kind() {
        let err: AppError = ClientError::Api {
            status: 403,
            code: "authorization".into(),
            message: "Only participants may post".into(),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Authorization);
        assert_eq!(err.message, "Only participants may post");

        let err: AppError = ClientError::Stream("reset".into()).into();
        assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
    }
}
