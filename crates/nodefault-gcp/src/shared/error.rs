use thiserror::Error;

/// Errors raised while talking to the Compute Engine API
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("HTTP transport error: {0}")]
    Http(String),
    #[error("Compute API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Failed to decode Compute API response: {0}")]
    Decode(String),
    #[error("Credential error: {0}")]
    Credentials(String),
}

impl From<reqwest::Error> for ComputeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ComputeError::Decode(err.to_string())
        } else {
            ComputeError::Http(err.to_string())
        }
    }
}

impl From<ComputeError> for nodefault_core::CoreError {
    fn from(err: ComputeError) -> Self {
        match err {
            ComputeError::Credentials(msg) => nodefault_core::CoreError::Configuration(msg),
            other => nodefault_core::CoreError::Transport(other.to_string()),
        }
    }
}

pub type ComputeResult<T> = std::result::Result<T, ComputeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use nodefault_core::CoreError;

    #[test]
    fn test_api_error_message() {
        let err = ComputeError::Api {
            status: 403,
            message: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Compute API returned 403: permission denied"
        );
    }

    #[test]
    fn test_credentials_map_to_configuration() {
        let err: CoreError = ComputeError::Credentials("no project".to_string()).into();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[test]
    fn test_transport_errors_map_to_transport() {
        let err: CoreError = ComputeError::Http("connection reset".to_string()).into();
        assert!(matches!(err, CoreError::Transport(_)));
        assert!(err.to_string().contains("connection reset"));

        let err: CoreError = ComputeError::Decode("bad json".to_string()).into();
        assert!(matches!(err, CoreError::Transport(_)));
    }
}
