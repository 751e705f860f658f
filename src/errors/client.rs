use thiserror::Error;

/// Errors surfaced by the API client
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request did not finish within the configured timeout
    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    /// Connection refused, DNS failure, reset, ...
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Non-2xx response; `message` comes from the JSON error body
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The response body was not the JSON shape expected
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Reading or writing the session file failed
    #[error("Session error: {0}")]
    Session(String),

    /// Endpoint could not be joined onto the base URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Whether the API client should try the request again
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_displays_server_message() {
        let err = ClientError::Api {
            status: 401,
            message: "Invalid credentials".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_server_errors_are_retryable() {
        let err = ClientError::Api {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.is_retryable());
        assert!(!ClientError::Timeout(10).is_retryable());
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(
            ClientError::Timeout(10).to_string(),
            "Request timeout after 10 seconds"
        );
    }
}
