//! Error types for the MESA SDK

use crate::auth::AuthError;
use thiserror::Error;

/// Main error type for MESA API operations
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP client error
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Authentication lifecycle error
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Missing authentication (no token provided)
    #[error("Authentication required: {message}")]
    MissingAuthentication { message: String },

    /// Authentication error (expired/invalid token)
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    /// Authorization error
    #[error("Authorization error: {message}")]
    Authorization { message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Not found
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Bad request with message
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Invalid request built client-side
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Timeout error
    #[error("Request timeout")]
    Timeout,

    /// Service unavailable
    #[error("Service temporarily unavailable")]
    ServiceUnavailable,

    /// Internal server error
    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Get error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::HttpClient(_) => "MESA_API_HTTP_CLIENT_ERROR",
            ApiError::Auth(_) => "MESA_API_AUTH_LIFECYCLE_ERROR",
            ApiError::MissingAuthentication { .. } => "MESA_API_AUTH_MISSING",
            ApiError::Authentication { .. } => "MESA_API_AUTH_ERROR",
            ApiError::Authorization { .. } => "MESA_API_AUTHZ_ERROR",
            ApiError::RateLimitExceeded => "MESA_API_RATE_LIMIT",
            ApiError::NotFound { .. } => "MESA_API_NOT_FOUND",
            ApiError::BadRequest { .. } => "MESA_API_BAD_REQUEST",
            ApiError::InvalidRequest { .. } => "MESA_API_INVALID_REQUEST",
            ApiError::Timeout => "MESA_API_TIMEOUT",
            ApiError::ServiceUnavailable => "MESA_API_SERVICE_UNAVAILABLE",
            ApiError::Internal { .. } => "MESA_API_INTERNAL_ERROR",
            ApiError::Serialization(_) => "MESA_API_SERIALIZATION_ERROR",
        }
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout
                | ApiError::ServiceUnavailable
                | ApiError::RateLimitExceeded
                | ApiError::HttpClient(_)
        )
    }

    /// Check if the error is a client error (4xx equivalent)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ApiError::MissingAuthentication { .. }
                | ApiError::Authentication { .. }
                | ApiError::Authorization { .. }
                | ApiError::RateLimitExceeded
                | ApiError::NotFound { .. }
                | ApiError::BadRequest { .. }
                | ApiError::InvalidRequest { .. }
        )
    }
}

/// Extract a human-readable message from a backend error body.
///
/// The backend reports errors FastAPI-style: `detail` as a string or an
/// array of validation items, with `message` and `error` as fallbacks.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    if let Some(detail) = value.get("detail") {
        match detail {
            serde_json::Value::String(s) => return Some(s.clone()),
            serde_json::Value::Array(items) => {
                let joined = items
                    .iter()
                    .map(|item| match item {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                return Some(joined);
            }
            _ => {}
        }
    }

    if let Some(message) = value.get("message").and_then(|v| v.as_str()) {
        return Some(message.to_string());
    }
    if let Some(error) = value.get("error").and_then(|v| v.as_str()) {
        return Some(error.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes() {
        assert_eq!(ApiError::RateLimitExceeded.error_code(), "MESA_API_RATE_LIMIT");
        assert_eq!(
            ApiError::NotFound {
                resource: "disease".to_string()
            }
            .error_code(),
            "MESA_API_NOT_FOUND"
        );
    }

    #[test]
    fn retryable_and_client_error_predicates() {
        assert!(ApiError::Timeout.is_retryable());
        assert!(ApiError::ServiceUnavailable.is_retryable());
        assert!(!ApiError::Authentication {
            message: "invalid token".to_string()
        }
        .is_retryable());

        assert!(ApiError::BadRequest {
            message: "invalid input".to_string()
        }
        .is_client_error());
        assert!(ApiError::RateLimitExceeded.is_client_error());
        assert!(!ApiError::Internal {
            message: "server error".to_string()
        }
        .is_client_error());
    }

    #[test]
    fn extracts_detail_string() {
        let body = r#"{"detail": "Disease not found"}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Disease not found")
        );
    }

    #[test]
    fn extracts_detail_array() {
        let body = r#"{"detail": ["field required", {"loc": ["symptoms"]}]}"#;
        let message = extract_error_message(body).unwrap();
        assert!(message.starts_with("field required, "));
        assert!(message.contains("symptoms"));
    }

    #[test]
    fn falls_back_to_message_and_error_keys() {
        assert_eq!(
            extract_error_message(r#"{"message": "boom"}"#).as_deref(),
            Some("boom")
        );
        assert_eq!(
            extract_error_message(r#"{"error": "nope"}"#).as_deref(),
            Some("nope")
        );
        assert_eq!(extract_error_message("not json"), None);
    }
}
