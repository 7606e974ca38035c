use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The API answered with a non-2xx status. Body is kept verbatim.
    #[error("Request failed with status {}: {}", .status, ApiError::truncate_body(.body))]
    Status { status: StatusCode, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Shown when a failed response carries no usable message.
const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

const NETWORK_FAILURE_MESSAGE: &str =
    "Unable to connect to server. Check your internet connection.";

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: StatusCode, body: String) -> Self {
        ApiError::Status { status, body }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Message suitable for showing to the user.
    ///
    /// Uses the `message` (or `error`) field of a JSON error payload when the
    /// API provides one, otherwise a generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { body, .. } => Self::payload_message(body)
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
            ApiError::Network(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::Network(_) => NETWORK_FAILURE_MESSAGE.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    fn payload_message(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        ["message", "error"]
            .iter()
            .filter_map(|field| value.get(*field))
            .find_map(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_from_payload() {
        let err = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"message":"Invalid credentials"}"#.to_string(),
        );
        assert_eq!(err.user_message(), "Invalid credentials");
        assert!(err.is_unauthorized());

        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"error":"Name is required"}"#.to_string(),
        );
        assert_eq!(err.user_message(), "Name is required");
    }

    #[test]
    fn test_user_message_fallback() {
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "oops".to_string());
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"message":""}"#.to_string());
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_status_body_kept_verbatim() {
        let body = "x".repeat(2000);
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, body.clone());
        match &err {
            ApiError::Status { status, body: kept } => {
                assert_eq!(*status, StatusCode::BAD_GATEWAY);
                assert_eq!(kept, &body);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // Display output is truncated
        assert!(err.to_string().contains("truncated, 2000 total bytes"));
    }
}
