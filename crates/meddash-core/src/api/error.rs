use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - session expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error ({status}): {body}")]
    ServerError { status: StatusCode, body: String },

    #[error("Request failed ({status}): {body}")]
    RequestFailed { status: StatusCode, body: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut cut = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError {
                status,
                body: truncated,
            },
            _ => ApiError::RequestFailed {
                status,
                body: truncated,
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Short, user-facing description in the manner of an HTTP status text.
    pub fn status_text(&self) -> String {
        let reason = |status: StatusCode| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_str().to_string())
        };
        match self {
            ApiError::Unauthorized => reason(StatusCode::UNAUTHORIZED),
            ApiError::AccessDenied(_) => reason(StatusCode::FORBIDDEN),
            ApiError::NotFound(_) => reason(StatusCode::NOT_FOUND),
            ApiError::RateLimited => reason(StatusCode::TOO_MANY_REQUESTS),
            ApiError::ServerError { status, .. } | ApiError::RequestFailed { status, .. } => {
                reason(*status)
            }
            ApiError::NetworkError(e) if e.is_timeout() => "Request timed out".to_string(),
            ApiError::NetworkError(_) => "Unable to reach server".to_string(),
            ApiError::InvalidResponse(_) => "Invalid response".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, "no"),
            ApiError::AccessDenied(ref b) if b == "no"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::ServerError { status, .. } if status == StatusCode::BAD_GATEWAY
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, "bad"),
            ApiError::RequestFailed { status, ref body }
                if status == StatusCode::BAD_REQUEST && body == "bad"
        ));
    }

    #[test]
    fn test_status_text() {
        assert_eq!(
            ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom").status_text(),
            "Internal Server Error"
        );
        assert_eq!(
            ApiError::from_status(StatusCode::NOT_FOUND, "").status_text(),
            "Not Found"
        );
        assert_eq!(ApiError::Unauthorized.status_text(), "Unauthorized");
    }

    #[test]
    fn test_status_text_for_client_errors() {
        assert_eq!(
            ApiError::from_status(StatusCode::CONFLICT, "{}").status_text(),
            "Conflict"
        );
        assert_eq!(
            ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "").status_text(),
            "Unprocessable Entity"
        );
        assert_eq!(
            ApiError::from_status(StatusCode::from_u16(499).unwrap(), "").status_text(),
            "499"
        );
    }

    #[test]
    fn test_long_body_is_truncated() {
        let body = "x".repeat(2000);
        match ApiError::from_status(StatusCode::FORBIDDEN, &body) {
            ApiError::AccessDenied(msg) => {
                assert!(msg.len() < 600);
                assert!(msg.contains("2000 total bytes"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let body = "é".repeat(400);
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.contains("truncated"));
    }
}
