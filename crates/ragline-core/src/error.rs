//! Error types for Ragline
//!
//! Every failure in the client layer is normalized into an [`AppError`] with a
//! code from a closed set, so callers branch on the code instead of parsing
//! messages.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Closed set of error codes recognized by the dashboard.
///
/// Unrecognized upstream statuses collapse to [`ErrorCode::Internal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Internal,
    Unavailable,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorCode::BadRequest,
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            500 => ErrorCode::Internal,
            503 => ErrorCode::Unavailable,
            _ => ErrorCode::Internal,
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            ErrorCode::BadRequest => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::Internal => 500,
            ErrorCode::Unavailable => 503,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Structured failure context, one variant per failure kind
#[derive(Debug, Clone)]
pub enum ErrorDetails {
    None,
    /// Non-2xx HTTP response
    Http { status: u16, body: String },
    /// Transport-level failure (DNS, connection refused, abort)
    Network { cause: String },
    /// The server answered but the payload was unusable
    MalformedResponse { payload: serde_json::Value },
    /// A redirect was observed on a manual-redirect call; the backend uses
    /// redirects to its login page to signal expired sessions
    Redirect { location: Option<String> },
    /// Opaque wrapped error with no better classification
    Cause { cause: String },
}

/// Normalized error for the credential/session layer
#[derive(Debug, Clone, Error)]
#[error("{message} ({code})")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: ErrorDetails,
    /// Rate-limit signal, preserved end-to-end so the UI can suggest waiting
    pub throttled: bool,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: ErrorDetails::None,
            throttled: false,
        }
    }

    /// Build from a non-2xx HTTP response. The raw text body becomes the
    /// message when present; a 429 marks the error throttled (429 is outside
    /// the closed code set, so the code itself collapses to 500).
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            body.clone()
        };
        Self {
            code: ErrorCode::from_status(status),
            message,
            details: ErrorDetails::Http { status, body },
            throttled: status == 429,
        }
    }

    /// Transport-level failure; always 503
    pub fn network(cause: impl std::fmt::Display) -> Self {
        let cause = cause.to_string();
        Self {
            code: ErrorCode::Unavailable,
            message: format!("network error: {cause}"),
            details: ErrorDetails::Network { cause },
            throttled: false,
        }
    }

    /// Server answered 2xx but the payload was unusable; always 500
    pub fn malformed(message: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            code: ErrorCode::Internal,
            message: message.into(),
            details: ErrorDetails::MalformedResponse { payload },
            throttled: false,
        }
    }

    /// Synthetic 401 for a redirect observed during a manual-redirect call
    pub fn session_redirect(location: Option<String>) -> Self {
        Self {
            code: ErrorCode::Unauthorized,
            message: "session redirect detected".to_string(),
            details: ErrorDetails::Redirect { location },
            throttled: false,
        }
    }

    /// Heuristic classification of an opaque error by message substrings
    pub fn classify(err: impl std::fmt::Display) -> Self {
        let cause = err.to_string();
        let lower = cause.to_lowercase();
        let code = if lower.contains("unauthorized") {
            ErrorCode::Unauthorized
        } else if lower.contains("forbidden") {
            ErrorCode::Forbidden
        } else if lower.contains("not found") {
            ErrorCode::NotFound
        } else if lower.contains("bad request") {
            ErrorCode::BadRequest
        } else {
            ErrorCode::Internal
        };
        Self {
            code,
            message: cause.clone(),
            details: ErrorDetails::Cause { cause },
            throttled: false,
        }
    }

    pub fn with_throttled(mut self, throttled: bool) -> Self {
        self.throttled = throttled;
        self
    }

    /// True when the failure was a redirect treated as session expiry
    pub fn is_session_redirect(&self) -> bool {
        matches!(self.details, ErrorDetails::Redirect { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_statuses_map_directly() {
        for status in [400u16, 401, 403, 404, 500, 503] {
            assert_eq!(ErrorCode::from_status(status).as_u16(), status);
        }
    }

    #[test]
    fn unrecognized_statuses_collapse_to_internal() {
        assert_eq!(ErrorCode::from_status(418), ErrorCode::Internal);
        assert_eq!(ErrorCode::from_status(429), ErrorCode::Internal);
        assert_eq!(ErrorCode::from_status(302), ErrorCode::Internal);
    }

    #[test]
    fn status_429_sets_throttled() {
        let err = AppError::from_status(429, "slow down");
        assert!(err.throttled);
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "slow down");
    }

    #[test]
    fn empty_body_gets_a_fallback_message() {
        let err = AppError::from_status(503, "");
        assert_eq!(err.message, "HTTP 503");
        assert_eq!(err.code, ErrorCode::Unavailable);
    }

    #[test]
    fn classify_maps_known_substrings() {
        assert_eq!(AppError::classify("Unauthorized access").code, ErrorCode::Unauthorized);
        assert_eq!(AppError::classify("resource not found").code, ErrorCode::NotFound);
        assert_eq!(AppError::classify("Forbidden").code, ErrorCode::Forbidden);
        assert_eq!(AppError::classify("Bad Request: owner").code, ErrorCode::BadRequest);
        assert_eq!(AppError::classify("boom").code, ErrorCode::Internal);
    }

    #[test]
    fn redirect_is_a_synthetic_unauthorized() {
        let err = AppError::session_redirect(Some("/login".to_string()));
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert!(err.is_session_redirect());
    }

    #[test]
    fn network_errors_are_unavailable() {
        let err = AppError::network("connection refused");
        assert_eq!(err.code, ErrorCode::Unavailable);
        assert!(matches!(err.details, ErrorDetails::Network { .. }));
    }
}
