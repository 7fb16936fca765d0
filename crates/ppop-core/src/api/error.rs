use thiserror::Error;

/// Body text used when a failing response carries no body.
pub const FALLBACK_ERROR_BODY: &str = "API error";

/// Body text used when a rejected login carries no body.
const FALLBACK_LOGIN_BODY: &str = "check email/password and try again";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API base URL is not configured (set PPOP_API_URL)")]
    Configuration,

    /// The backend rejected the credential with a 401. Callers must not show
    /// this to the user; the session shell logs out and the route guard
    /// takes the user to the login screen.
    #[error("Session expired")]
    SessionExpired,

    #[error("{body}")]
    Api { status: u16, body: String },

    #[error("Login failed ({status}): {body}")]
    LoginRejected { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid request header: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in log lines
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
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

    /// Classify a non-success response from an authorized call.
    ///
    /// A 401 is always `SessionExpired`, whatever the body says. Every other
    /// status keeps the raw body so it can be shown to the user as-is.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return ApiError::SessionExpired;
        }
        Self::from_anonymous_status(status, body)
    }

    /// Classify a non-success response from a call sent without a
    /// credential. No session was involved, so a 401 stays a plain `Api`
    /// error.
    pub fn from_anonymous_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = if body.is_empty() {
            FALLBACK_ERROR_BODY.to_string()
        } else {
            body.to_string()
        };
        ApiError::Api {
            status: status.as_u16(),
            body,
        }
    }

    /// Classify a non-success answer from `POST /auth/login`.
    ///
    /// Here a 401 means wrong email or password, not an expired session.
    pub fn login_rejected(status: reqwest::StatusCode, body: &str) -> Self {
        let body = if body.is_empty() {
            FALLBACK_LOGIN_BODY.to_string()
        } else {
            body.to_string()
        };
        ApiError::LoginRejected {
            status: status.as_u16(),
            body,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }

    /// The text to show the user, or `None` for the session-expired signal.
    pub fn user_message(&self) -> Option<String> {
        match self {
            ApiError::SessionExpired => None,
            other => Some(other.to_string()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_401_ignores_body() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "{\"detail\":\"bad token\"}");
        assert!(err.is_session_expired());
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "");
        assert!(err.is_session_expired());
    }

    #[test]
    fn test_from_status_keeps_exact_body() {
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "server error");
        match err {
            ApiError::Api { status, ref body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "server error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "server error");
    }

    #[test]
    fn test_from_status_empty_body_fallback() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, "");
        assert_eq!(err.to_string(), FALLBACK_ERROR_BODY);
    }

    #[test]
    fn test_anonymous_401_is_plain_api_error() {
        let err = ApiError::from_anonymous_status(StatusCode::UNAUTHORIZED, "");
        assert!(!err.is_session_expired());
        assert_eq!(err.user_message().as_deref(), Some(FALLBACK_ERROR_BODY));
    }

    #[test]
    fn test_forbidden_is_not_session_expired() {
        let err = ApiError::from_status(StatusCode::FORBIDDEN, "nope");
        assert!(!err.is_session_expired());
        assert_eq!(err.user_message().as_deref(), Some("nope"));
    }

    #[test]
    fn test_session_expired_has_no_user_message() {
        assert_eq!(ApiError::SessionExpired.user_message(), None);
    }

    #[test]
    fn test_login_rejected_message() {
        let err = ApiError::login_rejected(StatusCode::UNAUTHORIZED, "");
        assert_eq!(
            err.to_string(),
            "Login failed (401): check email/password and try again"
        );
        let err = ApiError::login_rejected(StatusCode::BAD_REQUEST, "missing password");
        assert_eq!(err.to_string(), "Login failed (400): missing password");
    }

    #[test]
    fn test_truncate_body() {
        let short = "x".repeat(10);
        assert_eq!(ApiError::truncate_body(&short), short);

        let long = "é".repeat(400);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated, 800 total bytes"));
    }
}
