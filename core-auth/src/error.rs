use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors surfaced by the session core.
///
/// `Clone` so one refresh failure can be delivered to every queued request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// 401 that a refresh cannot fix (bad credentials, revoked session, or a
    /// replayed request rejected again).
    #[error("Unauthorized (status {status}, code {code:?})")]
    Unauthorized { status: u16, code: Option<String> },

    /// The refresh call failed; the session has been terminated.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Authentication is required but this context cannot redirect.
    #[error("Authentication required")]
    AuthTokenRequired,

    /// Non-authorization failure, passed through untouched.
    #[error("Request failed with status {status}")]
    Http {
        status: u16,
        code: Option<String>,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Sign-in failed: {0}")]
    SignInFailed(String),

    #[error("Session storage unavailable: {0}")]
    SessionStore(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Operation timed out: {operation}")]
    OperationTimeout { operation: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP status attached to the error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Unauthorized { status, .. } | AuthError::Http { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Whether the error ended (or requires) the session.
    pub fn requires_sign_in(&self) -> bool {
        matches!(
            self,
            AuthError::Unauthorized { .. }
                | AuthError::RefreshFailed(_)
                | AuthError::AuthTokenRequired
        )
    }
}

impl From<BridgeError> for AuthError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Network(message) => AuthError::Network(message),
            BridgeError::StorageError(message) => AuthError::SessionStore(message),
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl From<core_runtime::Error> for AuthError {
    fn from(error: core_runtime::Error) -> Self {
        AuthError::Config(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_error_mapping() {
        assert_eq!(
            AuthError::from(BridgeError::Network("refused".to_string())),
            AuthError::Network("refused".to_string())
        );
        assert_eq!(
            AuthError::from(BridgeError::StorageError("locked".to_string())),
            AuthError::SessionStore("locked".to_string())
        );
        assert!(matches!(
            AuthError::from(BridgeError::NotAvailable("x".to_string())),
            AuthError::Internal(_)
        ));
    }

    #[test]
    fn test_requires_sign_in() {
        assert!(AuthError::AuthTokenRequired.requires_sign_in());
        assert!(AuthError::RefreshFailed("401".to_string()).requires_sign_in());
        assert!(!AuthError::Network("down".to_string()).requires_sign_in());
        assert!(AuthError::Unauthorized {
            status: 401,
            code: Some("token.invalid".to_string()),
        }
        .requires_sign_in());
        assert!(!AuthError::SignInFailed("bad password".to_string()).requires_sign_in());

        let http = AuthError::Http {
            status: 503,
            code: None,
            body: String::new(),
        };
        assert!(!http.requires_sign_in());
        assert_eq!(http.status(), Some(503));
    }
}
