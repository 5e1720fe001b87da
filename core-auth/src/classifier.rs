//! Classification of failed responses into expired-token, unauthorized, or
//! unrelated failures.

use bridge_traits::HttpResponse;
use core_runtime::config::DEFAULT_TOKEN_EXPIRED_CODE;

use crate::types::ErrorBody;

const UNAUTHORIZED: u16 = 401;

/// Outcome of classifying a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 401 carrying the expired-token code; recoverable through a refresh.
    TokenExpired,
    /// Any other 401.
    Unauthorized,
    /// Everything else, including transport failures.
    Other,
}

/// Pure classifier keyed on the server's expired-token code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureClassifier {
    expired_code: String,
}

impl FailureClassifier {
    pub fn new(expired_code: impl Into<String>) -> Self {
        Self {
            expired_code: expired_code.into(),
        }
    }

    pub fn expired_code(&self) -> &str {
        &self.expired_code
    }

    /// Classify a failure. `status` is `None` when no response was received.
    pub fn classify(&self, status: Option<u16>, code: Option<&str>) -> FailureKind {
        match (status, code) {
            (Some(UNAUTHORIZED), Some(code)) if code == self.expired_code => {
                FailureKind::TokenExpired
            }
            (Some(UNAUTHORIZED), _) => FailureKind::Unauthorized,
            _ => FailureKind::Other,
        }
    }

    pub fn classify_response(&self, response: &HttpResponse) -> FailureKind {
        let code = error_code(response);
        self.classify(Some(response.status), code.as_deref())
    }
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_EXPIRED_CODE)
    }
}

/// Machine-readable `code` from a JSON error body, if any.
pub fn error_code(response: &HttpResponse) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_code_on_401() {
        let classifier = FailureClassifier::default();
        assert_eq!(
            classifier.classify(Some(401), Some("token.expired")),
            FailureKind::TokenExpired
        );
    }

    #[test]
    fn test_plain_401_is_unauthorized() {
        let classifier = FailureClassifier::default();
        assert_eq!(classifier.classify(Some(401), None), FailureKind::Unauthorized);
        assert_eq!(
            classifier.classify(Some(401), Some("credentials.invalid")),
            FailureKind::Unauthorized
        );
    }

    #[test]
    fn test_expired_code_requires_401() {
        let classifier = FailureClassifier::default();
        assert_eq!(
            classifier.classify(Some(403), Some("token.expired")),
            FailureKind::Other
        );
        assert_eq!(classifier.classify(Some(500), None), FailureKind::Other);
        assert_eq!(classifier.classify(None, None), FailureKind::Other);
    }

    #[test]
    fn test_custom_code() {
        let classifier = FailureClassifier::new("jwt_expired");
        assert_eq!(
            classifier.classify(Some(401), Some("jwt_expired")),
            FailureKind::TokenExpired
        );
        assert_eq!(
            classifier.classify(Some(401), Some("token.expired")),
            FailureKind::Unauthorized
        );
    }

    #[test]
    fn test_classify_response_reads_json_code() {
        let classifier = FailureClassifier::default();

        let expired = HttpResponse::new(401, r#"{"code":"token.expired","message":"x"}"#);
        assert_eq!(classifier.classify_response(&expired), FailureKind::TokenExpired);

        let not_json = HttpResponse::new(401, "Unauthorized");
        assert_eq!(error_code(&not_json), None);
        assert_eq!(classifier.classify_response(&not_json), FailureKind::Unauthorized);
    }
}
