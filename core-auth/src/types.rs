use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Access/refresh token pair issued by the auth server.
///
/// Tokens are opaque to the client; neither is ever parsed.
///
/// # Security
///
/// `Debug` redacts both tokens so they never reach logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    /// Short-lived bearer credential attached to API requests
    pub access_token: String,

    /// Long-lived credential exchanged for a new pair
    pub refresh_token: String,
}

impl SessionTokens {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// In-memory view of the signed-in user.
///
/// Built from the sign-in response or from `GET /me` during hydration, and
/// never persisted.
///
/// # Examples
///
/// ```
/// use core_auth::AuthenticatedUser;
///
/// let user = AuthenticatedUser::new("ada@example.com")
///     .with_permissions(["reports.read"])
///     .with_roles(["analyst"]);
///
/// assert!(user.can(&["reports.read"], &["analyst", "admin"]));
/// assert!(!user.can(&["reports.write"], &[]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub email: String,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl AuthenticatedUser {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            permissions: BTreeSet::new(),
            roles: BTreeSet::new(),
        }
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Authorization check used by route guards.
    ///
    /// Every listed permission is required; any one listed role suffices.
    /// An empty list imposes no requirement.
    pub fn can(&self, permissions: &[&str], roles: &[&str]) -> bool {
        let permitted = permissions.iter().all(|p| self.has_permission(p));
        let in_role = roles.is_empty() || roles.iter().any(|r| self.has_role(r));
        permitted && in_role
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// Body of `POST sessions`.
#[derive(Clone, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignInRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl SignInResponse {
    pub fn tokens(&self) -> SessionTokens {
        SessionTokens::new(self.token.clone(), self.refresh_token.clone())
    }
}

/// Body of `POST refresh`. The refresh token travels in the body, never in
/// the `Authorization` header.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub refresh_token: String,
}

impl RefreshResponse {
    pub fn into_tokens(self) -> SessionTokens {
        SessionTokens::new(self.token, self.refresh_token)
    }
}

/// Error payload; only `code` is interpreted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
