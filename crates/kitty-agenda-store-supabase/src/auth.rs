//! Wire types for the Supabase auth (GoTrue) endpoints.

use std::fmt;

use kitty_agenda_core::UserId;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::SupabaseError;

/// Bearer token issued by the auth service.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw token for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// User record embedded in auth responses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthUser {
    /// Stable user identifier (the `user_id` of owned rows).
    pub id: UserId,
    /// Sign-in email, when the provider exposes one.
    #[serde(default)]
    pub email: Option<String>,
}

/// Successful password grant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthSession {
    /// Token sent with every REST call.
    pub access_token: AccessToken,
    /// Seconds until the access token expires.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Authenticated user.
    pub user: AuthUser,
}

/// Sign-up answers with a session when email confirmation is disabled,
/// otherwise with the pending user only.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum SignUpResponse {
    Session(AuthSession),
    Pending(AuthUser),
}

impl SignUpResponse {
    pub(crate) fn into_session(self) -> Option<AuthSession> {
        match self {
            Self::Session(session) => Some(session),
            Self::Pending(_) => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PasswordCredentials<'a> {
    pub(crate) email: &'a str,
    pub(crate) password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Turn a refused auth response into [`SupabaseError::AuthRejected`].
pub(crate) fn rejection(status: StatusCode, body: &str) -> SupabaseError {
    let parsed: AuthErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("authentication failed")
                .to_owned()
        });
    SupabaseError::AuthRejected { status, message }
}
