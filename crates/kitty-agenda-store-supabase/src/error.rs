//! Error types for Supabase operations.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while talking to Supabase.
#[derive(Error, Debug)]
pub enum SupabaseError {
    /// The request never produced a response (DNS, TLS, connection reset...).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The auth service refused the request; the message is user-facing.
    #[error("{message}")]
    AuthRejected {
        /// HTTP status of the refusal.
        status: StatusCode,
        /// Message reported by the auth service.
        message: String,
    },

    /// PostgREST answered with a non-success status.
    #[error("REST request failed: {status} - {body}")]
    Rest {
        /// HTTP status of the failure.
        status: StatusCode,
        /// Raw response body.
        body: String,
    },

    /// A mutation matched no row.
    #[error("Row not found: {0}")]
    NotFound(String),

    /// A representation was requested but the response was empty.
    #[error("Empty response for {0}")]
    EmptyResponse(&'static str),

    /// The response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configured base URL is unusable.
    #[error("Invalid Supabase URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// An authenticated call was attempted without a session.
    #[error("No active session")]
    NoSession,
}

impl SupabaseError {
    /// Whether the failure is a permission problem (expired token, RLS denial).
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Rest { status, .. } | Self::AuthRejected { status, .. } => {
                matches!(*status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            }
            Self::NoSession => true,
            _ => false,
        }
    }
}
