use thiserror::Error;

use crate::utils::UtilError;

/// Failure taxonomy for the session gateway.
///
/// `CredentialRejected`, `MalformedToken` and `UpstreamUnreachable` are
/// deliberately distinct: a user must never be told their password is wrong
/// when the backend was merely unreachable, and a garbage token from the
/// backend is an integration fault rather than a credential problem.
#[derive(Debug, Error, Clone)]
pub enum GatewayError {
    /// The backend explicitly rejected the supplied username/password.
    #[error("Invalid credentials: {0}")]
    CredentialRejected(String),

    /// The backend returned a token that fails the structural check.
    #[error("Received a malformed token from the server")]
    MalformedToken,

    /// Network or timeout failure talking to the backend.
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// No live session and cookie restoration failed.
    #[error("Session invalid")]
    SessionInvalid,

    #[error("Cookie error: {0}")]
    Cookie(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}
