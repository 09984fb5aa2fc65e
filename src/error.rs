//! Error taxonomy shared by every component of the crate.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced by the session lifecycle, listeners and mutators.
///
/// Validation errors carry a user-facing message and never reach a backend.
/// Authentication and mutation errors are returned to the caller as-is, while
/// subscription errors are captured into listener state instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Credential exchange failed (bad credentials, network, backend error).
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A live listener failed to attach or lost its connection.
    #[error("subscription failed: {0}")]
    Subscription(String),

    /// A create, update, delete or upload call failed.
    #[error("mutation failed: {0}")]
    Mutation(String),

    /// A client-side required-field or upload check failed.
    #[error("{0}")]
    Validation(String),

    /// The backend refused the session token (expired or revoked).
    #[error("session rejected by backend: {0}")]
    SessionRejected(String),

    /// The device key-value storage could not be read or written.
    #[error("device storage error: {0}")]
    Storage(String),

    /// Required configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true when the backend rejected the current session token.
    pub fn is_session_rejection(&self) -> bool {
        matches!(self, Error::SessionRejected(_))
    }

    /// Re-labels a backend failure as a mutation failure.
    ///
    /// Validation and session rejections keep their kind so callers can still
    /// tell a bad form from an expired login.
    pub(crate) fn into_mutation(self) -> Self {
        match self {
            Error::Validation(_) | Error::SessionRejected(_) | Error::Mutation(_) => self,
            other => Error::Mutation(other.to_string()),
        }
    }

    /// Re-labels any identity backend failure as an authentication failure.
    pub(crate) fn into_authentication(self) -> Self {
        match self {
            Error::Authentication(_) | Error::Validation(_) => self,
            other => Error::Authentication(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_relabel_keeps_session_rejection() {
        let rejected = Error::SessionRejected("token expired".into()).into_mutation();
        assert!(rejected.is_session_rejection());

        let storage = Error::Storage("disk full".into()).into_mutation();
        assert_eq!(
            storage,
            Error::Mutation("device storage error: disk full".into())
        );
    }

    #[test]
    fn authentication_relabel_wraps_backend_errors() {
        let err = Error::Mutation("503".into()).into_authentication();
        assert!(matches!(err, Error::Authentication(_)));
    }
}
