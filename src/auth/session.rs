use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::backend::IdentityToken;

/// How the current session came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionOrigin {
    /// Produced by a credential exchange in this process.
    SignedIn,
    /// Loaded from device storage at start and not yet confirmed by the
    /// backend.
    Restored,
}

/// The authenticated actor held by the running client.
///
/// The token is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    token: String,
    refresh_token: Option<String>,
    user_id: String,
    email: String,
    issued_at: OffsetDateTime,
    expires_at: Option<OffsetDateTime>,
    origin: SessionOrigin,
}

impl Session {
    /// Builds a session from a fresh identity backend credential.
    pub fn from_identity(identity: IdentityToken, now: OffsetDateTime) -> Self {
        let expires_at = identity
            .expires_in
            .and_then(|ttl| time::Duration::try_from(ttl).ok())
            .map(|ttl| now + ttl);
        Self {
            token: identity.id_token,
            refresh_token: identity.refresh_token,
            user_id: identity.user_id,
            email: identity.email,
            issued_at: now,
            expires_at,
            origin: SessionOrigin::SignedIn,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn issued_at(&self) -> OffsetDateTime {
        self.issued_at
    }

    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.expires_at
    }

    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }

    /// True when the backend-reported lifetime has elapsed at `now`.
    ///
    /// Sessions without a known expiry never report as expired; the backend
    /// remains the authority.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    pub(crate) fn into_restored(mut self) -> Self {
        self.origin = SessionOrigin::Restored;
        self
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
