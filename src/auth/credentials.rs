use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};

use super::session::Session;
use crate::backend::IdentityBackend;
use crate::error::{Error, Result};

/// Exchanges email and password for a [`Session`].
///
/// Only emptiness is checked locally. Every backend failure is reported as
/// [`Error::Authentication`]; there is no retry. The result is not fed into
/// any auth state; that is the caller's job.
#[derive(Clone)]
pub struct CredentialExchange {
    identity: Arc<dyn IdentityBackend>,
}

impl CredentialExchange {
    pub fn new(identity: Arc<dyn IdentityBackend>) -> Self {
        Self { identity }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim();
        if email.is_empty() || password.trim().is_empty() {
            return Err(Error::Validation(
                "Introduza o email e a palavra-passe.".into(),
            ));
        }

        let identity = self
            .identity
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| {
                warn!(error = %e, "sign-in rejected");
                e.into_authentication()
            })?;

        if identity.id_token.is_empty() {
            return Err(Error::Authentication(
                "identity backend returned an empty token".into(),
            ));
        }

        info!(user_id = %identity.user_id, "credentials exchanged");
        Ok(Session::from_identity(identity, OffsetDateTime::now_utc()))
    }
}
