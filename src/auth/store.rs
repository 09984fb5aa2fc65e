use std::sync::Arc;

use tracing::{debug, warn};

use super::session::Session;
use crate::backend::DeviceStorage;
use crate::error::{Error, Result};

/// Device storage key holding the persisted session.
pub const SESSION_KEY: &str = "token";

/// Persists the current session in device storage so it survives restarts.
///
/// Records are encoded with MessagePack. A record that no longer decodes is
/// treated as absent and removed.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn DeviceStorage>,
    key: String,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn DeviceStorage>) -> Self {
        Self {
            storage,
            key: SESSION_KEY.to_string(),
        }
    }

    /// Sets a custom storage key, e.g. to keep several profiles apart.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub async fn save(&self, session: &Session) -> Result<()> {
        let data = rmp_serde::to_vec(session).map_err(|e| Error::Storage(e.to_string()))?;
        self.storage.set(&self.key, data).await
    }

    pub async fn load(&self) -> Result<Option<Session>> {
        let Some(data) = self.storage.get(&self.key).await? else {
            return Ok(None);
        };

        match rmp_serde::from_slice::<Session>(&data) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(key = %self.key, error = %e, "discarding undecodable persisted session");
                if let Err(e) = self.storage.remove(&self.key).await {
                    debug!(error = %e, "could not remove undecodable session");
                }
                Ok(None)
            }
        }
    }

    pub async fn clear(&self) -> Result<()> {
        self.storage.remove(&self.key).await
    }
}
