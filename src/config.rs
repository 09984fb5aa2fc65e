//! Runtime configuration read from the environment.

use crate::error::{Error, Result};

pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";

/// Largest accepted upload, in bytes (5 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Settings for the backends the backoffice talks to.
///
/// # Environment
///
/// | Variable                          | Required | Default                                   |
/// |-----------------------------------|----------|-------------------------------------------|
/// | `BACKOFFICE_FIREBASE_API_KEY`     | yes      |                                           |
/// | `BACKOFFICE_IDENTITY_ENDPOINT`    | no       | `https://identitytoolkit.googleapis.com`  |
/// | `BACKOFFICE_DEVICE_DATABASE_URL`  | no       | none (session kept in memory only)        |
/// | `BACKOFFICE_MAX_UPLOAD_BYTES`     | no       | `5242880`                                 |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackofficeConfig {
    pub api_key: String,
    pub identity_endpoint: String,
    pub device_database_url: Option<String>,
    pub max_upload_bytes: u64,
}

impl BackofficeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            identity_endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
            device_database_url: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is normal outside development.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = read("BACKOFFICE_FIREBASE_API_KEY")
            .ok_or_else(|| Error::Config("BACKOFFICE_FIREBASE_API_KEY is not set".into()))?;
        let mut config = Self::new(api_key);

        if let Some(endpoint) = read("BACKOFFICE_IDENTITY_ENDPOINT") {
            config = config.with_identity_endpoint(endpoint);
        }
        if let Some(url) = read("BACKOFFICE_DEVICE_DATABASE_URL") {
            config = config.with_device_database_url(url);
        }
        if let Some(raw) = read("BACKOFFICE_MAX_UPLOAD_BYTES") {
            let bytes = raw.trim().parse::<u64>().map_err(|e| {
                Error::Config(format!("BACKOFFICE_MAX_UPLOAD_BYTES is not a byte count: {e}"))
            })?;
            config = config.with_max_upload_bytes(bytes);
        }
        Ok(config)
    }

    pub fn with_identity_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.identity_endpoint = endpoint.into();
        self
    }

    pub fn with_device_database_url(mut self, url: impl Into<String>) -> Self {
        self.device_database_url = Some(url.into());
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_api_key_is_set() {
        let config = BackofficeConfig::from_lookup(lookup(&[("BACKOFFICE_FIREBASE_API_KEY", "k")]))
            .unwrap();
        assert_eq!(config, BackofficeConfig::new("k"));
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let err = BackofficeConfig::from_lookup(lookup(&[("BACKOFFICE_FIREBASE_API_KEY", "  ")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = BackofficeConfig::from_lookup(lookup(&[
            ("BACKOFFICE_FIREBASE_API_KEY", "k"),
            ("BACKOFFICE_IDENTITY_ENDPOINT", "http://127.0.0.1:9099"),
            ("BACKOFFICE_DEVICE_DATABASE_URL", "sqlite::memory:"),
            ("BACKOFFICE_MAX_UPLOAD_BYTES", "1024"),
        ]))
        .unwrap();
        assert_eq!(config.identity_endpoint, "http://127.0.0.1:9099");
        assert_eq!(config.device_database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.max_upload_bytes, 1024);

        let bad = BackofficeConfig::from_lookup(lookup(&[
            ("BACKOFFICE_FIREBASE_API_KEY", "k"),
            ("BACKOFFICE_MAX_UPLOAD_BYTES", "lots"),
        ]));
        assert!(bad.is_err());
    }
}
