use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{IdentityBackend, IdentityToken};
use crate::config::BackofficeConfig;
use crate::error::{Error, Result};

const SIGN_IN_PATH: &str = "/v1/accounts:signInWithPassword";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Identity backend speaking the Identity Toolkit REST API.
#[derive(Debug, Clone)]
pub struct FirebaseIdentity {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl FirebaseIdentity {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: crate::config::DEFAULT_IDENTITY_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &BackofficeConfig) -> Self {
        Self::new(config.api_key.clone()).with_endpoint(config.identity_endpoint.clone())
    }

    /// Points the client at another base URL, such as an emulator or a mock.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl IdentityBackend for FirebaseIdentity {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentityToken> {
        let url = format!("{}{SIGN_IN_PATH}", self.endpoint.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&SignInRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| Error::Authentication(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorEnvelope>().await {
                Ok(envelope) => envelope.error.message,
                Err(_) => status.to_string(),
            };
            debug!(%status, %message, "identity backend refused sign-in");
            return Err(Error::Authentication(message));
        }

        let body: SignInResponse = response
            .json()
            .await
            .map_err(|e| Error::Authentication(format!("malformed sign-in response: {e}")))?;

        Ok(IdentityToken {
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            user_id: body.local_id,
            email: body.email,
            expires_in: body
                .expires_in
                .as_deref()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs),
        })
    }
}
