use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Bot check in front of the reservation store. `Ok(false)` means the
/// token was rejected; `Err` means the check itself could not complete.
#[async_trait]
pub trait HumanVerifier: Send + Sync {
    async fn verify(&self, token: Option<&str>, remote_ip: &str) -> Result<bool>;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

/// Cloudflare Turnstile siteverify client.
pub struct TurnstileVerifier {
    client: Client,
    secret_key: String,
    verify_url: String,
}

impl TurnstileVerifier {
    pub fn new(secret_key: &str, verify_url: &str) -> Self {
        Self {
            client: Client::new(),
            secret_key: secret_key.to_string(),
            verify_url: verify_url.to_string(),
        }
    }

    /// `None` when no secret key is configured, which disables the check.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        config.turnstile_secret_key
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .map(|secret| Self::new(secret, &config.turnstile_verify_url))
    }
}

#[async_trait]
impl HumanVerifier for TurnstileVerifier {
    async fn verify(&self, token: Option<&str>, remote_ip: &str) -> Result<bool> {
        let token = match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => {
                debug!("No verification token supplied by {}", remote_ip);
                return Ok(false);
            }
        };

        let response = self.client
            .post(&self.verify_url)
            .json(&json!({
                "secret": self.secret_key,
                "response": token,
                "remoteip": remote_ip
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("Turnstile siteverify returned {}", status);
            return Err(anyhow!("Turnstile siteverify returned {}", status));
        }

        let result: SiteVerifyResponse = response.json().await?;
        if !result.success {
            debug!("Turnstile rejected token from {}: {:?}", remote_ip, result.error_codes);
        }

        Ok(result.success)
    }
}
