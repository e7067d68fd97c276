//! Deployment identity, the token that namespaces persisted progress.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::HealthcheckError;

/// Supplies the deployment identifier. An empty string means "unknown",
/// which disables persistence.
#[async_trait]
pub trait DeploymentIdentity: Send + Sync {
    async fn deployment(&self) -> String;
}

/// Fixed identity, for embedding hosts that already know it.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub String);

#[async_trait]
impl DeploymentIdentity for StaticIdentity {
    async fn deployment(&self) -> String {
        self.0.clone()
    }
}

/// Healthcheck payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthCheck {
    #[serde(default)]
    pub dns: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub deployment: String,
}

/// Reads the deployment identity from the backend healthcheck endpoint.
pub struct HealthcheckClient {
    client: reqwest::Client,
    url: String,
}

impl HealthcheckClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Fetch and decode the healthcheck.
    pub async fn fetch(&self) -> Result<HealthCheck, HealthcheckError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| HealthcheckError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HealthcheckError::Status(status.as_u16()));
        }

        resp.json::<HealthCheck>()
            .await
            .map_err(|e| HealthcheckError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DeploymentIdentity for HealthcheckClient {
    async fn deployment(&self) -> String {
        match self.fetch().await {
            Ok(health) => {
                debug!(dns = %health.dns, version = %health.version, "Healthcheck ok");
                health.deployment
            }
            Err(e) => {
                error!(url = %self.url, "Failed to fetch health check data: {}", e);
                String::new()
            }
        }
    }
}
