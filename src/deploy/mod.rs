// SPDX-License-Identifier: MIT
//! Semantics deployment — submit a manifest and wait for indexing.
//!
//! The wait is a bounded retry loop with linearly increasing backoff
//! (roughly 30 seconds in total). Exhaustion is not an error: the waiter
//! gives up and returns a FAILED result so callers always get a terminal
//! outcome to persist.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::ai::status::DeployStatus;
use crate::ai::types::{DeployRequest, WireError};
use crate::ai::AiApi;
use crate::error::Result;

/// Retry budget for [`DeployService::wait_for_deployment`].
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Maximum status polls before giving up.
    pub max_attempts: u32,
    /// Backoff base: attempt n sleeps n * this.
    pub backoff_base: Duration,
}

impl Default for DeployConfig {
    fn default() -> Self {
        // 1+2+…+7 seconds ≈ 28s total.
        Self {
            max_attempts: 7,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl DeployConfig {
    /// A config suitable for quick unit tests (no real waiting).
    pub fn instant() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeployResult {
    pub status: DeployStatus,
    pub error: Option<WireError>,
}

pub struct DeployService {
    client: Arc<dyn AiApi>,
    config: DeployConfig,
}

impl DeployService {
    pub fn new(client: Arc<dyn AiApi>) -> Self {
        Self::with_config(client, DeployConfig::default())
    }

    pub fn with_config(client: Arc<dyn AiApi>, config: DeployConfig) -> Self {
        Self { client, config }
    }

    /// Submit the manifest under the caller-chosen deployment id.
    pub async fn deploy(&self, manifest: Value, deploy_id: &str) -> Result<()> {
        self.client
            .deploy(&DeployRequest {
                manifest,
                id: deploy_id.to_string(),
            })
            .await
    }

    /// Poll the deployment until it reaches a terminal status or the retry
    /// budget runs out.
    pub async fn wait_for_deployment(&self, deploy_id: &str) -> DeployResult {
        let max_attempts = self.config.max_attempts;
        for attempt in 1..=max_attempts {
            match self.client.fetch_deploy_status(deploy_id).await {
                Ok(result) if result.status.is_terminal() => {
                    return DeployResult {
                        status: result.status,
                        error: result.error,
                    };
                }
                Ok(result) => {
                    debug!(deploy_id, attempt, status = ?result.status, "deployment still indexing");
                }
                Err(e) => {
                    warn!(deploy_id, attempt, err = %e, "deployment status poll failed");
                }
            }
            if attempt < max_attempts {
                tokio::time::sleep(self.config.backoff_base * attempt).await;
            }
        }
        DeployResult {
            status: DeployStatus::Failed,
            error: Some(WireError {
                code: "DEPLOY_TIMEOUT".to_string(),
                message: format!(
                    "deployment {deploy_id} did not reach a terminal state after {max_attempts} polls"
                ),
            }),
        }
    }
}
