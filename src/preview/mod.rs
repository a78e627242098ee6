// SPDX-License-Identifier: MIT
//! Query-execution collaborator used for data previews.
//!
//! The core only consumes the [`QueryRunner`] seam; the default
//! implementation forwards to the deployed engine's preview endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::EngineConfig;
use crate::error::{Result, ServiceError};

/// Executes SQL against the live data source and returns a bounded row
/// preview.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    async fn preview(&self, sql: &str, limit: u64) -> Result<Value>;
}

/// Engine-backed preview over `POST /v1/mdl/preview`.
#[derive(Clone)]
pub struct EngineClient {
    http: reqwest::Client,
    base_url: String,
}

impl EngineClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ServiceError::Engine(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl QueryRunner for EngineClient {
    async fn preview(&self, sql: &str, limit: u64) -> Result<Value> {
        let resp = self
            .http
            .post(format!("{}/v1/mdl/preview", self.base_url))
            .json(&json!({ "sql": sql, "limit": limit }))
            .send()
            .await
            .map_err(|e| ServiceError::Engine(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Engine(format!("{status}: {body}")));
        }
        resp.json()
            .await
            .map_err(|e| ServiceError::Engine(e.to_string()))
    }
}
