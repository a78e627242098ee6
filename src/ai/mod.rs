//! HTTP adaptor to the external AI inference service.
//!
//! Every long-running operation is a resource family under `/v1/`: POST
//! submits and returns an opaque `query_id`, `GET …/{id}/result` polls, and
//! `PATCH …/{id}` with `{"status":"stopped"}` requests cancellation. The
//! trackers in [`crate::tracking`] own the polling; this module only does
//! single request/response exchanges.

pub mod status;
pub mod types;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::AiServiceConfig;
use crate::error::{Result, ServiceError};
use status::{
    AdjustmentStatus, AskStatus, BreakdownStatus, ChartStatus, DeployStatus, RecommendationStatus,
    TaskKind, TextAnswerStatus,
};
use types::*;

/// The request/response contract every long-running operation goes through.
///
/// Consumed — not implemented — by the orchestration services and poll
/// jobs, so tests can script the remote side. [`AiClient`] is the HTTP
/// implementation; streaming endpoints stay inherent on it since they never
/// cross this seam.
#[async_trait]
pub trait AiApi: Send + Sync {
    async fn create_ask(&self, req: &AskRequest) -> Result<String>;
    async fn cancel_ask(&self, query_id: &str) -> Result<()>;
    async fn fetch_ask_result(&self, query_id: &str) -> Result<AskResult>;

    async fn create_breakdown(&self, req: &BreakdownRequest) -> Result<String>;
    async fn fetch_breakdown_result(&self, query_id: &str) -> Result<BreakdownResult>;

    async fn create_text_answer(&self, req: &TextAnswerRequest) -> Result<String>;
    async fn fetch_text_answer_result(&self, query_id: &str) -> Result<TextAnswerResult>;

    async fn create_chart(&self, req: &ChartRequest) -> Result<String>;
    async fn cancel_chart(&self, query_id: &str) -> Result<()>;
    async fn fetch_chart_result(&self, query_id: &str) -> Result<ChartResult>;

    async fn create_chart_adjustment(&self, req: &ChartAdjustmentRequest) -> Result<String>;
    async fn fetch_chart_adjustment_result(&self, query_id: &str) -> Result<ChartResult>;

    async fn create_question_recommendation(&self, req: &RecommendationRequest)
        -> Result<String>;
    async fn fetch_question_recommendation_result(
        &self,
        query_id: &str,
    ) -> Result<RecommendationResult>;

    async fn create_feedback_adjustment(&self, req: &FeedbackAdjustmentRequest) -> Result<String>;
    async fn fetch_feedback_adjustment_result(
        &self,
        query_id: &str,
    ) -> Result<FeedbackAdjustmentResult>;

    async fn deploy(&self, req: &DeployRequest) -> Result<()>;
    async fn fetch_deploy_status(&self, deploy_id: &str) -> Result<DeployStatusResult>;
}

/// Typed client for the AI service. Cheap to clone (reqwest pools inside).
#[derive(Clone)]
pub struct AiClient {
    http: reqwest::Client,
    base_url: String,
}

impl AiClient {
    pub fn new(config: &AiServiceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ServiceError::AiService {
                code: "CLIENT_INIT".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    // ─── Generic exchanges ───────────────────────────────────────────────────

    /// POST a submission body to a resource family, returning the opaque id.
    async fn submit<B: Serialize>(&self, resource: &str, body: &B) -> Result<String> {
        let resp = self
            .http
            .post(self.url(resource))
            .json(body)
            .send()
            .await
            .map_err(transport_err)?;
        let resp = check(resp).await?;
        let parsed: SubmitResponse = resp.json().await.map_err(malformed_body)?;
        Ok(parsed.query_id)
    }

    /// GET the current result of a task.
    async fn fetch_raw(&self, resource: &str, query_id: &str) -> Result<RawTaskResult> {
        let resp = self
            .http
            .get(self.url(&format!("{resource}/{query_id}/result")))
            .send()
            .await
            .map_err(transport_err)?;
        let resp = check(resp).await?;
        resp.json().await.map_err(malformed_body)
    }

    /// PATCH a task to the stopped state. A cancel is fire-and-forget from
    /// the caller's perspective — the tracked entity is only deregistered
    /// once a later poll observes the terminal status.
    async fn patch_stop(&self, resource: &str, query_id: &str) -> Result<()> {
        let resp = self
            .http
            .patch(self.url(&format!("{resource}/{query_id}")))
            .json(&json!({ "status": "stopped" }))
            .send()
            .await
            .map_err(transport_err)?;
        check(resp).await?;
        Ok(())
    }

    fn decode_payload<T: serde::de::DeserializeOwned>(response: Option<Value>) -> Result<Option<T>> {
        match response {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    // ─── Streaming (inherent — never crosses the AiApi seam) ─────────────────

    /// Stream the incremental ask result as raw bytes (SSE-framed upstream).
    pub async fn stream_ask_result(
        &self,
        query_id: &str,
    ) -> Result<BoxStream<'static, reqwest::Result<Bytes>>> {
        self.stream(TaskKind::Ask.resource(), query_id).await
    }

    /// Stream the narrative answer body as it is generated.
    pub async fn stream_text_answer(
        &self,
        query_id: &str,
    ) -> Result<BoxStream<'static, reqwest::Result<Bytes>>> {
        self.stream(TaskKind::TextAnswer.resource(), query_id).await
    }

    async fn stream(
        &self,
        resource: &str,
        query_id: &str,
    ) -> Result<BoxStream<'static, reqwest::Result<Bytes>>> {
        let resp = self
            .http
            .get(self.url(&format!("{resource}/{query_id}/streaming-result")))
            .send()
            .await
            .map_err(transport_err)?;
        let resp = check(resp).await?;
        Ok(resp.bytes_stream().boxed())
    }
}

#[async_trait]
impl AiApi for AiClient {
    // ─── Asks ────────────────────────────────────────────────────────────────

    async fn create_ask(&self, req: &AskRequest) -> Result<String> {
        self.submit(TaskKind::Ask.resource(), req).await
    }

    async fn cancel_ask(&self, query_id: &str) -> Result<()> {
        self.patch_stop(TaskKind::Ask.resource(), query_id).await
    }

    async fn fetch_ask_result(&self, query_id: &str) -> Result<AskResult> {
        let raw = self.fetch_raw(TaskKind::Ask.resource(), query_id).await?;
        Ok(AskResult {
            status: AskStatus::parse_wire(&raw.status)?,
            error: raw.error,
            candidates: Self::decode_payload(raw.response)?.unwrap_or_default(),
        })
    }

    // ─── Ask details (breakdown) ─────────────────────────────────────────────

    async fn create_breakdown(&self, req: &BreakdownRequest) -> Result<String> {
        self.submit(TaskKind::Breakdown.resource(), req).await
    }

    async fn fetch_breakdown_result(&self, query_id: &str) -> Result<BreakdownResult> {
        let raw = self.fetch_raw(TaskKind::Breakdown.resource(), query_id).await?;
        Ok(BreakdownResult {
            status: BreakdownStatus::parse_wire(&raw.status)?,
            error: raw.error,
            payload: Self::decode_payload(raw.response)?,
        })
    }

    // ─── SQL answers (text answer) ───────────────────────────────────────────

    async fn create_text_answer(&self, req: &TextAnswerRequest) -> Result<String> {
        self.submit(TaskKind::TextAnswer.resource(), req).await
    }

    async fn fetch_text_answer_result(&self, query_id: &str) -> Result<TextAnswerResult> {
        let raw = self.fetch_raw(TaskKind::TextAnswer.resource(), query_id).await?;
        Ok(TextAnswerResult {
            status: TextAnswerStatus::parse_wire(&raw.status)?,
            error: raw.error,
        })
    }

    // ─── Charts ──────────────────────────────────────────────────────────────

    async fn create_chart(&self, req: &ChartRequest) -> Result<String> {
        self.submit(TaskKind::Chart.resource(), req).await
    }

    async fn cancel_chart(&self, query_id: &str) -> Result<()> {
        self.patch_stop(TaskKind::Chart.resource(), query_id).await
    }

    async fn fetch_chart_result(&self, query_id: &str) -> Result<ChartResult> {
        let raw = self.fetch_raw(TaskKind::Chart.resource(), query_id).await?;
        Ok(ChartResult {
            status: ChartStatus::parse_wire(&raw.status)?,
            error: raw.error,
            payload: Self::decode_payload(raw.response)?,
        })
    }

    async fn create_chart_adjustment(&self, req: &ChartAdjustmentRequest) -> Result<String> {
        self.submit(TaskKind::ChartAdjustment.resource(), req).await
    }

    async fn fetch_chart_adjustment_result(&self, query_id: &str) -> Result<ChartResult> {
        let raw = self.fetch_raw(TaskKind::ChartAdjustment.resource(), query_id).await?;
        Ok(ChartResult {
            status: ChartStatus::parse_wire(&raw.status)?,
            error: raw.error,
            payload: Self::decode_payload(raw.response)?,
        })
    }

    // ─── Question recommendations ────────────────────────────────────────────

    async fn create_question_recommendation(
        &self,
        req: &RecommendationRequest,
    ) -> Result<String> {
        self.submit(TaskKind::Recommendation.resource(), req).await
    }

    async fn fetch_question_recommendation_result(
        &self,
        query_id: &str,
    ) -> Result<RecommendationResult> {
        let raw = self.fetch_raw(TaskKind::Recommendation.resource(), query_id).await?;
        Ok(RecommendationResult {
            status: RecommendationStatus::parse_wire(&raw.status)?,
            error: raw.error,
            payload: Self::decode_payload(raw.response)?,
        })
    }

    // ─── Ask feedbacks (reasoning adjustment) ────────────────────────────────

    async fn create_feedback_adjustment(
        &self,
        req: &FeedbackAdjustmentRequest,
    ) -> Result<String> {
        self.submit(TaskKind::FeedbackAdjustment.resource(), req).await
    }

    async fn fetch_feedback_adjustment_result(
        &self,
        query_id: &str,
    ) -> Result<FeedbackAdjustmentResult> {
        let raw = self.fetch_raw(TaskKind::FeedbackAdjustment.resource(), query_id).await?;
        Ok(FeedbackAdjustmentResult {
            status: AdjustmentStatus::parse_wire(&raw.status)?,
            error: raw.error,
            candidates: Self::decode_payload(raw.response)?.unwrap_or_default(),
        })
    }

    // ─── Semantics preparations (deploy) ─────────────────────────────────────

    async fn deploy(&self, req: &DeployRequest) -> Result<()> {
        let resp = self
            .http
            .post(self.url("semantics-preparations"))
            .json(req)
            .send()
            .await
            .map_err(transport_err)?;
        check(resp).await?;
        Ok(())
    }

    async fn fetch_deploy_status(&self, deploy_id: &str) -> Result<DeployStatusResult> {
        let resp = self
            .http
            .get(self.url(&format!("semantics-preparations/{deploy_id}/status")))
            .send()
            .await
            .map_err(transport_err)?;
        let resp = check(resp).await?;
        let raw: RawTaskResult = resp.json().await.map_err(malformed_body)?;
        Ok(DeployStatusResult {
            status: DeployStatus::parse_wire(&raw.status)?,
            error: raw.error,
        })
    }
}

// ─── Error mapping ───────────────────────────────────────────────────────────

fn transport_err(e: reqwest::Error) -> ServiceError {
    ServiceError::AiService {
        code: "TRANSPORT".to_string(),
        message: e.to_string(),
    }
}

fn malformed_body(e: reqwest::Error) -> ServiceError {
    ServiceError::AiService {
        code: "MALFORMED_BODY".to_string(),
        message: e.to_string(),
    }
}

/// Turn a non-2xx response into a typed error, extracting the detail string
/// from the body when the service supplies one.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            ["detail", "message", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|d| d.as_str()).map(str::to_string))
        })
        .unwrap_or(body);
    Err(ServiceError::AiService {
        code: status.as_u16().to_string(),
        message,
    })
}
