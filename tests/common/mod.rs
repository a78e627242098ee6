//! Shared test doubles: a scripted AI service and an in-memory query runner.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use genbid::ai::types::*;
use genbid::ai::AiApi;
use genbid::asking::AskingService;
use genbid::error::{Result, ServiceError};
use genbid::preview::QueryRunner;
use genbid::storage::Storage;
use genbid::tasks::TaskBindingStorage;
use genbid::telemetry::TelemetrySender;
use genbid::threads::ThreadStorage;
use genbid::tracking::TrackerSet;

/// Scripted stand-in for the AI service. Submissions hand out sequential
/// query ids and capture the request; fetches pop pre-loaded results.
#[derive(Default)]
pub struct MockAi {
    counter: AtomicUsize,
    pub ask_requests: Mutex<Vec<AskRequest>>,
    pub recommendation_requests: Mutex<Vec<RecommendationRequest>>,
    pub cancelled: Mutex<Vec<String>>,
    pub ask_results: Mutex<VecDeque<Result<AskResult>>>,
    pub breakdown_results: Mutex<VecDeque<Result<BreakdownResult>>>,
    pub text_answer_results: Mutex<VecDeque<Result<TextAnswerResult>>>,
    pub chart_results: Mutex<VecDeque<Result<ChartResult>>>,
    pub recommendation_results: Mutex<VecDeque<Result<RecommendationResult>>>,
    pub feedback_results: Mutex<VecDeque<Result<FeedbackAdjustmentResult>>>,
    pub deploy_results: Mutex<VecDeque<Result<DeployStatusResult>>>,
}

impl MockAi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn next_id(&self) -> String {
        format!("q-{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn submissions(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    fn pop<T>(queue: &Mutex<VecDeque<Result<T>>>, what: &str) -> Result<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted {what} result left"))
    }

    pub fn push_breakdown(&self, result: Result<BreakdownResult>) {
        self.breakdown_results.lock().unwrap().push_back(result);
    }

    pub fn push_recommendation(&self, result: Result<RecommendationResult>) {
        self.recommendation_results.lock().unwrap().push_back(result);
    }

    pub fn push_feedback(&self, result: Result<FeedbackAdjustmentResult>) {
        self.feedback_results.lock().unwrap().push_back(result);
    }

    pub fn push_chart(&self, result: Result<ChartResult>) {
        self.chart_results.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl AiApi for MockAi {
    async fn create_ask(&self, req: &AskRequest) -> Result<String> {
        self.ask_requests.lock().unwrap().push(req.clone());
        Ok(self.next_id())
    }

    async fn cancel_ask(&self, query_id: &str) -> Result<()> {
        self.cancelled.lock().unwrap().push(query_id.to_string());
        Ok(())
    }

    async fn fetch_ask_result(&self, _query_id: &str) -> Result<AskResult> {
        Self::pop(&self.ask_results, "ask")
    }

    async fn create_breakdown(&self, _req: &BreakdownRequest) -> Result<String> {
        Ok(self.next_id())
    }

    async fn fetch_breakdown_result(&self, _query_id: &str) -> Result<BreakdownResult> {
        Self::pop(&self.breakdown_results, "breakdown")
    }

    async fn create_text_answer(&self, _req: &TextAnswerRequest) -> Result<String> {
        Ok(self.next_id())
    }

    async fn fetch_text_answer_result(&self, _query_id: &str) -> Result<TextAnswerResult> {
        Self::pop(&self.text_answer_results, "text answer")
    }

    async fn create_chart(&self, _req: &ChartRequest) -> Result<String> {
        Ok(self.next_id())
    }

    async fn cancel_chart(&self, query_id: &str) -> Result<()> {
        self.cancelled.lock().unwrap().push(query_id.to_string());
        Ok(())
    }

    async fn fetch_chart_result(&self, _query_id: &str) -> Result<ChartResult> {
        Self::pop(&self.chart_results, "chart")
    }

    async fn create_chart_adjustment(&self, _req: &ChartAdjustmentRequest) -> Result<String> {
        Ok(self.next_id())
    }

    async fn fetch_chart_adjustment_result(&self, _query_id: &str) -> Result<ChartResult> {
        Self::pop(&self.chart_results, "chart adjustment")
    }

    async fn create_question_recommendation(
        &self,
        req: &RecommendationRequest,
    ) -> Result<String> {
        self.recommendation_requests.lock().unwrap().push(req.clone());
        Ok(self.next_id())
    }

    async fn fetch_question_recommendation_result(
        &self,
        _query_id: &str,
    ) -> Result<RecommendationResult> {
        Self::pop(&self.recommendation_results, "recommendation")
    }

    async fn create_feedback_adjustment(
        &self,
        _req: &FeedbackAdjustmentRequest,
    ) -> Result<String> {
        Ok(self.next_id())
    }

    async fn fetch_feedback_adjustment_result(
        &self,
        _query_id: &str,
    ) -> Result<FeedbackAdjustmentResult> {
        Self::pop(&self.feedback_results, "feedback adjustment")
    }

    async fn deploy(&self, _req: &DeployRequest) -> Result<()> {
        Ok(())
    }

    async fn fetch_deploy_status(&self, _deploy_id: &str) -> Result<DeployStatusResult> {
        Self::pop(&self.deploy_results, "deploy status")
    }
}

/// Query runner that records every executed statement and returns a fixed
/// row set.
#[derive(Default)]
pub struct RecordingRunner {
    pub executed: Mutex<Vec<String>>,
}

#[async_trait]
impl QueryRunner for RecordingRunner {
    async fn preview(&self, sql: &str, _limit: u64) -> Result<Value> {
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(json!({ "rows": [[1]], "columns": ["n"] }))
    }
}

/// Runner that always fails, for error-propagation tests.
pub struct FailingRunner;

#[async_trait]
impl QueryRunner for FailingRunner {
    async fn preview(&self, _sql: &str, _limit: u64) -> Result<Value> {
        Err(ServiceError::Engine("connection refused".into()))
    }
}

/// Everything a service-level test needs, backed by a tempdir SQLite.
pub struct TestHarness {
    pub ai: Arc<MockAi>,
    pub store: ThreadStorage,
    pub bindings: TaskBindingStorage,
    pub trackers: TrackerSet,
    pub service: AskingService,
    pub runner: Arc<RecordingRunner>,
    _dir: TempDir,
}

impl TestHarness {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let storage = Storage::new(dir.path()).await.expect("Storage::new failed");
        let ai = MockAi::new();
        let store = ThreadStorage::new(storage.pool());
        let bindings = TaskBindingStorage::new(storage.pool());
        let trackers = TrackerSet::new();
        let runner = Arc::new(RecordingRunner::default());
        let service = AskingService::new(
            Arc::clone(&ai) as Arc<dyn AiApi>,
            store.clone(),
            bindings.clone(),
            trackers.clone(),
            TelemetrySender::disabled(),
            Arc::clone(&runner) as Arc<dyn QueryRunner>,
            500,
        );
        Self {
            ai,
            store,
            bindings,
            trackers,
            service,
            runner,
            _dir: dir,
        }
    }
}
