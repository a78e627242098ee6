//! Background task tracking.
//!
//! A [`Tracker`] owns the set of outstanding remote tasks for one task kind
//! and drives a recurring poll cycle over all of them. Six instances exist
//! side by side (breakdown, text answer, chart, chart adjustment,
//! recommendation questions, feedback adjustment); they share nothing but
//! the pattern.
//!
//! Per tracked entity the lifecycle is REGISTERED → POLLING → (unchanged:
//! POLLING) → FINALIZED (removed). A cycle polls every tracked entity that
//! is not already running; polls within a cycle execute concurrently and a
//! failure of one never aborts siblings or the timer. An entity leaves the
//! set only when a poll observes a terminal remote status.

pub mod jobs;

use async_trait::async_trait;
use futures_util::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;

/// What a single poll concluded about a tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Remote task still in progress (or unchanged) — keep tracking.
    InFlight,
    /// Terminal status observed (or the handle is stale) — stop tracking.
    Finalized,
}

/// One poll step for a particular task kind.
///
/// Implementations fetch the remote status, compare it with the persisted
/// one, write on change, and classify the transition for telemetry. They
/// never touch the tracked set — that is the tracker's job.
#[async_trait]
pub trait PollJob: Send + Sync + 'static {
    async fn poll(&self, entity_id: i64, query_id: &str) -> Result<PollOutcome>;
}

/// Recurring poller for one task kind.
pub struct Tracker {
    name: &'static str,
    /// entity id → opaque remote query id.
    tasks: Mutex<HashMap<i64, String>>,
    /// Entities with a poll currently in flight. `insert` is the atomic
    /// check-and-set; the lock is never held across an await point.
    running: Mutex<HashSet<i64>>,
}

impl Tracker {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            tasks: Mutex::new(HashMap::new()),
            running: Mutex::new(HashSet::new()),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register an entity. Re-registering replaces the handle — a new
    /// query id supersedes the old one, whose result is abandoned.
    pub fn add_task(&self, entity_id: i64, query_id: impl Into<String>) {
        let query_id = query_id.into();
        debug!(tracker = self.name, entity_id, query_id, "task registered");
        self.tasks.lock().unwrap().insert(entity_id, query_id);
    }

    /// Whether the entity currently has an outstanding task. Used by the
    /// orchestration layer to turn duplicate generation requests into
    /// no-ops.
    pub fn contains(&self, entity_id: i64) -> bool {
        self.tasks.lock().unwrap().contains_key(&entity_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().unwrap().is_empty()
    }

    /// Spawn the recurring poll loop. Each tick launches one cycle as its
    /// own task so a slow cycle never delays the timer; the running-guard
    /// keeps overlapping cycles from double-polling an entity. The loop
    /// exits when `token` is cancelled.
    pub fn spawn(
        self: &Arc<Self>,
        job: Arc<dyn PollJob>,
        poll_interval: Duration,
        token: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            ticker.tick().await; // skip immediate tick
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!(tracker = tracker.name, "tracker stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let tracker = Arc::clone(&tracker);
                        let job = Arc::clone(&job);
                        tokio::spawn(async move {
                            tracker.run_cycle(job.as_ref()).await;
                        });
                    }
                }
            }
        })
    }

    /// One poll cycle across all tracked entities not already running.
    ///
    /// Public so tests can drive ticks deterministically.
    pub async fn run_cycle(&self, job: &dyn PollJob) {
        let due: Vec<(i64, String)> = {
            let tasks = self.tasks.lock().unwrap();
            let mut running = self.running.lock().unwrap();
            tasks
                .iter()
                .filter(|(id, _)| running.insert(**id))
                .map(|(id, query_id)| (*id, query_id.clone()))
                .collect()
        };
        if due.is_empty() {
            return;
        }

        let polls = due.into_iter().map(|(entity_id, query_id)| async move {
            let outcome = job.poll(entity_id, &query_id).await;
            (entity_id, outcome)
        });
        for (entity_id, outcome) in join_all(polls).await {
            match outcome {
                Ok(PollOutcome::Finalized) => {
                    debug!(tracker = self.name, entity_id, "task finalized");
                    self.tasks.lock().unwrap().remove(&entity_id);
                }
                Ok(PollOutcome::InFlight) => {}
                // Fatal for this entity's cycle only: stays tracked for the
                // next tick, siblings and the timer are unaffected.
                Err(e) => {
                    warn!(tracker = self.name, entity_id, err = %e, "poll failed");
                }
            }
            self.running.lock().unwrap().remove(&entity_id);
        }
    }
}

// ─── TrackerSet ──────────────────────────────────────────────────────────────

use crate::ai::AiApi;
use crate::telemetry::TelemetrySender;
use crate::threads::ThreadStorage;

/// The six tracker instances, one per task kind. They do not share tracked
/// sets, timers, or running-guards.
#[derive(Clone)]
pub struct TrackerSet {
    pub breakdown: Arc<Tracker>,
    pub text_answer: Arc<Tracker>,
    pub chart: Arc<Tracker>,
    pub chart_adjustment: Arc<Tracker>,
    pub recommendation: Arc<Tracker>,
    pub feedback_adjustment: Arc<Tracker>,
}

impl TrackerSet {
    pub fn new() -> Self {
        Self {
            breakdown: Tracker::new("breakdown"),
            text_answer: Tracker::new("text_answer"),
            chart: Tracker::new("chart"),
            chart_adjustment: Tracker::new("chart_adjustment"),
            recommendation: Tracker::new("recommendation"),
            feedback_adjustment: Tracker::new("feedback_adjustment"),
        }
    }

    /// Spawn every tracker's poll loop. All loops stop when `token` is
    /// cancelled.
    pub fn spawn_all(
        &self,
        client: Arc<dyn AiApi>,
        store: ThreadStorage,
        telemetry: TelemetrySender,
        poll_interval: Duration,
        token: &CancellationToken,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        vec![
            self.breakdown.spawn(
                Arc::new(jobs::BreakdownPollJob {
                    client: Arc::clone(&client),
                    store: store.clone(),
                    telemetry: telemetry.clone(),
                }),
                poll_interval,
                token.clone(),
            ),
            self.text_answer.spawn(
                Arc::new(jobs::TextAnswerPollJob {
                    client: Arc::clone(&client),
                    store: store.clone(),
                    telemetry: telemetry.clone(),
                }),
                poll_interval,
                token.clone(),
            ),
            self.chart.spawn(
                Arc::new(jobs::ChartPollJob {
                    client: Arc::clone(&client),
                    store: store.clone(),
                    telemetry: telemetry.clone(),
                    adjustment: false,
                }),
                poll_interval,
                token.clone(),
            ),
            self.chart_adjustment.spawn(
                Arc::new(jobs::ChartPollJob {
                    client: Arc::clone(&client),
                    store: store.clone(),
                    telemetry: telemetry.clone(),
                    adjustment: true,
                }),
                poll_interval,
                token.clone(),
            ),
            self.recommendation.spawn(
                Arc::new(jobs::RecommendationPollJob {
                    client: Arc::clone(&client),
                    store: store.clone(),
                    telemetry: telemetry.clone(),
                }),
                poll_interval,
                token.clone(),
            ),
            self.feedback_adjustment.spawn(
                Arc::new(jobs::FeedbackAdjustmentPollJob {
                    client,
                    store,
                    telemetry,
                }),
                poll_interval,
                token.clone(),
            ),
        ]
    }
}

impl Default for TrackerSet {
    fn default() -> Self {
        Self::new()
    }
}
