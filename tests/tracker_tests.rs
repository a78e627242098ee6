//! Tracker engine semantics — poll dedup, terminal retirement, per-entity
//! error isolation. Cycles are driven manually so timing is deterministic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use genbid::error::{Result, ServiceError};
use genbid::tracking::{PollJob, PollOutcome, Tracker};

/// Job that records concurrency and returns a scripted outcome.
struct ScriptedJob {
    polls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    /// Per-poll artificial latency.
    delay: Duration,
    outcome: fn(u64) -> Result<PollOutcome>,
    seen_query_ids: Mutex<Vec<String>>,
}

impl ScriptedJob {
    fn new(delay: Duration, outcome: fn(u64) -> Result<PollOutcome>) -> Self {
        Self {
            polls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay,
            outcome,
            seen_query_ids: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PollJob for ScriptedJob {
    async fn poll(&self, _entity_id: i64, query_id: &str) -> Result<PollOutcome> {
        let nth = self.polls.fetch_add(1, Ordering::SeqCst) as u64;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.seen_query_ids.lock().unwrap().push(query_id.to_string());

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.outcome)(nth)
    }
}

#[tokio::test]
async fn overlapping_cycles_never_poll_the_same_entity_twice() {
    let tracker = Tracker::new("test");
    tracker.add_task(1, "q-1");

    // Slow poll: both cycles run concurrently; the second must skip the
    // entity because its poll is still in flight.
    let job = ScriptedJob::new(Duration::from_millis(100), |_| Ok(PollOutcome::InFlight));
    tokio::join!(tracker.run_cycle(&job), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        tracker.run_cycle(&job).await;
    });

    assert_eq!(job.polls.load(Ordering::SeqCst), 1, "second cycle must skip");
    assert_eq!(job.max_in_flight.load(Ordering::SeqCst), 1);
    assert!(tracker.contains(1), "entity stays tracked while in flight");
}

#[tokio::test]
async fn distinct_entities_poll_concurrently() {
    let tracker = Tracker::new("test");
    for id in 1..=4 {
        tracker.add_task(id, format!("q-{id}"));
    }

    let job = ScriptedJob::new(Duration::from_millis(50), |_| Ok(PollOutcome::Finalized));
    let started = std::time::Instant::now();
    tracker.run_cycle(&job).await;

    assert_eq!(job.polls.load(Ordering::SeqCst), 4);
    assert_eq!(job.max_in_flight.load(Ordering::SeqCst), 4, "polls overlap");
    assert!(
        started.elapsed() < Duration::from_millis(150),
        "cycle awaits polls jointly, not sequentially"
    );
    assert!(tracker.is_empty());
}

#[tokio::test]
async fn terminal_status_removes_entity_from_next_tick() {
    let tracker = Tracker::new("test");
    tracker.add_task(42, "q-42");

    let job = ScriptedJob::new(Duration::ZERO, |_| Ok(PollOutcome::Finalized));
    tracker.run_cycle(&job).await;
    assert!(!tracker.contains(42));

    // Next tick polls nothing.
    tracker.run_cycle(&job).await;
    assert_eq!(job.polls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn poll_error_keeps_entity_tracked_and_isolated() {
    let tracker = Tracker::new("test");
    tracker.add_task(1, "q-1");
    tracker.add_task(2, "q-2");

    // Entity polls interleave; the failing one must not disturb the other.
    fn outcome(nth: u64) -> Result<PollOutcome> {
        if nth % 2 == 0 {
            Err(ServiceError::UnknownStatus("exploded".into()))
        } else {
            Ok(PollOutcome::InFlight)
        }
    }
    let job = ScriptedJob::new(Duration::ZERO, outcome);
    tracker.run_cycle(&job).await;

    // Both polled, both still tracked (error is fatal for the cycle only).
    assert_eq!(job.polls.load(Ordering::SeqCst), 2);
    assert!(tracker.contains(1));
    assert!(tracker.contains(2));

    // The erroring entity is polled again on the next cycle.
    tracker.run_cycle(&job).await;
    assert_eq!(job.polls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn re_registration_supersedes_the_query_id() {
    let tracker = Tracker::new("test");
    tracker.add_task(7, "q-old");
    tracker.add_task(7, "q-new");
    assert_eq!(tracker.len(), 1);

    let job = ScriptedJob::new(Duration::ZERO, |_| Ok(PollOutcome::Finalized));
    tracker.run_cycle(&job).await;
    assert_eq!(*job.seen_query_ids.lock().unwrap(), vec!["q-new".to_string()]);
}

#[tokio::test]
async fn spawned_loop_stops_on_cancellation() {
    let tracker = Tracker::new("test");
    let job = std::sync::Arc::new(ScriptedJob::new(Duration::ZERO, |_| {
        Ok(PollOutcome::InFlight)
    }));
    let token = CancellationToken::new();
    let handle = tracker.spawn(job, Duration::from_millis(10), token.clone());

    token.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("loop must exit after cancellation")
        .expect("loop task must not panic");
}
