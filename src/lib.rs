pub mod ai;
pub mod api;
pub mod asking;
pub mod config;
pub mod deploy;
pub mod error;
pub mod preview;
pub mod storage;
pub mod tasks;
pub mod telemetry;
pub mod threads;
pub mod tracking;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use ai::{AiApi, AiClient};
use asking::AskingService;
use config::AppConfig;
use deploy::DeployService;
use preview::EngineClient;
use storage::Storage;
use tasks::TaskBindingStorage;
use telemetry::TelemetrySender;
use threads::ThreadStorage;
use tracking::TrackerSet;

/// Shared application state passed to every REST handler and background
/// tracker. Constructed once in main — components receive their
/// collaborators by injection, never through globals.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub storage: Arc<Storage>,
    pub asking: Arc<AskingService>,
    pub deploy: Arc<DeployService>,
    pub ai_client: AiClient,
    pub trackers: TrackerSet,
    /// Telemetry event sender (fire-and-forget).
    pub telemetry: TelemetrySender,
    pub started_at: std::time::Instant,
    /// Cancelled on shutdown; every tracker loop listens on it.
    pub shutdown: CancellationToken,
}

impl AppContext {
    /// Wire the full component graph and start the background trackers.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let storage = Arc::new(Storage::new(&config.data_dir).await?);
        let telemetry = telemetry::spawn(Arc::new(config.telemetry.clone()));

        let ai_client = AiClient::new(&config.ai_service)?;
        let ai_api: Arc<dyn AiApi> = Arc::new(ai_client.clone());
        let thread_storage = ThreadStorage::new(storage.pool());
        let bindings = TaskBindingStorage::new(storage.pool());
        let runner = Arc::new(EngineClient::new(&config.engine)?);

        let trackers = TrackerSet::new();
        let shutdown = CancellationToken::new();
        trackers.spawn_all(
            Arc::clone(&ai_api),
            thread_storage.clone(),
            telemetry.clone(),
            Duration::from_millis(config.ai_service.poll_interval_ms),
            &shutdown,
        );

        let asking = Arc::new(AskingService::new(
            Arc::clone(&ai_api),
            thread_storage,
            bindings,
            trackers.clone(),
            telemetry.clone(),
            runner,
            config.engine.preview_limit,
        ));
        let deploy = Arc::new(DeployService::new(ai_api));

        Ok(Self {
            config,
            storage,
            asking,
            deploy,
            ai_client,
            trackers,
            telemetry,
            started_at: std::time::Instant::now(),
            shutdown,
        })
    }
}
