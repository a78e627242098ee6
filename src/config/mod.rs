use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 4700;
const DEFAULT_AI_SERVICE_URL: &str = "http://127.0.0.1:5555";
const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_TELEMETRY_URL: &str = "https://api.genbi.io";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PREVIEW_LIMIT: u64 = 500;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".genbid")
}

// ─── AiServiceConfig ─────────────────────────────────────────────────────────

/// Remote AI inference service connection (`[ai_service]` in config.toml).
///
/// Every long-running operation (SQL generation, breakdowns, charts, text
/// answers, recommendations, adjustments) is submitted here and polled to
/// completion by the background trackers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AiServiceConfig {
    /// Base URL of the AI service (default: http://127.0.0.1:5555).
    pub base_url: String,
    /// Interval between tracker poll cycles in milliseconds (default: 1000).
    pub poll_interval_ms: u64,
    /// Per-request HTTP timeout in seconds (default: 30).
    pub request_timeout_secs: u64,
}

impl Default for AiServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_AI_SERVICE_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

// ─── EngineConfig ────────────────────────────────────────────────────────────

/// Query-execution engine used for data previews (`[engine]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the engine (default: http://127.0.0.1:8080).
    pub base_url: String,
    /// Default row cap for previews (default: 500).
    pub preview_limit: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ENGINE_URL.to_string(),
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }
}

// ─── TelemetryConfig ─────────────────────────────────────────────────────────

/// Usage telemetry (`[telemetry]` in config.toml). Fire-and-forget — flush
/// failures never block or fail any core flow.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Enable event emission (default: true).
    pub enabled: bool,
    /// Collector base URL (default: https://api.genbi.io).
    pub base_url: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_TELEMETRY_URL.to_string(),
        }
    }
}

// ─── TOML config file ────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// REST server port (default: 4700).
    port: Option<u16>,
    /// Bind address (default: "127.0.0.1").
    bind_address: Option<String>,
    /// Log level filter string, e.g. "debug", "info,genbid=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default) | "json".
    log_format: Option<String>,
    /// AI service connection (`[ai_service]`).
    ai_service: Option<AiServiceConfig>,
    /// Query engine connection (`[engine]`).
    engine: Option<EngineConfig>,
    /// Telemetry opt-out and collector URL (`[telemetry]`).
    telemetry: Option<TelemetryConfig>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── AppConfig ───────────────────────────────────────────────────────────────

/// Resolved daemon configuration. Constructed once at process start and
/// injected into every component — no ambient global lookup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub bind_address: String,
    pub data_dir: PathBuf,
    pub log: String,
    /// Log output format: "pretty" (default) | "json".
    pub log_format: String,
    pub ai_service: AiServiceConfig,
    pub engine: EngineConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let bind_address = bind_address
            .or(std::env::var("GENBID_BIND").ok().filter(|s| !s.is_empty()))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let log_format = std::env::var("GENBID_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let mut ai_service = toml.ai_service.unwrap_or_default();
        if let Some(url) = std::env::var("GENBID_AI_SERVICE_URL")
            .ok()
            .filter(|s| !s.is_empty())
        {
            ai_service.base_url = url;
        }

        let mut engine = toml.engine.unwrap_or_default();
        if let Some(url) = std::env::var("GENBID_ENGINE_URL")
            .ok()
            .filter(|s| !s.is_empty())
        {
            engine.base_url = url;
        }

        let telemetry = toml.telemetry.unwrap_or_default();

        Self {
            port,
            bind_address,
            data_dir,
            log,
            log_format,
            ai_service,
            engine,
            telemetry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_toml() {
        let dir = std::env::temp_dir().join("genbid-config-test-missing");
        let cfg = AppConfig::new(None, Some(dir), None, None);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.ai_service.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(cfg.engine.preview_limit, DEFAULT_PREVIEW_LIMIT);
        assert!(cfg.telemetry.enabled);
    }

    #[test]
    fn cli_overrides_beat_defaults() {
        let dir = std::env::temp_dir().join("genbid-config-test-cli");
        let cfg = AppConfig::new(Some(9999), Some(dir), Some("debug".into()), None);
        assert_eq!(cfg.port, 9999);
        assert_eq!(cfg.log, "debug");
    }
}
