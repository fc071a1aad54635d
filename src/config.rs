use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default host name of the supervisor inside a BenchBot deployment.
pub const DEFAULT_ADDRESS: &str = "benchbot_supervisor";
/// Default port the supervisor listens on.
pub const DEFAULT_PORT: u16 = 10000;
/// Default location of the result artifact.
pub const RESULT_LOCATION: &str = "/tmp/benchbot_result";

/// Environment variable overriding [`SupervisorConfig::address`].
pub const ENV_SUPERVISOR_ADDRESS: &str = "BENCHBOT_SUPERVISOR_ADDRESS";
/// Environment variable overriding [`BenchBotConfig::result_location`].
pub const ENV_RESULT_LOCATION: &str = "BENCHBOT_RESULT_LOCATION";

/// Complete configuration for a BenchBot client session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchBotConfig {
    pub supervisor: SupervisorConfig,
    pub connection: ConnectionConfig,
    /// Where the agent's result artifact is written.
    pub result_location: PathBuf,
}

/// How to reach the supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Base URL of the supervisor (default: `http://benchbot_supervisor:10000/`).
    pub address: String,
    /// Per-request timeout in seconds. `None` waits until the supervisor
    /// answers or the connection drops.
    pub request_timeout_secs: Option<u64>,
}

/// Startup handshake behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Interval between `is_running` polls (default: 100).
    pub poll_interval_ms: u64,
    /// Upper bound on the simulator readiness wait. `None` blocks indefinitely.
    pub readiness_timeout_secs: Option<u64>,
}

impl Default for BenchBotConfig {
    fn default() -> Self {
        Self {
            supervisor: SupervisorConfig::default(),
            connection: ConnectionConfig::default(),
            result_location: PathBuf::from(RESULT_LOCATION),
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            address: format!("http://{DEFAULT_ADDRESS}:{DEFAULT_PORT}/"),
            request_timeout_secs: None,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            readiness_timeout_secs: None,
        }
    }
}

impl ConnectionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn readiness_timeout(&self) -> Option<Duration> {
        self.readiness_timeout_secs.map(Duration::from_secs)
    }
}

impl SupervisorConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl BenchBotConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Apply `BENCHBOT_*` environment overrides on top of the loaded values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(address) = lookup(ENV_SUPERVISOR_ADDRESS).filter(|a| !a.is_empty()) {
            self.supervisor.address = address;
        }
        if let Some(location) = lookup(ENV_RESULT_LOCATION).filter(|l| !l.is_empty()) {
            self.result_location = PathBuf::from(location);
        }
    }
}
