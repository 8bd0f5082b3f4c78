//! Session configuration from explicit values or environment variables.
//!
//! Everything the driver needs is carried in one value handed to the session
//! constructor; there is no process-wide state.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::EngineError;
use crate::stream::DrainBudget;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Path to the engine binary.
    pub binary_path: PathBuf,

    /// Neural-net model file handed to the engine.
    pub model_path: PathBuf,

    /// Optional engine config file.
    pub config_path: Option<PathBuf>,

    /// `key=value` pairs appended as `-override-config` on the command line.
    pub overrides: Vec<(String, String)>,

    pub board_size: u8,
    pub komi: f64,

    /// Deadline for the startup handshake response.
    pub startup_timeout: Duration,

    /// Deadline for ordinary command responses.
    pub command_timeout: Duration,

    /// Deadline for `genmove`, which runs a full search.
    pub genmove_timeout: Duration,

    /// Per-read deadline while consuming an analysis stream.
    pub poll_timeout: Duration,

    /// Deadline for the liveness probe.
    pub probe_timeout: Duration,

    /// How long to wait for a polite exit before force-killing.
    pub shutdown_grace: Duration,

    /// Limits for draining trailing telemetry after `stop`.
    pub drain_budget: DrainBudget,
}

impl EngineConfig {
    pub fn new(binary_path: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            model_path: model_path.into(),
            config_path: None,
            overrides: Vec::new(),
            board_size: 19,
            komi: 7.5,
            startup_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(5),
            genmove_timeout: Duration::from_secs(60),
            poll_timeout: Duration::from_millis(100),
            probe_timeout: Duration::from_secs(2),
            shutdown_grace: Duration::from_secs(5),
            drain_budget: DrainBudget::default(),
        }
    }

    /// Load configuration from environment variables, with `.env` support
    /// for local development.
    pub fn from_env() -> Result<Self, EngineError> {
        let _ = dotenvy::dotenv();

        let binary = env::var("KATAGO_PATH")
            .map_err(|_| EngineError::Config("KATAGO_PATH not set".into()))?;
        let model = env::var("KATAGO_MODEL")
            .map_err(|_| EngineError::Config("KATAGO_MODEL not set".into()))?;

        let mut config = Self::new(binary, model);

        if let Ok(path) = env::var("KATAGO_CONFIG") {
            config.config_path = Some(path.into());
        }
        if let Some(size) = env::var("KATAGO_BOARD_SIZE").ok().and_then(|v| v.parse().ok()) {
            config.board_size = size;
        }
        if let Some(komi) = env::var("KATAGO_KOMI").ok().and_then(|v| v.parse().ok()) {
            config.komi = komi;
        }
        if let Some(secs) = env::var("KATAGO_STARTUP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.startup_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Fail fast on configuration that cannot work, before spawning anything.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.binary_path.is_file() {
            return Err(EngineError::Config(format!(
                "engine binary not found: {}",
                self.binary_path.display()
            )));
        }
        if !self.model_path.is_file() {
            return Err(EngineError::Config(format!(
                "model file not found: {}",
                self.model_path.display()
            )));
        }
        if let Some(path) = &self.config_path {
            if !path.is_file() {
                return Err(EngineError::Config(format!(
                    "engine config file not found: {}",
                    path.display()
                )));
            }
        }
        if !(2..=19).contains(&self.board_size) {
            return Err(EngineError::Config(format!(
                "unsupported board size: {}",
                self.board_size
            )));
        }
        Ok(())
    }

    /// Arguments for launching the engine in GTP mode.
    pub fn engine_args(&self) -> Vec<String> {
        let mut args = vec![
            "gtp".to_string(),
            "-model".to_string(),
            self.model_path.display().to_string(),
        ];
        if let Some(path) = &self.config_path {
            args.push("-config".to_string());
            args.push(path.display().to_string());
        }
        if !self.overrides.is_empty() {
            let joined = self
                .overrides
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",");
            args.push("-override-config".to_string());
            args.push(joined);
        }
        args
    }
}
