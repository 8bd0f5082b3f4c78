//! Driver error types

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Bad or missing configuration. Raised before the engine is spawned,
    /// never at runtime.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Spawn failure, unexpected exit, or a broken pipe. Fatal for the
    /// session; the caller must create a new one.
    #[error("Engine process error: {0}")]
    Process(String),

    /// No line from the engine within the deadline. Recoverable: retry, or
    /// escalate to a liveness probe before declaring the process dead.
    #[error("No response from engine within {0:?}")]
    Timeout(Duration),

    /// The engine refused a move (terminal `?` response to `play`).
    #[error("Engine rejected move: {0}")]
    RejectedMove(String),

    /// A terminal `?` response or a state-machine violation.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("No moves to undo")]
    NoHistory,

    /// An analysis stream is already active; new requests are rejected, not
    /// queued.
    #[error("Analysis stream already active")]
    StreamBusy,
}

impl EngineError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, EngineError::Timeout(_))
    }

    /// True for failures that require a full session restart.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Process(_) | EngineError::Config(_))
    }
}
