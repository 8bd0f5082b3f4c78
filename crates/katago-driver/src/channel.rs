//! Command/response framing over the engine transport.
//!
//! Exactly one command is in flight at a time: the channel owns the
//! transport and every operation takes `&mut self`, so callers are
//! serialized by the borrow checker rather than a runtime lock. Components
//! needing concurrent independent commands must queue at a higher level.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::EngineError;
use crate::transport::Transport;

/// Terminal response to one command.
#[derive(Debug, Clone)]
pub struct Response {
    /// True for a `=` terminal line, false for `?`.
    pub ok: bool,
    /// Remainder of the terminal line after the status marker.
    pub text: String,
    /// Non-terminal lines received before the terminal line.
    pub payload: Vec<String>,
}

pub struct CommandChannel {
    transport: Transport,
}

impl CommandChannel {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Send one command and collect lines until the terminal `=`/`?` marker.
    ///
    /// A timeout here does not mean the engine died; callers may retry or
    /// escalate to `probe` before declaring the process dead.
    pub async fn call(
        &mut self,
        command: &str,
        deadline: Duration,
    ) -> Result<Response, EngineError> {
        self.transport.write_line(command).await?;
        self.read_response(deadline).await
    }

    /// Collect the response to a command already written to the transport.
    pub(crate) async fn read_response(
        &mut self,
        deadline: Duration,
    ) -> Result<Response, EngineError> {
        let start = Instant::now();
        let mut payload = Vec::new();
        loop {
            let remaining = deadline
                .checked_sub(start.elapsed())
                .ok_or(EngineError::Timeout(deadline))?;
            let line = self.transport.read_line(remaining).await?;
            if let Some(rest) = line.strip_prefix('=') {
                return Ok(Response {
                    ok: true,
                    text: rest.trim().to_string(),
                    payload,
                });
            }
            if let Some(rest) = line.strip_prefix('?') {
                return Ok(Response {
                    ok: false,
                    text: rest.trim().to_string(),
                    payload,
                });
            }
            // Blank lines are command-boundary markers, not payload.
            if !line.is_empty() {
                payload.push(line);
            }
        }
    }

    /// Cheap liveness check. The sanctioned way to decide whether repeated
    /// timeouts mean a dead process or merely a slow one.
    pub async fn probe(&mut self, deadline: Duration) -> Result<(), EngineError> {
        let response = self.call("protocol_version", deadline).await?;
        if response.ok {
            Ok(())
        } else {
            Err(EngineError::Protocol(format!(
                "liveness probe rejected: {}",
                response.text
            )))
        }
    }

    /// Write a command without waiting for its terminal line. Only the
    /// streaming analysis uses this; its response is consumed via
    /// `read_line` until stopped.
    pub(crate) async fn send(&mut self, line: &str) -> Result<(), EngineError> {
        self.transport.write_line(line).await
    }

    pub(crate) async fn read_line(&mut self, deadline: Duration) -> Result<String, EngineError> {
        self.transport.read_line(deadline).await
    }

    pub(crate) async fn shutdown(&mut self, grace: Duration) {
        self.transport.shutdown(grace).await;
    }
}
