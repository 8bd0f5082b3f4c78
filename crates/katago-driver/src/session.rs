//! High-level engine session: process lifecycle, board replay, and
//! streaming analysis behind one sequenced interface.
//!
//! The session is driven by a single logical thread of control. Board
//! mutation and streaming analysis share one engine process and must not
//! interleave; the session enforces that sequencing.

use std::time::Duration;

use go_core::{Color, Move, Vertex};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::board::{BoardReplayController, BoardState};
use crate::channel::CommandChannel;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::stream::{PollOutcome, StreamingAnalysisSession};
use crate::telemetry::CandidateMove;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Starting,
    Ready,
    Streaming,
    Stopping,
    /// The process died or the stream broke. No auto-restart: the caller
    /// decides whether to create a new session, and may still read the
    /// last partial snapshot.
    Failed,
    Closed,
}

pub struct EngineSession {
    config: EngineConfig,
    chan: CommandChannel,
    board: BoardReplayController,
    stream: StreamingAnalysisSession,
    state: SessionState,
}

impl EngineSession {
    /// Validate the configuration, spawn the engine, wait for the protocol
    /// handshake, and push the initial board setup.
    ///
    /// Readiness is detected by awaiting the handshake response under the
    /// startup deadline; there are no fixed-duration sleeps.
    pub async fn start(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let args = config.engine_args();
        info!(binary = %config.binary_path.display(), "starting engine");
        let transport = Transport::spawn(&config.binary_path, &args)?;
        Self::with_transport(config, transport).await
    }

    /// Build a session over an already-open transport. Skips spawn and path
    /// validation; tests use this to drive the protocol against a stub.
    pub async fn with_transport(
        config: EngineConfig,
        transport: Transport,
    ) -> Result<Self, EngineError> {
        let mut session = Self {
            chan: CommandChannel::new(transport),
            board: BoardReplayController::new(
                config.board_size,
                config.komi,
                config.command_timeout,
            ),
            stream: StreamingAnalysisSession::new(config.drain_budget),
            state: SessionState::Starting,
            config,
        };

        if let Err(e) = session.handshake().await {
            session.chan.shutdown(session.config.shutdown_grace).await;
            return Err(e);
        }
        if let Err(e) = session.board.setup(&mut session.chan).await {
            session.chan.shutdown(session.config.shutdown_grace).await;
            return Err(e);
        }

        session.state = SessionState::Ready;
        info!(
            board_size = session.config.board_size,
            komi = session.config.komi,
            "engine session ready"
        );
        Ok(session)
    }

    async fn handshake(&mut self) -> Result<(), EngineError> {
        let deadline = self.config.startup_timeout;
        match self.chan.call("protocol_version", deadline).await {
            Ok(response) if response.ok => Ok(()),
            Ok(response) => Err(EngineError::Protocol(format!(
                "handshake rejected: {}",
                response.text
            ))),
            // No handshake within the startup deadline means the process
            // never came up properly.
            Err(e) if e.is_timeout() => Err(EngineError::Process(format!(
                "no handshake within {deadline:?}"
            ))),
            Err(e) => Err(e),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn board(&self) -> &BoardState {
        self.board.state()
    }

    pub fn history(&self) -> &[Move] {
        self.board.history()
    }

    /// Color to move at the engine's current position.
    pub fn turn(&self) -> Color {
        self.board.turn()
    }

    // ---- board operations (Ready only) ----

    pub async fn play(&mut self, color: Color, vertex: Vertex) -> Result<(), EngineError> {
        self.ensure_ready()?;
        let result = self.board.play(&mut self.chan, Move::new(color, vertex)).await;
        self.note(result)
    }

    pub async fn undo(&mut self) -> Result<Move, EngineError> {
        self.ensure_ready()?;
        let result = self.board.undo(&mut self.chan).await;
        self.note(result)
    }

    /// Position the engine at the first `k` moves of history.
    pub async fn checkpoint(&mut self, k: usize) -> Result<(), EngineError> {
        self.ensure_ready()?;
        let result = self.board.checkpoint(&mut self.chan, k).await;
        self.note(result)
    }

    pub async fn reset(&mut self) -> Result<(), EngineError> {
        self.ensure_ready()?;
        let result = self.board.reset(&mut self.chan).await;
        self.note(result)
    }

    /// Replace the canonical history and replay it onto the engine.
    pub async fn load_history(&mut self, moves: Vec<Move>) -> Result<(), EngineError> {
        self.ensure_ready()?;
        let result = self.board.load_history(&mut self.chan, moves).await;
        self.note(result)
    }

    /// Ask the engine to choose and play a move for `color`. The move is
    /// appended to history. Returns `None` if the engine resigns, leaving
    /// the board unchanged.
    pub async fn genmove(&mut self, color: Color) -> Result<Option<Vertex>, EngineError> {
        self.ensure_ready()?;
        if self.board.applied() != self.board.history().len() {
            return Err(EngineError::Protocol(
                "board is rewound to a checkpoint; advance to the tip before genmove".into(),
            ));
        }
        let command = format!("genmove {}", color.gtp());
        let result = self.chan.call(&command, self.config.genmove_timeout).await;
        let response = self.note(result)?;
        if !response.ok {
            return Err(EngineError::Protocol(format!(
                "genmove: {}",
                response.text
            )));
        }
        let token = response.text.split_whitespace().next().unwrap_or("pass");
        if token.eq_ignore_ascii_case("resign") {
            return Ok(None);
        }
        let vertex = Vertex::from_gtp(token)
            .map_err(|e| EngineError::Protocol(format!("genmove returned {token}: {e}")))?;
        self.board.record_engine_move(Move::new(color, vertex));
        Ok(Some(vertex))
    }

    // ---- streaming analysis ----

    /// Start a streaming analysis for `color`. Rejected while one is active.
    pub async fn analyze_start(
        &mut self,
        color: Color,
        visit_budget: u32,
    ) -> Result<(), EngineError> {
        self.ensure_ready()?;
        let result = self.stream.start(&mut self.chan, color, visit_budget).await;
        let result = self.note(result);
        if result.is_ok() {
            self.state = SessionState::Streaming;
        }
        result
    }

    /// Pump one stream event. Callers loop on this between snapshots.
    pub async fn analyze_poll(&mut self) -> Result<PollOutcome, EngineError> {
        if self.state != SessionState::Streaming {
            return Err(EngineError::Protocol("no active analysis".into()));
        }
        let result = self.stream.poll(&mut self.chan, self.config.poll_timeout).await;
        if let Ok(PollOutcome::Finished) = &result {
            self.state = SessionState::Ready;
        }
        self.note(result)
    }

    /// Cancel the stream and return the frozen candidate ranking.
    pub async fn analyze_stop(&mut self) -> Result<Vec<CandidateMove>, EngineError> {
        if self.state != SessionState::Streaming {
            return Err(EngineError::Protocol("no active analysis".into()));
        }
        self.state = SessionState::Stopping;
        match self.stream.stop(&mut self.chan).await {
            Ok(snapshot) => {
                self.state = SessionState::Ready;
                Ok(snapshot)
            }
            Err(e) => {
                self.state = if matches!(e, EngineError::Process(_)) {
                    SessionState::Failed
                } else {
                    SessionState::Ready
                };
                Err(e)
            }
        }
    }

    /// Best candidate ranking captured so far. After a failure this is the
    /// partial result the caller should surface, labeled incomplete.
    pub fn snapshot(&self) -> Vec<CandidateMove> {
        self.stream.snapshot()
    }

    /// Bounded analysis convenience: start, consume telemetry until the
    /// engine finishes on its own or `max_wait` elapses, then stop.
    pub async fn analyze(
        &mut self,
        color: Color,
        visit_budget: u32,
        max_wait: Duration,
    ) -> Result<Vec<CandidateMove>, EngineError> {
        self.analyze_start(color, visit_budget).await?;
        let deadline = Instant::now() + max_wait;
        while Instant::now() < deadline {
            match self.analyze_poll().await? {
                PollOutcome::Finished => return Ok(self.snapshot()),
                PollOutcome::Update | PollOutcome::Pending => {}
            }
        }
        self.analyze_stop().await
    }

    /// Cheap liveness check, for deciding whether repeated timeouts mean a
    /// dead process or a slow one.
    pub async fn probe_liveness(&mut self) -> Result<(), EngineError> {
        self.ensure_ready()?;
        let result = self.chan.probe(self.config.probe_timeout).await;
        self.note(result)
    }

    /// Terminate the engine politely, force-killing after the grace period.
    /// Idempotent.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if self.state == SessionState::Streaming {
            warn!("closing session with an active analysis stream");
        }
        self.chan.shutdown(self.config.shutdown_grace).await;
        self.state = SessionState::Closed;
        info!("engine session closed");
    }

    fn ensure_ready(&self) -> Result<(), EngineError> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::Streaming | SessionState::Stopping => Err(EngineError::StreamBusy),
            SessionState::Failed => Err(EngineError::Process(
                "session failed; a restart is required".into(),
            )),
            SessionState::Closed => Err(EngineError::Process("session is closed".into())),
            SessionState::Uninitialized | SessionState::Starting => {
                Err(EngineError::Protocol("session not ready".into()))
            }
        }
    }

    /// Process-level failures latch the session into `Failed`.
    fn note<T>(&mut self, result: Result<T, EngineError>) -> Result<T, EngineError> {
        if let Err(EngineError::Process(_)) = &result {
            self.state = SessionState::Failed;
        }
        result
    }
}
