//! Canonical move history and engine-side board replay.
//!
//! The engine has no random-access seek: reaching a position means
//! replaying moves sequentially, and rewinding means `undo`. This module
//! owns the canonical history and keeps track of how much of it is
//! currently applied on the engine board.

use std::time::Duration;

use go_core::{Color, Move};
use tracing::debug;

use crate::channel::CommandChannel;
use crate::error::EngineError;

/// Canonical board description. Mutated only through the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardState {
    /// Fixed for the session lifetime.
    pub size: u8,
    /// Fixed score compensation, not altered mid-session.
    pub komi: f64,
    /// Insertion order is play order. Append-only except for `undo`.
    pub history: Vec<Move>,
}

impl BoardState {
    pub fn new(size: u8, komi: f64) -> Self {
        Self {
            size,
            komi,
            history: Vec::new(),
        }
    }

    /// Color to move with the full history applied.
    pub fn turn(&self) -> Color {
        Color::to_move_after(self.history.len())
    }
}

pub struct BoardReplayController {
    state: BoardState,
    /// Number of history moves currently applied on the engine board.
    applied: usize,
    command_timeout: Duration,
}

impl BoardReplayController {
    pub fn new(size: u8, komi: f64, command_timeout: Duration) -> Self {
        Self {
            state: BoardState::new(size, komi),
            applied: 0,
            command_timeout,
        }
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn history(&self) -> &[Move] {
        &self.state.history
    }

    /// Color to move at the engine's current position. After
    /// `checkpoint(k)` this is Black iff k is even.
    pub fn turn(&self) -> Color {
        Color::to_move_after(self.applied)
    }

    /// Length of the history prefix currently on the engine board.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Push board size, clear, and komi to a freshly started engine.
    pub async fn setup(&mut self, chan: &mut CommandChannel) -> Result<(), EngineError> {
        self.expect_ok(chan, &format!("boardsize {}", self.state.size))
            .await?;
        self.expect_ok(chan, "clear_board").await?;
        self.expect_ok(chan, &format!("komi {}", self.state.komi))
            .await?;
        self.state.history.clear();
        self.applied = 0;
        Ok(())
    }

    /// Play one move: the engine enforces legality, we record history.
    pub async fn play(&mut self, chan: &mut CommandChannel, mv: Move) -> Result<(), EngineError> {
        self.require_at_tip()?;
        self.apply_move(chan, mv).await?;
        self.state.history.push(mv);
        self.applied += 1;
        Ok(())
    }

    /// Remove the last move from the engine board and the history.
    pub async fn undo(&mut self, chan: &mut CommandChannel) -> Result<Move, EngineError> {
        let mv = *self.state.history.last().ok_or(EngineError::NoHistory)?;
        self.require_at_tip()?;
        let response = chan.call("undo", self.command_timeout).await?;
        if !response.ok {
            return Err(EngineError::Protocol(format!("undo: {}", response.text)));
        }
        self.state.history.pop();
        self.applied -= 1;
        Ok(mv)
    }

    /// Position the engine at `history[0..k]`.
    ///
    /// Moves forward with incremental `play` and rewinds with `undo`, so a
    /// caller walking checkpoints in ascending order pays one command per
    /// step instead of a full replay. Falls back to a clear-and-replay
    /// rebuild if the engine refuses an undo.
    pub async fn checkpoint(
        &mut self,
        chan: &mut CommandChannel,
        k: usize,
    ) -> Result<(), EngineError> {
        if k > self.state.history.len() {
            return Err(EngineError::Protocol(format!(
                "checkpoint {k} is past the end of history ({})",
                self.state.history.len()
            )));
        }
        if k >= self.applied {
            for i in self.applied..k {
                let mv = self.state.history[i];
                self.apply_move(chan, mv).await?;
                self.applied = i + 1;
            }
        } else {
            debug!(from = self.applied, to = k, "rewinding board");
            while self.applied > k {
                let response = chan.call("undo", self.command_timeout).await?;
                if !response.ok {
                    return self.rebuild(chan, k).await;
                }
                self.applied -= 1;
            }
        }
        Ok(())
    }

    /// Discard the board and history: clear plus komi.
    pub async fn reset(&mut self, chan: &mut CommandChannel) -> Result<(), EngineError> {
        self.expect_ok(chan, "clear_board").await?;
        self.expect_ok(chan, &format!("komi {}", self.state.komi))
            .await?;
        self.state.history.clear();
        self.applied = 0;
        Ok(())
    }

    /// Replace the canonical history with `moves` and replay all of it onto
    /// a cleared engine board.
    pub async fn load_history(
        &mut self,
        chan: &mut CommandChannel,
        moves: Vec<Move>,
    ) -> Result<(), EngineError> {
        self.reset(chan).await?;
        self.state.history = moves;
        let tip = self.state.history.len();
        self.checkpoint(chan, tip).await
    }

    /// Record a move the engine already played itself (via `genmove`).
    /// History and the engine board stay in lockstep without re-sending it.
    pub(crate) fn record_engine_move(&mut self, mv: Move) {
        debug_assert_eq!(self.applied, self.state.history.len());
        self.state.history.push(mv);
        self.applied = self.state.history.len();
    }

    /// Clear the engine board and replay the first `k` history moves.
    async fn rebuild(&mut self, chan: &mut CommandChannel, k: usize) -> Result<(), EngineError> {
        debug!(k, "rebuilding engine board from scratch");
        self.expect_ok(chan, "clear_board").await?;
        self.expect_ok(chan, &format!("komi {}", self.state.komi))
            .await?;
        self.applied = 0;
        for i in 0..k {
            let mv = self.state.history[i];
            self.apply_move(chan, mv).await?;
            self.applied = i + 1;
        }
        Ok(())
    }

    async fn apply_move(&self, chan: &mut CommandChannel, mv: Move) -> Result<(), EngineError> {
        let command = format!("play {} {}", mv.color.gtp(), mv.vertex.to_gtp());
        let response = chan.call(&command, self.command_timeout).await?;
        if !response.ok {
            return Err(EngineError::RejectedMove(response.text));
        }
        Ok(())
    }

    async fn expect_ok(
        &self,
        chan: &mut CommandChannel,
        command: &str,
    ) -> Result<String, EngineError> {
        let response = chan.call(command, self.command_timeout).await?;
        if response.ok {
            Ok(response.text)
        } else {
            Err(EngineError::Protocol(format!(
                "{command}: {}",
                response.text
            )))
        }
    }

    /// Mutating the history while the engine sits at an older checkpoint
    /// would silently diverge the two; fail loudly instead.
    fn require_at_tip(&self) -> Result<(), EngineError> {
        if self.applied == self.state.history.len() {
            Ok(())
        } else {
            Err(EngineError::Protocol(format!(
                "board is rewound to checkpoint {} of {}; advance to the tip before mutating",
                self.applied,
                self.state.history.len()
            )))
        }
    }
}
