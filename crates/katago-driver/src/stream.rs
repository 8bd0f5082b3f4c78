//! Streaming analysis: start/stop lifecycle and candidate accumulation.
//!
//! `kata-analyze` streams telemetry indefinitely until stopped, so unlike
//! ordinary commands its response has no terminal line up front. Telemetry
//! keeps arriving for a short window after cancellation; the drain phase
//! consumes and discards those lines so they cannot be misread as the next
//! command's response.

use std::collections::HashMap;
use std::time::Duration;

use go_core::Color;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::channel::CommandChannel;
use crate::error::EngineError;
use crate::telemetry::{parse_info_line, CandidateMove};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    /// Analysis command written, no telemetry observed yet.
    Requested,
    Streaming,
    /// Terminal: the process died or the stream broke mid-analysis.
    /// The owner must recreate the session.
    Failed,
}

/// What one poll of the stream produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A telemetry line updated the candidate set.
    Update,
    /// Nothing useful arrived within the poll deadline.
    Pending,
    /// The engine emitted its terminal line on its own — the visit budget
    /// was satisfied before `stop` was requested.
    Finished,
}

/// Limits for the post-`stop` drain phase. Protects against an engine that
/// never emits the terminal marker.
#[derive(Debug, Clone, Copy)]
pub struct DrainBudget {
    pub max_lines: usize,
    pub max_wait: Duration,
}

impl Default for DrainBudget {
    fn default() -> Self {
        Self {
            max_lines: 256,
            max_wait: Duration::from_secs(2),
        }
    }
}

pub struct StreamingAnalysisSession {
    state: StreamState,
    /// Keyed by vertex; the engine republishes growing totals for the same
    /// move, so updates are last-write-wins, never merged or averaged.
    candidates: HashMap<String, CandidateMove>,
    drain: DrainBudget,
}

impl StreamingAnalysisSession {
    pub fn new(drain: DrainBudget) -> Self {
        Self {
            state: StreamState::Idle,
            candidates: HashMap::new(),
            drain,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Begin a streaming analysis for `color`. The command is written
    /// without waiting for a terminal line; telemetry is consumed through
    /// `poll`. Rejected (not queued) if a stream is already active, leaving
    /// the existing candidate set untouched.
    pub async fn start(
        &mut self,
        chan: &mut CommandChannel,
        color: Color,
        visit_budget: u32,
    ) -> Result<(), EngineError> {
        match self.state {
            StreamState::Idle => {}
            StreamState::Failed => {
                return Err(EngineError::Protocol(
                    "analysis stream failed; recreate the session".into(),
                ))
            }
            _ => return Err(EngineError::StreamBusy),
        }
        self.candidates.clear();
        let command = format!("kata-analyze {} {}", color.gtp(), visit_budget);
        if let Err(e) = chan.send(&command).await {
            self.state = StreamState::Failed;
            return Err(e);
        }
        self.state = StreamState::Requested;
        Ok(())
    }

    /// Consume at most one line from the stream.
    pub async fn poll(
        &mut self,
        chan: &mut CommandChannel,
        deadline: Duration,
    ) -> Result<PollOutcome, EngineError> {
        match self.state {
            StreamState::Requested | StreamState::Streaming => {}
            _ => {
                return Err(EngineError::Protocol(
                    "no analysis stream to poll".into(),
                ))
            }
        }
        let line = match chan.read_line(deadline).await {
            Ok(line) => line,
            Err(e) if e.is_timeout() => return Ok(PollOutcome::Pending),
            Err(e) => {
                self.state = StreamState::Failed;
                return Err(e);
            }
        };
        if line.is_empty() {
            return Ok(PollOutcome::Pending);
        }
        if line.starts_with('=') || line.starts_with('?') {
            self.state = StreamState::Idle;
            return Ok(PollOutcome::Finished);
        }
        if let Some(candidate) = parse_info_line(&line) {
            self.state = StreamState::Streaming;
            self.candidates
                .insert(candidate.vertex.to_gtp(), candidate);
            return Ok(PollOutcome::Update);
        }
        debug!(line = %line, "ignoring non-telemetry line in stream");
        Ok(PollOutcome::Pending)
    }

    /// Cancel the stream: send `stop`, then drain trailing lines until the
    /// terminal marker appears or the drain budget runs out. Returns to
    /// `Idle` on every drain exit; an overrun is a soft warning, not an
    /// error. Yields the candidate set frozen at cancellation.
    pub async fn stop(
        &mut self,
        chan: &mut CommandChannel,
    ) -> Result<Vec<CandidateMove>, EngineError> {
        match self.state {
            StreamState::Requested | StreamState::Streaming => {}
            _ => {
                return Err(EngineError::Protocol(
                    "no analysis stream to stop".into(),
                ))
            }
        }
        if let Err(e) = chan.send("stop").await {
            self.state = StreamState::Failed;
            return Err(e);
        }

        let started = Instant::now();
        let mut drained = 0usize;
        loop {
            if drained >= self.drain.max_lines {
                warn!(drained, "drain line budget exhausted before terminal line");
                break;
            }
            let remaining = self.drain.max_wait.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                warn!(drained, "drain deadline exhausted before terminal line");
                break;
            }
            match chan.read_line(remaining).await {
                Ok(line) if line.starts_with('=') || line.starts_with('?') => break,
                Ok(_) => {
                    // Stale telemetry; the set was frozen at cancellation.
                    drained += 1;
                }
                Err(e) if e.is_timeout() => {}
                Err(e) => {
                    self.state = StreamState::Failed;
                    return Err(e);
                }
            }
        }
        self.state = StreamState::Idle;
        Ok(self.snapshot())
    }

    /// Current ranking, safe to call mid-stream for a best guess so far.
    ///
    /// Sorted by engine rank ascending when every candidate carries a
    /// non-negative rank; ties, and the rank-less case, order by winrate
    /// descending then visits descending.
    pub fn snapshot(&self) -> Vec<CandidateMove> {
        let ranked = !self.candidates.is_empty()
            && self.candidates.values().all(|c| c.order >= 0);
        let mut out: Vec<CandidateMove> = self.candidates.values().cloned().collect();
        out.sort_by(|a, b| {
            let primary = if ranked {
                a.order.cmp(&b.order)
            } else {
                std::cmp::Ordering::Equal
            };
            primary
                .then_with(|| {
                    b.winrate
                        .partial_cmp(&a.winrate)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| b.visits.cmp(&a.visits))
        });
        out
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::parse_info_line;

    fn session_with(lines: &[&str]) -> StreamingAnalysisSession {
        let mut session = StreamingAnalysisSession::new(DrainBudget::default());
        for line in lines {
            let candidate = parse_info_line(line).unwrap();
            session
                .candidates
                .insert(candidate.vertex.to_gtp(), candidate);
        }
        session
    }

    #[test]
    fn test_snapshot_rank_order() {
        let session = session_with(&[
            "info move D4 visits 30 winrate 0.48 order 1",
            "info move Q16 visits 50 winrate 0.55 order 0",
            "info move C3 visits 10 winrate 0.40 order 2",
        ]);
        let moves: Vec<String> = session
            .snapshot()
            .iter()
            .map(|c| c.vertex.to_gtp())
            .collect();
        assert_eq!(moves, vec!["Q16", "D4", "C3"]);
    }

    #[test]
    fn test_snapshot_fallback_when_rank_absent() {
        let session = session_with(&[
            "info move D4 visits 30 winrate 0.48",
            "info move Q16 visits 50 winrate 0.55 order 0",
        ]);
        // One unranked candidate disables rank ordering entirely.
        let moves: Vec<String> = session
            .snapshot()
            .iter()
            .map(|c| c.vertex.to_gtp())
            .collect();
        assert_eq!(moves, vec!["Q16", "D4"]);
    }

    #[test]
    fn test_snapshot_ties_broken_by_winrate_then_visits() {
        let session = session_with(&[
            "info move D4 visits 30 winrate 0.50 order 0",
            "info move Q16 visits 50 winrate 0.50 order 0",
            "info move C3 visits 50 winrate 0.60 order 0",
        ]);
        let moves: Vec<String> = session
            .snapshot()
            .iter()
            .map(|c| c.vertex.to_gtp())
            .collect();
        assert_eq!(moves, vec!["C3", "Q16", "D4"]);
    }

    #[test]
    fn test_last_write_wins_in_candidate_map() {
        let session = session_with(&[
            "info move Q16 visits 5 winrate 0.50 order 0",
            "info move Q16 visits 40 winrate 0.56 order 0",
        ]);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].visits, 40);
    }
}
