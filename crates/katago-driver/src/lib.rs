//! Driver for a long-running Go analysis engine speaking the GTP line
//! protocol, including the `kata-analyze` streaming extension.
//!
//! The engine has no random-access seek: positions are reached by
//! sequential play/undo replay. Analysis is an open-ended telemetry stream
//! that must be started, collected, and cancelled without losing or
//! misordering lines. [`session::EngineSession`] ties those pieces together
//! behind one sequenced interface.

pub mod board;
pub mod channel;
pub mod config;
pub mod error;
pub mod session;
pub mod stream;
pub mod telemetry;
pub mod transport;

pub use go_core::{Color, Move, Vertex};

pub use board::{BoardReplayController, BoardState};
pub use channel::{CommandChannel, Response};
pub use config::EngineConfig;
pub use error::EngineError;
pub use session::{EngineSession, SessionState};
pub use stream::{DrainBudget, PollOutcome, StreamState, StreamingAnalysisSession};
pub use telemetry::{parse_info_line, CandidateMove};
