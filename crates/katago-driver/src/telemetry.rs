//! Parser for the engine's streaming analysis telemetry.
//!
//! While an analysis runs, the engine re-emits one line per candidate move:
//!
//! `info move Q16 visits 12 winrate 0.55 scoreLead 1.2 prior 0.12 order 0 pv Q16 D4`
//!
//! Keys and values alternate after the `info` prefix; the trailing `pv` key
//! consumes every remaining token as the principal variation.

use go_core::Vertex;
use serde::Serialize;

/// One candidate move extracted from a telemetry line. Rebuilt per analysis
/// request, never persisted across checkpoints.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateMove {
    /// Suggested move, possibly a pass.
    pub vertex: Vertex,
    /// Search effort spent on this candidate so far.
    pub visits: u64,
    /// Win probability for the side to move, in [0, 1].
    pub winrate: f64,
    /// Estimated score margin for the side to move.
    pub score_lead: f64,
    /// Raw policy prior, in [0, 1].
    pub prior: f64,
    /// Engine-assigned rank; -1 when the engine did not report one.
    pub order: i32,
    /// Predicted continuation after this move.
    pub pv: Vec<Vertex>,
}

/// Parse one telemetry line. Returns `None` for lines that are not
/// candidate telemetry (wrong prefix, or no `move` token — the engine mixes
/// administrative lines into the stream).
///
/// Individual malformed fields fall back to defaults instead of failing the
/// line: visits 0, winrate 0.5, scoreLead 0.0, prior 0.0, order -1.
pub fn parse_info_line(line: &str) -> Option<CandidateMove> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("info") {
        return None;
    }

    let mut vertex: Option<Vertex> = None;
    let mut visits: u64 = 0;
    let mut winrate: f64 = 0.5;
    let mut score_lead: f64 = 0.0;
    let mut prior: f64 = 0.0;
    let mut order: i32 = -1;
    let mut pv: Vec<Vertex> = Vec::new();

    while let Some(key) = tokens.next() {
        match key {
            "move" => {
                vertex = tokens.next().and_then(|t| Vertex::from_gtp(t).ok());
            }
            "visits" => {
                visits = tokens.next().and_then(|t| t.parse().ok()).unwrap_or(0);
            }
            "winrate" => {
                winrate = tokens.next().and_then(|t| t.parse().ok()).unwrap_or(0.5);
            }
            "scoreLead" => {
                score_lead = tokens.next().and_then(|t| t.parse().ok()).unwrap_or(0.0);
            }
            "prior" => {
                prior = tokens.next().and_then(|t| t.parse().ok()).unwrap_or(0.0);
            }
            "order" => {
                order = tokens.next().and_then(|t| t.parse().ok()).unwrap_or(-1);
            }
            "pv" => {
                pv = tokens
                    .by_ref()
                    .map_while(|t| Vertex::from_gtp(t).ok())
                    .collect();
                break;
            }
            // Unknown key: skip its value token and keep going.
            _ => {
                tokens.next();
            }
        }
    }

    // A line without a usable move token is noise, not an error.
    let vertex = vertex?;

    Some(CandidateMove {
        vertex,
        visits,
        winrate,
        score_lead,
        prior,
        order,
        pv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_line() {
        let line =
            "info move Q16 visits 12 winrate 0.55 scoreLead 1.2 prior 0.12 order 0 pv Q16 D4";
        let candidate = parse_info_line(line).unwrap();
        assert_eq!(candidate.vertex, Vertex::from_gtp("Q16").unwrap());
        assert_eq!(candidate.visits, 12);
        assert_eq!(candidate.winrate, 0.55);
        assert_eq!(candidate.score_lead, 1.2);
        assert_eq!(candidate.prior, 0.12);
        assert_eq!(candidate.order, 0);
        assert_eq!(candidate.pv.len(), 2);
    }

    #[test]
    fn test_missing_winrate_defaults() {
        let line = "info move D4 visits 8 scoreLead -0.3 order 1 pv D4";
        let candidate = parse_info_line(line).unwrap();
        assert_eq!(candidate.winrate, 0.5);
        assert_eq!(candidate.visits, 8);
    }

    #[test]
    fn test_malformed_field_does_not_abort() {
        let line = "info move C3 visits banana winrate 0.61 order 2";
        let candidate = parse_info_line(line).unwrap();
        assert_eq!(candidate.visits, 0);
        assert_eq!(candidate.winrate, 0.61);
    }

    #[test]
    fn test_missing_move_is_discarded() {
        assert!(parse_info_line("info visits 40 winrate 0.5").is_none());
        assert!(parse_info_line("= done").is_none());
        assert!(parse_info_line("").is_none());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let line = "info move K10 lcb 0.49 utility -0.2 visits 7 winrate 0.52 order 3";
        let candidate = parse_info_line(line).unwrap();
        assert_eq!(candidate.visits, 7);
        assert_eq!(candidate.order, 3);
    }

    #[test]
    fn test_pass_candidate_kept() {
        let candidate = parse_info_line("info move pass visits 3 winrate 0.41 order 9").unwrap();
        assert!(candidate.vertex.is_pass());
    }

    #[test]
    fn test_missing_order_marks_unranked() {
        let candidate = parse_info_line("info move Q4 visits 5 winrate 0.5").unwrap();
        assert_eq!(candidate.order, -1);
    }

    #[test]
    fn test_serializes_for_downstream_consumers() {
        let candidate =
            parse_info_line("info move Q16 visits 12 winrate 0.55 scoreLead 1.2 order 0 pv Q16")
                .unwrap();
        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["visits"], 12);
        assert_eq!(json["order"], 0);
    }
}
