//! Board coordinates in the engine's vertex notation.
//!
//! The engine speaks alphanumeric vertices: a column letter A-T with I
//! skipped, then a 1-based row counted from the bottom ("Q16", "pass").
//! SGF records instead use a lowercase letter pair counted from the
//! top-left ("pd"). The driver speaks vertex notation exclusively, on both
//! the command and telemetry sides; SGF pairs are converted at the file
//! boundary with the explicit `from_sgf`/`to_sgf` codecs below.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column letters in engine order. I is reserved and skipped.
const COLUMNS: &[u8] = b"ABCDEFGHJKLMNOPQRST";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VertexError {
    #[error("empty vertex")]
    Empty,

    #[error("invalid column letter: {0}")]
    Column(char),

    #[error("invalid row in vertex: {0}")]
    Row(String),

    #[error("vertex out of range for board size {size}: {vertex}")]
    OutOfRange { size: u8, vertex: String },

    #[error("malformed SGF coordinate: {0}")]
    Sgf(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vertex {
    Pass,
    /// Zero-based column (0 = A) and row (0 = row 1, the bottom edge).
    Point { col: u8, row: u8 },
}

impl Vertex {
    pub fn point(col: u8, row: u8) -> Vertex {
        Vertex::Point { col, row }
    }

    pub fn is_pass(self) -> bool {
        matches!(self, Vertex::Pass)
    }

    /// Parse the engine's notation, case-insensitively.
    pub fn from_gtp(s: &str) -> Result<Vertex, VertexError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VertexError::Empty);
        }
        if s.eq_ignore_ascii_case("pass") {
            return Ok(Vertex::Pass);
        }
        let mut chars = s.chars();
        let letter = chars.next().ok_or(VertexError::Empty)?.to_ascii_uppercase();
        let col = COLUMNS
            .iter()
            .position(|&b| b as char == letter)
            .ok_or(VertexError::Column(letter))? as u8;
        let row: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| VertexError::Row(s.to_string()))?;
        if row == 0 || row as usize > COLUMNS.len() {
            return Err(VertexError::Row(s.to_string()));
        }
        Ok(Vertex::Point { col, row: row - 1 })
    }

    /// Format in the engine's notation.
    pub fn to_gtp(self) -> String {
        match self {
            Vertex::Pass => "pass".to_string(),
            Vertex::Point { col, row } => {
                format!("{}{}", COLUMNS[col as usize] as char, row + 1)
            }
        }
    }

    /// Decode an SGF letter pair. Empty string and "tt" (on boards up to 19)
    /// are the SGF pass conventions.
    pub fn from_sgf(s: &str, size: u8) -> Result<Vertex, VertexError> {
        if s.is_empty() || (s == "tt" && size <= 19) {
            return Ok(Vertex::Pass);
        }
        let bytes = s.as_bytes();
        if bytes.len() != 2 || !bytes.iter().all(|b| b.is_ascii_lowercase()) {
            return Err(VertexError::Sgf(s.to_string()));
        }
        let col = bytes[0] - b'a';
        let row_from_top = bytes[1] - b'a';
        if col >= size || row_from_top >= size || col as usize >= COLUMNS.len() {
            return Err(VertexError::OutOfRange {
                size,
                vertex: s.to_string(),
            });
        }
        Ok(Vertex::Point {
            col,
            row: size - 1 - row_from_top,
        })
    }

    /// Encode as an SGF letter pair; pass encodes as the empty string.
    pub fn to_sgf(self, size: u8) -> String {
        match self {
            Vertex::Pass => String::new(),
            Vertex::Point { col, row } => {
                let row_from_top = size - 1 - row;
                format!("{}{}", (b'a' + col) as char, (b'a' + row_from_top) as char)
            }
        }
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_gtp())
    }
}

impl FromStr for Vertex {
    type Err = VertexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Vertex::from_gtp(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gtp_round_trip() {
        for raw in ["A1", "T19", "Q16", "J10", "D4"] {
            let v = Vertex::from_gtp(raw).unwrap();
            assert_eq!(v.to_gtp(), raw);
        }
    }

    #[test]
    fn test_gtp_skips_i() {
        // H is column 7 and J is column 8; there is no I column.
        assert_eq!(Vertex::from_gtp("H5").unwrap(), Vertex::point(7, 4));
        assert_eq!(Vertex::from_gtp("J5").unwrap(), Vertex::point(8, 4));
        assert_eq!(Vertex::from_gtp("I5").unwrap_err(), VertexError::Column('I'));
    }

    #[test]
    fn test_gtp_pass_and_case() {
        assert_eq!(Vertex::from_gtp("pass").unwrap(), Vertex::Pass);
        assert_eq!(Vertex::from_gtp("PASS").unwrap(), Vertex::Pass);
        assert_eq!(Vertex::from_gtp("q16").unwrap(), Vertex::from_gtp("Q16").unwrap());
    }

    #[test]
    fn test_gtp_rejects_garbage() {
        assert!(Vertex::from_gtp("").is_err());
        assert!(Vertex::from_gtp("Z3").is_err());
        assert!(Vertex::from_gtp("Q0").is_err());
        assert!(Vertex::from_gtp("Q99").is_err());
        assert!(Vertex::from_gtp("QQ").is_err());
    }

    #[test]
    fn test_sgf_conversion() {
        // Q16 on a 19x19 board is the SGF point "pd".
        let q16 = Vertex::from_gtp("Q16").unwrap();
        assert_eq!(q16.to_sgf(19), "pd");
        assert_eq!(Vertex::from_sgf("pd", 19).unwrap(), q16);

        // A1 is bottom-left: column a, SGF row counted from the top.
        let a1 = Vertex::from_gtp("A1").unwrap();
        assert_eq!(a1.to_sgf(19), "as");
        assert_eq!(Vertex::from_sgf("as", 19).unwrap(), a1);
    }

    #[test]
    fn test_sgf_pass_conventions() {
        assert_eq!(Vertex::from_sgf("", 19).unwrap(), Vertex::Pass);
        assert_eq!(Vertex::from_sgf("tt", 19).unwrap(), Vertex::Pass);
    }

    #[test]
    fn test_sgf_bounds() {
        assert!(Vertex::from_sgf("zz", 19).is_err());
        assert!(Vertex::from_sgf("p", 19).is_err());
        assert!(Vertex::from_sgf("PD", 19).is_err());
    }
}
