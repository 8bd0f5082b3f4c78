//! A played move: color plus vertex. Immutable once recorded in a history.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Color, Vertex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub color: Color,
    pub vertex: Vertex,
}

impl Move {
    pub fn new(color: Color, vertex: Vertex) -> Move {
        Move { color, vertex }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.color.gtp(), self.vertex.to_gtp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_play_args() {
        let mv = Move::new(Color::Black, Vertex::from_gtp("Q16").unwrap());
        assert_eq!(mv.to_string(), "B Q16");
    }
}
