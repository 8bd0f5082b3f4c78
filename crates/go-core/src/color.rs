//! Stone colors and turn alternation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Black,
    White,
}

impl Color {
    /// Single-letter form used on the engine command line.
    pub fn gtp(self) -> &'static str {
        match self {
            Color::Black => "B",
            Color::White => "W",
        }
    }

    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Color to move after `moves_played` alternating moves from an empty
    /// board. Black moves first.
    pub fn to_move_after(moves_played: usize) -> Color {
        if moves_played % 2 == 0 {
            Color::Black
        } else {
            Color::White
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.gtp())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "B" | "b" | "black" | "Black" | "BLACK" => Ok(Color::Black),
            "W" | "w" | "white" | "White" | "WHITE" => Ok(Color::White),
            other => Err(format!("unknown color: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternation() {
        assert_eq!(Color::to_move_after(0), Color::Black);
        assert_eq!(Color::to_move_after(1), Color::White);
        assert_eq!(Color::to_move_after(2), Color::Black);
    }

    #[test]
    fn test_parse() {
        assert_eq!("B".parse::<Color>().unwrap(), Color::Black);
        assert_eq!("white".parse::<Color>().unwrap(), Color::White);
        assert!("green".parse::<Color>().is_err());
    }
}
