//! Core Go primitives shared by the engine driver and its consumers:
//! stone colors, board coordinates, and moves.

pub mod color;
pub mod moves;
pub mod vertex;

pub use color::Color;
pub use moves::Move;
pub use vertex::{Vertex, VertexError};
