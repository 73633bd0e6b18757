//! Board observations handed over by the snake environment: multi-frame cell
//! grids, caller-supplied cell codes, legality masks and cell coordinates.

mod board;
mod coords;
mod mask;

pub use board::{Board, BoardBatch, CellValues};
pub use coords::{CoordinateMapper, Direction};
pub use mask::LegalMask;
