use burn::prelude::*;
use burn::tensor::TensorData;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Numeric codes the environment writes into board cells.
///
/// The codes are supplied by the caller; agents compare against these values
/// and never assume particular numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellValues {
    pub free: i32,
    pub body: i32,
    pub head: i32,
    pub food: i32,
}

impl Default for CellValues {
    fn default() -> Self {
        CellValues {
            free: 0,
            body: 1,
            head: 2,
            food: 3,
        }
    }
}

impl CellValues {
    /// Cells the snake may move through while planning.
    pub fn is_traversable(&self, code: i32) -> bool {
        code == self.free || code == self.food || code == self.head
    }
}

/// A single `size x size x frames` observation. Frame 0 is the most recent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    size: usize,
    frames: usize,
    cells: Vec<i32>,
}

impl Board {
    /// Create a board with every cell of every frame set to `fill`.
    pub fn new(size: usize, frames: usize, fill: i32) -> Self {
        Board {
            size,
            frames,
            cells: vec![fill; size * size * frames],
        }
    }

    /// Build a board from row-major cells with the frame index innermost.
    pub fn from_cells(size: usize, frames: usize, cells: Vec<i32>) -> Result<Self, AgentError> {
        if cells.len() != size * size * frames {
            return Err(AgentError::Shape(format!(
                "expected {} cells for a {size}x{size}x{frames} board, got {}",
                size * size * frames,
                cells.len()
            )));
        }
        Ok(Board {
            size,
            frames,
            cells,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn cells(&self) -> &[i32] {
        &self.cells
    }

    fn offset(&self, row: usize, col: usize, frame: usize) -> usize {
        (row * self.size + col) * self.frames + frame
    }

    pub fn get(&self, row: usize, col: usize, frame: usize) -> i32 {
        self.cells[self.offset(row, col, frame)]
    }

    /// Code at flat cell index `point` in `frame`.
    pub fn at(&self, point: usize, frame: usize) -> i32 {
        self.cells[point * self.frames + frame]
    }

    pub fn set(&mut self, row: usize, col: usize, frame: usize, code: i32) {
        let idx = self.offset(row, col, frame);
        self.cells[idx] = code;
    }

    /// Set the same code in every frame.
    pub fn fill_cell(&mut self, row: usize, col: usize, code: i32) {
        for frame in 0..self.frames {
            self.set(row, col, frame, code);
        }
    }

    /// First flat cell index in `frame` holding `code`.
    pub fn find(&self, frame: usize, code: i32) -> Option<usize> {
        (0..self.size * self.size).find(|&point| self.at(point, frame) == code)
    }

    /// An empty playing field: border cells get `values.body`, interior cells
    /// `values.free`.
    pub fn walled(size: usize, frames: usize, values: &CellValues) -> Self {
        let mut board = Board::new(size, frames, values.free);
        for i in 0..size {
            board.fill_cell(0, i, values.body);
            board.fill_cell(size - 1, i, values.body);
            board.fill_cell(i, 0, values.body);
            board.fill_cell(i, size - 1, values.body);
        }
        board
    }
}

/// One or more boards of identical shape; every agent operation runs on
/// this batched form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardBatch {
    boards: Vec<Board>,
}

impl BoardBatch {
    pub fn new(boards: Vec<Board>) -> Result<Self, AgentError> {
        if let Some(first) = boards.first() {
            let mismatch = boards
                .iter()
                .any(|b| b.size != first.size || b.frames != first.frames);
            if mismatch {
                return Err(AgentError::Shape(
                    "all boards in a batch must share size and frame count".into(),
                ));
            }
        }
        Ok(BoardBatch { boards })
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn iter(&self) -> impl Iterator<Item = &Board> {
        self.boards.iter()
    }

    /// `(size, frames)` of the boards, if any.
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.boards.first().map(|b| (b.size, b.frames))
    }

    /// Check the batch against an agent's configured input shape.
    pub fn expect_shape(&self, size: usize, frames: usize) -> Result<(), AgentError> {
        match self.shape() {
            None => Err(AgentError::Shape("board batch is empty".into())),
            Some(shape) if shape == (size, frames) => Ok(()),
            Some((s, f)) => Err(AgentError::Shape(format!(
                "expected {size}x{size}x{frames} boards, got {s}x{s}x{f}"
            ))),
        }
    }

    /// Encode as a `[batch, frames, size, size]` tensor with every code
    /// divided by `scale`. A zero or NaN scale is treated as 1.0.
    pub fn to_tensor<B: Backend>(&self, scale: f32, device: &B::Device) -> Tensor<B, 4> {
        let scale = if scale.is_finite() && scale != 0.0 {
            scale
        } else {
            1.0
        };
        let (size, frames) = self.shape().unwrap_or((0, 0));
        let mut data = Vec::with_capacity(self.len() * frames * size * size);
        for board in &self.boards {
            for frame in 0..frames {
                for point in 0..size * size {
                    data.push(board.at(point, frame) as f32 / scale);
                }
            }
        }
        Tensor::<B, 1>::from_data(TensorData::from(data.as_slice()), device)
            .reshape([self.len(), frames, size, size])
    }
}

impl From<Board> for BoardBatch {
    fn from(board: Board) -> Self {
        BoardBatch {
            boards: vec![board],
        }
    }
}
