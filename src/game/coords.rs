use crate::error::AgentError;

/// Movement directions, numbered as the environment numbers its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    East = 0,
    North = 1,
    West = 2,
    South = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::North,
        Direction::West,
        Direction::South,
    ];

    /// Action index for this direction.
    pub fn action(self) -> usize {
        self as usize
    }

    /// Map a displacement `(dx, dy)` to a direction. `dx` grows with the
    /// column index, `dy` grows towards row 0 (up the board).
    pub fn from_displacement(dx: i64, dy: i64) -> Option<Direction> {
        match (dx, dy) {
            (1, 0) => Some(Direction::East),
            (0, 1) => Some(Direction::North),
            (-1, 0) => Some(Direction::West),
            (0, -1) => Some(Direction::South),
            _ => None,
        }
    }
}

/// Converts between flat cell indices and `(row, col)` on a square board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateMapper {
    size: usize,
}

impl CoordinateMapper {
    pub fn new(size: usize) -> Self {
        CoordinateMapper { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell_count(&self) -> usize {
        self.size * self.size
    }

    pub fn to_row_col(&self, point: usize) -> (usize, usize) {
        (point / self.size, point % self.size)
    }

    pub fn to_point(&self, row: usize, col: usize) -> usize {
        row * self.size + col
    }

    /// In-bounds 4-neighbours of `point`, ordered up, down, right, left.
    pub fn neighbors(&self, point: usize) -> Vec<usize> {
        let (row, col) = self.to_row_col(point);
        let mut out = Vec::with_capacity(4);
        if row > 0 {
            out.push(self.to_point(row - 1, col));
        }
        if row + 1 < self.size {
            out.push(self.to_point(row + 1, col));
        }
        if col + 1 < self.size {
            out.push(self.to_point(row, col + 1));
        }
        if col > 0 {
            out.push(self.to_point(row, col - 1));
        }
        out
    }

    /// Whether `point` lies inside the one-cell border.
    pub fn is_interior(&self, point: usize) -> bool {
        let (row, col) = self.to_row_col(point);
        row >= 1 && row + 1 < self.size && col >= 1 && col + 1 < self.size
    }

    /// Neighbours of `point` restricted to interior cells.
    pub fn interior_neighbors(&self, point: usize) -> Vec<usize> {
        self.neighbors(point)
            .into_iter()
            .filter(|&p| self.is_interior(p))
            .collect()
    }

    pub fn are_adjacent(&self, a: usize, b: usize) -> bool {
        let (ar, ac) = self.to_row_col(a);
        let (br, bc) = self.to_row_col(b);
        ar.abs_diff(br) + ac.abs_diff(bc) == 1
    }

    /// Displacement `(dx, dy)` from `from` to `to` in the direction-table axes.
    pub fn displacement(&self, from: usize, to: usize) -> (i64, i64) {
        let (fr, fc) = self.to_row_col(from);
        let (tr, tc) = self.to_row_col(to);
        (tc as i64 - fc as i64, fr as i64 - tr as i64)
    }

    /// Direction of a single step from `from` to `to`.
    pub fn step_direction(&self, from: usize, to: usize) -> Result<Direction, AgentError> {
        let (dx, dy) = self.displacement(from, to);
        Direction::from_displacement(dx, dy).ok_or(AgentError::UnmatchedDisplacement { dx, dy })
    }
}
