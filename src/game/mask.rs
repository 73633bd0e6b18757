use crate::error::AgentError;

/// Per-row legality of each action, `rows x width`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalMask {
    width: usize,
    bits: Vec<bool>,
}

impl LegalMask {
    pub fn from_rows(rows: Vec<Vec<bool>>) -> Result<Self, AgentError> {
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != width) {
            return Err(AgentError::Shape(
                "all legality mask rows must have the same width".into(),
            ));
        }
        Ok(LegalMask {
            width,
            bits: rows.into_iter().flatten().collect(),
        })
    }

    /// Mask for a single state.
    pub fn single(row: Vec<bool>) -> Self {
        LegalMask {
            width: row.len(),
            bits: row,
        }
    }

    /// Every action legal in every row.
    pub fn all_legal(rows: usize, width: usize) -> Self {
        LegalMask {
            width,
            bits: vec![true; rows * width],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.bits.len() / self.width
        }
    }

    pub fn row(&self, index: usize) -> &[bool] {
        &self.bits[index * self.width..(index + 1) * self.width]
    }

    pub fn is_legal(&self, row: usize, action: usize) -> bool {
        self.row(row).get(action).copied().unwrap_or(false)
    }

    /// Check that the mask covers `rows` states over `width` actions.
    pub fn expect_shape(&self, rows: usize, width: usize) -> Result<(), AgentError> {
        if self.rows() != rows || self.width != width {
            return Err(AgentError::Shape(format!(
                "expected a {rows}x{width} legality mask, got {}x{}",
                self.rows(),
                self.width
            )));
        }
        Ok(())
    }
}
