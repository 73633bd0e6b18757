//! Planner that lays a Hamiltonian cycle over the board interior and follows
//! it forever, which guarantees the snake eventually reaches every food cell.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::agent::{Agent, AgentConfig, AgentCore};
use crate::ai::selection::{guard_planned_action, one_hot_row};
use crate::error::AgentError;
use crate::game::{BoardBatch, CellValues, CoordinateMapper, Direction, LegalMask};

/// How the cycle is constructed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStrategy {
    /// Column-by-column up/down sweep, linear in the interior size.
    #[default]
    Serpentine,
    /// Depth-first search with backtracking. Exponential in the worst case;
    /// only practical on small boards.
    Backtracking,
}

/// Interior cells in cycle order, with an O(1) reverse lookup.
#[derive(Debug, Clone)]
pub struct HamiltonianCycle {
    order: Vec<usize>,
    position: Vec<Option<usize>>,
}

impl HamiltonianCycle {
    pub fn build(mapper: &CoordinateMapper, strategy: CycleStrategy) -> Result<Self, AgentError> {
        let size = mapper.size();
        if size % 2 != 0 {
            return Err(AgentError::OddBoardSize(size));
        }
        if size < 4 {
            return Err(AgentError::NoCycle(size));
        }
        let order = match strategy {
            CycleStrategy::Serpentine => serpentine(mapper),
            CycleStrategy::Backtracking => backtracking(mapper)?,
        };
        let mut position = vec![None; mapper.cell_count()];
        for (i, &cell) in order.iter().enumerate() {
            position[cell] = Some(i);
        }
        Ok(HamiltonianCycle { order, position })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn cells(&self) -> &[usize] {
        &self.order
    }

    pub fn position_of(&self, cell: usize) -> Option<usize> {
        self.position.get(cell).copied().flatten()
    }

    /// Cells before and after `cell` on the cycle.
    pub fn neighbors_of(&self, cell: usize) -> Option<(usize, usize)> {
        let i = self.position_of(cell)?;
        let n = self.order.len();
        Some((self.order[(i + n - 1) % n], self.order[(i + 1) % n]))
    }
}

fn serpentine(mapper: &CoordinateMapper) -> Vec<usize> {
    let last = mapper.size() - 2;
    let mut order = Vec::with_capacity(last * last);
    for row in 1..=last {
        order.push(mapper.to_point(row, 1));
    }
    for col in 2..=last {
        if col % 2 == 0 {
            for row in (2..=last).rev() {
                order.push(mapper.to_point(row, col));
            }
        } else {
            for row in 2..=last {
                order.push(mapper.to_point(row, col));
            }
        }
    }
    for col in (2..=last).rev() {
        order.push(mapper.to_point(1, col));
    }
    order
}

fn backtracking(mapper: &CoordinateMapper) -> Result<Vec<usize>, AgentError> {
    let interior = (mapper.size() - 2).pow(2);
    let start = mapper.to_point(1, 1);
    let mut visited = vec![false; mapper.cell_count()];
    let mut path = vec![start];
    // next neighbour index to try at each depth
    let mut cursors = vec![0usize];
    visited[start] = true;

    while let Some(&current) = path.last() {
        let depth = path.len() - 1;
        if path.len() == interior {
            if mapper.are_adjacent(current, start) {
                return Ok(path);
            }
        } else {
            let neighbors = mapper.interior_neighbors(current);
            let cursor = cursors[depth];
            if let Some(&next) = neighbors.get(cursor) {
                cursors[depth] += 1;
                if !visited[next] {
                    visited[next] = true;
                    path.push(next);
                    cursors.push(0);
                }
                continue;
            }
        }
        visited[current] = false;
        path.pop();
        cursors.pop();
    }
    Err(AgentError::NoCycle(mapper.size()))
}

/// Follows a fixed Hamiltonian cycle.
pub struct HamiltonianAgent {
    core: AgentCore,
    cycle: HamiltonianCycle,
}

impl HamiltonianAgent {
    pub fn new(agent_config: AgentConfig, strategy: CycleStrategy) -> Result<Self, AgentError> {
        if agent_config.n_actions < Direction::ALL.len() {
            return Err(AgentError::ActionCount {
                required: Direction::ALL.len(),
                actual: agent_config.n_actions,
            });
        }
        let core = AgentCore::new(agent_config);
        let cycle = HamiltonianCycle::build(core.mapper(), strategy)?;
        debug!(len = cycle.len(), ?strategy, "built hamiltonian cycle");
        Ok(HamiltonianAgent { core, cycle })
    }

    pub fn cycle(&self) -> &HamiltonianCycle {
        &self.cycle
    }

    /// Move for one board, before legality is considered.
    fn plan(&self, board_index: usize, boards: &BoardBatch, values: &CellValues) -> Result<usize, AgentError> {
        let board = &boards.boards()[board_index];
        let head = board
            .find(0, values.head)
            .ok_or(AgentError::HeadNotFound(board_index))?;
        let (prev, next) = self
            .cycle
            .neighbors_of(head)
            .ok_or(AgentError::HeadOffCycle(head))?;

        if board.at(prev, 0) == values.free {
            // not yet riding the cycle: close in on it vertically
            let direction = if next > head {
                Direction::South
            } else {
                Direction::North
            };
            return Ok(direction.action());
        }
        Ok(self.core.mapper().step_direction(head, next)?.action())
    }
}

impl Agent for HamiltonianAgent {
    fn name(&self) -> &str {
        "Hamiltonian"
    }

    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    fn select_action(
        &self,
        boards: &BoardBatch,
        legal: &LegalMask,
        values: &CellValues,
    ) -> Result<Vec<usize>, AgentError> {
        self.core.check_inputs(boards, legal)?;
        (0..boards.len())
            .map(|row| guard_planned_action(self.plan(row, boards, values)?, row, legal))
            .collect()
    }

    fn action_probabilities(
        &self,
        boards: &BoardBatch,
        legal: &LegalMask,
        values: &CellValues,
    ) -> Result<Vec<Vec<f32>>, AgentError> {
        let width = self.core.config().n_actions;
        Ok(self
            .select_action(boards, legal, values)?
            .into_iter()
            .map(|action| one_hot_row(action, width))
            .collect())
    }
}
