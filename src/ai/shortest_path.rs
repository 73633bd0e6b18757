//! Breadth-first planner: heads straight for the food along a shortest path
//! through free cells.

use std::collections::VecDeque;

use crate::ai::agent::{Agent, AgentConfig, AgentCore};
use crate::ai::selection::{guard_planned_action, one_hot_row};
use crate::error::AgentError;
use crate::game::{Board, BoardBatch, CellValues, CoordinateMapper, Direction, LegalMask};

/// Hop counts from a source cell; `None` is unreachable (or not yet reached).
struct DistanceField {
    hops: Vec<Option<u32>>,
}

impl DistanceField {
    fn from_hops(hops: Vec<Option<u32>>) -> Self {
        DistanceField { hops }
    }

    fn get(&self, cell: usize) -> Option<u32> {
        self.hops[cell]
    }
}

/// BFS from `head` over traversable cells of frame 0, stopping as soon as
/// `food` is discovered.
fn search(
    board: &Board,
    mapper: &CoordinateMapper,
    values: &CellValues,
    head: usize,
    food: usize,
) -> DistanceField {
    let mut hops = vec![None; mapper.cell_count()];
    hops[head] = Some(0);
    let mut frontier = VecDeque::from([head]);

    while let Some(current) = frontier.pop_front() {
        let next_hops = hops[current].map_or(0, |d| d + 1);
        for neighbor in mapper.neighbors(current) {
            if hops[neighbor].is_some() || !values.is_traversable(board.at(neighbor, 0)) {
                continue;
            }
            hops[neighbor] = Some(next_hops);
            if neighbor == food {
                return DistanceField::from_hops(hops);
            }
            frontier.push_back(neighbor);
        }
    }
    DistanceField::from_hops(hops)
}

/// Cells from the food back to the head, both included. Empty when the head
/// or food is missing, the food is unreachable, or the distance field cannot
/// be walked back.
pub fn shortest_path(board: &Board, mapper: &CoordinateMapper, values: &CellValues) -> Vec<usize> {
    let (Some(head), Some(food)) = (board.find(0, values.head), board.find(0, values.food)) else {
        return Vec::new();
    };
    trace_back(&search(board, mapper, values, head, food), mapper, food)
}

/// Walk from `food` down the distance field to the zero-hop cell.
fn trace_back(field: &DistanceField, mapper: &CoordinateMapper, food: usize) -> Vec<usize> {
    let mut path = vec![food];
    let mut current = food;
    loop {
        let Some(hops) = field.get(current) else {
            return Vec::new();
        };
        if hops == 0 {
            return path;
        }
        let step = mapper
            .neighbors(current)
            .into_iter()
            .find(|&n| field.get(n) == Some(hops - 1));
        match step {
            Some(previous) => {
                path.push(previous);
                current = previous;
            }
            None => return Vec::new(),
        }
    }
}

/// Greedy shortest-path planner.
pub struct ShortestPathAgent {
    core: AgentCore,
    fallback_action: usize,
}

impl ShortestPathAgent {
    /// `fallback_action` is taken whenever the food is missing or unreachable.
    pub fn new(agent_config: AgentConfig, fallback_action: usize) -> Result<Self, AgentError> {
        if agent_config.n_actions < Direction::ALL.len() {
            return Err(AgentError::ActionCount {
                required: Direction::ALL.len(),
                actual: agent_config.n_actions,
            });
        }
        if fallback_action >= agent_config.n_actions {
            return Err(AgentError::ActionCount {
                required: fallback_action + 1,
                actual: agent_config.n_actions,
            });
        }
        Ok(ShortestPathAgent {
            core: AgentCore::new(agent_config),
            fallback_action,
        })
    }

    fn plan(&self, board: &Board, row: usize, values: &CellValues) -> Result<usize, AgentError> {
        if board.find(0, values.head).is_none() {
            return Err(AgentError::HeadNotFound(row));
        }
        let mapper = self.core.mapper();
        let path = shortest_path(board, mapper, values);
        if path.len() < 2 {
            return Ok(self.fallback_action);
        }
        let head = path[path.len() - 1];
        let next = path[path.len() - 2];
        Ok(mapper.step_direction(head, next)?.action())
    }
}

impl Agent for ShortestPathAgent {
    fn name(&self) -> &str {
        "ShortestPath"
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
        boards
            .iter()
            .enumerate()
            .map(|(row, board)| guard_planned_action(self.plan(board, row, values)?, row, legal))
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

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> ShortestPathAgent {
        ShortestPathAgent::new(
            AgentConfig {
                board_size: 6,
                ..Default::default()
            },
            Direction::North.action(),
        )
        .unwrap()
    }

    fn board(head: (usize, usize), food: (usize, usize)) -> Board {
        let values = CellValues::default();
        let mut board = Board::walled(6, 2, &values);
        board.set(head.0, head.1, 0, values.head);
        board.set(food.0, food.1, 0, values.food);
        board
    }

    #[test]
    fn test_straight_path_along_row() {
        let values = CellValues::default();
        let mapper = CoordinateMapper::new(6);
        let path = shortest_path(&board((1, 1), (1, 3)), &mapper, &values);
        assert_eq!(
            path,
            vec![mapper.to_point(1, 3), mapper.to_point(1, 2), mapper.to_point(1, 1)]
        );

        let actions = agent()
            .select_action(
                &BoardBatch::from(board((1, 1), (1, 3))),
                &LegalMask::all_legal(1, 4),
                &values,
            )
            .unwrap();
        assert_eq!(actions, vec![Direction::East.action()]);
    }

    #[test]
    fn test_enclosed_food_has_no_path() {
        let values = CellValues::default();
        let mapper = CoordinateMapper::new(6);
        let mut enclosed = board((1, 1), (3, 3));
        for (r, c) in [(2, 3), (4, 3), (3, 2), (3, 4)] {
            enclosed.set(r, c, 0, values.body);
        }
        assert!(shortest_path(&enclosed, &mapper, &values).is_empty());

        let actions = agent()
            .select_action(&BoardBatch::from(enclosed), &LegalMask::all_legal(1, 4), &values)
            .unwrap();
        assert_eq!(actions, vec![Direction::North.action()]);
    }

    #[test]
    fn test_path_routes_around_body() {
        let values = CellValues::default();
        let mapper = CoordinateMapper::new(6);
        let mut blocked = board((2, 1), (2, 3));
        blocked.set(2, 2, 0, values.body);
        let path = shortest_path(&blocked, &mapper, &values);
        // around the body cell: 2 hops up or down, 2 across
        assert_eq!(path.len(), 5);
        assert_eq!(path[0], mapper.to_point(2, 3));
        assert_eq!(*path.last().unwrap(), mapper.to_point(2, 1));
        for pair in path.windows(2) {
            assert!(mapper.are_adjacent(pair[0], pair[1]));
        }
    }

    #[test]
    fn test_each_board_planned_independently() {
        let values = CellValues::default();
        let boards = BoardBatch::new(vec![
            board((1, 1), (1, 3)),
            board((3, 2), (1, 2)),
            board((3, 3), (3, 1)),
            board((1, 2), (4, 2)),
        ])
        .unwrap();
        let actions = agent()
            .select_action(&boards, &LegalMask::all_legal(4, 4), &values)
            .unwrap();
        assert_eq!(
            actions,
            vec![
                Direction::East.action(),
                Direction::North.action(),
                Direction::West.action(),
                Direction::South.action(),
            ]
        );
    }

    #[test]
    fn test_missing_food_falls_back() {
        let values = CellValues::default();
        let mut no_food = Board::walled(6, 2, &values);
        no_food.set(2, 2, 0, values.head);
        let legal = LegalMask::single(vec![true, false, true, true]);
        // fallback North is illegal here, so the lowest legal action is used
        let actions = agent()
            .select_action(&BoardBatch::from(no_food), &legal, &values)
            .unwrap();
        assert_eq!(actions, vec![0]);
    }

    #[test]
    fn test_missing_head_is_an_error() {
        let values = CellValues::default();
        let mut no_head = Board::walled(6, 2, &values);
        no_head.set(3, 3, 0, values.food);
        let boards = BoardBatch::new(vec![board((1, 1), (1, 3)), no_head]).unwrap();
        let err = agent()
            .select_action(&boards, &LegalMask::all_legal(2, 4), &values)
            .unwrap_err();
        assert!(matches!(err, AgentError::HeadNotFound(1)));
    }

    #[test]
    fn test_trace_back_stops_at_gap() {
        let mapper = CoordinateMapper::new(6);
        let mut hops = vec![None; mapper.cell_count()];
        hops[mapper.to_point(1, 1)] = Some(0);
        hops[mapper.to_point(1, 2)] = Some(1);
        // (1, 3) was never reached, so the food at (1, 4) has no 2-hop neighbour
        hops[mapper.to_point(1, 4)] = Some(3);
        let field = DistanceField::from_hops(hops);
        assert!(trace_back(&field, &mapper, mapper.to_point(1, 4)).is_empty());

        // an unreached food cell
        assert!(trace_back(&field, &mapper, mapper.to_point(4, 4)).is_empty());

        let path = trace_back(&field, &mapper, mapper.to_point(1, 2));
        assert_eq!(path, vec![mapper.to_point(1, 2), mapper.to_point(1, 1)]);
    }

    #[test]
    fn test_probabilities_are_one_hot() {
        let values = CellValues::default();
        let probs = agent()
            .action_probabilities(
                &BoardBatch::from(board((1, 1), (1, 3))),
                &LegalMask::all_legal(1, 4),
                &values,
            )
            .unwrap();
        assert_eq!(probs, vec![vec![1.0, 0.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_fallback_must_be_an_action() {
        let config = AgentConfig {
            board_size: 6,
            ..Default::default()
        };
        assert!(ShortestPathAgent::new(config, 4).is_err());
    }
}
