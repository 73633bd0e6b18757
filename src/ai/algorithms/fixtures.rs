//! Shared test inputs for the learning agents.

use crate::ai::{Agent, AgentConfig, Transition};
use crate::game::{Board, BoardBatch, CellValues, LegalMask};

pub fn small_config() -> AgentConfig {
    AgentConfig {
        board_size: 6,
        frames: 2,
        buffer_size: 64,
        ..Default::default()
    }
}

/// Walled 6x6 board with the head in frame 0 and body where it was in frame 1.
pub fn board_with(head: (usize, usize), food: (usize, usize)) -> Board {
    let values = CellValues::default();
    let mut board = Board::walled(6, 2, &values);
    board.set(head.0, head.1, 0, values.head);
    board.set(head.0, head.1, 1, values.free);
    board.fill_cell(food.0, food.1, values.food);
    board
}

pub fn sample_batch() -> (BoardBatch, LegalMask) {
    let boards = BoardBatch::new(vec![board_with((2, 2), (3, 4)), board_with((4, 1), (1, 1))])
        .unwrap();
    let legal = LegalMask::from_rows(vec![
        vec![true, false, true, true],
        vec![false, true, true, false],
    ])
    .unwrap();
    (boards, legal)
}

/// Record `n` transitions cycling through actions and rewards.
pub fn fill_buffer(agent: &mut dyn Agent, n: usize) {
    for i in 0..n {
        let head = (1 + i % 4, 1 + (i / 4) % 4);
        agent
            .record_transition(Transition {
                state: board_with(head, (4, 4)),
                action: i % 4,
                reward: [1.0, -1.0, 0.0, 0.5][i % 4],
                next_state: board_with(((head.0 % 4) + 1, head.1), (4, 4)),
                done: i % 5 == 4,
                legal_mask: vec![true, i % 3 != 0, true, false],
            })
            .unwrap();
    }
}
