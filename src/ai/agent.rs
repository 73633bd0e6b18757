use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::game::{Board, BoardBatch, CellValues, CoordinateMapper, LegalMask};
use crate::training::replay_buffer::ReplayBuffer;

/// A single step of experience for training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub state: Board,
    pub action: usize,
    pub reward: f32,
    pub next_state: Board,
    pub done: bool,
    /// Legal actions in `next_state`.
    pub legal_mask: Vec<bool>,
}

/// Losses returned from a training update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateMetrics {
    pub loss: f32,
    pub actor_loss: Option<f32>,
    pub critic_loss: Option<f32>,
    pub entropy: Option<f32>,
}

/// Per-call training parameters. Each agent documents which fields it reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    pub batch_size: usize,
    /// Replace rewards by their sign before building targets.
    pub reward_clip: bool,
    /// Standardize rewards over the sampled batch.
    pub normalize_rewards: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        TrainOptions {
            batch_size: 32,
            reward_clip: false,
            normalize_rewards: false,
        }
    }
}

/// Settings shared by every agent, fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub board_size: usize,
    pub frames: usize,
    pub buffer_size: usize,
    pub gamma: f32,
    pub n_actions: usize,
    pub use_target_net: bool,
    /// Architecture version; empty selects the built-in default.
    pub version: String,
    pub model_config_dir: PathBuf,
    /// Cell codes are divided by this before entering a network.
    pub board_scale: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            board_size: 10,
            frames: 2,
            buffer_size: 10_000,
            gamma: 0.99,
            n_actions: 4,
            use_target_net: true,
            version: String::new(),
            model_config_dir: PathBuf::from("model_config"),
            board_scale: 4.0,
        }
    }
}

/// State every agent owns: its configuration, experience buffer and
/// coordinate mapper.
pub struct AgentCore {
    config: AgentConfig,
    buffer: ReplayBuffer,
    mapper: CoordinateMapper,
}

impl AgentCore {
    pub fn new(config: AgentConfig) -> Self {
        let buffer = ReplayBuffer::new(config.buffer_size);
        let mapper = CoordinateMapper::new(config.board_size);
        AgentCore {
            config,
            buffer,
            mapper,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut ReplayBuffer {
        &mut self.buffer
    }

    /// Reject boards or masks that do not match the configured shape.
    pub fn check_inputs(&self, boards: &BoardBatch, legal: &LegalMask) -> Result<(), AgentError> {
        boards.expect_shape(self.config.board_size, self.config.frames)?;
        legal.expect_shape(boards.len(), self.config.n_actions)
    }
}

/// Reject transitions whose boards, action or mask do not match `config`.
fn check_transition(config: &AgentConfig, t: &Transition) -> Result<(), AgentError> {
    let (size, frames) = (config.board_size, config.frames);
    for board in [&t.state, &t.next_state] {
        if board.size() != size || board.frames() != frames {
            return Err(AgentError::Shape(format!(
                "transition board is {0}x{0}x{1}, expected {size}x{size}x{frames}",
                board.size(),
                board.frames()
            )));
        }
    }
    if t.action >= config.n_actions || t.legal_mask.len() != config.n_actions {
        return Err(AgentError::Shape(format!(
            "transition action {} with a mask of width {} does not fit {} actions",
            t.action,
            t.legal_mask.len(),
            config.n_actions
        )));
    }
    Ok(())
}

/// Interface shared by every snake agent.
///
/// Selection borrows the agent immutably. Training, target synchronization
/// and loading need `&mut self`, so they can never overlap with each other
/// or with selection on the same agent.
pub trait Agent {
    /// Display name.
    fn name(&self) -> &str;

    fn core(&self) -> &AgentCore;

    fn core_mut(&mut self) -> &mut AgentCore;

    /// One action per board. Never returns an action the mask marks illegal.
    fn select_action(
        &self,
        boards: &BoardBatch,
        legal: &LegalMask,
        values: &CellValues,
    ) -> Result<Vec<usize>, AgentError>;

    /// Distribution over actions per board; every row sums to one.
    fn action_probabilities(
        &self,
        boards: &BoardBatch,
        legal: &LegalMask,
        values: &CellValues,
    ) -> Result<Vec<Vec<f32>>, AgentError>;

    /// One optimization update from buffered experience. A non-finite loss is
    /// returned as [`AgentError::NonFiniteLoss`] without changing parameters.
    fn train_step(&mut self, _options: &TrainOptions) -> Result<UpdateMetrics, AgentError> {
        Ok(UpdateMetrics::default())
    }

    /// Copy online parameters into the target snapshot, if there is one.
    fn sync_target_network(&mut self) {}

    fn save_checkpoint(&self, _dir: &Path, _iteration: u32) -> Result<(), AgentError> {
        Ok(())
    }

    fn load_checkpoint(&mut self, _dir: &Path, _iteration: u32) -> Result<(), AgentError> {
        Ok(())
    }

    fn gamma(&self) -> f32 {
        self.core().config().gamma
    }

    /// Store a transition after checking it against the configured shape.
    fn record_transition(&mut self, transition: Transition) -> Result<(), AgentError> {
        check_transition(self.core().config(), &transition)?;
        self.core_mut().buffer_mut().push(transition);
        Ok(())
    }

    fn buffer_size(&self) -> usize {
        self.core().buffer().len()
    }

    /// Drop all buffered experience, optionally changing the capacity.
    fn reset_buffer(&mut self, capacity: Option<usize>) {
        let core = self.core_mut();
        let capacity = capacity.unwrap_or_else(|| core.buffer.capacity());
        core.buffer = ReplayBuffer::new(capacity);
    }

    fn save_buffer(&self, dir: &Path, iteration: u32) -> Result<PathBuf, AgentError> {
        Ok(self.core().buffer().save(dir, iteration)?)
    }

    /// Replace the buffer with a saved one. Every stored transition is checked
    /// like [`record_transition`](Self::record_transition) does; on a mismatch
    /// the current buffer is kept.
    fn load_buffer(&mut self, dir: &Path, iteration: u32) -> Result<(), AgentError> {
        let AgentCore { config, buffer, .. } = self.core_mut();
        let config = &*config;
        buffer.load_validated(dir, iteration, |t| check_transition(config, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FirstLegal {
        core: AgentCore,
    }

    impl Agent for FirstLegal {
        fn name(&self) -> &str {
            "first-legal"
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
            _values: &CellValues,
        ) -> Result<Vec<usize>, AgentError> {
            self.core.check_inputs(boards, legal)?;
            (0..boards.len())
                .map(|row| crate::ai::selection::guard_planned_action(0, row, legal))
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
                .map(|a| crate::ai::selection::one_hot_row(a, width))
                .collect())
        }
    }

    fn small_agent() -> FirstLegal {
        FirstLegal {
            core: AgentCore::new(AgentConfig {
                board_size: 6,
                buffer_size: 4,
                ..Default::default()
            }),
        }
    }

    fn transition(action: usize) -> Transition {
        let values = CellValues::default();
        let board = Board::walled(6, 2, &values);
        Transition {
            state: board.clone(),
            action,
            reward: 1.0,
            next_state: board,
            done: false,
            legal_mask: vec![true; 4],
        }
    }

    #[test]
    fn test_default_hooks_are_noops() {
        let mut agent = small_agent();
        assert_eq!(
            agent.train_step(&TrainOptions::default()).unwrap(),
            UpdateMetrics::default()
        );
        agent.sync_target_network();
        let dir = tempfile::tempdir().unwrap();
        assert!(agent.save_checkpoint(dir.path(), 0).is_ok());
        assert!((agent.gamma() - 0.99).abs() < 1e-6);
    }

    #[test]
    fn test_record_and_reset_buffer() {
        let mut agent = small_agent();
        for _ in 0..6 {
            agent.record_transition(transition(2)).unwrap();
        }
        assert_eq!(agent.buffer_size(), 4);

        agent.reset_buffer(Some(16));
        assert_eq!(agent.buffer_size(), 0);
        assert_eq!(agent.core().buffer().capacity(), 16);
    }

    #[test]
    fn test_record_rejects_mismatched_transition() {
        let mut agent = small_agent();
        assert!(agent.record_transition(transition(4)).is_err());

        let mut wrong_board = transition(0);
        wrong_board.next_state = Board::new(8, 2, 0);
        assert!(agent.record_transition(wrong_board).is_err());
        assert_eq!(agent.buffer_size(), 0);
    }

    #[test]
    fn test_buffer_persistence_through_trait() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = small_agent();
        agent.record_transition(transition(1)).unwrap();
        agent.save_buffer(dir.path(), 0).unwrap();

        let mut other = small_agent();
        other.load_buffer(dir.path(), 0).unwrap();
        assert_eq!(other.buffer_size(), 1);

        let err = other.load_buffer(dir.path(), 1).unwrap_err();
        assert!(matches!(err, AgentError::Buffer(_)));
    }

    #[test]
    fn test_load_buffer_rejects_other_board_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut small = small_agent();
        small.record_transition(transition(1)).unwrap();
        small.save_buffer(dir.path(), 0).unwrap();

        let mut large = FirstLegal {
            core: AgentCore::new(AgentConfig {
                board_size: 8,
                buffer_size: 4,
                ..Default::default()
            }),
        };
        let board = Board::walled(8, 2, &CellValues::default());
        large
            .record_transition(Transition {
                state: board.clone(),
                action: 0,
                reward: 0.5,
                next_state: board,
                done: true,
                legal_mask: vec![true; 4],
            })
            .unwrap();

        let err = large.load_buffer(dir.path(), 0).unwrap_err();
        assert!(matches!(err, AgentError::Shape(_)));
        assert_eq!(large.buffer_size(), 1);
        let batch = large.core_mut().buffer_mut().sample_all().unwrap();
        assert_eq!(batch.states.shape(), Some((8, 2)));
    }

    #[test]
    fn test_select_checks_shapes() {
        let agent = small_agent();
        let values = CellValues::default();
        let boards = BoardBatch::from(Board::walled(6, 2, &values));
        let legal = LegalMask::single(vec![false, true, true, true]);
        assert_eq!(agent.select_action(&boards, &legal, &values).unwrap(), vec![1]);

        let narrow = LegalMask::single(vec![true, true]);
        assert!(agent.select_action(&boards, &narrow, &values).is_err());
    }
}
