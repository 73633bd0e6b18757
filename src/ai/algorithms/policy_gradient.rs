use std::path::Path;

use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig};
use burn::prelude::*;
use burn::tensor::activation::{log_softmax, softmax};
use burn::tensor::TensorData;
use tracing::{debug, warn};

use super::descend;
use crate::ai::agent::{Agent, AgentConfig, AgentCore, TrainOptions, UpdateMetrics};
use crate::ai::backend::{default_device, scalar_value, tensor_values, InferBackend, TrainBackend};
use crate::ai::networks::{ModelArchitecture, QNetwork};
use crate::ai::selection::{masked_argmax, stable_softmax};
use crate::ai::targets::{normalize_rewards, one_hot};
use crate::checkpoint::{load_module, metadata_path, model_path, save_module, CheckpointMetadata};
use crate::error::AgentError;
use crate::game::{BoardBatch, CellValues, LegalMask};

type PolicyOptimizer = OptimizerAdaptor<Adam, QNetwork<TrainBackend>, TrainBackend>;

/// Policy Gradient hyperparameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PgConfig {
    pub learning_rate: f64,
    /// Entropy bonus weight.
    pub beta: f32,
}

impl Default for PgConfig {
    fn default() -> Self {
        PgConfig {
            learning_rate: 1e-4,
            beta: 0.1,
        }
    }
}

/// Monte-Carlo policy gradient over the whole buffer. The network's outputs
/// are policy logits.
pub struct PolicyGradientAgent {
    core: AgentCore,
    policy: QNetwork<TrainBackend>,
    optimizer: PolicyOptimizer,
    config: PgConfig,
    device: <TrainBackend as Backend>::Device,
}

impl PolicyGradientAgent {
    pub fn new(mut agent_config: AgentConfig, config: PgConfig) -> Result<Self, AgentError> {
        if agent_config.n_actions == 0 {
            return Err(AgentError::ActionCount {
                required: 1,
                actual: 0,
            });
        }
        if agent_config.use_target_net {
            warn!("policy gradient has no target network, ignoring use_target_net");
            agent_config.use_target_net = false;
        }
        let device = default_device();
        let architecture =
            ModelArchitecture::for_version(&agent_config.model_config_dir, &agent_config.version)?;
        let policy = QNetwork::new(
            &architecture,
            agent_config.board_size,
            agent_config.frames,
            agent_config.n_actions,
            &device,
        )?;

        Ok(PolicyGradientAgent {
            core: AgentCore::new(agent_config),
            policy,
            optimizer: AdamConfig::new().init(),
            config,
            device,
        })
    }

    fn logits(&self, boards: &BoardBatch) -> Result<Vec<f32>, AgentError> {
        let input = boards.to_tensor::<InferBackend>(self.core.config().board_scale, &self.device);
        tensor_values(self.policy.valid().forward(input))
    }
}

impl Agent for PolicyGradientAgent {
    fn name(&self) -> &str {
        "PG"
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
        masked_argmax(&self.logits(boards)?, self.core.config().n_actions, legal)
    }

    fn action_probabilities(
        &self,
        boards: &BoardBatch,
        legal: &LegalMask,
        _values: &CellValues,
    ) -> Result<Vec<Vec<f32>>, AgentError> {
        self.core.check_inputs(boards, legal)?;
        Ok(stable_softmax(
            &self.logits(boards)?,
            self.core.config().n_actions,
        ))
    }

    /// Samples the entire buffer; `batch_size` and `reward_clip` are ignored,
    /// `normalize_rewards` is honored.
    fn train_step(&mut self, options: &TrainOptions) -> Result<UpdateMetrics, AgentError> {
        let batch = self.core.buffer_mut().sample_all()?;
        if batch.is_empty() {
            return Ok(UpdateMetrics::default());
        }
        let n = batch.len();
        let width = self.core.config().n_actions;

        let rewards = if options.normalize_rewards {
            normalize_rewards(&batch.rewards)
        } else {
            batch.rewards.clone()
        };
        let rewards = Tensor::<TrainBackend, 1>::from_data(
            TensorData::from(rewards.as_slice()),
            &self.device,
        )
        .reshape([n, 1]);
        let taken = Tensor::<TrainBackend, 1>::from_data(
            TensorData::from(one_hot(&batch.actions, width).as_slice()),
            &self.device,
        )
        .reshape([n, width]);

        let input = batch
            .states
            .to_tensor::<TrainBackend>(self.core.config().board_scale, &self.device);
        let logits = self.policy.forward(input);
        let log_probs = log_softmax(logits.clone(), 1);
        let taken_log_probs = (log_probs.clone() * taken).sum_dim(1);
        let policy_loss = -(taken_log_probs * rewards).mean();
        let entropy = -(softmax(logits, 1) * log_probs).sum_dim(1).mean();
        let entropy_val = scalar_value(entropy.clone())?;
        let loss = policy_loss - entropy * self.config.beta;

        let loss = descend(
            &mut self.policy,
            &mut self.optimizer,
            loss,
            self.config.learning_rate,
        )?;
        debug!(loss, entropy = entropy_val, samples = n, "policy gradient update");

        Ok(UpdateMetrics {
            loss,
            entropy: Some(entropy_val),
            ..Default::default()
        })
    }

    fn save_checkpoint(&self, dir: &Path, iteration: u32) -> Result<(), AgentError> {
        save_module(self.policy.valid(), &model_path(dir, iteration))?;
        CheckpointMetadata::new(self.name(), self.core.config(), iteration, false)
            .write(&metadata_path(dir, iteration))?;
        Ok(())
    }

    fn load_checkpoint(&mut self, dir: &Path, iteration: u32) -> Result<(), AgentError> {
        let meta = metadata_path(dir, iteration);
        if meta.exists() {
            CheckpointMetadata::read(&meta)?.check_compatible(self.name(), self.core.config())?;
        }
        self.policy = load_module(self.policy.clone(), &model_path(dir, iteration), &self.device)?;
        self.optimizer = AdamConfig::new().init();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::algorithms::fixtures::{fill_buffer, sample_batch, small_config};

    fn agent() -> PolicyGradientAgent {
        PolicyGradientAgent::new(small_config(), PgConfig::default()).unwrap()
    }

    #[test]
    fn test_pg_forces_no_target_network() {
        let agent = agent();
        assert!(small_config().use_target_net);
        assert!(!agent.core().config().use_target_net);
    }

    #[test]
    fn test_pg_selects_legal_actions() {
        let agent = agent();
        let (boards, legal) = sample_batch();
        let actions = agent
            .select_action(&boards, &legal, &CellValues::default())
            .unwrap();
        for (row, &action) in actions.iter().enumerate() {
            assert!(legal.is_legal(row, action));
        }
    }

    #[test]
    fn test_pg_probabilities_sum_to_one() {
        let agent = agent();
        let (boards, legal) = sample_batch();
        for row in agent
            .action_probabilities(&boards, &legal, &CellValues::default())
            .unwrap()
        {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_pg_trains_on_whole_buffer() {
        let mut agent = agent();
        fill_buffer(&mut agent, 7);
        // batch_size larger than the buffer is ignored
        let options = TrainOptions {
            batch_size: 500,
            normalize_rewards: true,
            ..Default::default()
        };
        let metrics = agent.train_step(&options).unwrap();
        assert!(metrics.loss.is_finite());
        let entropy = metrics.entropy.unwrap();
        // entropy of a 4-way distribution lies in [0, ln 4]
        assert!(entropy >= 0.0 && entropy <= 4.0f32.ln() + 1e-4);
        assert_eq!(agent.buffer_size(), 7);
    }

    #[test]
    fn test_pg_constant_rewards_normalize_without_nan() {
        let mut agent = agent();
        for _ in 0..4 {
            agent
                .record_transition(crate::ai::Transition {
                    state: crate::ai::algorithms::fixtures::board_with((2, 2), (4, 4)),
                    action: 1,
                    reward: 2.0,
                    next_state: crate::ai::algorithms::fixtures::board_with((1, 2), (4, 4)),
                    done: false,
                    legal_mask: vec![true; 4],
                })
                .unwrap();
        }
        let options = TrainOptions {
            normalize_rewards: true,
            ..Default::default()
        };
        let metrics = agent.train_step(&options).unwrap();
        assert!(metrics.loss.is_finite());
    }

    #[test]
    fn test_pg_empty_buffer_is_noop() {
        let mut agent = agent();
        let metrics = agent.train_step(&TrainOptions::default()).unwrap();
        assert_eq!(metrics, UpdateMetrics::default());
    }

    #[test]
    fn test_pg_checkpoint_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let trained = agent();
        trained.save_checkpoint(dir.path(), 0).unwrap();
        assert!(!dir.path().join("model_0000_target.mpk").exists());

        let mut restored = agent();
        restored.load_checkpoint(dir.path(), 0).unwrap();
        let (boards, legal) = sample_batch();
        let values = CellValues::default();
        assert_eq!(
            trained.select_action(&boards, &legal, &values).unwrap(),
            restored.select_action(&boards, &legal, &values).unwrap()
        );
    }
}
