use std::path::Path;

use burn::module::AutodiffModule;
use burn::nn::loss::{HuberLossConfig, Reduction};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig};
use burn::prelude::*;
use burn::tensor::activation::{log_softmax, softmax};
use burn::tensor::TensorData;
use tracing::{debug, info};

use super::descend;
use crate::ai::agent::{Agent, AgentConfig, AgentCore, TrainOptions, UpdateMetrics};
use crate::ai::backend::{default_device, scalar_value, tensor_values, InferBackend, TrainBackend};
use crate::ai::networks::{ActorCriticNetwork, ActorCriticNetworkConfig};
use crate::ai::selection::{masked_argmax, stable_softmax};
use crate::ai::targets::{one_hot, shape_rewards};
use crate::checkpoint::{
    load_module, metadata_path, model_path, save_module, target_path, CheckpointMetadata,
};
use crate::error::AgentError;
use crate::game::{BoardBatch, CellValues, LegalMask};

type ActorCriticOptimizer = OptimizerAdaptor<Adam, ActorCriticNetwork<TrainBackend>, TrainBackend>;

/// Actor-critic hyperparameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ActorCriticConfig {
    pub learning_rate: f64,
    /// Entropy bonus weight in the actor loss.
    pub beta: f32,
    pub huber_delta: f32,
}

impl Default for ActorCriticConfig {
    fn default() -> Self {
        ActorCriticConfig {
            learning_rate: 5e-4,
            beta: 0.001,
            huber_delta: 1.0,
        }
    }
}

/// Shared-trunk actor-critic with an optional target snapshot used for the
/// bootstrapped next-state value.
pub struct ActorCriticAgent {
    core: AgentCore,
    network: ActorCriticNetwork<TrainBackend>,
    target_network: Option<ActorCriticNetwork<InferBackend>>,
    optimizer: ActorCriticOptimizer,
    config: ActorCriticConfig,
    device: <TrainBackend as Backend>::Device,
}

impl ActorCriticAgent {
    pub fn new(agent_config: AgentConfig, config: ActorCriticConfig) -> Result<Self, AgentError> {
        if agent_config.n_actions == 0 {
            return Err(AgentError::ActionCount {
                required: 1,
                actual: 0,
            });
        }
        let device = default_device();
        let network: ActorCriticNetwork<TrainBackend> = ActorCriticNetworkConfig::new(
            agent_config.board_size,
            agent_config.frames,
            agent_config.n_actions,
        )
        .init(&device)?;
        let target_network = agent_config.use_target_net.then(|| network.valid());

        Ok(ActorCriticAgent {
            core: AgentCore::new(agent_config),
            network,
            target_network,
            optimizer: AdamConfig::new().init(),
            config,
            device,
        })
    }

    fn encode<B>(&self, boards: &BoardBatch) -> Tensor<B, 4>
    where
        B: Backend<Device = <InferBackend as Backend>::Device>,
    {
        boards.to_tensor(self.core.config().board_scale, &self.device)
    }

    fn logits(&self, boards: &BoardBatch) -> Result<Vec<f32>, AgentError> {
        tensor_values(self.network.valid().policy(self.encode(boards)))
    }

    /// Online value estimate per board.
    pub fn state_values(&self, boards: &BoardBatch) -> Result<Vec<f32>, AgentError> {
        boards.expect_shape(self.core.config().board_size, self.core.config().frames)?;
        tensor_values(self.network.valid().value(self.encode(boards)))
    }

    fn next_state_values(&self, boards: &BoardBatch) -> Result<Vec<f32>, AgentError> {
        let input = self.encode::<InferBackend>(boards);
        match &self.target_network {
            Some(target) => tensor_values(target.value(input)),
            None => tensor_values(self.network.valid().value(input)),
        }
    }
}

impl Agent for ActorCriticAgent {
    fn name(&self) -> &str {
        "ActorCritic"
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

    /// Samples the entire buffer; `batch_size` is ignored. Rewards are
    /// normalized, then clipped, when the options ask for it.
    fn train_step(&mut self, options: &TrainOptions) -> Result<UpdateMetrics, AgentError> {
        let batch = self.core.buffer_mut().sample_all()?;
        if batch.is_empty() {
            return Ok(UpdateMetrics::default());
        }
        let n = batch.len();
        let width = self.core.config().n_actions;
        let gamma = self.core.config().gamma;

        let rewards = shape_rewards(
            &batch.rewards,
            options.reward_clip,
            options.normalize_rewards,
        );

        let next_values = self.next_state_values(&batch.next_states)?;
        let returns: Vec<f32> = (0..n)
            .map(|i| rewards[i] + gamma * next_values[i] * (1.0 - batch.dones[i]))
            .collect();

        let (logits, value) = self.network.forward(self.encode(&batch.states));
        let current_values = tensor_values(value.clone())?;
        let taken = one_hot(&batch.actions, width);
        let advantage: Vec<f32> = taken
            .iter()
            .enumerate()
            .map(|(idx, &m)| {
                let row = idx / width;
                m * (returns[row] - current_values[row])
            })
            .collect();

        let advantage = Tensor::<TrainBackend, 1>::from_data(
            TensorData::from(advantage.as_slice()),
            &self.device,
        )
        .reshape([n, width]);
        let critic_target = Tensor::<TrainBackend, 1>::from_data(
            TensorData::from(returns.as_slice()),
            &self.device,
        )
        .reshape([n, 1]);

        let log_probs = log_softmax(logits.clone(), 1);
        let entropy = -(softmax(logits, 1) * log_probs.clone()).sum_dim(1).mean();
        let actor_loss =
            -(advantage * log_probs).sum_dim(1).mean() - entropy.clone() * self.config.beta;
        let critic_loss = HuberLossConfig::new(self.config.huber_delta)
            .init()
            .forward(value, critic_target, Reduction::Mean);

        let actor_val = scalar_value(actor_loss.clone())?;
        let critic_val = scalar_value(critic_loss.clone())?;
        let entropy_val = scalar_value(entropy)?;

        let loss = descend(
            &mut self.network,
            &mut self.optimizer,
            actor_loss + critic_loss,
            self.config.learning_rate,
        )?;
        debug!(
            loss,
            actor = actor_val,
            critic = critic_val,
            samples = n,
            "actor-critic update"
        );

        Ok(UpdateMetrics {
            loss,
            actor_loss: Some(actor_val),
            critic_loss: Some(critic_val),
            entropy: Some(entropy_val),
        })
    }

    fn sync_target_network(&mut self) {
        if self.target_network.is_some() {
            self.target_network = Some(self.network.valid());
            info!("target network synchronized");
        }
    }

    fn save_checkpoint(&self, dir: &Path, iteration: u32) -> Result<(), AgentError> {
        save_module(self.network.valid(), &model_path(dir, iteration))?;
        if let Some(target) = &self.target_network {
            save_module(target.clone(), &target_path(dir, iteration))?;
        }
        CheckpointMetadata::new(
            self.name(),
            self.core.config(),
            iteration,
            self.target_network.is_some(),
        )
        .write(&metadata_path(dir, iteration))?;
        Ok(())
    }

    fn load_checkpoint(&mut self, dir: &Path, iteration: u32) -> Result<(), AgentError> {
        let meta = metadata_path(dir, iteration);
        if meta.exists() {
            CheckpointMetadata::read(&meta)?.check_compatible(self.name(), self.core.config())?;
        }
        let online = load_module(self.network.clone(), &model_path(dir, iteration), &self.device)?;
        let target = match &self.target_network {
            Some(target) => Some(load_module(
                target.clone(),
                &target_path(dir, iteration),
                &self.device,
            )?),
            None => None,
        };
        self.network = online;
        self.target_network = target;
        self.optimizer = AdamConfig::new().init();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::algorithms::fixtures::{fill_buffer, sample_batch, small_config};

    fn agent() -> ActorCriticAgent {
        ActorCriticAgent::new(small_config(), ActorCriticConfig::default()).unwrap()
    }

    #[test]
    fn test_actor_critic_selects_legal_actions() {
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
    fn test_actor_critic_probabilities_sum_to_one() {
        let agent = agent();
        let (boards, legal) = sample_batch();
        for row in agent
            .action_probabilities(&boards, &legal, &CellValues::default())
            .unwrap()
        {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
            assert!(row.iter().all(|p| p.is_finite()));
        }
    }

    #[test]
    fn test_train_step_returns_structured_losses() {
        let mut agent = agent();
        fill_buffer(&mut agent, 12);
        let options = TrainOptions {
            reward_clip: true,
            normalize_rewards: true,
            ..Default::default()
        };
        let metrics = agent.train_step(&options).unwrap();
        let actor = metrics.actor_loss.unwrap();
        let critic = metrics.critic_loss.unwrap();
        assert!(critic >= 0.0);
        assert!((metrics.loss - (actor + critic)).abs() < 1e-4);
        assert!(metrics.entropy.is_some());
    }

    #[test]
    fn test_training_moves_online_but_not_target() {
        let mut agent = agent();
        fill_buffer(&mut agent, 12);
        let (boards, _) = sample_batch();
        let before = agent.state_values(&boards).unwrap();
        let target_before = agent.next_state_values(&boards).unwrap();

        agent.train_step(&TrainOptions::default()).unwrap();
        assert_ne!(before, agent.state_values(&boards).unwrap());
        assert_eq!(target_before, agent.next_state_values(&boards).unwrap());

        agent.sync_target_network();
        assert_eq!(
            agent.state_values(&boards).unwrap(),
            agent.next_state_values(&boards).unwrap()
        );
    }

    #[test]
    fn test_actor_critic_checkpoint_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut trained = agent();
        fill_buffer(&mut trained, 8);
        trained.train_step(&TrainOptions::default()).unwrap();
        trained.save_checkpoint(dir.path(), 1).unwrap();

        let mut restored = agent();
        restored.load_checkpoint(dir.path(), 1).unwrap();
        let (boards, legal) = sample_batch();
        let values = CellValues::default();
        assert_eq!(
            trained.select_action(&boards, &legal, &values).unwrap(),
            restored.select_action(&boards, &legal, &values).unwrap()
        );
        assert_eq!(
            trained.state_values(&boards).unwrap(),
            restored.state_values(&boards).unwrap()
        );
    }

    #[test]
    fn test_checkpoint_from_other_agent_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let dqn = crate::ai::DqnAgent::new(small_config(), Default::default()).unwrap();
        dqn.save_checkpoint(dir.path(), 0).unwrap();

        let mut agent = agent();
        assert!(matches!(
            agent.load_checkpoint(dir.path(), 0),
            Err(AgentError::Checkpoint(_))
        ));
    }
}
