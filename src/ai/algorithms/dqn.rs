use std::path::Path;

use burn::module::AutodiffModule;
use burn::nn::loss::{HuberLossConfig, Reduction};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig};
use burn::prelude::*;
use burn::tensor::TensorData;
use tracing::{debug, info};

use super::descend;
use crate::ai::agent::{Agent, AgentConfig, AgentCore, TrainOptions, UpdateMetrics};
use crate::ai::backend::{default_device, tensor_values, InferBackend, TrainBackend};
use crate::ai::networks::{ModelArchitecture, QNetwork};
use crate::ai::selection::{masked_argmax, stable_softmax};
use crate::ai::targets::{blend_taken_action, bootstrapped_returns, clip_rewards};
use crate::checkpoint::{
    load_module, metadata_path, model_path, save_module, target_path, CheckpointMetadata,
};
use crate::error::AgentError;
use crate::game::{BoardBatch, CellValues, LegalMask};

type QOptimizer = OptimizerAdaptor<Adam, QNetwork<TrainBackend>, TrainBackend>;

/// Value-learning hyperparameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    pub learning_rate: f64,
    pub huber_delta: f32,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            learning_rate: 5e-4,
            huber_delta: 1.0,
        }
    }
}

/// Bootstrapped action-value learner with an optional target snapshot.
pub struct DqnAgent {
    core: AgentCore,
    q_network: QNetwork<TrainBackend>,
    target_network: Option<QNetwork<InferBackend>>,
    optimizer: QOptimizer,
    config: DqnConfig,
    device: <TrainBackend as Backend>::Device,
}

impl DqnAgent {
    pub fn new(agent_config: AgentConfig, config: DqnConfig) -> Result<Self, AgentError> {
        if agent_config.n_actions == 0 {
            return Err(AgentError::ActionCount {
                required: 1,
                actual: 0,
            });
        }
        let device = default_device();
        let architecture =
            ModelArchitecture::for_version(&agent_config.model_config_dir, &agent_config.version)?;
        let q_network: QNetwork<TrainBackend> = QNetwork::new(
            &architecture,
            agent_config.board_size,
            agent_config.frames,
            agent_config.n_actions,
            &device,
        )?;
        let target_network = agent_config.use_target_net.then(|| q_network.valid());

        Ok(DqnAgent {
            core: AgentCore::new(agent_config),
            q_network,
            target_network,
            optimizer: AdamConfig::new().init(),
            config,
            device,
        })
    }

    pub fn has_target_network(&self) -> bool {
        self.target_network.is_some()
    }

    fn encode<B: Backend>(&self, boards: &BoardBatch, device: &B::Device) -> Tensor<B, 4> {
        boards.to_tensor(self.core.config().board_scale, device)
    }

    /// Online network outputs, `[batch * n_actions]` row-major.
    pub fn online_outputs(&self, boards: &BoardBatch) -> Result<Vec<f32>, AgentError> {
        boards.expect_shape(self.core.config().board_size, self.core.config().frames)?;
        let input = self.encode::<InferBackend>(boards, &self.device);
        tensor_values(self.q_network.valid().forward(input))
    }

    fn next_state_outputs(&self, boards: &BoardBatch) -> Result<Vec<f32>, AgentError> {
        let input = self.encode::<InferBackend>(boards, &self.device);
        match &self.target_network {
            Some(target) => tensor_values(target.forward(input)),
            None => tensor_values(self.q_network.valid().forward(input)),
        }
    }

    /// Replace this agent's online and target parameters with copies of
    /// `other`'s.
    pub fn copy_weights_from(&mut self, other: &DqnAgent) {
        self.q_network = other.q_network.clone();
        self.target_network = match (&self.target_network, &other.target_network) {
            (None, _) => None,
            (Some(_), Some(target)) => Some(target.clone()),
            (Some(_), None) => Some(other.q_network.valid()),
        };
    }

    /// Fit the online network as a classifier of `actions` on `boards` with
    /// cross-entropy, `epochs` full-batch passes. Returns the last loss.
    pub(crate) fn fit_actions(
        &mut self,
        boards: &BoardBatch,
        actions: &[usize],
        epochs: usize,
        lr: f64,
    ) -> Result<f32, AgentError> {
        let n = actions.len();
        let targets = Tensor::<TrainBackend, 1, Int>::from_data(
            TensorData::new(actions.iter().map(|&a| a as i64).collect::<Vec<_>>(), [n]),
            &self.device,
        );
        let criterion = burn::nn::loss::CrossEntropyLossConfig::new().init(&self.device);
        let mut loss_val = 0.0;
        for epoch in 0..epochs {
            let logits = self.q_network.forward(self.encode(boards, &self.device));
            let loss = criterion.forward(logits, targets.clone());
            loss_val = descend(&mut self.q_network, &mut self.optimizer, loss, lr)?;
            debug!(epoch, loss = loss_val, "supervised epoch");
        }
        Ok(loss_val)
    }

    /// Scale the online (and target) output layer by `1 / factor`.
    pub(crate) fn scale_output(&mut self, factor: f32) {
        self.q_network = self.q_network.clone().scale_output(factor);
        if let Some(target) = self.target_network.take() {
            self.target_network = Some(target.scale_output(factor));
        }
    }

    /// Reset optimizer moments, e.g. after parameters were replaced.
    fn reset_optimizer(&mut self) {
        self.optimizer = AdamConfig::new().init();
    }
}

impl Agent for DqnAgent {
    fn name(&self) -> &str {
        "DQN"
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
        let outputs = self.online_outputs(boards)?;
        masked_argmax(&outputs, self.core.config().n_actions, legal)
    }

    fn action_probabilities(
        &self,
        boards: &BoardBatch,
        legal: &LegalMask,
        _values: &CellValues,
    ) -> Result<Vec<Vec<f32>>, AgentError> {
        self.core.check_inputs(boards, legal)?;
        let outputs = self.online_outputs(boards)?;
        Ok(stable_softmax(&outputs, self.core.config().n_actions))
    }

    /// Honors `batch_size` and `reward_clip`.
    fn train_step(&mut self, options: &TrainOptions) -> Result<UpdateMetrics, AgentError> {
        let batch = self.core.buffer_mut().sample(options.batch_size)?;
        if batch.is_empty() {
            return Ok(UpdateMetrics::default());
        }
        let n = batch.len();
        let width = self.core.config().n_actions;
        let gamma = self.core.config().gamma;

        let rewards = if options.reward_clip {
            clip_rewards(&batch.rewards)
        } else {
            batch.rewards.clone()
        };

        let next_outputs = self.next_state_outputs(&batch.next_states)?;
        let returns =
            bootstrapped_returns(&rewards, &next_outputs, &batch.next_legal, &batch.dones, gamma)?;

        let q_all = self
            .q_network
            .forward(self.encode(&batch.states, &self.device));
        let current = tensor_values(q_all.clone())?;
        let target_data = blend_taken_action(&current, &batch.actions, &returns, width);
        let targets = Tensor::<TrainBackend, 1>::from_data(
            TensorData::from(target_data.as_slice()),
            &self.device,
        )
        .reshape([n, width]);

        let loss = HuberLossConfig::new(self.config.huber_delta)
            .init()
            .forward(q_all, targets, Reduction::Mean);
        let loss = descend(
            &mut self.q_network,
            &mut self.optimizer,
            loss,
            self.config.learning_rate,
        )?;
        debug!(loss, batch = n, "value update");

        Ok(UpdateMetrics {
            loss,
            ..Default::default()
        })
    }

    fn sync_target_network(&mut self) {
        if self.target_network.is_some() {
            self.target_network = Some(self.q_network.valid());
            info!("target network synchronized");
        }
    }

    fn save_checkpoint(&self, dir: &Path, iteration: u32) -> Result<(), AgentError> {
        save_module(self.q_network.valid(), &model_path(dir, iteration))?;
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
        let online = load_module(self.q_network.clone(), &model_path(dir, iteration), &self.device)?;
        let target = match &self.target_network {
            Some(target) => Some(load_module(
                target.clone(),
                &target_path(dir, iteration),
                &self.device,
            )?),
            None => None,
        };
        self.q_network = online;
        self.target_network = target;
        self.reset_optimizer();
        Ok(())
    }
}
