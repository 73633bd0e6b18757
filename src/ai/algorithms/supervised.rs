use std::path::Path;

use tracing::{debug, info};

use super::dqn::{DqnAgent, DqnConfig};
use crate::ai::agent::{Agent, AgentConfig, AgentCore, TrainOptions, UpdateMetrics};
use crate::error::AgentError;
use crate::game::{BoardBatch, CellValues, LegalMask};

/// Supervised pretraining hyperparameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SupervisedConfig {
    pub learning_rate: f64,
    /// Full passes over the buffer per training call.
    pub epochs: usize,
}

impl Default for SupervisedConfig {
    fn default() -> Self {
        SupervisedConfig {
            learning_rate: 5e-4,
            epochs: 5,
        }
    }
}

/// Value network trained to imitate the actions recorded in its buffer,
/// typically by a planner. Once fitted, its outputs can be rescaled and the
/// network handed to a [`DqnAgent`] for fine-tuning.
pub struct SupervisedAgent {
    inner: DqnAgent,
    config: SupervisedConfig,
}

impl SupervisedAgent {
    pub fn new(agent_config: AgentConfig, config: SupervisedConfig) -> Result<Self, AgentError> {
        Ok(SupervisedAgent {
            inner: DqnAgent::new(agent_config, DqnConfig::default())?,
            config,
        })
    }

    /// Largest absolute network output over every buffered state; 0.0 for an
    /// empty buffer.
    pub fn max_output(&mut self) -> Result<f32, AgentError> {
        let batch = self.inner.core_mut().buffer_mut().sample_all()?;
        if batch.is_empty() {
            return Ok(0.0);
        }
        let outputs = self.inner.online_outputs(&batch.states)?;
        Ok(outputs.iter().fold(0.0f32, |acc, v| acc.max(v.abs())))
    }

    /// Divide the output layer by `max_value`. `None`, zero and NaN are
    /// treated as 1.0.
    pub fn normalize_output_layer(&mut self, max_value: Option<f32>) {
        let factor = match max_value {
            Some(v) if v.is_finite() && v != 0.0 => v,
            _ => 1.0,
        };
        self.inner.scale_output(factor);
        info!(factor, "normalized output layer");
    }

    /// The wrapped value agent, e.g. to copy weights into another learner.
    pub fn value_agent(&self) -> &DqnAgent {
        &self.inner
    }
}

impl Agent for SupervisedAgent {
    fn name(&self) -> &str {
        "Supervised"
    }

    fn core(&self) -> &AgentCore {
        self.inner.core()
    }

    fn core_mut(&mut self) -> &mut AgentCore {
        self.inner.core_mut()
    }

    fn select_action(
        &self,
        boards: &BoardBatch,
        legal: &LegalMask,
        values: &CellValues,
    ) -> Result<Vec<usize>, AgentError> {
        self.inner.select_action(boards, legal, values)
    }

    fn action_probabilities(
        &self,
        boards: &BoardBatch,
        legal: &LegalMask,
        values: &CellValues,
    ) -> Result<Vec<Vec<f32>>, AgentError> {
        self.inner.action_probabilities(boards, legal, values)
    }

    /// Samples the entire buffer and runs `epochs` cross-entropy passes on the
    /// recorded actions. No option is read.
    fn train_step(&mut self, _options: &TrainOptions) -> Result<UpdateMetrics, AgentError> {
        let batch = self.inner.core_mut().buffer_mut().sample_all()?;
        if batch.is_empty() || self.config.epochs == 0 {
            return Ok(UpdateMetrics::default());
        }
        let loss = self.inner.fit_actions(
            &batch.states,
            &batch.actions,
            self.config.epochs,
            self.config.learning_rate,
        )?;
        debug!(loss, samples = batch.len(), "supervised update");
        Ok(UpdateMetrics {
            loss,
            ..Default::default()
        })
    }

    fn sync_target_network(&mut self) {
        self.inner.sync_target_network();
    }

    fn save_checkpoint(&self, dir: &Path, iteration: u32) -> Result<(), AgentError> {
        self.inner.save_checkpoint(dir, iteration)
    }

    fn load_checkpoint(&mut self, dir: &Path, iteration: u32) -> Result<(), AgentError> {
        self.inner.load_checkpoint(dir, iteration)
    }
}
