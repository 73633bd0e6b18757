use std::path::Path;

use tracing::warn;

use crate::ai::{ActorCriticConfig, AgentConfig, DqnConfig, PgConfig, PlannerConfig, SupervisedConfig};
use crate::error::ConfigError;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub dqn: DqnConfig,
    pub pg: PgConfig,
    pub actor_critic: ActorCriticConfig,
    pub supervised: SupervisedConfig,
    pub planner: PlannerConfig,
}

fn invalid(message: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Validation(message.into()))
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let agent = &self.agent;
        if !(0.0..=1.0).contains(&agent.gamma) {
            return invalid("agent.gamma must be in [0, 1]");
        }
        if agent.board_size < 3 {
            return invalid("agent.board_size must be >= 3");
        }
        if agent.frames == 0 {
            return invalid("agent.frames must be >= 1");
        }
        if agent.n_actions == 0 {
            return invalid("agent.n_actions must be >= 1");
        }
        if agent.buffer_size == 0 {
            return invalid("agent.buffer_size must be >= 1");
        }
        if !agent.board_scale.is_finite() || agent.board_scale == 0.0 {
            return invalid("agent.board_scale must be finite and non-zero");
        }

        if self.dqn.learning_rate <= 0.0 {
            return invalid("dqn.learning_rate must be > 0");
        }
        if self.dqn.huber_delta <= 0.0 {
            return invalid("dqn.huber_delta must be > 0");
        }

        if self.pg.learning_rate <= 0.0 {
            return invalid("pg.learning_rate must be > 0");
        }
        if self.pg.beta < 0.0 {
            return invalid("pg.beta must be >= 0");
        }

        if self.actor_critic.learning_rate <= 0.0 {
            return invalid("actor_critic.learning_rate must be > 0");
        }
        if self.actor_critic.beta < 0.0 {
            return invalid("actor_critic.beta must be >= 0");
        }
        if self.actor_critic.huber_delta <= 0.0 {
            return invalid("actor_critic.huber_delta must be > 0");
        }

        if self.supervised.learning_rate <= 0.0 {
            return invalid("supervised.learning_rate must be > 0");
        }

        if self.planner.fallback_action >= agent.n_actions {
            return invalid("planner.fallback_action must be < agent.n_actions");
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&AppConfig::default())?)
    }
}
