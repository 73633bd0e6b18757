use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::ai::AgentConfig;
use crate::error::CheckpointError;

/// Sidecar written next to each model file as `model_NNNN.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub iteration: u32,
    pub timestamp: u64,
    pub agent: String,
    pub has_target: bool,
    pub board_size: usize,
    pub frames: usize,
    pub n_actions: usize,
    pub version: String,
    pub gamma: f32,
}

impl CheckpointMetadata {
    pub fn new(agent: &str, config: &AgentConfig, iteration: u32, has_target: bool) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        CheckpointMetadata {
            iteration,
            timestamp,
            agent: agent.to_string(),
            has_target,
            board_size: config.board_size,
            frames: config.frames,
            n_actions: config.n_actions,
            version: config.version.clone(),
            gamma: config.gamma,
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), CheckpointError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, CheckpointError> {
        let json = fs::read_to_string(path).map_err(|e| CheckpointError::MetadataRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| CheckpointError::MetadataParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Check that parameters saved under this metadata fit an agent built from
    /// `config`.
    pub fn check_compatible(&self, agent: &str, config: &AgentConfig) -> Result<(), CheckpointError> {
        if self.agent != agent {
            return Err(CheckpointError::Incompatible(format!(
                "saved by a {} agent, loading into {agent}",
                self.agent
            )));
        }
        let saved = (self.board_size, self.frames, self.n_actions);
        let wanted = (config.board_size, config.frames, config.n_actions);
        if saved != wanted || self.version != config.version {
            return Err(CheckpointError::Incompatible(format!(
                "saved for board {}x{} with {} frames, {} actions, version '{}'",
                self.board_size, self.board_size, self.frames, self.n_actions, self.version
            )));
        }
        Ok(())
    }
}
