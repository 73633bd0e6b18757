//! Layer-list description of a value network, loaded per version from
//! `<model_config_dir>/<version>.json`.
//!
//! ```json
//! {"layers": [
//!   {"type": "conv2d", "filters": 16, "kernel_size": 3, "activation": "relu"},
//!   {"type": "flatten"},
//!   {"type": "dense", "units": 64, "activation": "relu"}
//! ]}
//! ```
//!
//! Convolutions come first, then a single flatten, then dense layers. The
//! output layer mapping to the action count is always appended.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    Conv2d {
        filters: usize,
        kernel_size: usize,
        #[serde(default)]
        activation: Activation,
    },
    Flatten,
    Dense {
        units: usize,
        #[serde(default)]
        activation: Activation,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArchitecture {
    pub layers: Vec<LayerSpec>,
}

impl Default for ModelArchitecture {
    fn default() -> Self {
        ModelArchitecture {
            layers: vec![
                LayerSpec::Conv2d {
                    filters: 16,
                    kernel_size: 3,
                    activation: Activation::Relu,
                },
                LayerSpec::Conv2d {
                    filters: 32,
                    kernel_size: 3,
                    activation: Activation::Relu,
                },
                LayerSpec::Flatten,
                LayerSpec::Dense {
                    units: 256,
                    activation: Activation::Relu,
                },
            ],
        }
    }
}

/// Convolution stage resolved against an input shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvStage {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: usize,
    pub activation: Activation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DenseStage {
    pub inputs: usize,
    pub outputs: usize,
    pub activation: Activation,
}

/// Layer sizes for a concrete `size x size x frames` input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPlan {
    pub convs: Vec<ConvStage>,
    pub dense: Vec<DenseStage>,
    /// Width of the last hidden activation, feeding the output layer.
    pub features: usize,
}

impl ModelArchitecture {
    /// Architecture for `version`; the empty version is the built-in default.
    pub fn for_version(dir: &Path, version: &str) -> Result<Self, AgentError> {
        if version.is_empty() {
            return Ok(Self::default());
        }
        if version.contains(['/', '\\']) || version.contains("..") {
            return Err(AgentError::Architecture(format!(
                "version '{version}' is not a plain name"
            )));
        }
        let path = dir.join(format!("{version}.json"));
        let json = fs::read_to_string(&path).map_err(|e| {
            AgentError::Architecture(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&json)
            .map_err(|e| AgentError::Architecture(format!("{}: {e}", path.display())))
    }

    /// Resolve channel counts and the flattened width for an input shape.
    pub fn plan(&self, size: usize, frames: usize) -> Result<NetworkPlan, AgentError> {
        let mut convs = Vec::new();
        let mut dense = Vec::new();
        let mut channels = frames;
        let mut side = size;
        let mut features = None;

        for layer in &self.layers {
            match (*layer, features) {
                (
                    LayerSpec::Conv2d {
                        filters,
                        kernel_size,
                        activation,
                    },
                    None,
                ) => {
                    if filters == 0 || kernel_size == 0 || kernel_size > side {
                        return Err(AgentError::Architecture(format!(
                            "conv2d with {filters} filters and kernel {kernel_size} does not fit a {side}x{side} input"
                        )));
                    }
                    convs.push(ConvStage {
                        in_channels: channels,
                        out_channels: filters,
                        kernel_size,
                        activation,
                    });
                    channels = filters;
                    side = side - kernel_size + 1;
                }
                (LayerSpec::Flatten, None) => features = Some(channels * side * side),
                (LayerSpec::Dense { units, activation }, Some(inputs)) => {
                    if units == 0 {
                        return Err(AgentError::Architecture("dense layer with 0 units".into()));
                    }
                    dense.push(DenseStage {
                        inputs,
                        outputs: units,
                        activation,
                    });
                    features = Some(units);
                }
                (LayerSpec::Dense { .. }, None) => {
                    return Err(AgentError::Architecture(
                        "dense layer before flatten".into(),
                    ))
                }
                (_, Some(_)) => {
                    return Err(AgentError::Architecture(
                        "only dense layers may follow flatten".into(),
                    ))
                }
            }
        }

        let features = features
            .ok_or_else(|| AgentError::Architecture("architecture never flattens".into()))?;
        Ok(NetworkPlan {
            convs,
            dense,
            features,
        })
    }
}
