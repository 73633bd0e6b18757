use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

use crate::error::AgentError;

const TRUNK_CHANNELS: [usize; 2] = [16, 32];
const TRUNK_FEATURES: usize = 64;

/// Shared-trunk policy and value network.
///
/// ```text
/// Input:  [batch, frames, size, size]
/// Conv1:  frames -> 16 channels, 3x3 kernel, ReLU
/// Conv2:  16 -> 32 channels, 3x3 kernel, ReLU
/// Flatten: 32 * (size-4)^2
/// FC_shared: -> 64, ReLU
/// Policy head: 64 -> n_actions  (logits)
/// Value head:  64 -> 1          (state value)
/// ```
#[derive(Module, Debug)]
pub struct ActorCriticNetwork<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    fc_shared: Linear<B>,
    policy_head: Linear<B>,
    value_head: Linear<B>,
    relu: Relu,
}

#[derive(Config, Debug)]
pub struct ActorCriticNetworkConfig {
    pub board_size: usize,
    pub frames: usize,
    pub n_actions: usize,
}

impl ActorCriticNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ActorCriticNetwork<B>, AgentError> {
        if self.board_size < 5 {
            return Err(AgentError::Architecture(format!(
                "actor-critic trunk needs a board of at least 5x5, got {0}x{0}",
                self.board_size
            )));
        }
        let side = self.board_size - 4;
        Ok(ActorCriticNetwork {
            conv1: Conv2dConfig::new([self.frames, TRUNK_CHANNELS[0]], [3, 3]).init(device),
            conv2: Conv2dConfig::new(TRUNK_CHANNELS, [3, 3]).init(device),
            fc_shared: LinearConfig::new(TRUNK_CHANNELS[1] * side * side, TRUNK_FEATURES)
                .init(device),
            policy_head: LinearConfig::new(TRUNK_FEATURES, self.n_actions).init(device),
            value_head: LinearConfig::new(TRUNK_FEATURES, 1).init(device),
            relu: Relu::new(),
        })
    }
}

impl<B: Backend> ActorCriticNetwork<B> {
    fn trunk(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.relu.forward(self.conv1.forward(input));
        let x = self.relu.forward(self.conv2.forward(x));
        let x: Tensor<B, 2> = x.flatten(1, 3);
        self.relu.forward(self.fc_shared.forward(x))
    }

    /// Combined view: (logits `[batch, n_actions]`, value `[batch, 1]`).
    pub fn forward(&self, input: Tensor<B, 4>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let x = self.trunk(input);
        let logits = self.policy_head.forward(x.clone());
        let value = self.value_head.forward(x);
        (logits, value)
    }

    pub fn policy(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        self.policy_head.forward(self.trunk(input))
    }

    pub fn value(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        self.value_head.forward(self.trunk(input))
    }
}
