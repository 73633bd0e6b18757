use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

use super::architecture::{Activation, ModelArchitecture};
use crate::error::AgentError;

/// Action-value network assembled from a [`ModelArchitecture`].
///
/// ```text
/// Input:  [batch, frames, size, size]
/// Conv*:  per architecture, optional ReLU after each
/// Flatten
/// Dense*: per architecture, optional ReLU after each
/// Output: features -> n_actions
/// ```
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    convs: Vec<Conv2d<B>>,
    conv_activations: Vec<Option<Relu>>,
    hidden: Vec<Linear<B>>,
    hidden_activations: Vec<Option<Relu>>,
    output: Linear<B>,
}

fn activation(kind: Activation) -> Option<Relu> {
    match kind {
        Activation::Relu => Some(Relu::new()),
        Activation::Linear => None,
    }
}

impl<B: Backend> QNetwork<B> {
    pub fn new(
        architecture: &ModelArchitecture,
        size: usize,
        frames: usize,
        n_actions: usize,
        device: &B::Device,
    ) -> Result<Self, AgentError> {
        let plan = architecture.plan(size, frames)?;
        Ok(QNetwork {
            convs: plan
                .convs
                .iter()
                .map(|c| {
                    Conv2dConfig::new([c.in_channels, c.out_channels], [c.kernel_size; 2])
                        .init(device)
                })
                .collect(),
            conv_activations: plan.convs.iter().map(|c| activation(c.activation)).collect(),
            hidden: plan
                .dense
                .iter()
                .map(|d| LinearConfig::new(d.inputs, d.outputs).init(device))
                .collect(),
            hidden_activations: plan.dense.iter().map(|d| activation(d.activation)).collect(),
            output: LinearConfig::new(plan.features, n_actions).init(device),
        })
    }

    /// Forward pass: `[batch, frames, size, size]` -> `[batch, n_actions]`.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = input;
        for (conv, act) in self.convs.iter().zip(&self.conv_activations) {
            x = conv.forward(x);
            if let Some(relu) = act {
                x = relu.forward(x);
            }
        }
        let mut x: Tensor<B, 2> = x.flatten(1, 3);
        for (linear, act) in self.hidden.iter().zip(&self.hidden_activations) {
            x = linear.forward(x);
            if let Some(relu) = act {
                x = relu.forward(x);
            }
        }
        self.output.forward(x)
    }

    /// Divide the output layer's weights and bias by `factor`, scaling every
    /// output by the same amount. A zero or non-finite factor leaves the
    /// layer unchanged.
    pub fn scale_output(mut self, factor: f32) -> Self {
        let factor = if factor.is_finite() && factor != 0.0 {
            factor
        } else {
            1.0
        };
        self.output.weight = self
            .output
            .weight
            .map(|w| w.div_scalar(factor).detach().require_grad());
        self.output.bias = self
            .output
            .bias
            .map(|b| b.map(|b| b.div_scalar(factor).detach().require_grad()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::backend::InferBackend;

    #[test]
    fn test_network_output_shape() {
        let device = Default::default();
        let network =
            QNetwork::<InferBackend>::new(&ModelArchitecture::default(), 10, 2, 4, &device)
                .unwrap();

        let input = Tensor::zeros([3, 2, 10, 10], &device);
        let output = network.forward(input);
        assert_eq!(output.shape().dims, [3, 4]);
    }

    #[test]
    fn test_dense_only_architecture() {
        let json = r#"{"layers":[{"type":"flatten"},{"type":"dense","units":5,"activation":"relu"}]}"#;
        let arch: ModelArchitecture = serde_json::from_str(json).unwrap();
        let device = Default::default();
        let network = QNetwork::<InferBackend>::new(&arch, 6, 1, 3, &device).unwrap();
        let output = network.forward(Tensor::ones([1, 1, 6, 6], &device));
        assert_eq!(output.shape().dims, [1, 3]);
    }

    #[test]
    fn test_scale_output_divides_outputs() {
        let device = Default::default();
        let network =
            QNetwork::<InferBackend>::new(&ModelArchitecture::default(), 8, 2, 4, &device)
                .unwrap();
        let input = Tensor::<InferBackend, 4>::ones([1, 2, 8, 8], &device);
        let before: Vec<f32> = network.forward(input.clone()).into_data().to_vec().unwrap();

        let scaled = network.scale_output(2.0);
        let after: Vec<f32> = scaled.forward(input).into_data().to_vec().unwrap();
        for (b, a) in before.iter().zip(&after) {
            assert!((b / 2.0 - a).abs() < 1e-5);
        }
    }

    #[test]
    fn test_scale_output_ignores_nan() {
        let device = Default::default();
        let network =
            QNetwork::<InferBackend>::new(&ModelArchitecture::default(), 8, 2, 4, &device)
                .unwrap();
        let input = Tensor::<InferBackend, 4>::ones([1, 2, 8, 8], &device);
        let before: Vec<f32> = network.forward(input.clone()).into_data().to_vec().unwrap();
        let after: Vec<f32> = network
            .scale_output(f32::NAN)
            .forward(input)
            .into_data()
            .to_vec()
            .unwrap();
        assert_eq!(before, after);
    }
}
