//! Backend type aliases shared by the learning agents.
//!
//! Training runs on an autodiff-wrapped `NdArray` CPU backend; inference and
//! target snapshots live on the plain backend so they never record gradients.

use burn::backend::ndarray::{NdArray, NdArrayDevice};
use burn::backend::Autodiff;
use burn::prelude::*;

use crate::error::AgentError;

pub type InferBackend = NdArray<f32>;
pub type TrainBackend = Autodiff<InferBackend>;

pub fn default_device() -> NdArrayDevice {
    NdArrayDevice::default()
}

/// Copy a tensor's elements out as `f32`, row-major.
pub fn tensor_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>, AgentError> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| AgentError::TensorData(format!("{e:?}")))
}

/// Single-element tensor to a scalar.
pub fn scalar_value<B: Backend>(tensor: Tensor<B, 1>) -> Result<f32, AgentError> {
    tensor_values(tensor)?
        .first()
        .copied()
        .ok_or_else(|| AgentError::TensorData("expected a scalar, got an empty tensor".into()))
}
