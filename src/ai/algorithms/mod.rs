mod actor_critic;
mod dqn;
mod policy_gradient;
mod supervised;

#[cfg(test)]
pub(crate) mod fixtures;

pub use actor_critic::{ActorCriticAgent, ActorCriticConfig};
pub use dqn::{DqnAgent, DqnConfig};
pub use policy_gradient::{PgConfig, PolicyGradientAgent};
pub use supervised::{SupervisedAgent, SupervisedConfig};

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;

use crate::ai::backend::{scalar_value, TrainBackend};
use crate::error::AgentError;

/// Backpropagate `loss` through `module` and apply one optimizer step.
///
/// A non-finite loss skips the step and is reported as
/// [`AgentError::NonFiniteLoss`]; the module keeps its previous parameters.
pub(crate) fn descend<M, O>(
    module: &mut M,
    optimizer: &mut O,
    loss: Tensor<TrainBackend, 1>,
    learning_rate: f64,
) -> Result<f32, AgentError>
where
    M: AutodiffModule<TrainBackend>,
    O: Optimizer<M, TrainBackend>,
{
    let loss_val = scalar_value(loss.clone())?;
    if !loss_val.is_finite() {
        return Err(AgentError::NonFiniteLoss(loss_val));
    }
    let grads = GradientsParams::from_grads(loss.backward(), &*module);
    *module = optimizer.step(learning_rate, module.clone(), grads);
    Ok(loss_val)
}
