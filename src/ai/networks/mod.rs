//! Network collaborators: the versioned layer-list architecture, the value
//! network built from it and the fixed shared-trunk actor-critic network.

mod actor_critic_network;
mod architecture;
mod q_network;

pub use actor_critic_network::{ActorCriticNetwork, ActorCriticNetworkConfig};
pub use architecture::{Activation, LayerSpec, ModelArchitecture, NetworkPlan};
pub use q_network::QNetwork;
