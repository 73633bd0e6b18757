//! Agents: the shared [`Agent`] interface, the learning algorithms and their
//! networks, and the two search planners.

mod agent;
pub mod algorithms;
pub mod backend;
pub mod hamiltonian;
pub mod networks;
pub mod registry;
pub mod selection;
pub mod shortest_path;
pub mod targets;

pub use agent::{Agent, AgentConfig, AgentCore, TrainOptions, Transition, UpdateMetrics};
pub use algorithms::{
    ActorCriticAgent, ActorCriticConfig, DqnAgent, DqnConfig, PgConfig, PolicyGradientAgent,
    SupervisedAgent, SupervisedConfig,
};
pub use hamiltonian::{CycleStrategy, HamiltonianAgent, HamiltonianCycle};
pub use networks::{ActorCriticNetwork, ActorCriticNetworkConfig, ModelArchitecture, QNetwork};
pub use registry::{AgentKind, PlannerConfig, SnakeAgent};
pub use shortest_path::{shortest_path, ShortestPathAgent};
