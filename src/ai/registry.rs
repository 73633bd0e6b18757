//! Agent selection by name: one enum variant per agent, built from
//! [`AppConfig`].

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ai::agent::Agent;
use crate::ai::algorithms::{ActorCriticAgent, DqnAgent, PolicyGradientAgent, SupervisedAgent};
use crate::ai::hamiltonian::{CycleStrategy, HamiltonianAgent};
use crate::ai::shortest_path::ShortestPathAgent;
use crate::config::AppConfig;
use crate::error::AgentError;
use crate::game::Direction;

/// Settings shared by the non-learning planners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub cycle_strategy: CycleStrategy,
    /// Action the shortest-path planner takes when the food is unreachable.
    pub fallback_action: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            cycle_strategy: CycleStrategy::default(),
            fallback_action: Direction::North.action(),
        }
    }
}

/// Which agent to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Dqn,
    PolicyGradient,
    ActorCritic,
    Supervised,
    Hamiltonian,
    ShortestPath,
}

impl AgentKind {
    pub const ALL: [AgentKind; 6] = [
        AgentKind::Dqn,
        AgentKind::PolicyGradient,
        AgentKind::ActorCritic,
        AgentKind::Supervised,
        AgentKind::Hamiltonian,
        AgentKind::ShortestPath,
    ];
}

pub enum SnakeAgent {
    Dqn(DqnAgent),
    PolicyGradient(PolicyGradientAgent),
    ActorCritic(ActorCriticAgent),
    Supervised(SupervisedAgent),
    Hamiltonian(HamiltonianAgent),
    ShortestPath(ShortestPathAgent),
}

impl SnakeAgent {
    pub fn from_config(kind: AgentKind, config: &AppConfig) -> Result<Self, AgentError> {
        let agent_config = config.agent.clone();
        let agent = match kind {
            AgentKind::Dqn => SnakeAgent::Dqn(DqnAgent::new(agent_config, config.dqn.clone())?),
            AgentKind::PolicyGradient => SnakeAgent::PolicyGradient(PolicyGradientAgent::new(
                agent_config,
                config.pg.clone(),
            )?),
            AgentKind::ActorCritic => SnakeAgent::ActorCritic(ActorCriticAgent::new(
                agent_config,
                config.actor_critic.clone(),
            )?),
            AgentKind::Supervised => SnakeAgent::Supervised(SupervisedAgent::new(
                agent_config,
                config.supervised.clone(),
            )?),
            AgentKind::Hamiltonian => SnakeAgent::Hamiltonian(HamiltonianAgent::new(
                agent_config,
                config.planner.cycle_strategy,
            )?),
            AgentKind::ShortestPath => SnakeAgent::ShortestPath(ShortestPathAgent::new(
                agent_config,
                config.planner.fallback_action,
            )?),
        };
        info!(?kind, name = agent.as_agent().name(), "built agent");
        Ok(agent)
    }

    pub fn kind(&self) -> AgentKind {
        match self {
            SnakeAgent::Dqn(_) => AgentKind::Dqn,
            SnakeAgent::PolicyGradient(_) => AgentKind::PolicyGradient,
            SnakeAgent::ActorCritic(_) => AgentKind::ActorCritic,
            SnakeAgent::Supervised(_) => AgentKind::Supervised,
            SnakeAgent::Hamiltonian(_) => AgentKind::Hamiltonian,
            SnakeAgent::ShortestPath(_) => AgentKind::ShortestPath,
        }
    }

    pub fn as_agent(&self) -> &dyn Agent {
        match self {
            SnakeAgent::Dqn(a) => a,
            SnakeAgent::PolicyGradient(a) => a,
            SnakeAgent::ActorCritic(a) => a,
            SnakeAgent::Supervised(a) => a,
            SnakeAgent::Hamiltonian(a) => a,
            SnakeAgent::ShortestPath(a) => a,
        }
    }

    pub fn as_agent_mut(&mut self) -> &mut dyn Agent {
        match self {
            SnakeAgent::Dqn(a) => a,
            SnakeAgent::PolicyGradient(a) => a,
            SnakeAgent::ActorCritic(a) => a,
            SnakeAgent::Supervised(a) => a,
            SnakeAgent::Hamiltonian(a) => a,
            SnakeAgent::ShortestPath(a) => a,
        }
    }
}
