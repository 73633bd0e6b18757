//! # ML Snake Agents
//!
//! Decision-making and learning agents for a grid-based snake game. Each agent
//! maps batches of board observations plus legality masks to actions, and the
//! learners improve from transitions stored in an experience buffer. Networks
//! run on the Burn ML framework.
//!
//! ## Modules
//!
//! - [`game`]: Board observations, legality masks, coordinates and directions
//! - [`ai`]: Agent trait, learners (DQN, PG, actor-critic, supervised), planners
//! - [`training`]: Experience replay buffer and its persistence
//! - [`checkpoint`]: Model persistence, metadata and versioning
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types

#![recursion_limit = "256"]

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod training;
