//! Experience storage shared by every agent.

pub mod replay_buffer;
