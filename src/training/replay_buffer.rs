use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ai::Transition;
use crate::checkpoint::buffer_path;
use crate::error::BufferError;
use crate::game::{BoardBatch, LegalMask};

/// Column-wise view of sampled transitions.
#[derive(Debug, Clone)]
pub struct TransitionBatch {
    pub states: BoardBatch,
    pub actions: Vec<usize>,
    pub rewards: Vec<f32>,
    pub next_states: BoardBatch,
    pub dones: Vec<f32>,
    /// Legality of each action in the corresponding next state.
    pub next_legal: LegalMask,
}

impl TransitionBatch {
    fn collate(transitions: Vec<Transition>) -> Result<Self, BufferError> {
        let n = transitions.len();
        let mut states = Vec::with_capacity(n);
        let mut next_states = Vec::with_capacity(n);
        let mut actions = Vec::with_capacity(n);
        let mut rewards = Vec::with_capacity(n);
        let mut dones = Vec::with_capacity(n);
        let mut legal = Vec::with_capacity(n);
        for t in transitions {
            states.push(t.state);
            next_states.push(t.next_state);
            actions.push(t.action);
            rewards.push(t.reward);
            dones.push(if t.done { 1.0 } else { 0.0 });
            legal.push(t.legal_mask);
        }
        let corrupt = |e: crate::error::AgentError| BufferError::Corrupt(e.to_string());
        Ok(TransitionBatch {
            states: BoardBatch::new(states).map_err(corrupt)?,
            actions,
            rewards,
            next_states: BoardBatch::new(next_states).map_err(corrupt)?,
            dones,
            next_legal: LegalMask::from_rows(legal).map_err(corrupt)?,
        })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct StoredBuffer {
    capacity: usize,
    position: usize,
    transitions: Vec<Transition>,
}

/// Fixed-capacity ring buffer for storing training transitions.
pub struct ReplayBuffer {
    buffer: Vec<Transition>,
    capacity: usize,
    position: usize,
    rng: StdRng,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_os_rng())
    }

    /// Buffer with a deterministic sampling sequence.
    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        let capacity = capacity.max(1);
        ReplayBuffer {
            buffer: Vec::with_capacity(capacity.min(4096)),
            capacity,
            position: 0,
            rng,
        }
    }

    /// Add a transition. Overwrites the oldest when full.
    pub fn push(&mut self, transition: Transition) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(transition);
        } else {
            self.buffer[self.position] = transition;
        }
        self.position = (self.position + 1) % self.capacity;
    }

    /// Sample `batch_size` distinct transitions uniformly at random.
    pub fn sample(&mut self, batch_size: usize) -> Result<TransitionBatch, BufferError> {
        if batch_size > self.buffer.len() {
            return Err(BufferError::Insufficient {
                requested: batch_size,
                available: self.buffer.len(),
            });
        }
        let indices = index::sample(&mut self.rng, self.buffer.len(), batch_size);
        TransitionBatch::collate(indices.iter().map(|i| self.buffer[i].clone()).collect())
    }

    /// Every stored transition, in random order.
    pub fn sample_all(&mut self) -> Result<TransitionBatch, BufferError> {
        self.sample(self.buffer.len())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Write the buffer to `dir/buffer_NNNN`.
    pub fn save(&self, dir: &Path, iteration: u32) -> Result<PathBuf, BufferError> {
        std::fs::create_dir_all(dir)?;
        let path = buffer_path(dir, iteration);
        let stored = StoredBuffer {
            capacity: self.capacity,
            position: self.position,
            transitions: self.buffer.clone(),
        };
        let writer = BufWriter::new(File::create(&path)?);
        bincode::serialize_into(writer, &stored)?;
        info!(path = %path.display(), len = self.buffer.len(), "saved replay buffer");
        Ok(path)
    }

    /// Replace the contents with `dir/buffer_NNNN`. The sampling RNG is kept.
    pub fn load(&mut self, dir: &Path, iteration: u32) -> Result<(), BufferError> {
        self.load_validated(dir, iteration, |_| Ok::<(), BufferError>(()))
    }

    /// Like [`load`](Self::load), but every stored transition must pass
    /// `validate` first. On any failure the current contents are untouched.
    pub fn load_validated<F, E>(&mut self, dir: &Path, iteration: u32, validate: F) -> Result<(), E>
    where
        F: Fn(&Transition) -> Result<(), E>,
        E: From<BufferError>,
    {
        let path = buffer_path(dir, iteration);
        if !path.exists() {
            return Err(BufferError::NotFound(path).into());
        }
        let reader = BufReader::new(File::open(&path).map_err(BufferError::from)?);
        let stored: StoredBuffer = bincode::deserialize_from(reader).map_err(BufferError::from)?;
        if stored.transitions.len() > stored.capacity.max(1) {
            return Err(BufferError::Corrupt(format!(
                "{} transitions exceed capacity {}",
                stored.transitions.len(),
                stored.capacity
            ))
            .into());
        }
        for transition in &stored.transitions {
            validate(transition)?;
        }
        self.capacity = stored.capacity.max(1);
        self.position = stored.position % self.capacity;
        self.buffer = stored.transitions;
        info!(path = %path.display(), len = self.buffer.len(), "loaded replay buffer");
        Ok(())
    }
}
