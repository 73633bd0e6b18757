use std::path::PathBuf;

/// Errors raised by agent construction, action selection and training.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("board side length {0} must be even to build a Hamiltonian cycle")]
    OddBoardSize(usize),

    #[error("no Hamiltonian cycle exists over the interior of a {0}x{0} board")]
    NoCycle(usize),

    #[error("invalid model architecture: {0}")]
    Architecture(String),

    #[error("agent needs at least {required} actions, configured with {actual}")]
    ActionCount { required: usize, actual: usize },

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("legality mask row {row} has no legal actions")]
    NoLegalActions { row: usize },

    #[error("no head cell found on board {0}")]
    HeadNotFound(usize),

    #[error("head cell {0} is not part of the cycle")]
    HeadOffCycle(usize),

    #[error("displacement ({dx}, {dy}) does not map to an action")]
    UnmatchedDisplacement { dx: i64, dy: i64 },

    #[error("training produced a non-finite loss ({0})")]
    NonFiniteLoss(f32),

    #[error("failed to read tensor data: {0}")]
    TensorData(String),

    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Errors from the replay buffer and its persistence.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("requested {requested} transitions but the buffer holds {available}")]
    Insufficient { requested: usize, available: usize },

    #[error("buffer file not found: {0}")]
    NotFound(PathBuf),

    #[error("stored transitions are inconsistent: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode or decode buffer: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read metadata from {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse metadata from {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("checkpoint is incompatible with this agent: {0}")]
    Incompatible(String),

    #[error("failed to save model: {0}")]
    ModelSave(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur when loading or writing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
