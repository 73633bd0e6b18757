//! Parameter and metadata persistence keyed by a four-digit iteration number.

mod manager;
mod metadata;

pub use manager::{
    buffer_path, latest_iteration, list_iterations, load_module, metadata_path, model_path,
    save_module, target_path, MODEL_EXTENSION,
};
pub use metadata::CheckpointMetadata;
