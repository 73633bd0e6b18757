use std::fs;
use std::path::{Path, PathBuf};

use burn::prelude::*;
use burn::record::DefaultRecorder;
use tracing::info;

use crate::error::CheckpointError;

/// Extension the default recorder appends to model files.
pub const MODEL_EXTENSION: &str = "mpk";

/// `dir/model_NNNN`, without the recorder extension.
pub fn model_path(dir: &Path, iteration: u32) -> PathBuf {
    dir.join(format!("model_{iteration:04}"))
}

/// `dir/model_NNNN_target`, without the recorder extension.
pub fn target_path(dir: &Path, iteration: u32) -> PathBuf {
    dir.join(format!("model_{iteration:04}_target"))
}

pub fn metadata_path(dir: &Path, iteration: u32) -> PathBuf {
    dir.join(format!("model_{iteration:04}.json"))
}

pub fn buffer_path(dir: &Path, iteration: u32) -> PathBuf {
    dir.join(format!("buffer_{iteration:04}"))
}

/// Record `module` at `path` and return the file actually written.
pub fn save_module<B: Backend, M: Module<B>>(
    module: M,
    path: &Path,
) -> Result<PathBuf, CheckpointError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let recorder = DefaultRecorder::default();
    module
        .save_file(path.to_path_buf(), &recorder)
        .map_err(|e| CheckpointError::ModelSave(e.to_string()))?;
    let file = path.with_extension(MODEL_EXTENSION);
    info!(path = %file.display(), "saved model parameters");
    Ok(file)
}

/// Load parameters recorded at `path` into `module`. A missing file is an
/// error; nothing is partially applied.
pub fn load_module<B: Backend, M: Module<B>>(
    module: M,
    path: &Path,
    device: &B::Device,
) -> Result<M, CheckpointError> {
    let file = path.with_extension(MODEL_EXTENSION);
    if !file.exists() {
        return Err(CheckpointError::NotFound(file));
    }
    let recorder = DefaultRecorder::default();
    let module = module
        .load_file(path.to_path_buf(), &recorder, device)
        .map_err(|e| CheckpointError::ModelLoad(e.to_string()))?;
    info!(path = %file.display(), "loaded model parameters");
    Ok(module)
}

/// Iterations with an online model file in `dir`, ascending. A missing
/// directory has none.
pub fn list_iterations(dir: &Path) -> Result<Vec<u32>, CheckpointError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut iterations = Vec::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        let Some(stem) = name
            .strip_prefix("model_")
            .and_then(|rest| rest.strip_suffix(&format!(".{MODEL_EXTENSION}")))
        else {
            continue;
        };
        if let Ok(iteration) = stem.parse::<u32>() {
            iterations.push(iteration);
        }
    }
    iterations.sort_unstable();
    Ok(iterations)
}

pub fn latest_iteration(dir: &Path) -> Result<Option<u32>, CheckpointError> {
    Ok(list_iterations(dir)?.last().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::backend::InferBackend;
    use burn::nn::{Linear, LinearConfig};

    #[test]
    fn test_file_names_are_zero_padded() {
        let dir = Path::new("models");
        assert_eq!(model_path(dir, 7), Path::new("models/model_0007"));
        assert_eq!(target_path(dir, 7), Path::new("models/model_0007_target"));
        assert_eq!(metadata_path(dir, 12), Path::new("models/model_0012.json"));
        assert_eq!(buffer_path(dir, 0), Path::new("models/buffer_0000"));
    }

    #[test]
    fn test_list_iterations_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "model_0003.mpk",
            "model_0003_target.mpk",
            "model_0010.mpk",
            "model_0010.json",
            "buffer_0010",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        assert_eq!(list_iterations(dir.path()).unwrap(), vec![3, 10]);
        assert_eq!(latest_iteration(dir.path()).unwrap(), Some(10));
    }

    #[test]
    fn test_list_iterations_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(list_iterations(&missing).unwrap().is_empty());
        assert_eq!(latest_iteration(&missing).unwrap(), None);
    }

    #[test]
    fn test_module_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let layer: Linear<InferBackend> = LinearConfig::new(3, 2).init(&device);
        let path = model_path(dir.path(), 1);
        let written = save_module(layer.clone(), &path).unwrap();
        assert!(written.exists());

        let fresh: Linear<InferBackend> = LinearConfig::new(3, 2).init(&device);
        let loaded = load_module(fresh, &path, &device).unwrap();
        let before: Vec<f32> = layer.weight.val().into_data().to_vec().unwrap();
        let after: Vec<f32> = loaded.weight.val().into_data().to_vec().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_load_missing_module() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let layer: Linear<InferBackend> = LinearConfig::new(3, 2).init(&device);
        let err = load_module(layer, &model_path(dir.path(), 5), &device).unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(p) if p.ends_with("model_0005.mpk")));
    }
}
