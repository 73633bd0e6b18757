//! Reward shaping and learning-target construction for the learning agents.

use crate::error::AgentError;
use crate::game::LegalMask;

/// Value given to illegal next-state actions before the per-row maximum.
/// A finite sentinel keeps later arithmetic free of NaN.
pub const ILLEGAL_ACTION_SENTINEL: f32 = -10_000.0;

const NORMALIZE_EPSILON: f32 = 1e-8;

/// Replace each reward by its sign.
pub fn clip_rewards(rewards: &[f32]) -> Vec<f32> {
    rewards
        .iter()
        .map(|&r| if r > 0.0 { 1.0 } else if r < 0.0 { -1.0 } else { 0.0 })
        .collect()
}

/// Shift to zero mean and scale to unit standard deviation.
///
/// A constant vector maps to all zeros; a non-finite spread is treated as 1.0.
pub fn normalize_rewards(rewards: &[f32]) -> Vec<f32> {
    if rewards.is_empty() {
        return Vec::new();
    }
    let n = rewards.len() as f32;
    let mean = rewards.iter().sum::<f32>() / n;
    let var = rewards.iter().map(|r| (r - mean).powi(2)).sum::<f32>() / n;
    let std = var.sqrt();
    let std = if std.is_finite() { std } else { 1.0 };
    rewards
        .iter()
        .map(|r| (r - mean) / (std + NORMALIZE_EPSILON))
        .collect()
}

/// Optional standardization followed by optional sign clipping, so clipped
/// rewards always land in {-1, 0, 1}.
pub fn shape_rewards(rewards: &[f32], clip: bool, normalize: bool) -> Vec<f32> {
    let mut shaped = if normalize {
        normalize_rewards(rewards)
    } else {
        rewards.to_vec()
    };
    if clip {
        shaped = clip_rewards(&shaped);
    }
    shaped
}

/// One-hot rows for `actions` over `width` actions, flattened.
pub fn one_hot(actions: &[usize], width: usize) -> Vec<f32> {
    let mut data = vec![0.0f32; actions.len() * width];
    for (i, &a) in actions.iter().enumerate() {
        data[i * width + a] = 1.0;
    }
    data
}

/// `reward + gamma * max_legal(next) * (1 - done)` per row.
pub fn bootstrapped_returns(
    rewards: &[f32],
    next_outputs: &[f32],
    next_legal: &LegalMask,
    dones: &[f32],
    gamma: f32,
) -> Result<Vec<f32>, AgentError> {
    let width = next_legal.width();
    let rows = rewards.len();
    next_legal.expect_shape(rows, width)?;
    if next_outputs.len() != rows * width || dones.len() != rows {
        return Err(AgentError::Shape(format!(
            "bootstrap inputs disagree: {rows} rewards, {} outputs, {} dones",
            next_outputs.len(),
            dones.len()
        )));
    }

    Ok((0..rows)
        .map(|i| {
            let max_next = next_outputs[i * width..(i + 1) * width]
                .iter()
                .enumerate()
                .map(|(a, &q)| {
                    if next_legal.is_legal(i, a) {
                        q
                    } else {
                        ILLEGAL_ACTION_SENTINEL
                    }
                })
                .fold(f32::NEG_INFINITY, f32::max);
            rewards[i] + gamma * max_next * (1.0 - dones[i])
        })
        .collect())
}

/// Regression target equal to `current` except in the taken action's column,
/// which becomes the row's return.
pub fn blend_taken_action(
    current: &[f32],
    actions: &[usize],
    returns: &[f32],
    width: usize,
) -> Vec<f32> {
    let mask = one_hot(actions, width);
    current
        .iter()
        .zip(mask)
        .enumerate()
        .map(|(idx, (&c, m))| (1.0 - m) * c + m * returns[idx / width])
        .collect()
}
