//! Action-selection strategies shared by every agent variant.

use tracing::warn;

use crate::error::AgentError;
use crate::game::LegalMask;

/// Raw outputs are clipped to `[-PROBABILITY_CLIP, PROBABILITY_CLIP]` before
/// the softmax in [`stable_softmax`].
pub const PROBABILITY_CLIP: f32 = 10.0;

/// Arg-max per row with illegal actions treated as negative infinity.
///
/// Ties resolve to the lowest action index. A row without any legal action is
/// an error.
pub fn masked_argmax(
    outputs: &[f32],
    width: usize,
    legal: &LegalMask,
) -> Result<Vec<usize>, AgentError> {
    let rows = if width == 0 { 0 } else { outputs.len() / width };
    legal.expect_shape(rows, width)?;

    (0..rows)
        .map(|row| {
            let values = &outputs[row * width..(row + 1) * width];
            let mut best: Option<(usize, f32)> = None;
            for (action, &value) in values.iter().enumerate() {
                if !legal.is_legal(row, action) {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((_, best_value)) => value > best_value,
                };
                if better {
                    best = Some((action, value));
                }
            }
            best.map(|(action, _)| action)
                .ok_or(AgentError::NoLegalActions { row })
        })
        .collect()
}

/// Softmax per row after clipping to [`PROBABILITY_CLIP`] and subtracting the
/// row maximum, in that order.
pub fn stable_softmax(outputs: &[f32], width: usize) -> Vec<Vec<f32>> {
    outputs
        .chunks(width.max(1))
        .map(|row| {
            let clipped: Vec<f32> = row
                .iter()
                .map(|v| v.clamp(-PROBABILITY_CLIP, PROBABILITY_CLIP))
                .collect();
            let max = clipped.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let exps: Vec<f32> = clipped.iter().map(|v| (v - max).exp()).collect();
            let sum: f32 = exps.iter().sum();
            exps.into_iter().map(|e| e / sum).collect()
        })
        .collect()
}

/// Probability vector putting all mass on `action`.
pub fn one_hot_row(action: usize, width: usize) -> Vec<f32> {
    let mut row = vec![0.0; width];
    if let Some(slot) = row.get_mut(action) {
        *slot = 1.0;
    }
    row
}

/// Keep a planner's choice when it is legal, otherwise substitute the lowest
/// legal action.
pub fn guard_planned_action(
    action: usize,
    row: usize,
    legal: &LegalMask,
) -> Result<usize, AgentError> {
    if legal.is_legal(row, action) {
        return Ok(action);
    }
    let fallback = legal
        .row(row)
        .iter()
        .position(|&ok| ok)
        .ok_or(AgentError::NoLegalActions { row })?;
    warn!(row, planned = action, fallback, "planned action is illegal, substituting");
    Ok(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_argmax_skips_illegal() {
        let outputs = vec![5.0, 1.0, 3.0, 0.0, 0.0, 9.0, 2.0, 1.0];
        let legal = LegalMask::from_rows(vec![
            vec![false, true, true, true],
            vec![true, false, true, true],
        ])
        .unwrap();
        let actions = masked_argmax(&outputs, 4, &legal).unwrap();
        assert_eq!(actions, vec![2, 2]);
    }

    #[test]
    fn test_masked_argmax_ties_pick_lowest_index() {
        let legal = LegalMask::all_legal(1, 3);
        assert_eq!(masked_argmax(&[1.0, 4.0, 4.0], 3, &legal).unwrap(), vec![1]);
    }

    #[test]
    fn test_masked_argmax_all_illegal_row_is_error() {
        let legal = LegalMask::from_rows(vec![vec![true, false], vec![false, false]]).unwrap();
        let err = masked_argmax(&[0.0, 1.0, 2.0, 3.0], 2, &legal).unwrap_err();
        assert!(matches!(err, AgentError::NoLegalActions { row: 1 }));
    }

    #[test]
    fn test_masked_argmax_rejects_mask_shape() {
        let legal = LegalMask::all_legal(2, 3);
        assert!(masked_argmax(&[0.0; 4], 4, &legal).is_err());
    }

    #[test]
    fn test_stable_softmax_rows_sum_to_one() {
        let outputs = vec![1.0, 2.0, 3.0, 1e6, -1e6, 0.0];
        let probs = stable_softmax(&outputs, 3);
        for row in &probs {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "sum = {sum}");
            assert!(row.iter().all(|p| p.is_finite()));
        }
        // large magnitudes are clipped to +/-10 before exponentiation
        let expected = 1.0 / (1.0 + (-10.0f32).exp() + (-20.0f32).exp());
        assert!((probs[1][0] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_guard_planned_action() {
        let legal = LegalMask::single(vec![false, true, true, false]);
        assert_eq!(guard_planned_action(2, 0, &legal).unwrap(), 2);
        assert_eq!(guard_planned_action(0, 0, &legal).unwrap(), 1);

        let none = LegalMask::single(vec![false; 4]);
        assert!(guard_planned_action(0, 0, &none).is_err());
    }
}
