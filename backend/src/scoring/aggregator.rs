//! Rolling-window distraction scoring.
//!
//! Each classification contributes `penalty[label] * confidence`, weighted so
//! that recent observations dominate, and the per-window mean is squashed
//! through a logistic curve centered at 5. The result is a score in (0, 1)
//! where higher means a more distracted driver.

use crate::classifier::classes::NUM_CLASSES;

/// Distractiveness penalty per class index. Index 0 is "safe driving",
/// index 7 ("reaching behind") is the worst offender.
pub const CLASS_PENALTIES: [u32; NUM_CLASSES] = [1, 7, 6, 7, 6, 5, 4, 10, 7, 3];

/// Bounded window of most-recent classifications considered per score.
pub const WINDOW_SIZE: usize = 5;

/// Weight schedule over the window, oldest to newest. A window shorter than
/// five entries uses the trailing weights, so the newest entry always
/// carries weight 1.0.
const WINDOW_WEIGHTS: [f64; WINDOW_SIZE] = [0.2, 0.4, 0.6, 0.8, 1.0];

/// Midpoint of the logistic curve: a weighted mean of 5 maps to score 0.5.
const SIGMOID_MIDPOINT: f64 = 5.0;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AggregateError {
    #[error("no classification history to aggregate")]
    InsufficientHistory,
}

/// One window entry: predicted class index and the classifier's confidence
/// in it, ordered oldest first within a [`ScoreWindow`].
pub type ScoreWindow = Vec<(usize, f32)>;

pub fn class_penalty(label: usize) -> u32 {
    CLASS_PENALTIES.get(label).copied().unwrap_or(0)
}

/// Aggregates up to [`WINDOW_SIZE`] most-recent `(label, confidence)` pairs,
/// newest last, into a single score in (0, 1).
pub fn aggregate_score(window: &[(usize, f32)]) -> Result<f64, AggregateError> {
    if window.is_empty() {
        return Err(AggregateError::InsufficientHistory);
    }

    let entries = if window.len() > WINDOW_SIZE {
        &window[window.len() - WINDOW_SIZE..]
    } else {
        window
    };
    let weights = &WINDOW_WEIGHTS[WINDOW_SIZE - entries.len()..];

    let weighted_sum: f64 = entries
        .iter()
        .zip(weights)
        .map(|(&(label, confidence), &weight)| {
            class_penalty(label) as f64 * confidence as f64 * weight
        })
        .sum();

    let x = weighted_sum / entries.len() as f64;
    Ok(sigmoid(x - SIGMOID_MIDPOINT))
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_entry_uses_full_weight() {
        // x = penalty[0] * 0.9 * 1.0 / 1 = 0.9, score = 1 / (1 + e^4.1)
        let score = aggregate_score(&[(0, 0.9)]).unwrap();
        assert!((score - 0.0163).abs() < 1e-3, "score was {score}");
    }

    #[test]
    fn empty_window_is_refused() {
        assert_eq!(
            aggregate_score(&[]),
            Err(AggregateError::InsufficientHistory)
        );
    }

    #[test]
    fn short_window_uses_trailing_weights() {
        // Two entries weigh [0.8, 1.0]:
        // x = (penalty[7]*1.0*0.8 + penalty[7]*1.0*1.0) / 2 = (8 + 10) / 2 = 9
        let score = aggregate_score(&[(7, 1.0), (7, 1.0)]).unwrap();
        let expected = 1.0 / (1.0 + (5.0f64 - 9.0).exp());
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn full_window_mean_at_midpoint_scores_half() {
        // Five entries of penalty 10 at full confidence:
        // x = 10 * (0.2 + 0.4 + 0.6 + 0.8 + 1.0) / 5 = 6
        let window = vec![(7, 1.0); 5];
        let score = aggregate_score(&window).unwrap();
        let expected = 1.0 / (1.0 + (5.0f64 - 6.0).exp());
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn oversized_window_only_considers_last_five() {
        let mut window = vec![(7, 1.0); 3];
        window.extend(vec![(0, 0.5); 5]);
        let trimmed: ScoreWindow = window[window.len() - 5..].to_vec();
        assert_eq!(
            aggregate_score(&window).unwrap(),
            aggregate_score(&trimmed).unwrap()
        );
    }

    #[test]
    fn scores_stay_in_open_unit_interval() {
        let calm = aggregate_score(&[(0, 1.0); 5]).unwrap();
        let frantic = aggregate_score(&[(7, 1.0); 5]).unwrap();
        assert!(calm > 0.0 && calm < 1.0);
        assert!(frantic > 0.0 && frantic < 1.0);
        assert!(frantic > calm);
    }

    #[test]
    fn penalty_table_matches_class_severity() {
        assert_eq!(class_penalty(0), 1);
        assert_eq!(class_penalty(7), 10);
        assert_eq!(class_penalty(9), 3);
        assert_eq!(class_penalty(42), 0);
    }
}
