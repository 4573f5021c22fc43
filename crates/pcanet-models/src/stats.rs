use std::collections::BTreeMap;

use crate::error::ModelError;

/// Fraction of predictions equal to the ground truth.
///
/// # Arguments
///
/// * `y_true` - Ground-truth labels.
/// * `y_pred` - Predicted labels, same length and order as `y_true`.
///
/// # Returns
///
/// A value in `[0, 1]`, or an error when the inputs are empty or differ in length.
pub fn accuracy_score(y_true: &[usize], y_pred: &[usize]) -> Result<f64, ModelError> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::LengthMismatch {
            expected: y_true.len(),
            actual: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(ModelError::EmptyInput(
            "cannot score an empty prediction".to_string(),
        ));
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Most common label, the smallest one among equally common labels.
/// `None` for an empty slice.
pub fn most_frequent_label(labels: &[usize]) -> Option<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    let mut best: Option<(usize, usize)> = None;
    for (label, count) in counts {
        match best {
            Some((_, best_count)) if best_count >= count => {}
            _ => best = Some((label, count)),
        }
    }
    best.map(|(label, _)| label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_accuracy_score() {
        let acc = accuracy_score(&[0, 1, 2, 3], &[0, 1, 3, 3]).unwrap();
        assert_relative_eq!(acc, 0.75);
        assert_relative_eq!(accuracy_score(&[4], &[4]).unwrap(), 1.0);
    }

    #[test]
    fn test_accuracy_score_errors() {
        assert!(matches!(
            accuracy_score(&[0, 1], &[0]),
            Err(ModelError::LengthMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            accuracy_score(&[], &[]),
            Err(ModelError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_most_frequent_label() {
        assert_eq!(most_frequent_label(&[3, 1, 3, 2]), Some(3));
        // 1 and 4 both appear twice
        assert_eq!(most_frequent_label(&[4, 1, 4, 1, 7]), Some(1));
        assert_eq!(most_frequent_label(&[]), None);
    }
}
