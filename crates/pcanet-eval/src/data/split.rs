use ndarray::{s, Array3, Axis};

use crate::error::EvaluationError;

/// Images `(n, height, width)` and their labels, index-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub images: Array3<f64>,
    pub labels: Vec<usize>,
}

impl Split {
    pub fn new(images: Array3<f64>, labels: Vec<usize>) -> Result<Self, EvaluationError> {
        let n_images = images.len_of(Axis(0));
        if n_images != labels.len() {
            return Err(EvaluationError::SplitMismatch {
                images: n_images,
                labels: labels.len(),
            });
        }
        Ok(Split { images, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Owned copy of the first `n` samples, or of the whole split if it is shorter.
    pub fn head(&self, n: usize) -> Split {
        let n = n.min(self.len());
        Split {
            images: self.images.slice(s![..n, .., ..]).to_owned(),
            labels: self.labels[..n].to_vec(),
        }
    }
}

/// First `n_train` training samples and first `n_test` test samples, in
/// their original order.
pub fn pick(train: &Split, test: &Split, n_train: usize, n_test: usize) -> (Split, Split) {
    (train.head(n_train), test.head(n_test))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Split {
        let images = Array3::from_shape_fn((n, 2, 2), |(i, _, _)| i as f64);
        Split::new(images, (0..n).map(|i| i % 10).collect()).unwrap()
    }

    #[test]
    fn pick_takes_prefixes() {
        let (train, test) = (numbered(50), numbered(30));
        let (a, b) = pick(&train, &test, 20, 5);
        assert_eq!(a.len(), 20);
        assert_eq!(b.len(), 5);
        assert_eq!(a.labels, train.labels[..20].to_vec());
        assert_eq!(a.images[[19, 1, 1]], 19.0);
        assert_eq!(b.images, test.images.slice(s![..5, .., ..]).to_owned());
    }

    #[test]
    fn pick_is_idempotent_and_leaves_sources_alone() {
        let (train, test) = (numbered(12), numbered(12));
        let first = pick(&train, &test, 4, 4);
        let second = pick(&train, &test, 4, 4);
        assert_eq!(first, second);
        assert_eq!(train, numbered(12));
    }

    #[test]
    fn pick_saturates_at_split_length() {
        let (train, test) = (numbered(3), numbered(2));
        let (a, b) = pick(&train, &test, 100, 100);
        assert_eq!(a, train);
        assert_eq!(b, test);
    }

    #[test]
    fn mismatched_split_is_rejected() {
        let err = Split::new(Array3::zeros((3, 2, 2)), vec![1, 2]).unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::SplitMismatch { images: 3, labels: 2 }
        ));
    }
}
