//! Running mean accumulator.

use super::{check_merge_shape, check_sample_len};
use crate::error::AccumulatorError;
use serde::{Deserialize, Serialize};

/// Running arithmetic mean per vector element.
///
/// Update is the standard single-pass recurrence
/// `mean += (x - mean) / n`; merge is the count-weighted pairwise
/// combination (Chan et al.), stable for large counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanAccumulator {
    pub(crate) mean: Vec<f64>,
    pub(crate) count: u64,
}

impl MeanAccumulator {
    /// Create an empty accumulator for `vect_size` elements.
    pub fn new(vect_size: usize) -> Self {
        Self {
            mean: vec![0.0; vect_size],
            count: 0,
        }
    }

    /// Vector size fixed at construction.
    pub fn vect_size(&self) -> usize {
        self.mean.len()
    }

    /// Number of sample vectors folded so far.
    pub fn sample_count(&self) -> u64 {
        self.count
    }

    /// Fold one sample vector.
    pub fn increment(&mut self, sample: &[f64]) -> Result<(), AccumulatorError> {
        check_sample_len(self.mean.len(), sample)?;
        self.count += 1;
        let n = self.count as f64;
        for (m, &x) in self.mean.iter_mut().zip(sample) {
            *m += (x - *m) / n;
        }
        Ok(())
    }

    /// Merge an independently accumulated peer into `self`.
    pub fn merge(&mut self, other: &Self) -> Result<(), AccumulatorError> {
        check_merge_shape(self.mean.len(), other.mean.len())?;
        if other.count == 0 {
            return Ok(());
        }
        if self.count == 0 {
            self.mean.copy_from_slice(&other.mean);
            self.count = other.count;
            return Ok(());
        }
        let n = (self.count + other.count) as f64;
        let w_other = other.count as f64 / n;
        for (m, &m_other) in self.mean.iter_mut().zip(&other.mean) {
            *m += (m_other - *m) * w_other;
        }
        self.count += other.count;
        Ok(())
    }

    /// Per-element means.
    pub fn mean(&self) -> Result<&[f64], AccumulatorError> {
        if self.count == 0 {
            return Err(AccumulatorError::NoSamples);
        }
        Ok(&self.mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_basic() {
        let mut acc = MeanAccumulator::new(2);
        assert_eq!(acc.mean(), Err(AccumulatorError::NoSamples));

        acc.increment(&[1.0, 10.0]).unwrap();
        acc.increment(&[3.0, 20.0]).unwrap();
        assert_eq!(acc.sample_count(), 2);

        let mean = acc.mean().unwrap();
        assert!((mean[0] - 2.0).abs() < 1e-12);
        assert!((mean[1] - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_merge_equals_sequential_fold() {
        let samples: Vec<[f64; 1]> = vec![[2.0], [4.0], [4.0], [4.0], [5.0], [5.0], [7.0], [9.0]];

        let mut whole = MeanAccumulator::new(1);
        for s in &samples {
            whole.increment(s).unwrap();
        }

        // Uneven split, merged in both orders.
        let (left, right) = samples.split_at(3);
        for (a_part, b_part) in [(left, right), (right, left)] {
            let mut a = MeanAccumulator::new(1);
            for s in a_part {
                a.increment(s).unwrap();
            }
            let mut b = MeanAccumulator::new(1);
            for s in b_part {
                b.increment(s).unwrap();
            }
            a.merge(&b).unwrap();
            assert_eq!(a.sample_count(), whole.sample_count());
            assert!((a.mean().unwrap()[0] - whole.mean().unwrap()[0]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_merge_with_empty() {
        let mut a = MeanAccumulator::new(1);
        a.increment(&[5.0]).unwrap();
        let empty = MeanAccumulator::new(1);

        a.merge(&empty).unwrap();
        assert_eq!(a.sample_count(), 1);
        assert_eq!(a.mean().unwrap()[0], 5.0);

        let mut b = MeanAccumulator::new(1);
        b.merge(&a).unwrap();
        assert_eq!(b.sample_count(), 1);
        assert_eq!(b.mean().unwrap()[0], 5.0);
    }

    #[test]
    fn test_merge_shape_mismatch() {
        let mut a = MeanAccumulator::new(2);
        let b = MeanAccumulator::new(3);
        assert_eq!(
            a.merge(&b),
            Err(AccumulatorError::ShapeMismatch { left: 2, right: 3 })
        );
    }
}
