//! Threshold exceedance counters.

use super::{check_merge_shape, check_sample_len};
use crate::error::AccumulatorError;
use serde::{Deserialize, Serialize};

/// Per-element count of samples at or above a fixed threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdAccumulator {
    threshold: f64,
    exceedances: Vec<u64>,
    count: u64,
}

impl ThresholdAccumulator {
    /// Create an empty accumulator for `vect_size` elements.
    pub fn new(vect_size: usize, threshold: f64) -> Self {
        Self {
            threshold,
            exceedances: vec![0; vect_size],
            count: 0,
        }
    }

    /// Vector size fixed at construction.
    pub fn vect_size(&self) -> usize {
        self.exceedances.len()
    }

    /// The comparison value.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Number of sample vectors folded so far.
    pub fn sample_count(&self) -> u64 {
        self.count
    }

    /// Fold one sample vector; elements `>= threshold` count as
    /// exceedances.
    pub fn increment(&mut self, sample: &[f64]) -> Result<(), AccumulatorError> {
        check_sample_len(self.exceedances.len(), sample)?;
        self.count += 1;
        for (c, &x) in self.exceedances.iter_mut().zip(sample) {
            if x >= self.threshold {
                *c += 1;
            }
        }
        Ok(())
    }

    /// Merge an independently accumulated peer into `self` by summing
    /// counters elementwise.
    ///
    /// Both sides must use the same threshold.
    pub fn merge(&mut self, other: &Self) -> Result<(), AccumulatorError> {
        check_merge_shape(self.exceedances.len(), other.exceedances.len())?;
        if self.threshold != other.threshold {
            return Err(AccumulatorError::ThresholdMismatch {
                left: self.threshold,
                right: other.threshold,
            });
        }
        for (c, &c_other) in self.exceedances.iter_mut().zip(&other.exceedances) {
            *c += c_other;
        }
        self.count += other.count;
        Ok(())
    }

    /// Per-element exceedance counts.
    pub fn exceedances(&self) -> Result<&[u64], AccumulatorError> {
        if self.count == 0 {
            return Err(AccumulatorError::NoSamples);
        }
        Ok(&self.exceedances)
    }
}
