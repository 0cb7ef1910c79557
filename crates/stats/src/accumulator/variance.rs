//! Running variance accumulator (Welford / Chan et al.).

use super::mean::MeanAccumulator;
use super::{check_merge_shape, check_sample_len};
use crate::error::AccumulatorError;
use serde::{Deserialize, Serialize};

/// Running mean plus per-element sum of squared deviations.
///
/// Update is Welford's single-pass recurrence; merge adds both partial
/// `m2` sums plus the cross term `n1*n2/(n1+n2) * (mu1 - mu2)^2`
/// (Chan et al. pairwise combination). The server never retains raw
/// samples, so the pairwise rule is the only valid way to combine
/// shard-local partials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceAccumulator {
    pub(crate) mean: MeanAccumulator,
    /// Sum of squared deviations from the running mean, per element.
    pub(crate) m2: Vec<f64>,
}

impl VarianceAccumulator {
    /// Create an empty accumulator for `vect_size` elements.
    pub fn new(vect_size: usize) -> Self {
        Self {
            mean: MeanAccumulator::new(vect_size),
            m2: vec![0.0; vect_size],
        }
    }

    /// Vector size fixed at construction.
    pub fn vect_size(&self) -> usize {
        self.m2.len()
    }

    /// Number of sample vectors folded so far.
    pub fn sample_count(&self) -> u64 {
        self.mean.count
    }

    /// Fold one sample vector.
    pub fn increment(&mut self, sample: &[f64]) -> Result<(), AccumulatorError> {
        check_sample_len(self.m2.len(), sample)?;
        self.mean.count += 1;
        let n = self.mean.count as f64;
        for ((m, m2), &x) in self.mean.mean.iter_mut().zip(&mut self.m2).zip(sample) {
            let delta = x - *m;
            *m += delta / n;
            // delta uses the pre-update mean, the second factor the
            // post-update mean; their product telescopes correctly.
            *m2 += delta * (x - *m);
        }
        Ok(())
    }

    /// Merge an independently accumulated peer into `self`.
    pub fn merge(&mut self, other: &Self) -> Result<(), AccumulatorError> {
        check_merge_shape(self.m2.len(), other.m2.len())?;
        if other.mean.count == 0 {
            return Ok(());
        }
        if self.mean.count == 0 {
            self.mean.mean.copy_from_slice(&other.mean.mean);
            self.mean.count = other.mean.count;
            self.m2.copy_from_slice(&other.m2);
            return Ok(());
        }
        let n1 = self.mean.count as f64;
        let n2 = other.mean.count as f64;
        let n = n1 + n2;
        let cross_weight = n1 * n2 / n;
        for i in 0..self.m2.len() {
            let delta = other.mean.mean[i] - self.mean.mean[i];
            self.m2[i] += other.m2[i] + cross_weight * delta * delta;
            self.mean.mean[i] += delta * n2 / n;
        }
        self.mean.count += other.mean.count;
        Ok(())
    }

    /// Per-element means.
    pub fn mean(&self) -> Result<&[f64], AccumulatorError> {
        self.mean.mean()
    }

    /// Per-element population variance, `m2 / n`.
    pub fn variance(&self) -> Result<Vec<f64>, AccumulatorError> {
        if self.mean.count == 0 {
            return Err(AccumulatorError::NoSamples);
        }
        let n = self.mean.count as f64;
        Ok(self.m2.iter().map(|m2| m2 / n).collect())
    }

    /// Per-element population standard deviation.
    pub fn std_dev(&self) -> Result<Vec<f64>, AccumulatorError> {
        Ok(self.variance()?.into_iter().map(f64::sqrt).collect())
    }
}
