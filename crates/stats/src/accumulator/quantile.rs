//! Stochastic-approximation quantile estimates.
//!
//! One scalar estimate per (level, element), updated by the
//! Robbins-Monro recursion so memory stays O(vect_size) regardless of
//! how many samples stream through. The step size decreases as
//! `gain / n`, which gives asymptotic convergence to the true quantile.
//!
//! Merging two quantile accumulators is a count-weighted average of the
//! estimates. Quantiles are not exactly mergeable without raw samples;
//! this is a deliberate, documented approximation.

use super::{check_merge_shape, check_sample_len};
use crate::error::AccumulatorError;
use serde::{Deserialize, Serialize};

/// Per-element quantile estimates for a fixed set of levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileAccumulator {
    /// Requested levels, each in (0, 1).
    alphas: Vec<f64>,
    /// Estimates, row-major: `estimates[level * vect_size + element]`.
    estimates: Vec<f64>,
    vect_size: usize,
    gain: f64,
    count: u64,
}

impl QuantileAccumulator {
    /// Create an empty accumulator for `vect_size` elements and the
    /// given quantile levels.
    pub fn new(
        vect_size: usize,
        alphas: Vec<f64>,
        gain: f64,
    ) -> Result<Self, AccumulatorError> {
        if alphas.is_empty() {
            return Err(AccumulatorError::NoQuantileLevels);
        }
        for &alpha in &alphas {
            if !(alpha > 0.0 && alpha < 1.0) {
                return Err(AccumulatorError::InvalidQuantileLevel { alpha });
            }
        }
        if !(gain.is_finite() && gain > 0.0) {
            return Err(AccumulatorError::InvalidGain { gain });
        }
        let estimates = vec![0.0; alphas.len() * vect_size];
        Ok(Self {
            alphas,
            estimates,
            vect_size,
            gain,
            count: 0,
        })
    }

    /// Vector size fixed at construction.
    pub fn vect_size(&self) -> usize {
        self.vect_size
    }

    /// The configured quantile levels.
    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    /// Number of sample vectors folded so far.
    pub fn sample_count(&self) -> u64 {
        self.count
    }

    /// Fold one sample vector.
    ///
    /// The first sample initializes every estimate; subsequent samples
    /// apply the Robbins-Monro step `q -= (gain/n) * (1{x <= q} - alpha)`.
    pub fn increment(&mut self, sample: &[f64]) -> Result<(), AccumulatorError> {
        check_sample_len(self.vect_size, sample)?;
        self.count += 1;
        if self.count == 1 {
            for level in 0..self.alphas.len() {
                let row = &mut self.estimates[level * self.vect_size..][..self.vect_size];
                row.copy_from_slice(sample);
            }
            return Ok(());
        }
        let step = self.gain / self.count as f64;
        for (level, &alpha) in self.alphas.iter().enumerate() {
            let row = &mut self.estimates[level * self.vect_size..][..self.vect_size];
            for (q, &x) in row.iter_mut().zip(sample) {
                if x <= *q {
                    *q -= step * (1.0 - alpha);
                } else {
                    *q += step * alpha;
                }
            }
        }
        Ok(())
    }

    /// Merge an independently accumulated peer into `self` as a
    /// count-weighted average of estimates (approximation).
    ///
    /// Both sides must have been configured with the same levels.
    pub fn merge(&mut self, other: &Self) -> Result<(), AccumulatorError> {
        check_merge_shape(self.vect_size, other.vect_size)?;
        if self.alphas != other.alphas {
            return Err(AccumulatorError::QuantileLevelsMismatch);
        }
        if other.count == 0 {
            return Ok(());
        }
        if self.count == 0 {
            self.estimates.copy_from_slice(&other.estimates);
            self.count = other.count;
            return Ok(());
        }
        let n = (self.count + other.count) as f64;
        let w_other = other.count as f64 / n;
        for (q, &q_other) in self.estimates.iter_mut().zip(&other.estimates) {
            *q += (q_other - *q) * w_other;
        }
        self.count += other.count;
        Ok(())
    }

    /// Per-element estimates for the level at `alpha_index` (index into
    /// [`Self::alphas`]).
    pub fn quantile(&self, alpha_index: usize) -> Result<&[f64], AccumulatorError> {
        if self.count == 0 {
            return Err(AccumulatorError::NoSamples);
        }
        if alpha_index >= self.alphas.len() {
            return Err(AccumulatorError::QuantileIndexOutOfRange {
                index: alpha_index,
                count: self.alphas.len(),
            });
        }
        Ok(&self.estimates[alpha_index * self.vect_size..][..self.vect_size])
    }
}
