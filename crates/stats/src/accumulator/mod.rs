//! The accumulator family: incremental, pairwise-mergeable statistics.
//!
//! One accumulator covers one (field, time step) over the full vector
//! element range; every variant keeps per-element state of fixed length
//! `vect_size` plus a scalar sample count. Updates are single-pass and
//! numerically stable; merges combine two independently accumulated
//! partitions without raw samples (Chan et al. for mean/variance, Pébay
//! for higher moments).

mod mean;
mod minmax;
mod moments;
mod quantile;
mod threshold;
mod variance;

pub use mean::MeanAccumulator;
pub use minmax::MinMaxAccumulator;
pub use moments::MomentsAccumulator;
pub use quantile::QuantileAccumulator;
pub use threshold::ThresholdAccumulator;
pub use variance::VarianceAccumulator;

use crate::error::AccumulatorError;
use enstat_types::SimulationId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of an accumulator variant, used for queries and
/// merge-compatibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatisticKind {
    Mean,
    Variance,
    Moments,
    MinMax,
    Quantile,
    ThresholdExceedance,
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatisticKind::Mean => write!(f, "mean"),
            StatisticKind::Variance => write!(f, "variance"),
            StatisticKind::Moments => write!(f, "moments"),
            StatisticKind::MinMax => write!(f, "min-max"),
            StatisticKind::Quantile => write!(f, "quantile"),
            StatisticKind::ThresholdExceedance => write!(f, "threshold-exceedance"),
        }
    }
}

/// Configuration for one statistic enabled on a field.
///
/// A spec is instantiated once per retained time step; variant parameters
/// (moment order, quantile levels, threshold) are fixed per field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatisticSpec {
    Mean,
    Variance,
    Moments {
        /// Highest central moment to track, 1..=4.
        max_order: u8,
    },
    MinMax,
    Quantile {
        /// Requested quantile levels, each in (0, 1).
        alphas: Vec<f64>,
        /// Gain constant for the stochastic-approximation step size.
        gain: f64,
    },
    ThresholdExceedance {
        /// Exceedance is counted when a sample element is >= this value.
        threshold: f64,
    },
}

impl StatisticSpec {
    /// The kind this spec instantiates.
    pub fn kind(&self) -> StatisticKind {
        match self {
            StatisticSpec::Mean => StatisticKind::Mean,
            StatisticSpec::Variance => StatisticKind::Variance,
            StatisticSpec::Moments { .. } => StatisticKind::Moments,
            StatisticSpec::MinMax => StatisticKind::MinMax,
            StatisticSpec::Quantile { .. } => StatisticKind::Quantile,
            StatisticSpec::ThresholdExceedance { .. } => StatisticKind::ThresholdExceedance,
        }
    }

    /// Validate variant parameters without instantiating.
    pub fn validate(&self) -> Result<(), AccumulatorError> {
        match self {
            StatisticSpec::Moments { max_order } => {
                if !(1..=4).contains(max_order) {
                    return Err(AccumulatorError::InvalidOrder {
                        max_order: *max_order,
                    });
                }
            }
            StatisticSpec::Quantile { alphas, gain } => {
                if alphas.is_empty() {
                    return Err(AccumulatorError::NoQuantileLevels);
                }
                for &alpha in alphas {
                    if !(alpha > 0.0 && alpha < 1.0) {
                        return Err(AccumulatorError::InvalidQuantileLevel { alpha });
                    }
                }
                if !(gain.is_finite() && *gain > 0.0) {
                    return Err(AccumulatorError::InvalidGain { gain: *gain });
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Instantiate an empty accumulator of this kind for `vect_size`
    /// elements.
    pub fn instantiate(&self, vect_size: usize) -> Result<Accumulator, AccumulatorError> {
        Ok(match self {
            StatisticSpec::Mean => Accumulator::Mean(MeanAccumulator::new(vect_size)),
            StatisticSpec::Variance => {
                Accumulator::Variance(VarianceAccumulator::new(vect_size))
            }
            StatisticSpec::Moments { max_order } => {
                Accumulator::Moments(MomentsAccumulator::new(vect_size, *max_order)?)
            }
            StatisticSpec::MinMax => Accumulator::MinMax(MinMaxAccumulator::new(vect_size)),
            StatisticSpec::Quantile { alphas, gain } => {
                Accumulator::Quantile(QuantileAccumulator::new(vect_size, alphas.clone(), *gain)?)
            }
            StatisticSpec::ThresholdExceedance { threshold } => {
                Accumulator::ThresholdExceedance(ThresholdAccumulator::new(vect_size, *threshold))
            }
        })
    }
}

/// One instantiated accumulator of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Accumulator {
    Mean(MeanAccumulator),
    Variance(VarianceAccumulator),
    Moments(MomentsAccumulator),
    MinMax(MinMaxAccumulator),
    Quantile(QuantileAccumulator),
    ThresholdExceedance(ThresholdAccumulator),
}

impl Accumulator {
    /// The kind of this accumulator.
    pub fn kind(&self) -> StatisticKind {
        match self {
            Accumulator::Mean(_) => StatisticKind::Mean,
            Accumulator::Variance(_) => StatisticKind::Variance,
            Accumulator::Moments(_) => StatisticKind::Moments,
            Accumulator::MinMax(_) => StatisticKind::MinMax,
            Accumulator::Quantile(_) => StatisticKind::Quantile,
            Accumulator::ThresholdExceedance(_) => StatisticKind::ThresholdExceedance,
        }
    }

    /// Vector size fixed at construction.
    pub fn vect_size(&self) -> usize {
        match self {
            Accumulator::Mean(a) => a.vect_size(),
            Accumulator::Variance(a) => a.vect_size(),
            Accumulator::Moments(a) => a.vect_size(),
            Accumulator::MinMax(a) => a.vect_size(),
            Accumulator::Quantile(a) => a.vect_size(),
            Accumulator::ThresholdExceedance(a) => a.vect_size(),
        }
    }

    /// Number of sample vectors folded so far.
    pub fn sample_count(&self) -> u64 {
        match self {
            Accumulator::Mean(a) => a.sample_count(),
            Accumulator::Variance(a) => a.sample_count(),
            Accumulator::Moments(a) => a.sample_count(),
            Accumulator::MinMax(a) => a.sample_count(),
            Accumulator::Quantile(a) => a.sample_count(),
            Accumulator::ThresholdExceedance(a) => a.sample_count(),
        }
    }

    /// Fold one sample vector from `source`.
    ///
    /// Only MinMax records the contributing member id; the other variants
    /// ignore `source`.
    pub fn increment(
        &mut self,
        sample: &[f64],
        source: SimulationId,
    ) -> Result<(), AccumulatorError> {
        match self {
            Accumulator::Mean(a) => a.increment(sample),
            Accumulator::Variance(a) => a.increment(sample),
            Accumulator::Moments(a) => a.increment(sample),
            Accumulator::MinMax(a) => a.increment(sample, source),
            Accumulator::Quantile(a) => a.increment(sample),
            Accumulator::ThresholdExceedance(a) => a.increment(sample),
        }
    }

    /// Merge an independently accumulated peer of the same kind into
    /// `self`.
    pub fn merge(&mut self, other: &Accumulator) -> Result<(), AccumulatorError> {
        match (self, other) {
            (Accumulator::Mean(a), Accumulator::Mean(b)) => a.merge(b),
            (Accumulator::Variance(a), Accumulator::Variance(b)) => a.merge(b),
            (Accumulator::Moments(a), Accumulator::Moments(b)) => a.merge(b),
            (Accumulator::MinMax(a), Accumulator::MinMax(b)) => a.merge(b),
            (Accumulator::Quantile(a), Accumulator::Quantile(b)) => a.merge(b),
            (Accumulator::ThresholdExceedance(a), Accumulator::ThresholdExceedance(b)) => {
                a.merge(b)
            }
            (left, right) => Err(AccumulatorError::KindMismatch {
                left: left.kind(),
                right: right.kind(),
            }),
        }
    }

    /// View as a mean accumulator.
    pub fn as_mean(&self) -> Option<&MeanAccumulator> {
        match self {
            Accumulator::Mean(a) => Some(a),
            _ => None,
        }
    }

    /// View as a variance accumulator.
    pub fn as_variance(&self) -> Option<&VarianceAccumulator> {
        match self {
            Accumulator::Variance(a) => Some(a),
            _ => None,
        }
    }

    /// View as a moments accumulator.
    pub fn as_moments(&self) -> Option<&MomentsAccumulator> {
        match self {
            Accumulator::Moments(a) => Some(a),
            _ => None,
        }
    }

    /// View as a min/max accumulator.
    pub fn as_min_max(&self) -> Option<&MinMaxAccumulator> {
        match self {
            Accumulator::MinMax(a) => Some(a),
            _ => None,
        }
    }

    /// View as a quantile accumulator.
    pub fn as_quantile(&self) -> Option<&QuantileAccumulator> {
        match self {
            Accumulator::Quantile(a) => Some(a),
            _ => None,
        }
    }

    /// View as a threshold-exceedance accumulator.
    pub fn as_threshold(&self) -> Option<&ThresholdAccumulator> {
        match self {
            Accumulator::ThresholdExceedance(a) => Some(a),
            _ => None,
        }
    }
}

/// Check a sample vector against the accumulator's element count.
pub(crate) fn check_sample_len(expected: usize, sample: &[f64]) -> Result<(), AccumulatorError> {
    if sample.len() != expected {
        return Err(AccumulatorError::SampleLengthMismatch {
            expected,
            actual: sample.len(),
        });
    }
    Ok(())
}

/// Check two accumulators' element counts before a merge.
pub(crate) fn check_merge_shape(left: usize, right: usize) -> Result<(), AccumulatorError> {
    if left != right {
        return Err(AccumulatorError::ShapeMismatch { left, right });
    }
    Ok(())
}
