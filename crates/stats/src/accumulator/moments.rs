//! Central moments up to order 4 (Pébay pairwise updates).
//!
//! State per element is the running mean `m1` plus the centered power
//! sums `theta2..theta4` (`theta_k = sum (x - m1)^k`). Both the
//! single-sample update and the pairwise merge follow Pébay (2008),
//! "Formulas for Robust, One-Pass Parallel Computation of Covariances
//! and Arbitrary-Order Statistical Moments", which generalizes the
//! Chan et al. variance combination to higher orders.
//!
//! Skewness and kurtosis are derived on demand, never stored, so a
//! query before the first fold is a typed error instead of a division
//! by zero.

use super::{check_merge_shape, check_sample_len};
use crate::error::AccumulatorError;
use serde::{Deserialize, Serialize};

/// Running central moments per vector element, up to `max_order` <= 4.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentsAccumulator {
    max_order: u8,
    m1: Vec<f64>,
    /// Centered power sums; `theta[k]` is empty when `k + 2 > max_order`.
    theta2: Vec<f64>,
    theta3: Vec<f64>,
    theta4: Vec<f64>,
    count: u64,
}

impl MomentsAccumulator {
    /// Create an empty accumulator tracking moments 1..=`max_order`.
    pub fn new(vect_size: usize, max_order: u8) -> Result<Self, AccumulatorError> {
        if !(1..=4).contains(&max_order) {
            return Err(AccumulatorError::InvalidOrder { max_order });
        }
        let sized = |order| {
            if max_order >= order {
                vec![0.0; vect_size]
            } else {
                Vec::new()
            }
        };
        Ok(Self {
            max_order,
            m1: vec![0.0; vect_size],
            theta2: sized(2),
            theta3: sized(3),
            theta4: sized(4),
            count: 0,
        })
    }

    /// Vector size fixed at construction.
    pub fn vect_size(&self) -> usize {
        self.m1.len()
    }

    /// Highest tracked moment order.
    pub fn max_order(&self) -> u8 {
        self.max_order
    }

    /// Number of sample vectors folded so far.
    pub fn sample_count(&self) -> u64 {
        self.count
    }

    /// Fold one sample vector (Pébay single-observation update).
    pub fn increment(&mut self, sample: &[f64]) -> Result<(), AccumulatorError> {
        check_sample_len(self.m1.len(), sample)?;
        let n_prev = self.count as f64;
        self.count += 1;
        let n = self.count as f64;
        for (i, &x) in sample.iter().enumerate() {
            let delta = x - self.m1[i];
            let delta_n = delta / n;
            let term1 = delta * delta_n * n_prev;
            // Higher orders first: each update reads the lower-order
            // sums from before this sample.
            if self.max_order >= 4 {
                self.theta4[i] += term1 * delta_n * delta_n * (n * n - 3.0 * n + 3.0)
                    + 6.0 * delta_n * delta_n * self.theta2[i]
                    - 4.0 * delta_n * self.theta3[i];
            }
            if self.max_order >= 3 {
                self.theta3[i] += term1 * delta_n * (n - 2.0) - 3.0 * delta_n * self.theta2[i];
            }
            if self.max_order >= 2 {
                self.theta2[i] += term1;
            }
            self.m1[i] += delta_n;
        }
        Ok(())
    }

    /// Merge an independently accumulated peer into `self`.
    ///
    /// Both sides must track the same `max_order`.
    pub fn merge(&mut self, other: &Self) -> Result<(), AccumulatorError> {
        check_merge_shape(self.m1.len(), other.m1.len())?;
        if self.max_order != other.max_order {
            return Err(AccumulatorError::OrderNotTracked {
                requested: other.max_order,
                max_order: self.max_order,
            });
        }
        if other.count == 0 {
            return Ok(());
        }
        if self.count == 0 {
            self.m1.copy_from_slice(&other.m1);
            self.theta2.copy_from_slice(&other.theta2);
            self.theta3.copy_from_slice(&other.theta3);
            self.theta4.copy_from_slice(&other.theta4);
            self.count = other.count;
            return Ok(());
        }
        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        for i in 0..self.m1.len() {
            let delta = other.m1[i] - self.m1[i];
            let t2a = if self.max_order >= 2 { self.theta2[i] } else { 0.0 };
            let t2b = if self.max_order >= 2 { other.theta2[i] } else { 0.0 };
            let t3a = if self.max_order >= 3 { self.theta3[i] } else { 0.0 };
            let t3b = if self.max_order >= 3 { other.theta3[i] } else { 0.0 };

            if self.max_order >= 4 {
                self.theta4[i] += other.theta4[i]
                    + delta.powi(4) * na * nb * (na * na - na * nb + nb * nb) / (n * n * n)
                    + 6.0 * delta * delta * (na * na * t2b + nb * nb * t2a) / (n * n)
                    + 4.0 * delta * (na * t3b - nb * t3a) / n;
            }
            if self.max_order >= 3 {
                self.theta3[i] += t3b
                    + delta.powi(3) * na * nb * (na - nb) / (n * n)
                    + 3.0 * delta * (na * t2b - nb * t2a) / n;
            }
            if self.max_order >= 2 {
                self.theta2[i] += t2b + delta * delta * na * nb / n;
            }
            self.m1[i] += delta * nb / n;
        }
        self.count += other.count;
        Ok(())
    }

    /// Per-element means.
    pub fn mean(&self) -> Result<&[f64], AccumulatorError> {
        if self.count == 0 {
            return Err(AccumulatorError::NoSamples);
        }
        Ok(&self.m1)
    }

    /// Per-element population variance, `theta2 / n`.
    pub fn variance(&self) -> Result<Vec<f64>, AccumulatorError> {
        self.require_order(2)?;
        let n = self.count as f64;
        Ok(self.theta2.iter().map(|t| t / n).collect())
    }

    /// Per-element population skewness.
    ///
    /// Zero-variance elements report 0.0 (the statistic is undefined
    /// there; the data is constant).
    pub fn skewness(&self) -> Result<Vec<f64>, AccumulatorError> {
        self.require_order(3)?;
        let n = self.count as f64;
        Ok(self
            .theta2
            .iter()
            .zip(&self.theta3)
            .map(|(&t2, &t3)| {
                let var = t2 / n;
                if var > 0.0 {
                    (t3 / n) / var.powf(1.5)
                } else {
                    0.0
                }
            })
            .collect())
    }

    /// Per-element population excess kurtosis.
    ///
    /// Zero-variance elements report 0.0.
    pub fn kurtosis(&self) -> Result<Vec<f64>, AccumulatorError> {
        self.require_order(4)?;
        let n = self.count as f64;
        Ok(self
            .theta2
            .iter()
            .zip(&self.theta4)
            .map(|(&t2, &t4)| {
                let var = t2 / n;
                if var > 0.0 {
                    (t4 / n) / (var * var) - 3.0
                } else {
                    0.0
                }
            })
            .collect())
    }

    fn require_order(&self, order: u8) -> Result<(), AccumulatorError> {
        if self.max_order < order {
            return Err(AccumulatorError::OrderNotTracked {
                requested: order,
                max_order: self.max_order,
            });
        }
        if self.count == 0 {
            return Err(AccumulatorError::NoSamples);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Direct two-pass central moments for reference.
    fn direct_moments(samples: &[f64]) -> (f64, f64, f64, f64) {
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let central =
            |p: i32| samples.iter().map(|x| (x - mean).powi(p)).sum::<f64>() / n;
        (mean, central(2), central(3), central(4))
    }

    fn fold(samples: &[f64]) -> MomentsAccumulator {
        let mut acc = MomentsAccumulator::new(1, 4).unwrap();
        for &x in samples {
            acc.increment(&[x]).unwrap();
        }
        acc
    }

    #[test]
    fn test_moments_match_direct_computation() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let samples: Vec<f64> = (0..500).map(|_| rng.gen_range(-3.0..5.0)).collect();
        let acc = fold(&samples);

        let (mean, m2, m3, m4) = direct_moments(&samples);

        assert!((acc.mean().unwrap()[0] - mean).abs() < 1e-9);
        assert!((acc.variance().unwrap()[0] - m2).abs() < 1e-9);

        let skew = m3 / m2.powf(1.5);
        let kurt = m4 / (m2 * m2) - 3.0;
        assert!((acc.skewness().unwrap()[0] - skew).abs() < 1e-9);
        assert!((acc.kurtosis().unwrap()[0] - kurt).abs() < 1e-9);
    }

    #[test]
    fn test_pairwise_merge_matches_single_fold() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let samples: Vec<f64> = (0..200).map(|_| rng.gen_range(0.0..1.0)).collect();

        let whole = fold(&samples);
        let (left, right) = samples.split_at(73);
        let mut a = fold(left);
        let b = fold(right);
        a.merge(&b).unwrap();

        assert_eq!(a.sample_count(), whole.sample_count());
        assert!((a.mean().unwrap()[0] - whole.mean().unwrap()[0]).abs() < 1e-10);
        assert!((a.variance().unwrap()[0] - whole.variance().unwrap()[0]).abs() < 1e-9);
        assert!((a.skewness().unwrap()[0] - whole.skewness().unwrap()[0]).abs() < 1e-8);
        assert!((a.kurtosis().unwrap()[0] - whole.kurtosis().unwrap()[0]).abs() < 1e-8);
    }

    #[test]
    fn test_query_before_fold_and_order_bounds() {
        let acc = MomentsAccumulator::new(2, 2).unwrap();
        assert_eq!(acc.variance(), Err(AccumulatorError::NoSamples));
        assert_eq!(
            acc.skewness(),
            Err(AccumulatorError::OrderNotTracked {
                requested: 3,
                max_order: 2
            })
        );
        assert_eq!(MomentsAccumulator::new(1, 0).err(),
            Some(AccumulatorError::InvalidOrder { max_order: 0 }));
        assert_eq!(MomentsAccumulator::new(1, 5).err(),
            Some(AccumulatorError::InvalidOrder { max_order: 5 }));
    }

    #[test]
    fn test_constant_data_reports_zero_skew_kurtosis() {
        let mut acc = MomentsAccumulator::new(1, 4).unwrap();
        for _ in 0..10 {
            acc.increment(&[2.5]).unwrap();
        }
        assert!(acc.variance().unwrap()[0].abs() < 1e-12);
        assert_eq!(acc.skewness().unwrap()[0], 0.0);
        assert_eq!(acc.kurtosis().unwrap()[0], 0.0);
    }
}
