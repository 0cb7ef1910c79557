//! Per-element min/max with contributing ensemble member ids.

use super::{check_merge_shape, check_sample_len};
use crate::error::AccumulatorError;
use enstat_types::SimulationId;
use serde::{Deserialize, Serialize};

/// Per-element extrema plus the id of the ensemble member that produced
/// each one.
///
/// Comparisons are strict, so on ties the first occurrence keeps the
/// extremum and its id; `merge` preserves the same rule with `self`
/// playing the earlier role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxAccumulator {
    min: Vec<f64>,
    max: Vec<f64>,
    min_source: Vec<SimulationId>,
    max_source: Vec<SimulationId>,
    count: u64,
}

impl MinMaxAccumulator {
    /// Create an empty accumulator for `vect_size` elements.
    pub fn new(vect_size: usize) -> Self {
        Self {
            min: vec![f64::INFINITY; vect_size],
            max: vec![f64::NEG_INFINITY; vect_size],
            min_source: vec![SimulationId(0); vect_size],
            max_source: vec![SimulationId(0); vect_size],
            count: 0,
        }
    }

    /// Vector size fixed at construction.
    pub fn vect_size(&self) -> usize {
        self.min.len()
    }

    /// Number of sample vectors folded so far.
    pub fn sample_count(&self) -> u64 {
        self.count
    }

    /// Fold one sample vector from ensemble member `source`.
    pub fn increment(
        &mut self,
        sample: &[f64],
        source: SimulationId,
    ) -> Result<(), AccumulatorError> {
        check_sample_len(self.min.len(), sample)?;
        self.count += 1;
        for (i, &x) in sample.iter().enumerate() {
            if x < self.min[i] {
                self.min[i] = x;
                self.min_source[i] = source;
            }
            if x > self.max[i] {
                self.max[i] = x;
                self.max_source[i] = source;
            }
        }
        Ok(())
    }

    /// Merge an independently accumulated peer into `self`, taking the
    /// elementwise extremum and propagating the winning side's id.
    pub fn merge(&mut self, other: &Self) -> Result<(), AccumulatorError> {
        check_merge_shape(self.min.len(), other.min.len())?;
        if other.count == 0 {
            return Ok(());
        }
        for i in 0..self.min.len() {
            if other.min[i] < self.min[i] {
                self.min[i] = other.min[i];
                self.min_source[i] = other.min_source[i];
            }
            if other.max[i] > self.max[i] {
                self.max[i] = other.max[i];
                self.max_source[i] = other.max_source[i];
            }
        }
        self.count += other.count;
        Ok(())
    }

    /// Per-element minima.
    pub fn min(&self) -> Result<&[f64], AccumulatorError> {
        self.initialized()?;
        Ok(&self.min)
    }

    /// Per-element maxima.
    pub fn max(&self) -> Result<&[f64], AccumulatorError> {
        self.initialized()?;
        Ok(&self.max)
    }

    /// Ensemble member that produced each minimum.
    pub fn min_source(&self) -> Result<&[SimulationId], AccumulatorError> {
        self.initialized()?;
        Ok(&self.min_source)
    }

    /// Ensemble member that produced each maximum.
    pub fn max_source(&self) -> Result<&[SimulationId], AccumulatorError> {
        self.initialized()?;
        Ok(&self.max_source)
    }

    fn initialized(&self) -> Result<(), AccumulatorError> {
        if self.count == 0 {
            return Err(AccumulatorError::NoSamples);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_occurrence_wins_ties() {
        let mut acc = MinMaxAccumulator::new(1);
        let values = [3.0, 1.0, 4.0, 1.0, 5.0];
        for (i, &x) in values.iter().enumerate() {
            acc.increment(&[x], SimulationId(i as u64)).unwrap();
        }
        assert_eq!(acc.sample_count(), 5);
        assert_eq!(acc.min().unwrap()[0], 1.0);
        assert_eq!(acc.min_source().unwrap()[0], SimulationId(1));
        assert_eq!(acc.max().unwrap()[0], 5.0);
        assert_eq!(acc.max_source().unwrap()[0], SimulationId(4));
    }

    #[test]
    fn test_query_before_fold() {
        let acc = MinMaxAccumulator::new(2);
        assert_eq!(acc.min(), Err(AccumulatorError::NoSamples));
        assert_eq!(acc.max_source(), Err(AccumulatorError::NoSamples));
    }

    #[test]
    fn test_merge_propagates_winning_ids() {
        let mut a = MinMaxAccumulator::new(2);
        a.increment(&[3.0, -1.0], SimulationId(10)).unwrap();
        a.increment(&[2.0, 0.0], SimulationId(11)).unwrap();

        let mut b = MinMaxAccumulator::new(2);
        b.increment(&[1.0, 4.0], SimulationId(20)).unwrap();

        a.merge(&b).unwrap();
        assert_eq!(a.sample_count(), 3);
        assert_eq!(a.min().unwrap(), &[1.0, -1.0]);
        assert_eq!(
            a.min_source().unwrap(),
            &[SimulationId(20), SimulationId(10)]
        );
        assert_eq!(a.max().unwrap(), &[3.0, 4.0]);
        assert_eq!(
            a.max_source().unwrap(),
            &[SimulationId(10), SimulationId(20)]
        );
    }

    #[test]
    fn test_merge_tie_keeps_self() {
        let mut a = MinMaxAccumulator::new(1);
        a.increment(&[2.0], SimulationId(1)).unwrap();
        let mut b = MinMaxAccumulator::new(1);
        b.increment(&[2.0], SimulationId(2)).unwrap();

        a.merge(&b).unwrap();
        assert_eq!(a.min_source().unwrap()[0], SimulationId(1));
        assert_eq!(a.max_source().unwrap()[0], SimulationId(1));
    }

    #[test]
    fn test_merge_into_empty() {
        let mut a = MinMaxAccumulator::new(1);
        let mut b = MinMaxAccumulator::new(1);
        b.increment(&[7.0], SimulationId(3)).unwrap();
        a.merge(&b).unwrap();
        assert_eq!(a.min().unwrap()[0], 7.0);
        assert_eq!(a.min_source().unwrap()[0], SimulationId(3));
    }
}
