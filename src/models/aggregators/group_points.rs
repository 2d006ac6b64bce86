use serde::{Deserialize, Serialize};

use crate::traits::aggregator::Aggregator;

/// Values one spectrum contributed to a group, one entry per transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromatogramPoint {
    pub retention_time: f64,
    pub scan_index: usize,
    pub values: Vec<f32>,
    pub mass_errors: Option<Vec<f32>>,
}

/// Append-only point series for one chromatogram group.
#[derive(Debug, Clone)]
pub struct GroupPointsAggregator {
    group_index: usize,
    num_transitions: usize,
    points: Vec<ChromatogramPoint>,
}

impl GroupPointsAggregator {
    pub fn new(group_index: usize, num_transitions: usize) -> Self {
        Self {
            group_index,
            num_transitions,
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Aggregator for GroupPointsAggregator {
    type Item = ChromatogramPoint;
    type Output = ChromatogramGroupPoints;

    fn add(&mut self, item: impl Into<Self::Item>) {
        let item = item.into();
        debug_assert_eq!(item.values.len(), self.num_transitions);
        self.points.push(item);
    }

    fn finalize(self) -> ChromatogramGroupPoints {
        ChromatogramGroupPoints {
            group_index: self.group_index,
            num_transitions: self.num_transitions,
            points: self.points,
        }
    }
}

/// Finalized point series of a group, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromatogramGroupPoints {
    pub group_index: usize,
    pub num_transitions: usize,
    pub points: Vec<ChromatogramPoint>,
}

impl ChromatogramGroupPoints {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn retention_times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.retention_time).collect()
    }

    pub fn scan_indices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.scan_index as f64).collect()
    }

    /// Trace of a single transition.
    pub fn intensities(&self, transition: usize) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.values.get(transition).copied().unwrap_or(0.0) as f64)
            .collect()
    }

    /// Mass errors of a single transition, if they were recorded.
    pub fn mass_errors(&self, transition: usize) -> Option<Vec<f32>> {
        self.points
            .iter()
            .map(|p| {
                p.mass_errors
                    .as_ref()
                    .map(|errs| errs.get(transition).copied().unwrap_or(0.0))
            })
            .collect()
    }
}
