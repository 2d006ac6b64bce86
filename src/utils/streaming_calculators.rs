use tracing::debug;

// Streaming, weighted accumulators. Values arrive one peak at a time and
// only the running state is kept.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingAggregatorError {
    NotEnoughData,
}

type Result<T> = std::result::Result<T, StreamingAggregatorError>;

/// Weighted running mean, updated one value at a time.
///
/// Used to compute intensity-weighted mass errors, so weights are raw
/// intensities and values with a non-positive weight are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningMeanCalculator {
    weight: f64,
    mean_n: f64,
}

impl RunningMeanCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64, weight: f64) {
        if weight.is_nan() || weight <= 0.0 {
            debug!("Ignoring value {} with non-positive weight {}", value, weight);
            return;
        }
        self.weight += weight;
        let delta = value - self.mean_n;
        self.mean_n += delta * (weight / self.weight);
    }

    pub fn total_weight(&self) -> f64 {
        self.weight
    }

    pub fn mean(&self) -> Result<f64> {
        if self.weight == 0.0 {
            return Err(StreamingAggregatorError::NotEnoughData);
        }
        Ok(self.mean_n)
    }
}
