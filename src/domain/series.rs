// Series domain model - immutable snapshot of a rolling sample window
use super::sample::PollutantSample;
use serde::{Serialize, Serializer};
use std::sync::Arc;

/// Nominal window: 72 hours of history plus the current hour.
pub const WINDOW_LEN: usize = 73;

/// Cheap to clone; samples are shared so a carried-over reading is the same allocation.
#[derive(Debug, Clone, Default)]
pub struct Series {
    samples: Arc<[Arc<PollutantSample>]>,
}

impl Series {
    pub fn new(samples: Vec<Arc<PollutantSample>>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[Arc<PollutantSample>] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&PollutantSample> {
        self.samples.last().map(|s| s.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &PollutantSample> {
        self.samples.iter().map(|s| s.as_ref())
    }

    #[cfg(test)]
    pub fn is_chronological(&self) -> bool {
        self.samples
            .windows(2)
            .all(|pair| pair[0].timestamp < pair[1].timestamp)
    }

    /// Whether both snapshots hold the very same sample allocations.
    #[cfg(test)]
    pub fn shares_samples_with(&self, other: &Series) -> bool {
        self.len() == other.len()
            && self
                .samples
                .iter()
                .zip(other.samples.iter())
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

impl Serialize for Series {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
