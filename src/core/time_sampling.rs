//! Time sampling types.
//!
//! Every animated property maps its sample indices to times through one
//! entry of the archive-wide time sampling table.

use std::sync::Arc;

use crate::util::{Chrono, Error, Result};

/// `time_per_cycle` value reserved for acyclic sampling.
pub const ACYCLIC_TIME_PER_CYCLE: Chrono = f64::MAX / 32.0;

/// Type of time sampling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimeSamplingType {
    /// One sample per cycle: `start + index * time_per_cycle`.
    Uniform { time_per_cycle: Chrono },

    /// A repeating pattern of `samples_per_cycle` times per period.
    Cyclic {
        time_per_cycle: Chrono,
        samples_per_cycle: usize,
    },

    /// Explicit time for each sample.
    Acyclic,
}

impl TimeSamplingType {
    /// Classify a decoded (time_per_cycle, sample count) pair.
    pub fn from_record(time_per_cycle: Chrono, num_samples: usize) -> Self {
        if time_per_cycle == ACYCLIC_TIME_PER_CYCLE {
            Self::Acyclic
        } else if num_samples == 1 {
            Self::Uniform { time_per_cycle }
        } else {
            Self::Cyclic {
                time_per_cycle,
                samples_per_cycle: num_samples,
            }
        }
    }

    /// Check if this is uniform sampling.
    #[inline]
    pub fn is_uniform(&self) -> bool {
        matches!(self, Self::Uniform { .. })
    }

    /// Check if this is cyclic sampling (uniform counts as cyclic).
    #[inline]
    pub fn is_cyclic(&self) -> bool {
        !self.is_acyclic()
    }

    /// Check if this is acyclic sampling.
    #[inline]
    pub fn is_acyclic(&self) -> bool {
        matches!(self, Self::Acyclic)
    }

    /// Period of one cycle, or the acyclic sentinel.
    pub fn time_per_cycle(&self) -> Chrono {
        match self {
            Self::Uniform { time_per_cycle } => *time_per_cycle,
            Self::Cyclic { time_per_cycle, .. } => *time_per_cycle,
            Self::Acyclic => ACYCLIC_TIME_PER_CYCLE,
        }
    }
}

impl Default for TimeSamplingType {
    fn default() -> Self {
        Self::Uniform { time_per_cycle: 1.0 }
    }
}

/// Time sampling information for a property.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSampling {
    /// The type of sampling.
    pub sampling_type: TimeSamplingType,
    /// Sample times of one full cycle (every sample for acyclic).
    pub times: Vec<Chrono>,
}

impl TimeSampling {
    /// Identity time sampling: one sample per second starting at 0.
    pub fn identity() -> Self {
        Self::uniform(1.0, 0.0)
    }

    /// Create uniform time sampling.
    pub fn uniform(time_per_cycle: Chrono, start_time: Chrono) -> Self {
        Self {
            sampling_type: TimeSamplingType::Uniform { time_per_cycle },
            times: vec![start_time],
        }
    }

    /// Create cyclic time sampling.
    pub fn cyclic(time_per_cycle: Chrono, times: Vec<Chrono>) -> Self {
        Self {
            sampling_type: TimeSamplingType::from_record(time_per_cycle, times.len()),
            times,
        }
    }

    /// Create acyclic time sampling from explicit times.
    pub fn acyclic(times: Vec<Chrono>) -> Self {
        Self {
            sampling_type: TimeSamplingType::Acyclic,
            times,
        }
    }

    /// True unless the sampling is acyclic.
    #[inline]
    pub fn is_cyclic(&self) -> bool {
        self.sampling_type.is_cyclic()
    }

    /// Period of one cycle, or [`ACYCLIC_TIME_PER_CYCLE`].
    #[inline]
    pub fn time_per_cycle(&self) -> Chrono {
        self.sampling_type.time_per_cycle()
    }

    /// Get the time for a specific sample index.
    pub fn sample_time(&self, index: usize) -> Chrono {
        if self.times.is_empty() {
            return 0.0;
        }
        match self.sampling_type {
            TimeSamplingType::Uniform { .. } | TimeSamplingType::Cyclic { .. } => {
                let per_cycle = self.times.len();
                let cycle = index / per_cycle;
                let local_idx = index % per_cycle;
                self.times[local_idx] + (cycle as Chrono) * self.time_per_cycle()
            }
            TimeSamplingType::Acyclic => {
                let last = self.times.len() - 1;
                self.times[index.min(last)]
            }
        }
    }

    /// Find the floor index (largest index with time <= given time).
    pub fn floor_index(&self, time: Chrono, num_samples: usize) -> (usize, Chrono) {
        if num_samples == 0 {
            return (0, 0.0);
        }

        let first = self.sample_time(0);
        if time <= first {
            return (0, first);
        }

        if let TimeSamplingType::Uniform { time_per_cycle } = self.sampling_type {
            let idx = ((time - first) / time_per_cycle).floor() as usize;
            let idx = idx.min(num_samples - 1);
            return (idx, self.sample_time(idx));
        }

        // Binary search for floor
        let mut lo = 0;
        let mut hi = num_samples;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.sample_time(mid) <= time {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let idx = lo.saturating_sub(1);
        (idx, self.sample_time(idx))
    }

    /// Find the ceiling index (smallest index with time >= given time).
    pub fn ceil_index(&self, time: Chrono, num_samples: usize) -> (usize, Chrono) {
        if num_samples == 0 {
            return (0, 0.0);
        }

        let (floor_idx, floor_time) = self.floor_index(time, num_samples);
        if floor_time >= time {
            return (floor_idx, floor_time);
        }

        let ceil_idx = (floor_idx + 1).min(num_samples - 1);
        (ceil_idx, self.sample_time(ceil_idx))
    }

    /// Find the nearest index to the given time.
    pub fn near_index(&self, time: Chrono, num_samples: usize) -> (usize, Chrono) {
        if num_samples == 0 {
            return (0, 0.0);
        }

        let (floor_idx, floor_time) = self.floor_index(time, num_samples);
        if floor_idx >= num_samples - 1 {
            return (floor_idx, floor_time);
        }

        let ceil_idx = floor_idx + 1;
        let ceil_time = self.sample_time(ceil_idx);

        if (time - floor_time).abs() <= (ceil_time - time).abs() {
            (floor_idx, floor_time)
        } else {
            (ceil_idx, ceil_time)
        }
    }
}

impl Default for TimeSampling {
    fn default() -> Self {
        Self::identity()
    }
}

/// Archive-wide time sampling table.
///
/// Built once when an archive is opened and read-only afterwards, so it can
/// be shared across threads and indexed without locking.
#[derive(Clone, Debug, Default)]
pub struct TimeSamplingRegistry {
    samplings: Vec<Arc<TimeSampling>>,
    max_samples: Vec<u32>,
}

impl TimeSamplingRegistry {
    /// Build from decoded samplings and their max sample counts.
    pub fn new(samplings: Vec<TimeSampling>, max_samples: Vec<u32>) -> Self {
        Self {
            samplings: samplings.into_iter().map(Arc::new).collect(),
            max_samples,
        }
    }

    /// Look up a sampling by index.
    pub fn get(&self, index: u32) -> Result<&Arc<TimeSampling>> {
        self.samplings
            .get(index as usize)
            .ok_or(Error::TimeSamplingNotFound {
                index,
                count: self.samplings.len(),
            })
    }

    /// Highest sample count any property recorded against `index`.
    pub fn max_samples(&self, index: u32) -> Option<u32> {
        self.max_samples.get(index as usize).copied()
    }

    /// Number of samplings.
    pub fn len(&self) -> usize {
        self.samplings.len()
    }

    /// True if the registry holds no samplings.
    pub fn is_empty(&self) -> bool {
        self.samplings.is_empty()
    }

    /// Iterate over samplings in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TimeSampling>> {
        self.samplings.iter()
    }
}
