//! Driver configuration

use serde::{Deserialize, Serialize};

use crate::error::{SepError, SepResult};

/// Configuration for the overlap-add inference driver.
///
/// Nothing here is hardcoded in the core: segment length, overlap, crossfade
/// shape, and batching all come from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Segment length in samples (one inference unit). Must be even.
    pub seg_len: usize,

    /// Overlap between consecutive segments (0.0 inclusive to 1.0 exclusive)
    pub overlap: f32,

    /// Exponent applied to the triangular crossfade curve (>= 1.0).
    /// Higher values concentrate weight at segment centers.
    pub transition_power: f32,

    /// Maximum segments per inference call. `None` or `Some(0)` runs
    /// everything in a single batch.
    pub max_batch: Option<usize>,

    /// Threads for parallel segment extraction
    pub extract_threads: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            // 10 seconds at 44.1 kHz
            seg_len: 441_000,
            overlap: 0.25,
            transition_power: 1.0,
            max_batch: None,
            extract_threads: num_cpus::get(),
        }
    }
}

impl DriverConfig {
    /// Low-memory configuration: shorter segments, one segment per batch
    pub fn low_memory() -> Self {
        Self {
            seg_len: 220_500,
            max_batch: Some(1),
            ..Self::default()
        }
    }

    /// Higher-quality configuration: more overlap, sharper crossfade
    pub fn high_overlap() -> Self {
        Self {
            overlap: 0.5,
            transition_power: 2.0,
            ..Self::default()
        }
    }

    /// Distance between consecutive segment offsets
    pub fn stride(&self) -> usize {
        ((1.0 - self.overlap as f64) * self.seg_len as f64).round() as usize
    }

    /// Validate the configuration and return the stride.
    ///
    /// Runs before any extraction: a stride of zero would loop forever, and a
    /// stride larger than the segment length would leave sample positions with
    /// zero accumulated weight.
    pub fn validate(&self) -> SepResult<usize> {
        if self.seg_len == 0 || self.seg_len % 2 != 0 {
            return Err(SepError::InvalidConfig {
                reason: format!("segment length must be even and non-zero, got {}", self.seg_len),
            });
        }
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(SepError::InvalidConfig {
                reason: format!("overlap must be in [0, 1), got {}", self.overlap),
            });
        }
        if self.transition_power < 1.0 {
            return Err(SepError::InvalidConfig {
                reason: format!("transition power must be >= 1, got {}", self.transition_power),
            });
        }
        let stride = self.stride();
        if stride < 1 {
            return Err(SepError::InvalidConfig {
                reason: format!("stride is zero for overlap {}", self.overlap),
            });
        }
        if stride > self.seg_len {
            return Err(SepError::InvalidConfig {
                reason: format!(
                    "stride {} exceeds segment length {}, merge would leave gaps",
                    stride, self.seg_len
                ),
            });
        }
        Ok(stride)
    }
}
