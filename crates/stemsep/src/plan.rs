//! Segment planning over a signal of known length

use crate::config::DriverConfig;
use crate::error::{SepError, SepResult};

/// Segment offsets for one driver invocation.
///
/// Offsets are strictly increasing multiples of the stride; the final offset
/// is kept even when `offset + seg_len` overhangs the signal end. The tail
/// overhang is intentional and handled later by effective-length clamping in
/// the merge.
#[derive(Debug, Clone)]
pub struct SegmentPlan {
    pub stride: usize,
    pub seg_len: usize,
    pub offsets: Vec<usize>,
}

impl SegmentPlan {
    /// Plan segments for a signal of `total_len` samples.
    ///
    /// Fails fast with a config error before any extraction when the stride
    /// would be zero or would exceed the segment length.
    pub fn new(total_len: usize, config: &DriverConfig) -> SepResult<Self> {
        let stride = config.validate()?;
        if total_len == 0 {
            return Err(SepError::InvalidConfig {
                reason: "signal is empty".into(),
            });
        }

        let offsets: Vec<usize> = (0..total_len).step_by(stride).collect();
        debug_assert_eq!(offsets.len(), total_len.div_ceil(stride));

        Ok(Self {
            stride,
            seg_len: config.seg_len,
            offsets,
        })
    }

    /// Number of planned segments
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}
