//! Weighted overlap-add accumulation

use ndarray::{Array1, Array3, ArrayView3};

use crate::error::{SepError, SepResult};
use crate::window::WeightCurve;

/// Accumulation state for one driver invocation.
///
/// Owns the output tensor `(sources, channels, total_len)` and a parallel
/// weight-sum vector. All writes go through [`accumulate`](Self::accumulate),
/// which is the one contended step of the pipeline; `finalize` consumes the
/// buffers so no partially merged result can escape.
#[derive(Debug)]
pub struct MergeBuffers {
    out: Array3<f32>,
    weight_sum: Array1<f32>,
    total_len: usize,
}

impl MergeBuffers {
    /// Zero-initialized buffers sized to the full signal
    pub fn new(sources: usize, channels: usize, total_len: usize) -> Self {
        Self {
            out: Array3::zeros((sources, channels, total_len)),
            weight_sum: Array1::zeros(total_len),
            total_len,
        }
    }

    /// Add one trimmed segment output, weighted by the crossfade curve.
    ///
    /// `trimmed` has shape `(sources, channels, seg_len)`. The write is
    /// clamped to `effective = min(seg_len, total_len - offset)` samples, so a
    /// tail segment never writes past the signal end.
    pub fn accumulate(
        &mut self,
        offset: usize,
        trimmed: ArrayView3<'_, f32>,
        curve: &WeightCurve,
    ) -> SepResult<()> {
        let (sources, channels, seg_len) = trimmed.dim();
        if sources != self.out.shape()[0] || channels != self.out.shape()[1] {
            return Err(SepError::InvalidOutputShape {
                expected: format!("({}, {}, _)", self.out.shape()[0], self.out.shape()[1]),
                got: format!("({sources}, {channels}, {seg_len})"),
            });
        }
        if seg_len != curve.len() {
            return Err(SepError::InvalidOutputShape {
                expected: format!("segment of {} samples", curve.len()),
                got: format!("{seg_len} samples"),
            });
        }
        if offset >= self.total_len {
            return Err(SepError::OffsetOutOfRange {
                offset,
                total: self.total_len,
            });
        }

        let effective = seg_len.min(self.total_len - offset);
        let w = curve.as_slice();

        for s in 0..sources {
            for c in 0..channels {
                for i in 0..effective {
                    self.out[[s, c, offset + i]] += trimmed[[s, c, i]] * w[i];
                }
            }
        }
        for (i, &wi) in w.iter().take(effective).enumerate() {
            self.weight_sum[offset + i] += wi;
        }

        Ok(())
    }

    /// Normalize by the accumulated weights and return the merged tensor.
    ///
    /// A zero-weight position means the planner left a gap; that is an
    /// assertion-grade failure, not a recoverable condition.
    pub fn finalize(self) -> SepResult<Array3<f32>> {
        let Self {
            mut out,
            weight_sum,
            total_len,
        } = self;

        for (position, &w) in weight_sum.iter().enumerate() {
            if w <= 0.0 {
                return Err(SepError::ZeroWeight { position });
            }
        }

        for mut channel in out.rows_mut() {
            debug_assert_eq!(channel.len(), total_len);
            for (x, &w) in channel.iter_mut().zip(weight_sum.iter()) {
                *x /= w;
            }
        }

        Ok(out)
    }
}
