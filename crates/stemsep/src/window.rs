//! Crossfade weight curve for overlap-add merging

use crate::error::{SepError, SepResult};

/// Triangular crossfade curve raised to a transition power.
///
/// For an even segment length `L` the underlying triangle is
/// `[1, 2, ..., L/2, L/2, ..., 2, 1]`, normalized by its peak and raised to
/// `transition_power`. Symmetric, strictly positive, peak at the center.
/// Built once per driver invocation and reused unchanged for every segment.
#[derive(Debug, Clone)]
pub struct WeightCurve {
    weights: Vec<f32>,
}

impl WeightCurve {
    /// Build the curve for a segment length and transition power
    pub fn new(seg_len: usize, transition_power: f32) -> SepResult<Self> {
        if seg_len == 0 || seg_len % 2 != 0 {
            return Err(SepError::InvalidConfig {
                reason: format!("weight curve length must be even and non-zero, got {seg_len}"),
            });
        }
        if transition_power < 1.0 {
            return Err(SepError::InvalidConfig {
                reason: format!("transition power must be >= 1, got {transition_power}"),
            });
        }

        let half = seg_len / 2;
        let peak = half as f32;
        let mut weights = Vec::with_capacity(seg_len);
        for i in 1..=half {
            weights.push(i as f32);
        }
        for i in (1..=half).rev() {
            weights.push(i as f32);
        }
        for w in &mut weights {
            *w = (*w / peak).powf(transition_power);
        }

        Ok(Self { weights })
    }

    /// Segment length the curve was built for
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weight values, one per segment sample
    pub fn as_slice(&self) -> &[f32] {
        &self.weights
    }
}
