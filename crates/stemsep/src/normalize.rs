//! Caller-side amplitude normalization
//!
//! The driver operates on a normalized mix and its output must be rescaled
//! afterwards; both steps belong to the caller, not the core. The reference
//! is the channel-averaged mono signal: the mix is shifted and scaled by that
//! reference's mean and standard deviation before inference, and the stems
//! are mapped back with the same statistics.

use ndarray::{Array3, ArrayView2, ArrayViewMut2};
use serde::{Deserialize, Serialize};

/// Mean and standard deviation of the mono reference signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReferenceStats {
    pub mean: f32,
    pub std: f32,
}

impl ReferenceStats {
    /// Measure the channel-averaged reference of a `(channels, samples)` mix.
    ///
    /// Uses the unbiased (n-1) standard deviation estimator. A near-silent
    /// signal gets a unit scale so normalization stays a no-op instead of
    /// amplifying noise.
    pub fn measure(mix: ArrayView2<'_, f32>) -> Self {
        let (channels, samples) = mix.dim();
        if samples == 0 || channels == 0 {
            return Self { mean: 0.0, std: 1.0 };
        }

        let mut reference = vec![0.0f64; samples];
        for c in 0..channels {
            for (i, r) in reference.iter_mut().enumerate() {
                *r += mix[[c, i]] as f64;
            }
        }
        for r in &mut reference {
            *r /= channels as f64;
        }

        let mean = reference.iter().sum::<f64>() / samples as f64;
        let std = if samples > 1 {
            let var = reference
                .iter()
                .map(|&r| (r - mean) * (r - mean))
                .sum::<f64>()
                / (samples - 1) as f64;
            var.sqrt()
        } else {
            0.0
        };

        let std = if std < 1e-8 { 1.0 } else { std };
        Self {
            mean: mean as f32,
            std: std as f32,
        }
    }

    /// Normalize the mix in place: `(x - mean) / std`
    pub fn apply(&self, mut mix: ArrayViewMut2<'_, f32>) {
        mix.mapv_inplace(|x| (x - self.mean) / self.std);
    }

    /// Rescale separated stems in place: `x * std + mean`
    pub fn unapply(&self, tensor: &mut Array3<f32>) {
        let (mean, std) = (self.mean, self.std);
        tensor.mapv_inplace(|x| x * std + mean);
    }
}
