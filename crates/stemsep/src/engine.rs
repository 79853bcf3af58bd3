//! Inference engine abstraction
//!
//! The driver never touches a model directly: it is handed an
//! [`InferenceEngine`] capability at construction. The bundled backend is
//! tract (pure Rust ONNX); a network-backed engine satisfies the same
//! contract.

use std::path::Path;

use ndarray::{Array3, Array4};
use serde::{Deserialize, Serialize};

use crate::error::{SepError, SepResult};

/// Opaque separation capability: a batch of padded segments in, a batch of
/// per-source outputs out.
pub trait InferenceEngine: Send + Sync {
    /// Input length required to produce exactly `seg_len` samples of valid
    /// output once the model's receptive field has consumed boundary context.
    /// Always `>= seg_len`.
    fn valid_length(&self, seg_len: usize) -> usize;

    /// Number of sources the model emits, in wire order
    fn num_sources(&self) -> usize;

    /// Run one batch.
    ///
    /// Input `(batch, channels, valid_len)`; output
    /// `(batch, sources, channels, out_len)` with `out_len >= seg_len`.
    /// Ordering within the batch must survive the round trip. Any failure is
    /// fatal to the invocation; the core never retries.
    fn run_batch(&self, batch: &Array3<f32>) -> SepResult<Array4<f32>>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
    fn valid_length(&self, seg_len: usize) -> usize {
        (**self).valid_length(seg_len)
    }
    fn num_sources(&self) -> usize {
        (**self).num_sources()
    }
    fn run_batch(&self, batch: &Array3<f32>) -> SepResult<Array4<f32>> {
        (**self).run_batch(batch)
    }
}

/// Convolutional geometry of a Demucs-style encoder/decoder stack.
///
/// Determines how much boundary context the model consumes, and therefore the
/// padded input length needed per segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelGeometry {
    /// Encoder/decoder depth
    pub depth: usize,
    /// Convolution kernel size
    pub kernel_size: usize,
    /// Convolution stride
    pub stride: usize,
    /// Context frames added by the decoder convolutions
    pub context: usize,
    /// Sources the model separates
    pub sources: usize,
}

impl Default for ModelGeometry {
    fn default() -> Self {
        Self {
            depth: 6,
            kernel_size: 8,
            stride: 4,
            context: 3,
            sources: 4,
        }
    }
}

impl ModelGeometry {
    /// Smallest input length `>= length` that flows through the
    /// encoder/decoder stack without truncation.
    ///
    /// Walks the encoder downsampling forward (each layer keeps
    /// `ceil((l - kernel) / stride) + 1` frames plus decoder context), then
    /// unrolls the decoder upsampling.
    pub fn valid_length(&self, length: usize) -> usize {
        let mut l = length;
        for _ in 0..self.depth {
            l = if l > self.kernel_size {
                (l - self.kernel_size).div_ceil(self.stride) + 1
            } else {
                1
            };
            l += self.context.saturating_sub(1);
        }
        for _ in 0..self.depth {
            l = (l - 1) * self.stride + self.kernel_size;
        }
        l
    }
}

type TractPlan = tract_onnx::prelude::SimplePlan<
    tract_onnx::prelude::TypedFact,
    Box<dyn tract_onnx::prelude::TypedOp>,
    tract_onnx::prelude::Graph<
        tract_onnx::prelude::TypedFact,
        Box<dyn tract_onnx::prelude::TypedOp>,
    >,
>;

/// Tract-backed engine running an ONNX Demucs export in-process
pub struct TractEngine {
    plan: TractPlan,
    geometry: ModelGeometry,
}

impl TractEngine {
    /// Load the model and prepare an optimized execution plan
    pub fn new<P: AsRef<Path>>(model_path: P, geometry: ModelGeometry) -> SepResult<Self> {
        use tract_onnx::prelude::*;

        let path = model_path.as_ref();
        if !path.exists() {
            return Err(SepError::ModelNotFound {
                path: path.display().to_string(),
            });
        }

        log::info!("Loading separation model from {}", path.display());

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| SepError::TractError(e.to_string()))?
            .into_optimized()
            .map_err(|e| SepError::TractError(e.to_string()))?
            .into_runnable()
            .map_err(|e| SepError::TractError(e.to_string()))?;

        Ok(Self { plan, geometry })
    }

    pub fn geometry(&self) -> &ModelGeometry {
        &self.geometry
    }
}

impl InferenceEngine for TractEngine {
    fn valid_length(&self, seg_len: usize) -> usize {
        self.geometry.valid_length(seg_len)
    }

    fn num_sources(&self) -> usize {
        self.geometry.sources
    }

    fn run_batch(&self, batch: &Array3<f32>) -> SepResult<Array4<f32>> {
        use tract_onnx::prelude::*;

        let tensor: Tensor = batch.clone().into_dyn().into();
        let outputs = self
            .plan
            .run(tvec![tensor.into()])
            .map_err(|e| SepError::TractError(e.to_string()))?;

        let output = outputs.first().ok_or_else(|| SepError::InferenceFailed {
            reason: "model produced no outputs".into(),
        })?;

        let view = output
            .to_array_view::<f32>()
            .map_err(|e| SepError::TractError(e.to_string()))?;

        if view.ndim() != 4 {
            return Err(SepError::InvalidOutputShape {
                expected: "4D tensor (batch, sources, channels, samples)".into(),
                got: format!("{}D tensor {:?}", view.ndim(), view.shape()),
            });
        }

        view.to_owned()
            .into_dimensionality::<ndarray::Ix4>()
            .map_err(|e| SepError::InferenceFailed {
                reason: format!("shape conversion failed: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_length_single_layer() {
        let geometry = ModelGeometry {
            depth: 1,
            kernel_size: 8,
            stride: 4,
            context: 3,
            sources: 4,
        };
        // forward: ceil(92/4)+1 = 24, +2 = 26; back: 25*4+8 = 108
        assert_eq!(geometry.valid_length(100), 108);
    }

    #[test]
    fn test_valid_length_covers_segment() {
        let geometry = ModelGeometry::default();
        for seg_len in [1, 100, 4096, 441_000] {
            let valid = geometry.valid_length(seg_len);
            assert!(valid >= seg_len, "valid_length({seg_len}) = {valid}");
        }
    }

    #[test]
    fn test_valid_length_monotonic() {
        let geometry = ModelGeometry::default();
        let mut prev = 0;
        for seg_len in (1000..50_000).step_by(1000) {
            let valid = geometry.valid_length(seg_len);
            assert!(valid >= prev);
            prev = valid;
        }
    }

    #[test]
    fn test_missing_model_file() {
        let err = TractEngine::new("/nonexistent/model.onnx", ModelGeometry::default());
        assert!(matches!(err, Err(SepError::ModelNotFound { .. })));
    }
}
