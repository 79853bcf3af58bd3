//! Overlap-add inference driver
//!
//! Orchestrates the full pipeline: plan segments over the signal, extract
//! padded chunks, batch them through the engine, center-trim each output, and
//! merge with weighted overlap-add. One call, one signal, one result; any
//! engine failure aborts the whole invocation with no partial stems.

use ndarray::{s, Array2, Array3, ArrayView2, Axis};
use rayon::prelude::*;

use crate::batch::split_batches;
use crate::chunk::{center_trim, extract_padded};
use crate::config::DriverConfig;
use crate::engine::InferenceEngine;
use crate::error::{SepError, SepResult};
use crate::merge::MergeBuffers;
use crate::plan::SegmentPlan;
use crate::stems::{SourceCollection, SourceType};
use crate::window::WeightCurve;

/// Counters for one invocation
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverStats {
    /// Segments planned and merged
    pub segments: usize,
    /// Engine calls made
    pub batches: usize,
}

/// Result of one driver invocation: the merged per-source tensor
/// `(sources, channels, total_len)` plus processing counters.
///
/// Sources follow the model's wire order; the tensor carries no embedded
/// labels. Use [`SourceCollection::from_tensor`] to attach tags.
#[derive(Debug)]
pub struct Separation {
    pub tensor: Array3<f32>,
    pub stats: DriverStats,
}

/// Segmented overlap-add driver around an injected inference engine
pub struct InferenceDriver<E> {
    engine: E,
    config: DriverConfig,
}

impl<E: InferenceEngine> InferenceDriver<E> {
    pub fn new(engine: E, config: DriverConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Separate a full-length multichannel signal.
    ///
    /// `mix` has shape `(channels, total_len)` at the model's expected sample
    /// rate. Amplitude normalization (reference mean/std) is the caller's
    /// job, before and after this call.
    pub fn separate(&self, mix: ArrayView2<'_, f32>) -> SepResult<Separation> {
        let (channels, total_len) = mix.dim();
        let seg_len = self.config.seg_len;

        // Config problems surface here, before any extraction.
        let plan = SegmentPlan::new(total_len, &self.config)?;
        let curve = WeightCurve::new(seg_len, self.config.transition_power)?;

        let valid_len = self.engine.valid_length(seg_len);
        if valid_len < seg_len {
            return Err(SepError::InvalidConfig {
                reason: format!(
                    "engine valid length {valid_len} smaller than segment length {seg_len}"
                ),
            });
        }
        let num_sources = self.engine.num_sources();

        log::debug!(
            "separating {total_len} samples x {channels}ch: {} segments of {seg_len} (stride {}, valid {valid_len})",
            plan.len(),
            plan.stride,
        );

        // Extraction of any segment never depends on another, so it runs on a
        // thread pool; the indexed collect keeps offset order.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.extract_threads)
            .build()
            .map_err(|e| SepError::InvalidConfig {
                reason: format!("extraction thread pool: {e}"),
            })?;
        let segments: Vec<Array2<f32>> = pool.install(|| {
            plan.offsets
                .par_iter()
                .map(|&offset| extract_padded(mix, offset, seg_len, valid_len))
                .collect::<SepResult<Vec<_>>>()
        })?;

        let ranges = split_batches(segments.len(), self.config.max_batch);
        let mut merge = MergeBuffers::new(num_sources, channels, total_len);
        let stats = DriverStats {
            segments: segments.len(),
            batches: ranges.len(),
        };

        for range in ranges {
            let batch_len = range.len();
            let mut batch = Array3::<f32>::zeros((batch_len, channels, valid_len));
            for (k, seg) in segments[range.clone()].iter().enumerate() {
                batch.slice_mut(s![k, .., ..]).assign(seg);
            }

            log::debug!("inference batch of {batch_len} segments at offset index {}", range.start);
            let output = self.engine.run_batch(&batch)?;

            let (b, sources, out_channels, _out_len) = output.dim();
            if b != batch_len || sources != num_sources || out_channels != channels {
                return Err(SepError::InvalidOutputShape {
                    expected: format!("({batch_len}, {num_sources}, {channels}, >= {seg_len})"),
                    got: format!("{:?}", output.shape()),
                });
            }

            for (k, &offset) in plan.offsets[range].iter().enumerate() {
                let trimmed = center_trim(output.index_axis(Axis(0), k), seg_len)?;
                merge.accumulate(offset, trimmed, &curve)?;
            }
        }

        let tensor = merge.finalize()?;
        log::debug!("merge complete: {} sources x {channels}ch x {total_len}", num_sources);

        Ok(Separation { tensor, stats })
    }

    /// Separate and attach source tags in the given wire order.
    ///
    /// Fails with a source-count mismatch when the model arity does not match
    /// `order`, instead of silently mislabeling stems.
    pub fn separate_labeled(
        &self,
        mix: ArrayView2<'_, f32>,
        order: &[SourceType],
    ) -> SepResult<SourceCollection> {
        let separation = self.separate(mix)?;
        SourceCollection::from_tensor(separation.tensor, order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array4;

    /// Engine stub that replicates its input across `sources` outputs,
    /// padded by `pad` context samples on each side.
    struct IdentityEngine {
        sources: usize,
        pad: usize,
    }

    impl InferenceEngine for IdentityEngine {
        fn valid_length(&self, seg_len: usize) -> usize {
            seg_len + 2 * self.pad
        }

        fn num_sources(&self) -> usize {
            self.sources
        }

        fn run_batch(&self, batch: &Array3<f32>) -> SepResult<Array4<f32>> {
            let (b, c, l) = batch.dim();
            let mut out = Array4::<f32>::zeros((b, self.sources, c, l));
            for source in 0..self.sources {
                out.slice_mut(s![.., source, .., ..]).assign(batch);
            }
            Ok(out)
        }
    }

    /// Engine stub that must never be reached
    struct PanicEngine;

    impl InferenceEngine for PanicEngine {
        fn valid_length(&self, seg_len: usize) -> usize {
            seg_len
        }
        fn num_sources(&self) -> usize {
            4
        }
        fn run_batch(&self, _batch: &Array3<f32>) -> SepResult<Array4<f32>> {
            panic!("engine must not be called for an invalid config");
        }
    }

    /// Engine stub returning fewer samples than one segment
    struct ShortEngine;

    impl InferenceEngine for ShortEngine {
        fn valid_length(&self, seg_len: usize) -> usize {
            seg_len
        }
        fn num_sources(&self) -> usize {
            2
        }
        fn run_batch(&self, batch: &Array3<f32>) -> SepResult<Array4<f32>> {
            let (b, c, l) = batch.dim();
            Ok(Array4::zeros((b, 2, c, l / 2)))
        }
    }

    fn test_signal(channels: usize, len: usize) -> Array2<f32> {
        // deterministic, non-periodic over the lengths used here
        Array2::from_shape_fn((channels, len), |(c, i)| {
            ((i as f32 * 0.37 + c as f32 * 1.3).sin() + (i as f32 * 0.011).cos()) * 0.4
        })
    }

    fn config(seg_len: usize, overlap: f32, max_batch: Option<usize>) -> DriverConfig {
        DriverConfig {
            seg_len,
            overlap,
            transition_power: 1.0,
            max_batch,
            extract_threads: 2,
        }
    }

    #[test]
    fn test_identity_round_trip() {
        let mix = test_signal(2, 1000);
        let driver = InferenceDriver::new(
            IdentityEngine { sources: 4, pad: 16 },
            config(400, 0.25, None),
        );
        let result = driver.separate(mix.view()).unwrap();

        assert_eq!(result.tensor.dim(), (4, 2, 1000));
        assert_eq!(result.stats.segments, 4);
        assert_eq!(result.stats.batches, 1);
        for source in 0..4 {
            for c in 0..2 {
                for i in 0..1000 {
                    assert_abs_diff_eq!(
                        result.tensor[[source, c, i]],
                        mix[[c, i]],
                        epsilon = 1e-5
                    );
                }
            }
        }
    }

    #[test]
    fn test_batch_invariance() {
        // batching must not change the merge outcome
        let mix = test_signal(2, 2500);
        let single = InferenceDriver::new(
            IdentityEngine { sources: 3, pad: 7 },
            config(600, 0.25, None),
        )
        .separate(mix.view())
        .unwrap();
        let per_segment = InferenceDriver::new(
            IdentityEngine { sources: 3, pad: 7 },
            config(600, 0.25, Some(1)),
        )
        .separate(mix.view())
        .unwrap();

        assert_eq!(per_segment.stats.batches, per_segment.stats.segments);
        for (a, b) in single.tensor.iter().zip(per_segment.tensor.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_degenerate_single_segment() {
        // total <= seg_len: one segment, normalization is a no-op
        let mix = test_signal(2, 300);
        let driver = InferenceDriver::new(
            IdentityEngine { sources: 4, pad: 8 },
            config(400, 0.25, None),
        );
        let result = driver.separate(mix.view()).unwrap();
        assert_eq!(result.stats.segments, 1);
        assert_eq!(result.tensor.dim(), (4, 2, 300));
        for i in 0..300 {
            assert_abs_diff_eq!(result.tensor[[0, 0, i]], mix[[0, i]], epsilon = 1e-5);
        }
    }

    #[test]
    fn test_tail_segment_stays_in_bounds() {
        // offsets [0, 300, 600, 900]; segment at 900 contributes 100 samples
        let mix = test_signal(1, 1000);
        let driver = InferenceDriver::new(
            IdentityEngine { sources: 1, pad: 0 },
            config(400, 0.25, Some(2)),
        );
        let result = driver.separate(mix.view()).unwrap();
        assert_eq!(result.stats.segments, 4);
        assert_eq!(result.stats.batches, 2);
        assert_eq!(result.tensor.dim(), (1, 1, 1000));
        // positions past the last overlap only ever see the tail segment
        for i in 0..1000 {
            assert_abs_diff_eq!(result.tensor[[0, 0, i]], mix[[0, i]], epsilon = 1e-5);
        }
    }

    #[test]
    fn test_invalid_config_fails_before_inference() {
        let mix = test_signal(2, 1000);
        let driver = InferenceDriver::new(PanicEngine, config(400, 1.0, None));
        assert!(matches!(
            driver.separate(mix.view()),
            Err(SepError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_short_output_is_fatal() {
        let mix = test_signal(2, 1000);
        let driver = InferenceDriver::new(ShortEngine, config(400, 0.25, None));
        assert!(matches!(
            driver.separate(mix.view()),
            Err(SepError::OutputTooShort { .. })
        ));
    }

    #[test]
    fn test_odd_context_delta() {
        // odd valid-length delta: one pad sample left, trim drops the extra
        // sample from the right, so the identity still holds
        struct OddPadEngine;
        impl InferenceEngine for OddPadEngine {
            fn valid_length(&self, seg_len: usize) -> usize {
                seg_len + 3
            }
            fn num_sources(&self) -> usize {
                1
            }
            fn run_batch(&self, batch: &Array3<f32>) -> SepResult<Array4<f32>> {
                let (b, c, l) = batch.dim();
                let mut out = Array4::<f32>::zeros((b, 1, c, l));
                out.slice_mut(s![.., 0, .., ..]).assign(batch);
                Ok(out)
            }
        }
        let mix = test_signal(1, 500);
        let driver = InferenceDriver::new(OddPadEngine, config(250, 0.5, None));
        let result = driver.separate(mix.view()).unwrap();
        for i in 0..500 {
            assert_abs_diff_eq!(result.tensor[[0, 0, i]], mix[[0, i]], epsilon = 1e-5);
        }
    }

    #[test]
    fn test_weight_positivity_across_configs() {
        // finalize() errors on any zero-weight position, so success here is
        // the positivity property
        for (total, seg, overlap) in [
            (1000, 400, 0.25),
            (997, 400, 0.0),
            (5000, 512, 0.5),
            (401, 400, 0.75),
        ] {
            let mix = test_signal(1, total);
            let driver = InferenceDriver::new(
                IdentityEngine { sources: 2, pad: 4 },
                config(seg, overlap, Some(3)),
            );
            let result = driver.separate(mix.view()).unwrap();
            assert_eq!(result.tensor.dim(), (2, 1, total));
        }
    }

    #[test]
    fn test_labeled_separation() {
        let mix = test_signal(2, 800);
        let driver = InferenceDriver::new(
            IdentityEngine { sources: 4, pad: 2 },
            config(400, 0.25, None),
        );
        let collection = driver
            .separate_labeled(mix.view(), &SourceType::WIRE_ORDER)
            .unwrap();
        assert_eq!(collection.len(), 4);
        assert!(collection.get(SourceType::Vocals).is_some());
    }

    #[test]
    fn test_labeled_arity_mismatch() {
        let mix = test_signal(2, 800);
        let driver = InferenceDriver::new(
            IdentityEngine { sources: 2, pad: 2 },
            config(400, 0.25, None),
        );
        assert!(matches!(
            driver.separate_labeled(mix.view(), &SourceType::WIRE_ORDER),
            Err(SepError::SourceCountMismatch { got: 2, expected: 4 })
        ));
    }
}
