//! # stemsep
//!
//! Segmented overlap-add inference driver for music source separation.
//!
//! Takes an arbitrarily long multichannel signal, splits it into fixed-length
//! overlapping analysis windows, runs each window through an injected
//! separation model, and reconstructs full-length per-source signals via
//! weighted overlap-add.
//!
//! ## Pipeline
//!
//! ```text
//! Signal (channels x total_len)
//!     │
//!     ▼
//! ┌─────────┐   ┌───────────┐   ┌──────────┐   ┌───────────────┐
//! │ Segment  │──▶│ Padded    │──▶│ Batched  │──▶│ Center-trim + │
//! │ planning │   │ extraction│   │ inference│   │ overlap-add   │
//! └─────────┘   └───────────┘   └──────────┘   └───────────────┘
//! ```
//!
//! The merge is batch-invariant: grouping segments differently for inference
//! never changes the reconstructed output. Everything around the core —
//! decoding, encoding, transport, caching — is an external collaborator; the
//! driver only sees sample tensors and an [`InferenceEngine`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stemsep::{DriverConfig, InferenceDriver, ModelGeometry, SourceType, TractEngine};
//!
//! let engine = TractEngine::new("models/demucs.onnx", ModelGeometry::default())?;
//! let driver = InferenceDriver::new(engine, DriverConfig::default());
//! let stems = driver.separate_labeled(mix.view(), &SourceType::WIRE_ORDER)?;
//! ```

pub mod batch;
pub mod chunk;
pub mod config;
pub mod driver;
pub mod engine;
pub mod merge;
pub mod normalize;
pub mod plan;
pub mod stems;
pub mod window;

mod error;

pub use config::DriverConfig;
pub use driver::{DriverStats, InferenceDriver, Separation};
pub use engine::{InferenceEngine, ModelGeometry, TractEngine};
pub use error::{SepError, SepResult};
pub use merge::MergeBuffers;
pub use normalize::ReferenceStats;
pub use plan::SegmentPlan;
pub use stems::{SourceCollection, SourceOutput, SourceType};
pub use window::WeightCurve;

/// Constants of the Demucs-style separation models this driver targets
pub mod model_info {
    /// Expected sample rate
    pub const SAMPLE_RATE: u32 = 44_100;

    /// Expected channel count
    pub const AUDIO_CHANNELS: usize = 2;

    /// Sources emitted by the 4-stem model
    pub const NUM_SOURCES: usize = 4;
}
