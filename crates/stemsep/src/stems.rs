//! Source tags and labeled outputs
//!
//! The merged tensor carries no embedded labels; the wire format is purely
//! positional. Downstream encoders and cache writers agree on the order by
//! convention: drums, bass, other, vocals. Attaching explicit tags happens
//! here, with an arity check so a change in model output count cannot
//! silently mislabel stems.

use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{SepError, SepResult};

/// Separated source types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    /// Drum kit
    Drums,
    /// Bass instruments
    Bass,
    /// Everything that is not drums, bass, or vocals
    Other,
    /// Vocal content
    Vocals,
}

impl SourceType {
    /// Fixed wire order of the 4-source model output
    pub const WIRE_ORDER: [SourceType; 4] = [
        SourceType::Drums,
        SourceType::Bass,
        SourceType::Other,
        SourceType::Vocals,
    ];

    /// Short name for file naming
    pub fn short_name(&self) -> &'static str {
        match self {
            SourceType::Drums => "drums",
            SourceType::Bass => "bass",
            SourceType::Other => "other",
            SourceType::Vocals => "vocals",
        }
    }

    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceType::Drums => "Drums",
            SourceType::Bass => "Bass",
            SourceType::Other => "Other",
            SourceType::Vocals => "Vocals",
        }
    }
}

/// One labeled source: tag plus its `(channels, samples)` audio
#[derive(Debug, Clone)]
pub struct SourceOutput {
    pub source: SourceType,
    pub audio: Array2<f32>,
}

impl SourceOutput {
    /// Samples per channel
    pub fn len(&self) -> usize {
        self.audio.shape()[1]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Interleave channels for encoders that expect frame-major samples
    pub fn interleaved(&self) -> Vec<f32> {
        let (channels, samples) = self.audio.dim();
        let mut out = Vec::with_capacity(channels * samples);
        for i in 0..samples {
            for c in 0..channels {
                out.push(self.audio[[c, i]]);
            }
        }
        out
    }

    /// Peak absolute level
    pub fn peak(&self) -> f32 {
        self.audio.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    /// RMS level
    pub fn rms(&self) -> f32 {
        if self.audio.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = self.audio.iter().map(|&s| s * s).sum();
        (sum_sq / self.audio.len() as f32).sqrt()
    }
}

/// Labeled stems from one separation call, in wire order
#[derive(Debug, Clone)]
pub struct SourceCollection {
    sources: Vec<SourceOutput>,
}

impl SourceCollection {
    /// Attach tags to a merged `(sources, channels, samples)` tensor.
    ///
    /// Fails when the tensor's source axis does not match `order` exactly.
    pub fn from_tensor(tensor: Array3<f32>, order: &[SourceType]) -> SepResult<Self> {
        let got = tensor.shape()[0];
        if got != order.len() {
            return Err(SepError::SourceCountMismatch {
                got,
                expected: order.len(),
            });
        }

        let sources = order
            .iter()
            .enumerate()
            .map(|(i, &source)| SourceOutput {
                source,
                audio: tensor.index_axis(Axis(0), i).to_owned(),
            })
            .collect();

        Ok(Self { sources })
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// All sources in wire order
    pub fn iter(&self) -> impl Iterator<Item = &SourceOutput> {
        self.sources.iter()
    }

    /// Look up one source by tag
    pub fn get(&self, source: SourceType) -> Option<&SourceOutput> {
        self.sources.iter().find(|s| s.source == source)
    }

    /// Sum of all sources except the excluded ones
    pub fn remix_without(&self, excluded: &[SourceType]) -> Option<Array2<f32>> {
        let mut iter = self.sources.iter().filter(|s| !excluded.contains(&s.source));
        let first = iter.next()?;
        let mut mixed = first.audio.clone();
        for s in iter {
            mixed += &s.audio;
        }
        Some(mixed)
    }

    /// Everything except vocals
    pub fn karaoke(&self) -> Option<Array2<f32>> {
        self.remix_without(&[SourceType::Vocals])
    }

    /// Vocals only
    pub fn acapella(&self) -> Option<Array2<f32>> {
        self.get(SourceType::Vocals).map(|s| s.audio.clone())
    }
}
