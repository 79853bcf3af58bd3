//! Padded segment extraction and center trimming

use ndarray::{s, Array2, ArrayView2, ArrayView3};

use crate::error::{SepError, SepResult};

/// Materialize one padded segment as an independent buffer.
///
/// The extraction window covers `[offset - (valid_len - seg_len)/2,
/// offset - (valid_len - seg_len)/2 + valid_len)`. Indices outside
/// `[0, total_len)` are zero-filled, never reflected or edge-repeated; the
/// model was trained against zero padding and that behavior is preserved.
///
/// `valid_len` is the input length the inference engine needs to produce
/// exactly `seg_len` samples of valid output.
pub fn extract_padded(
    signal: ArrayView2<'_, f32>,
    offset: usize,
    seg_len: usize,
    valid_len: usize,
) -> SepResult<Array2<f32>> {
    let (channels, total_len) = signal.dim();
    if offset >= total_len {
        return Err(SepError::OffsetOutOfRange {
            offset,
            total: total_len,
        });
    }
    if valid_len < seg_len {
        return Err(SepError::InvalidConfig {
            reason: format!("valid length {valid_len} smaller than segment length {seg_len}"),
        });
    }

    let pad = (valid_len - seg_len) / 2;
    let start = offset as i64 - pad as i64;
    let end = start + valid_len as i64;

    let src_start = start.max(0) as usize;
    let src_end = (end.min(total_len as i64)).max(0) as usize;

    let mut out = Array2::<f32>::zeros((channels, valid_len));
    if src_start < src_end {
        let dst_start = (src_start as i64 - start) as usize;
        let copy_len = src_end - src_start;
        out.slice_mut(s![.., dst_start..dst_start + copy_len])
            .assign(&signal.slice(s![.., src_start..src_end]));
    }

    Ok(out)
}

/// Trim a per-segment model output to `target` samples along the last axis.
///
/// Equal amounts come off both ends; when the delta is odd the extra sample is
/// removed from the right. Fails when the output is shorter than the target.
pub fn center_trim<'a>(
    out: ArrayView3<'a, f32>,
    target: usize,
) -> SepResult<ArrayView3<'a, f32>> {
    let len = out.shape()[2];
    if len < target {
        return Err(SepError::OutputTooShort {
            got: len,
            need: target,
        });
    }
    let delta = len - target;
    let left = delta / 2;
    Ok(out.slice_move(s![.., .., left..left + target]))
}
