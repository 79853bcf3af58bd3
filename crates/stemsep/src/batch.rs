//! Batch scheduling for inference calls

use std::ops::Range;

/// Split `count` ordered segments into consecutive index ranges of at most
/// `max_batch` segments each.
///
/// `None` or `Some(0)` yields a single range holding everything. Segments are
/// never reordered or dropped: offset attribution depends on position.
pub fn split_batches(count: usize, max_batch: Option<usize>) -> Vec<Range<usize>> {
    if count == 0 {
        return Vec::new();
    }
    let size = match max_batch {
        None | Some(0) => count,
        Some(n) => n,
    };

    let mut ranges = Vec::with_capacity(count.div_ceil(size));
    let mut start = 0;
    while start < count {
        let end = (start + size).min(count);
        ranges.push(start..end);
        start = end;
    }
    ranges
}
