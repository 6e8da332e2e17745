//! Small shared utilities.

use std::ops::{Bound, Range, RangeBounds};

use bytes::Bytes;

/// A concrete byte-key range usable with any storage backend.
///
/// Scans accept this instead of a generic `RangeBounds` so the storage
/// traits stay object-safe.
#[derive(Debug, Clone)]
pub struct BytesRange {
    start: Bound<Bytes>,
    end: Bound<Bytes>,
}

impl BytesRange {
    pub fn new(start: Bound<Bytes>, end: Bound<Bytes>) -> Self {
        Self { start, end }
    }

    /// A range covering every key.
    pub fn unbounded() -> Self {
        Self {
            start: Bound::Unbounded,
            end: Bound::Unbounded,
        }
    }
}

impl From<Range<Bytes>> for BytesRange {
    fn from(range: Range<Bytes>) -> Self {
        Self {
            start: Bound::Included(range.start),
            end: Bound::Excluded(range.end),
        }
    }
}

impl RangeBounds<Bytes> for BytesRange {
    fn start_bound(&self) -> Bound<&Bytes> {
        self.start.as_ref()
    }

    fn end_bound(&self) -> Bound<&Bytes> {
        self.end.as_ref()
    }
}
