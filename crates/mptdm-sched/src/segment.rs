//! Segments of the connection-level byte stream.

use crate::path::PathIndex;

/// Set of paths a segment has been queued on, one bit per path index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathMask(u32);

impl PathMask {
    pub fn contains(self, index: PathIndex) -> bool {
        self.0 & index.flag() != 0
    }

    pub fn insert(&mut self, index: PathIndex) {
        self.0 |= index.flag();
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

/// A pending chunk of the byte stream.
///
/// Segments belong to the host's send buffer. The scheduler inspects them and
/// may clear `path_mask`, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Data sequence number of the first byte.
    pub seq: u32,

    /// Payload length in bytes.
    pub len: u32,

    /// Carries the connection-level FIN.
    pub data_fin: bool,

    /// Paths this segment was already sent or queued on.
    pub path_mask: PathMask,
}

impl Segment {
    pub fn new(seq: u32, len: u32) -> Self {
        Self {
            seq,
            len,
            data_fin: false,
            path_mask: PathMask::default(),
        }
    }

    /// Mark this segment as carrying the data-fin.
    pub fn with_data_fin(mut self) -> Self {
        self.data_fin = true;
        self
    }

    /// Record that the segment has been queued on `index`.
    pub fn mark_sent_on(&mut self, index: PathIndex) {
        self.path_mask.insert(index);
    }

    /// Sequence number following this segment.
    pub fn end_seq(&self) -> u32 {
        self.seq.wrapping_add(self.len)
    }
}
