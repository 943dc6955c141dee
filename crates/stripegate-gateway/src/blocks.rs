//! Stripe-unit arithmetic for one GET request.
//!
//! A [`ReadPlan`] fixes the normalized byte range, the stripe-unit size,
//! and everything derived from them: block counts, the aligned backend
//! start offset, and the leading bytes to discard from the first delivered
//! buffer. Offsets are client-visible byte addresses; only the backend
//! read position is block-aligned.

use crate::range::ByteRange;

/// The read geometry of one request.
#[derive(Debug, Clone, Copy)]
pub struct ReadPlan {
    unit_size: u64,
    content_length: u64,
    first_byte: u64,
    last_byte: u64,
    partial: bool,
}

impl ReadPlan {
    /// Build a plan for an object of `content_length` bytes stored in
    /// `unit_size` stripe units. `range` is the normalized byte range, or
    /// `None` for a full-object read.
    ///
    /// `content_length` must be non-zero; zero-length objects are answered
    /// before any plan is built.
    #[must_use]
    pub fn new(content_length: u64, unit_size: u64, range: Option<ByteRange>) -> Self {
        let (first_byte, last_byte, partial) = match range {
            Some(r) => (r.first, r.last, true),
            None => (0, content_length - 1, false),
        };
        Self {
            unit_size,
            content_length,
            first_byte,
            last_byte,
            partial,
        }
    }

    /// Stripe-unit size in bytes.
    #[must_use]
    pub fn unit_size(&self) -> u64 {
        self.unit_size
    }

    /// First requested byte offset.
    #[must_use]
    pub fn first_byte(&self) -> u64 {
        self.first_byte
    }

    /// Last requested byte offset, inclusive.
    #[must_use]
    pub fn last_byte(&self) -> u64 {
        self.last_byte
    }

    /// Whether this is a ranged read (`206` with `Content-Range`).
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Number of bytes the client will receive.
    #[must_use]
    pub fn requested_len(&self) -> u64 {
        self.last_byte - self.first_byte + 1
    }

    /// Total stripe units the object occupies.
    #[must_use]
    pub fn total_blocks_in_object(&self) -> u64 {
        self.content_length.div_ceil(self.unit_size)
    }

    /// Stripe units covering the requested range.
    #[must_use]
    pub fn total_blocks_to_read(&self) -> u64 {
        let first_block = self.first_byte / self.unit_size;
        let last_block = self.last_byte / self.unit_size;
        last_block - first_block + 1
    }

    /// The backend read start: the first requested byte aligned down to a
    /// unit boundary.
    #[must_use]
    pub fn block_start_offset(&self) -> u64 {
        self.first_byte - (self.first_byte % self.unit_size)
    }

    /// Bytes to discard from the front of the first delivered buffer.
    #[must_use]
    pub fn leading_discard(&self) -> u64 {
        self.first_byte % self.unit_size
    }

    /// The `Content-Range` header value for a partial response.
    #[must_use]
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.first_byte, self.last_byte, self.content_length)
    }
}

/// Decide how many blocks the next backend read should fetch.
///
/// The first read of a request larger than one full-sized read is kept
/// small to shorten time-to-first-byte; after that, reads fetch
/// `max_blocks_per_read` until the remainder fits in one read.
#[must_use]
pub fn blocks_for_next_read(
    blocks_already_read: u64,
    total_blocks_to_read: u64,
    requested_len: u64,
    unit_size: u64,
    max_blocks_per_read: u64,
    first_read_blocks: u64,
) -> u64 {
    let remaining = total_blocks_to_read.saturating_sub(blocks_already_read);
    if remaining == 0 {
        0
    } else if blocks_already_read == 0 && requested_len > max_blocks_per_read.saturating_mul(unit_size) {
        max_blocks_per_read.min(first_read_blocks)
    } else if remaining > max_blocks_per_read {
        max_blocks_per_read
    } else {
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_cover_whole_object_without_range() {
        // 100-byte object in 4 KiB units: one block.
        let plan = ReadPlan::new(100, 4096, None);
        assert!(!plan.is_partial());
        assert_eq!(plan.requested_len(), 100);
        assert_eq!(plan.total_blocks_in_object(), 1);
        assert_eq!(plan.total_blocks_to_read(), 1);
        assert_eq!(plan.block_start_offset(), 0);
        assert_eq!(plan.leading_discard(), 0);
    }

    #[test]
    fn test_should_match_object_block_count_for_full_reads() {
        for (len, unit) in [(1, 4096), (4096, 4096), (4097, 4096), (10_000_000, 1_048_576)] {
            let plan = ReadPlan::new(len, unit, None);
            assert_eq!(
                plan.total_blocks_to_read(),
                plan.total_blocks_in_object(),
                "len={len} unit={unit}"
            );
        }
    }

    #[test]
    fn test_should_plan_small_range_within_first_block() {
        // Bytes 1000-1500 of a 10 MB object in 1 MiB units.
        let plan = ReadPlan::new(10_000_000, 1_048_576, Some(ByteRange { first: 1000, last: 1500 }));
        assert!(plan.is_partial());
        assert_eq!(plan.requested_len(), 501);
        assert_eq!(plan.total_blocks_to_read(), 1);
        assert_eq!(plan.block_start_offset(), 0);
        assert_eq!(plan.leading_discard(), 1000);
        assert_eq!(plan.content_range(), "bytes 1000-1500/10000000");
    }

    #[test]
    fn test_should_plan_suffix_range() {
        // Last 500 bytes of a 2000-byte object.
        let plan = ReadPlan::new(2000, 4096, Some(ByteRange { first: 1500, last: 1999 }));
        assert_eq!(plan.requested_len(), 500);
        assert_eq!(plan.total_blocks_to_read(), 1);
        assert_eq!(plan.content_range(), "bytes 1500-1999/2000");
    }

    #[test]
    fn test_should_align_start_and_discard_for_mid_block_ranges() {
        let plan = ReadPlan::new(100_000, 4096, Some(ByteRange { first: 9000, last: 20_000 }));
        assert_eq!(plan.block_start_offset(), 8192);
        assert_eq!(plan.leading_discard(), 808);
        // Blocks 2 through 4 inclusive.
        assert_eq!(plan.total_blocks_to_read(), 3);
    }

    #[test]
    fn test_should_match_legacy_block_count_formula() {
        // The replaced formula computed ((off + u) / u) on both ends and
        // subtracted; the difference is identical to floor-based indices.
        let cases = [
            (0u64, 0u64, 4096u64),
            (0, 4095, 4096),
            (1000, 1500, 1_048_576),
            (4096, 8191, 4096),
            (9000, 20_000, 4096),
            (1500, 1999, 4096),
        ];
        for (first, last, unit) in cases {
            let legacy = (last + unit) / unit - (first + unit) / unit + 1;
            let plan = ReadPlan::new(last + 1, unit, Some(ByteRange { first, last }));
            assert_eq!(plan.total_blocks_to_read(), legacy, "first={first} last={last} unit={unit}");
        }
    }

    #[test]
    fn test_should_issue_small_first_read_for_large_requests() {
        // 100 blocks requested, 8 per read, 4 on the first.
        let blocks = blocks_for_next_read(0, 100, 100 * 4096, 4096, 8, 4);
        assert_eq!(blocks, 4);
    }

    #[test]
    fn test_should_cap_first_read_at_max_blocks() {
        let blocks = blocks_for_next_read(0, 100, 100 * 4096, 4096, 2, 4);
        assert_eq!(blocks, 2);
    }

    #[test]
    fn test_should_not_shrink_first_read_for_small_requests() {
        // Requested length fits in one full read: read it all at once.
        let blocks = blocks_for_next_read(0, 3, 3 * 4096, 4096, 8, 1);
        assert_eq!(blocks, 3);
    }

    #[test]
    fn test_should_issue_full_reads_in_the_middle() {
        let blocks = blocks_for_next_read(4, 100, 100 * 4096, 4096, 8, 4);
        assert_eq!(blocks, 8);
    }

    #[test]
    fn test_should_issue_exact_remainder_at_the_tail() {
        let blocks = blocks_for_next_read(96, 100, 100 * 4096, 4096, 8, 4);
        assert_eq!(blocks, 4);
    }

    #[test]
    fn test_should_issue_nothing_when_done() {
        let blocks = blocks_for_next_read(100, 100, 100 * 4096, 4096, 8, 4);
        assert_eq!(blocks, 0);
    }
}
