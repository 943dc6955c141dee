//! The process-wide layout table.
//!
//! Every object carries a layout id chosen at write time. The table maps
//! that id to the stripe-unit size the backend stores the object in, and to
//! the payload size one backend read is expected to move (used by the
//! backpressure threshold). The table is built once at startup and shared
//! read-only.

/// Per-layout parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Stripe-unit size in bytes. Powers of two in practice.
    pub unit_size: u64,
    /// Expected payload of one backend read for this layout, in bytes.
    pub read_payload_size: u64,
}

/// Read-only mapping from layout id to [`Layout`].
///
/// Layout ids are small dense integers starting at 1.
#[derive(Debug, Clone)]
pub struct LayoutTable {
    layouts: Vec<Layout>,
}

/// Smallest stripe-unit size, for layout id 1.
const BASE_UNIT_SIZE: u64 = 4096;

/// Number of layouts in the default table. Unit sizes double per id, so the
/// default range is 4 KiB through 1 MiB.
const DEFAULT_LAYOUT_COUNT: u32 = 9;

impl LayoutTable {
    /// Build a table from explicit layouts; index 0 corresponds to layout
    /// id 1.
    #[must_use]
    pub fn new(layouts: Vec<Layout>) -> Self {
        Self { layouts }
    }

    /// Look up a layout by id. Returns `None` for id 0 or ids past the end
    /// of the table.
    #[must_use]
    pub fn get(&self, layout_id: u32) -> Option<Layout> {
        let idx = usize::try_from(layout_id.checked_sub(1)?).ok()?;
        self.layouts.get(idx).copied()
    }

    /// Stripe-unit size for a layout id, if the id is known.
    #[must_use]
    pub fn unit_size(&self, layout_id: u32) -> Option<u64> {
        self.get(layout_id).map(|l| l.unit_size)
    }

    /// Expected read payload for a layout id, if the id is known.
    #[must_use]
    pub fn read_payload_size(&self, layout_id: u32) -> Option<u64> {
        self.get(layout_id).map(|l| l.read_payload_size)
    }

    /// The layout id whose unit size best fits an object of `len` bytes:
    /// the smallest unit size that is at least `len`, capped at the largest
    /// layout. Used by dev seeding and tests when storing objects.
    #[must_use]
    pub fn layout_for_object_size(&self, len: u64) -> u32 {
        for (idx, layout) in self.layouts.iter().enumerate() {
            if layout.unit_size >= len {
                return u32::try_from(idx).unwrap_or(0) + 1;
            }
        }
        u32::try_from(self.layouts.len()).unwrap_or(1)
    }
}

impl Default for LayoutTable {
    /// The default table: unit sizes doubling from 4 KiB (id 1) to 1 MiB
    /// (id 9), with `read_payload_size` equal to the unit size.
    fn default() -> Self {
        let layouts = (0..DEFAULT_LAYOUT_COUNT)
            .map(|i| {
                let unit_size = BASE_UNIT_SIZE << i;
                Layout {
                    unit_size,
                    read_payload_size: unit_size,
                }
            })
            .collect();
        Self { layouts }
    }
}
