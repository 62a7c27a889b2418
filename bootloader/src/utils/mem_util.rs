// Page arithmetic helpers for the loader

use crate::config::PAGE_SIZE;

/// Round `address` down to its page boundary
pub const fn align_down(address: u64) -> u64 {
    address & !(PAGE_SIZE as u64 - 1)
}

/// Offset of `address` inside its page
pub const fn page_offset(address: u64) -> u64 {
    address & (PAGE_SIZE as u64 - 1)
}

/// Check if address is page-aligned
pub const fn is_page_aligned(address: u64) -> bool {
    page_offset(address) == 0
}

/// Convert a byte count to the number of pages covering it
pub const fn size_to_pages(size: u64) -> u64 {
    size.div_ceil(PAGE_SIZE as u64)
}
