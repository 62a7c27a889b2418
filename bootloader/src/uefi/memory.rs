//! UEFI Memory Management
//!
//! Page and pool allocation for the kernel image and handoff records.
//! Everything is allocated as loader data and never freed.

use core::ptr::NonNull;

use ::uefi::boot::{self, AllocateType, MemoryType};

use crate::error::{BootError, Result};

/// Reserve `pages` pages starting exactly at physical `address`
pub fn allocate_pages_at(address: u64, pages: usize) -> Result<NonNull<u8>> {
    boot::allocate_pages(
        AllocateType::Address(address),
        MemoryType::LOADER_DATA,
        pages,
    )
    .map_err(|err| {
        log::error!(
            "AllocatePages({:#x}, {}) failed: {:?}",
            address,
            pages,
            err.status()
        );
        BootError::AllocationFailure
    })
}

/// Allocate `bytes` of loader data from the firmware pool
///
/// Pool memory is 8-byte aligned, enough for every handoff record.
pub fn allocate_loader_pool(bytes: usize) -> Result<NonNull<u8>> {
    boot::allocate_pool(MemoryType::LOADER_DATA, bytes.max(1)).map_err(|err| {
        log::error!("AllocatePool({}) failed: {:?}", bytes, err.status());
        BootError::AllocationFailure
    })
}
