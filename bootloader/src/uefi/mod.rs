//! UEFI implementation of the firmware services
//!
//! Boot services must still be active; every call goes straight to the
//! firmware and blocks until it returns.

pub mod file;
pub mod gop;
pub mod memory;

use core::ptr::NonNull;

use crate::error::Result;
use crate::utils::boot_traits::{DisplayMode, FileService, GraphicsService, PhysicalAllocator};

pub use file::UefiFile;

/// Firmware services of the running UEFI application
#[derive(Debug)]
pub struct UefiFirmware {
    _private: (),
}

impl UefiFirmware {
    /// # Safety
    ///
    /// Only valid inside a UEFI application before boot services are exited.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl FileService for UefiFirmware {
    type File = UefiFile;

    fn open(&mut self, path: &str) -> Result<UefiFile> {
        file::open_on_boot_volume(path)
    }
}

impl PhysicalAllocator for UefiFirmware {
    fn allocate_at(&mut self, address: u64, pages: usize) -> Result<NonNull<u8>> {
        memory::allocate_pages_at(address, pages)
    }

    fn allocate_pool(&mut self, bytes: usize) -> Result<NonNull<u8>> {
        memory::allocate_loader_pool(bytes)
    }
}

impl GraphicsService for UefiFirmware {
    fn query_display_mode(&mut self) -> Result<DisplayMode> {
        gop::current_display_mode()
    }
}
