//! Firmware service traits for dependency injection
//!
//! The loader core only talks to firmware through these interfaces, which
//! keeps it independent of the UEFI bindings and testable on the host.

use core::ptr::NonNull;

use crate::error::Result;

/// An open, seekable file on the boot volume
pub trait BootFile {
    /// Fill `buffer` completely; a short read is an error
    fn read_exact(&mut self, buffer: &mut [u8]) -> Result<()>;
    fn seek(&mut self, offset: u64) -> Result<()>;
    fn size(&mut self) -> Result<u64>;
}

/// Path based access to the volume the loader was started from
pub trait FileService {
    type File: BootFile;

    fn open(&mut self, path: &str) -> Result<Self::File>;
}

/// One-shot physical memory allocation
///
/// Nothing handed out here is ever returned to the firmware; ownership of
/// every block passes to the kernel at handoff.
pub trait PhysicalAllocator {
    /// Reserve `pages` pages starting exactly at `address`
    fn allocate_at(&mut self, address: u64, pages: usize) -> Result<NonNull<u8>>;
    /// Reserve `bytes` bytes of loader data, aligned for any handoff record
    fn allocate_pool(&mut self, bytes: usize) -> Result<NonNull<u8>>;
}

/// Current mode of the active display output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    pub frame_buffer_base: u64,
    pub frame_buffer_size: usize,
    pub horizontal_resolution: usize,
    pub vertical_resolution: usize,
    pub pixels_per_scan_line: usize,
}

/// Display output discovery
#[cfg_attr(test, mockall::automock)]
pub trait GraphicsService {
    /// Locate the display output service and report its current mode,
    /// or `ProtocolNotFound` on headless systems
    fn query_display_mode(&mut self) -> Result<DisplayMode>;
}

/// Everything the handoff sequence needs from the platform
pub trait Firmware: FileService + PhysicalAllocator + GraphicsService {}

impl<T: FileService + PhysicalAllocator + GraphicsService> Firmware for T {}

/// Move `value` into freshly allocated pool memory that is never freed
pub fn allocate_record<A, T>(allocator: &mut A, value: T) -> Result<&'static mut T>
where
    A: PhysicalAllocator + ?Sized,
{
    let ptr = allocator
        .allocate_pool(core::mem::size_of::<T>())?
        .cast::<T>();
    if !ptr.as_ptr().is_aligned() {
        return Err(crate::error::BootError::AllocationFailure);
    }

    // SAFETY: the pool block is large enough and aligned for `T`, and no
    // other reference to it exists.
    unsafe {
        ptr.as_ptr().write(value);
        Ok(&mut *ptr.as_ptr())
    }
}
