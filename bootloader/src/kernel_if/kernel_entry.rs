/// Kernel Entry
///
/// The one place where the loader turns an address into code and gives up
/// control of the CPU.

use crate::arch;
use crate::graphics::FramebufferDescriptor;
use crate::graphics::psf_font::GlyphFont;

/// Kernel entry point signature
///
/// Both arguments may be null when the resource was not available. A
/// well-behaved kernel never returns.
#[cfg(target_arch = "x86_64")]
pub type KernelEntryFn =
    extern "sysv64" fn(framebuffer: *const FramebufferDescriptor, font: *const GlyphFont);

#[cfg(not(target_arch = "x86_64"))]
pub type KernelEntryFn =
    extern "C" fn(framebuffer: *const FramebufferDescriptor, font: *const GlyphFont);

/// Calling convention name, for diagnostics
pub const KERNEL_ABI: &str = if cfg!(target_arch = "x86_64") { "sysv64" } else { "C" };

/// Jump to the kernel
///
/// # Safety
///
/// `entry_point` must be the address of code loaded from a validated image
/// that follows the [`KernelEntryFn`] contract, and both pointers must be
/// null or point to records that stay valid for the kernel's lifetime.
pub unsafe fn jump_to_kernel(
    entry_point: u64,
    framebuffer: *const FramebufferDescriptor,
    font: *const GlyphFont,
) -> ! {
    log::info!(
        "Jumping to kernel at {:#x} ({} ABI)",
        entry_point,
        KERNEL_ABI
    );

    // SAFETY: upheld by the caller.
    let entry: KernelEntryFn = unsafe { core::mem::transmute(entry_point as usize) };
    entry(framebuffer, font);

    log::error!("Kernel at {:#x} returned to the loader", entry_point);
    arch::halt()
}
