//! Framebuffer discovery
//!
//! Reads the current mode of the firmware's display output once and freezes
//! it into the descriptor the kernel receives. There is no shared state: the
//! descriptor is an owned value handed down the call chain.

pub mod psf_font;

use crate::error::{BootError, Result};
use crate::utils::boot_traits::{DisplayMode, GraphicsService};

/// Linear framebuffer description passed to the kernel
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferDescriptor {
    pub base_address: u64,
    pub buffer_size: usize,
    pub horizontal_resolution: u32,
    pub vertical_resolution: u32,
    pub pixels_per_scan_line: u32,
}

impl TryFrom<DisplayMode> for FramebufferDescriptor {
    type Error = BootError;

    /// Fails for geometry the 32-bit descriptor fields cannot carry
    fn try_from(mode: DisplayMode) -> Result<Self> {
        let narrow = |value: usize| u32::try_from(value).map_err(|_| BootError::ProtocolNotFound);

        Ok(Self {
            base_address: mode.frame_buffer_base,
            buffer_size: mode.frame_buffer_size,
            horizontal_resolution: narrow(mode.horizontal_resolution)?,
            vertical_resolution: narrow(mode.vertical_resolution)?,
            pixels_per_scan_line: narrow(mode.pixels_per_scan_line)?,
        })
    }
}

/// Query the display output and describe its framebuffer
///
/// `ProtocolNotFound` means the machine has no usable display; callers treat
/// it as an absent framebuffer rather than a failed boot.
pub fn discover_framebuffer<G>(graphics: &mut G) -> Result<FramebufferDescriptor>
where
    G: GraphicsService + ?Sized,
{
    let mode = graphics.query_display_mode().inspect_err(|err| {
        log::warn!("Unable to locate graphics output protocol: {}", err);
    })?;
    log::info!("Graphics output protocol located successfully");

    let descriptor = FramebufferDescriptor::try_from(mode).inspect_err(|_| {
        log::warn!(
            "Display mode {}x{} stride {} cannot be described",
            mode.horizontal_resolution,
            mode.vertical_resolution,
            mode.pixels_per_scan_line
        );
    })?;
    log::info!(
        "Framebuffer: base {:#x}, size {:#x}, {}x{}, {} pixels per scan line",
        descriptor.base_address,
        descriptor.buffer_size,
        descriptor.horizontal_resolution,
        descriptor.vertical_resolution,
        descriptor.pixels_per_scan_line
    );

    Ok(descriptor)
}
