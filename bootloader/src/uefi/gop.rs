//! Graphics Output Protocol discovery

use ::uefi::Identify;
use ::uefi::boot::{self, OpenProtocolAttributes, OpenProtocolParams};
use ::uefi::proto::console::gop::{GraphicsOutput, PixelFormat};

use crate::error::{BootError, Result};
use crate::utils::boot_traits::DisplayMode;

/// Locate GOP by its GUID and read its current mode
pub fn current_display_mode() -> Result<DisplayMode> {
    log::debug!("Locating graphics output protocol {}", GraphicsOutput::GUID);

    let handle = boot::get_handle_for_protocol::<GraphicsOutput>().map_err(|err| {
        log::debug!("GOP handle lookup failed: {:?}", err.status());
        BootError::ProtocolNotFound
    })?;

    // Non-exclusive: the firmware console keeps drawing to the same device.
    // SAFETY: the protocol is only read while boot services are active.
    let mut gop = unsafe {
        boot::open_protocol::<GraphicsOutput>(
            OpenProtocolParams {
                handle,
                agent: boot::image_handle(),
                controller: None,
            },
            OpenProtocolAttributes::GetProtocol,
        )
    }
    .map_err(|_| BootError::ProtocolNotFound)?;

    let info = gop.current_mode_info();
    if info.pixel_format() == PixelFormat::BltOnly {
        log::warn!("GOP mode has no linear framebuffer");
        return Err(BootError::ProtocolNotFound);
    }

    let (width, height) = info.resolution();
    let stride = info.stride();
    let mut frame_buffer = gop.frame_buffer();

    Ok(DisplayMode {
        frame_buffer_base: frame_buffer.as_mut_ptr() as u64,
        frame_buffer_size: frame_buffer.size(),
        horizontal_resolution: width,
        vertical_resolution: height,
        pixels_per_scan_line: stride,
    })
}
