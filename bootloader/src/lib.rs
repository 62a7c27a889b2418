//! Aderina Bootloader Library
//!
//! Loads the kernel image from the boot volume, describes the framebuffer
//! and console font, and hands control to the kernel entry point.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

/// Error taxonomy shared by every stage
pub mod error;

/// Fixed paths and boot configuration
pub mod config;

/// Firmware service traits and page arithmetic
pub mod utils;

/// Kernel interface - validation, placement, handoff
pub mod kernel_if;

/// Framebuffer discovery and console font loading
pub mod graphics;

/// Boot stage tracking
pub mod core;

/// CPU primitives
pub mod arch;

/// UEFI-backed firmware services
pub mod uefi;

pub use config::BootConfig;
pub use error::{BootError, Result};
pub use graphics::FramebufferDescriptor;
pub use graphics::psf_font::{GlyphFont, GlyphFontLoader, LoadedFont, PsfHeader};
pub use kernel_if::elf_validator::validate_header;
pub use kernel_if::kernel_handoff::{HandoffCoordinator, KernelHandoff};
pub use kernel_if::segment_placer::{LoadedImage, LoadedSegment, SegmentPlacer};
pub use utils::boot_traits::{
    BootFile, DisplayMode, FileService, Firmware, GraphicsService, PhysicalAllocator,
};

/// Loader version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
