/// Bootloader → Kernel Handoff
///
/// Drives the boot from kernel image validation to the final jump. Image
/// problems are fatal and stop the sequence before anything is transferred;
/// display and font discovery only ever degrade to absent resources.

use alloc::vec;
use alloc::vec::Vec;
use core::ptr;

use super::elf64::ImageHeader;
use super::elf64::constants::ELF64_HEADER_SIZE;
use super::elf_validator::validate_header;
use super::kernel_entry::jump_to_kernel;
use super::segment_placer::{LoadedImage, SegmentPlacer};
use crate::arch;
use crate::config::BootConfig;
use crate::core::boot_state::{BootStage, BootState};
use crate::error::{BootError, Result};
use crate::graphics::psf_font::{GlyphFont, GlyphFontLoader, LoadedFont};
use crate::graphics::{FramebufferDescriptor, discover_framebuffer};
use crate::utils::boot_traits::{BootFile, FileService, Firmware, allocate_record};

/// An opened kernel image whose header passed validation
pub struct ValidatedImage<File> {
    file: File,
    header: ImageHeader,
    program_headers: Vec<u8>,
}

impl<File> ValidatedImage<File> {
    pub fn header(&self) -> &ImageHeader {
        &self.header
    }

    pub fn program_headers(&self) -> &[u8] {
        &self.program_headers
    }
}

/// Optional amenities found for the kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct BootResources {
    pub framebuffer: Option<&'static FramebufferDescriptor>,
    pub font: Option<LoadedFont>,
}

/// Everything the kernel entry receives, ready for the jump
#[derive(Debug, Clone, Copy)]
pub struct KernelHandoff {
    entry: u64,
    framebuffer: Option<&'static FramebufferDescriptor>,
    font: Option<LoadedFont>,
}

impl KernelHandoff {
    pub fn entry_address(&self) -> u64 {
        self.entry
    }

    pub fn framebuffer(&self) -> Option<&FramebufferDescriptor> {
        self.framebuffer
    }

    pub fn font(&self) -> Option<&LoadedFont> {
        self.font.as_ref()
    }

    /// The two entry arguments, framebuffer first; absent records are null
    pub fn entry_arguments(&self) -> (*const FramebufferDescriptor, *const GlyphFont) {
        let framebuffer = self.framebuffer.map_or(ptr::null(), ptr::from_ref);
        let font = self
            .font
            .as_ref()
            .map_or(ptr::null(), LoadedFont::as_handoff_ptr);
        (framebuffer, font)
    }

    /// Call the kernel entry point
    ///
    /// # Safety
    ///
    /// The entry address must come from an image loaded by
    /// [`HandoffCoordinator::prepare`].
    pub unsafe fn transfer(self) -> ! {
        let (framebuffer, font) = self.entry_arguments();

        // SAFETY: upheld by the caller; both records live in pool memory.
        unsafe { jump_to_kernel(self.entry, framebuffer, font) }
    }
}

/// Sequences validation, placement, discovery and transfer
pub struct HandoffCoordinator<'f, F: Firmware + ?Sized> {
    firmware: &'f mut F,
    config: BootConfig,
    state: BootState,
}

impl<'f, F: Firmware + ?Sized> HandoffCoordinator<'f, F> {
    pub fn new(firmware: &'f mut F, config: BootConfig) -> Self {
        Self {
            firmware,
            config,
            state: BootState::new(),
        }
    }

    pub fn stage(&self) -> BootStage {
        self.state.stage()
    }

    /// Open the kernel image and check its header and descriptor table
    pub fn validate_image(&mut self) -> Result<ValidatedImage<<F as FileService>::File>> {
        self.require(BootStage::Init)?;

        let path = self.config.kernel_path;
        let mut file = self.firmware.open(path).map_err(|err| {
            log::error!("Failed to load kernel {}: {}", path, err);
            BootError::FileNotFound
        })?;
        log::info!("Kernel file {} located", path);

        let image_size = file.size()?;
        let mut raw = [0u8; ELF64_HEADER_SIZE];
        file.read_exact(&mut raw)
            .map_err(|_| BootError::FormatInvalid("Kernel image too short for a header"))?;
        let header = ImageHeader::parse(&raw);

        validate_header(&header).inspect_err(|err| {
            log::error!("Kernel format is bad: {}", err);
        })?;
        log::info!("Kernel header successfully verified");

        let table_len = header.program_header_table_len();
        let table_end = header
            .program_header_offset
            .checked_add(table_len as u64)
            .ok_or(BootError::FormatInvalid("Program header table out of bounds"))?;
        if table_end > image_size {
            log::error!(
                "Program header table ends at {:#x}, image is {:#x} bytes",
                table_end,
                image_size
            );
            return Err(BootError::FormatInvalid("Program header table out of bounds"));
        }

        let mut program_headers = vec![0u8; table_len];
        file.seek(header.program_header_offset)?;
        file.read_exact(&mut program_headers)?;

        self.state.advance(BootStage::Validated)?;
        Ok(ValidatedImage {
            file,
            header,
            program_headers,
        })
    }

    /// Place every loadable segment and check the entry address against them
    pub fn load_segments(
        &mut self,
        image: &mut ValidatedImage<<F as FileService>::File>,
    ) -> Result<LoadedImage> {
        self.require(BootStage::Validated)?;

        let loaded = SegmentPlacer::new(&mut *self.firmware).place(
            &image.header,
            &image.program_headers,
            &mut image.file,
        )?;
        loaded.verify_entry().inspect_err(|_| {
            log::error!(
                "Entry point {:#x} is not inside loaded code",
                loaded.entry_point
            );
        })?;

        log::info!(
            "Kernel loaded successfully: {} segment(s), entry {:#x}",
            loaded.segments().len(),
            loaded.entry_point
        );
        self.state.advance(BootStage::SegmentsLoaded)?;
        Ok(loaded)
    }

    /// Look for a framebuffer and the console font; neither is required
    pub fn discover_resources(&mut self) -> Result<BootResources> {
        self.require(BootStage::SegmentsLoaded)?;

        let framebuffer = match discover_framebuffer(&mut *self.firmware) {
            Ok(descriptor) => match allocate_record(&mut *self.firmware, descriptor) {
                Ok(record) => {
                    let record: &'static FramebufferDescriptor = record;
                    Some(record)
                }
                Err(err) => {
                    log::warn!("No memory for the framebuffer descriptor: {}", err);
                    None
                }
            },
            Err(_) => None,
        };

        let font = if self.config.load_font {
            match GlyphFontLoader::new(&mut *self.firmware).load(self.config.font_path) {
                Ok(font) => {
                    log::info!(
                        "Font found. character size: {}",
                        font.header().glyph_size
                    );
                    Some(font)
                }
                Err(err) => {
                    log::warn!("Font not found: {}", err);
                    None
                }
            }
        } else {
            None
        };

        self.state.advance(BootStage::ResourcesDiscovered)?;
        Ok(BootResources { framebuffer, font })
    }

    /// Run every stage up to the jump
    ///
    /// Any error leaves the coordinator halted; nothing after it may run.
    pub fn prepare(&mut self) -> Result<KernelHandoff> {
        let result = self.prepare_stages();
        if let Err(err) = &result {
            log::error!("Boot aborted at stage {}: {}", self.state.stage(), err);
            // Already terminal only if prepare ran twice
            let _ = self.state.halt();
        }
        result
    }

    fn prepare_stages(&mut self) -> Result<KernelHandoff> {
        let mut image = self.validate_image()?;
        let loaded = self.load_segments(&mut image)?;
        let resources = self.discover_resources()?;

        Ok(KernelHandoff {
            entry: loaded.entry_point,
            framebuffer: resources.framebuffer,
            font: resources.font,
        })
    }

    /// Prepare and jump, or halt the CPU if the kernel cannot be started
    ///
    /// # Safety
    ///
    /// Transfers control to code read from the boot volume.
    pub unsafe fn boot(&mut self) -> ! {
        let handoff = match self.prepare() {
            Ok(handoff) => handoff,
            Err(_) => arch::halt(),
        };

        if let Err(err) = self.state.advance(BootStage::Transferred) {
            log::error!("Refusing to transfer control: {}", err);
            arch::halt();
        }

        // SAFETY: the handoff was produced by `prepare` on this coordinator.
        unsafe { handoff.transfer() }
    }

    fn require(&self, stage: BootStage) -> Result {
        if self.state.stage() != stage {
            log::error!(
                "Boot stages out of order: expected {}, at {}",
                stage,
                self.state.stage()
            );
            return Err(BootError::InvalidState);
        }
        Ok(())
    }
}
