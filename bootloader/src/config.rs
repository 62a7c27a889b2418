// Boot configuration and fixed loader settings

use log::LevelFilter;

/// Kernel image path, relative to the root of the volume the loader was started from
pub const KERNEL_PATH: &str = "kernel.elf";

/// Bitmap font handed to the kernel for early text output
pub const FONT_PATH: &str = "zap-ext-light16.psf";

/// Firmware page granularity
pub const PAGE_SIZE: usize = 4096;

/// Upper bound on loadable segments tracked per image
pub const MAX_SEGMENTS: usize = 16;

/// Longest path accepted by the firmware file service (UCS-2 code units)
pub const MAX_PATH_LEN: usize = 256;

#[derive(Debug, Clone)]
pub struct BootConfig {
    pub kernel_path: &'static str,
    pub font_path: &'static str,
    pub load_font: bool,
    pub log_level: LevelFilter,
}

impl BootConfig {
    pub fn new() -> Self {
        Self {
            kernel_path: KERNEL_PATH,
            font_path: FONT_PATH,
            load_font: true,
            log_level: if cfg!(feature = "verbose_logging") {
                LevelFilter::Trace
            } else {
                LevelFilter::Info
            },
        }
    }

    pub fn with_kernel_path(mut self, path: &'static str) -> Self {
        self.kernel_path = path;
        self
    }

    pub fn with_font_path(mut self, path: &'static str) -> Self {
        self.font_path = path;
        self
    }

    pub fn without_font(mut self) -> Self {
        self.load_font = false;
        self
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self::new()
    }
}
