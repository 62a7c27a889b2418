//! PSF1 bitmap font loading
//!
//! The container is a 4-byte header followed directly by the glyph table:
//!
//! ```text
//! +------+------+------+------------+---------------------------------+
//! | 0x36 | 0x04 | mode | glyph size | glyph size * (256 | 512) bytes  |
//! +------+------+------+------------+---------------------------------+
//! ```
//!
//! Header, glyph table and the record handed to the kernel all live in pool
//! memory owned by the kernel after handoff.

use core::slice;

use crate::error::{BootError, Result};
use crate::utils::boot_traits::{BootFile, FileService, PhysicalAllocator, allocate_record};

pub const PSF1_MAGIC: [u8; 2] = [0x36, 0x04];
pub const PSF1_HEADER_SIZE: usize = 4;

/// Mode value selecting the 512 glyph table
pub const PSF1_MODE_512: u8 = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsfHeader {
    pub magic: [u8; 2],
    pub mode: u8,
    /// Bytes per glyph
    pub glyph_size: u8,
}

impl PsfHeader {
    pub fn parse(bytes: &[u8; PSF1_HEADER_SIZE]) -> Result<Self> {
        if bytes[..2] != PSF1_MAGIC {
            return Err(BootError::FontFormatInvalid);
        }

        Ok(Self {
            magic: PSF1_MAGIC,
            mode: bytes[2],
            glyph_size: bytes[3],
        })
    }

    pub fn glyph_count(&self) -> usize {
        if self.mode == PSF1_MODE_512 { 512 } else { 256 }
    }

    pub fn glyph_buffer_size(&self) -> usize {
        self.glyph_size as usize * self.glyph_count()
    }
}

/// Font argument of the kernel entry point
#[repr(C)]
#[derive(Debug)]
pub struct GlyphFont {
    pub header: *const PsfHeader,
    pub glyph_buffer: *const u8,
}

/// A font resident in pool memory
#[derive(Debug, Clone, Copy)]
pub struct LoadedFont {
    header: &'static PsfHeader,
    glyphs: &'static [u8],
    handoff: &'static GlyphFont,
}

impl LoadedFont {
    pub fn header(&self) -> &PsfHeader {
        self.header
    }

    pub fn glyphs(&self) -> &[u8] {
        self.glyphs
    }

    pub fn glyph_count(&self) -> usize {
        self.header.glyph_count()
    }

    /// Bitmap of glyph `index`, if the table has one
    pub fn glyph(&self, index: usize) -> Option<&[u8]> {
        let size = self.header.glyph_size as usize;
        let start = index.checked_mul(size)?;
        self.glyphs.get(start..start.checked_add(size)?)
    }

    pub fn as_handoff_ptr(&self) -> *const GlyphFont {
        self.handoff
    }
}

/// Loads PSF1 fonts from the boot volume
pub struct GlyphFontLoader<'a, F: FileService + PhysicalAllocator + ?Sized> {
    firmware: &'a mut F,
}

impl<'a, F: FileService + PhysicalAllocator + ?Sized> GlyphFontLoader<'a, F> {
    pub fn new(firmware: &'a mut F) -> Self {
        Self { firmware }
    }

    /// Open `path` and pull its whole glyph table into memory
    ///
    /// A missing file is `FontNotFound`; a bad identifier or a container too
    /// short for its declared table is `FontFormatInvalid`.
    pub fn load(&mut self, path: &str) -> Result<LoadedFont> {
        let mut file = self.firmware.open(path).map_err(|err| {
            log::debug!("Cannot open font {}: {}", path, err);
            BootError::FontNotFound
        })?;

        let mut raw = [0u8; PSF1_HEADER_SIZE];
        file.read_exact(&mut raw)
            .map_err(|_| BootError::FontFormatInvalid)?;
        let header = PsfHeader::parse(&raw)?;

        let table_size = header.glyph_buffer_size();
        if table_size == 0 {
            return Err(BootError::FontFormatInvalid);
        }
        if file.size()? < (PSF1_HEADER_SIZE + table_size) as u64 {
            return Err(BootError::FontFormatInvalid);
        }

        file.seek(PSF1_HEADER_SIZE as u64)?;
        let buffer = self.firmware.allocate_pool(table_size)?;
        // SAFETY: fresh pool block of `table_size` bytes, never freed.
        let glyphs = unsafe { slice::from_raw_parts_mut(buffer.as_ptr(), table_size) };
        file.read_exact(glyphs)
            .map_err(|_| BootError::FontFormatInvalid)?;
        let glyphs: &'static [u8] = glyphs;

        let header: &'static PsfHeader = allocate_record(&mut *self.firmware, header)?;
        let handoff: &'static GlyphFont = allocate_record(
            &mut *self.firmware,
            GlyphFont {
                header,
                glyph_buffer: glyphs.as_ptr(),
            },
        )?;

        Ok(LoadedFont {
            header,
            glyphs,
            handoff,
        })
    }
}
