//! Kernel image header validation
//!
//! Checks a freshly read header against the single supported profile before
//! any memory is committed: 64-bit, little-endian, executable, built for the
//! machine the loader runs on, current format version.

use super::elf64::constants::*;
use super::elf64::{ImageHeader, TARGET_MACHINE};
use crate::error::{BootError, Result};

/// Validate the identification block and type fields of `header`
pub fn validate_header(header: &ImageHeader) -> Result<()> {
    // Check magic number
    if header.magic() != ELF_MAGIC {
        return Err(BootError::FormatInvalid("Invalid ELF magic"));
    }

    // Check for 64-bit
    if header.class() != ELFCLASS64 {
        return Err(BootError::FormatInvalid("Not 64-bit ELF"));
    }

    // Check for little-endian
    if header.data_encoding() != ELFDATA2LSB {
        return Err(BootError::FormatInvalid("Not little-endian"));
    }

    if header.file_type != ET_EXEC {
        return Err(BootError::FormatInvalid("Not an executable image"));
    }

    if header.machine != TARGET_MACHINE {
        return Err(BootError::FormatInvalid("Image built for another machine"));
    }

    if header.version != EV_CURRENT || u32::from(header.ident_version()) != EV_CURRENT {
        return Err(BootError::FormatInvalid("Invalid ELF version"));
    }

    // The descriptor walk relies on these two
    if header.program_header_count == 0 {
        return Err(BootError::FormatInvalid("Image has no program headers"));
    }
    if (header.program_header_size as usize) < ELF64_PHDR_SIZE {
        return Err(BootError::FormatInvalid("Invalid program header size"));
    }

    Ok(())
}

/// Boolean form of [`validate_header`]
pub fn is_valid(header: &ImageHeader) -> bool {
    validate_header(header).is_ok()
}
