//! ELF64 format support
//!
//! On-disk layouts of the executable header and the program header table,
//! decoded field by field from little-endian bytes so that no alignment or
//! packing assumptions are made about the source buffer.

use bitflags::bitflags;

use crate::error::{BootError, Result};

/// ELF constants
pub mod constants {
    /// ELF magic number
    pub const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

    /// ELF classes
    pub const ELFCLASS32: u8 = 1;
    pub const ELFCLASS64: u8 = 2;

    /// ELF data encodings
    pub const ELFDATA2LSB: u8 = 1; // Little endian
    pub const ELFDATA2MSB: u8 = 2; // Big endian

    /// ELF versions
    pub const EV_CURRENT: u32 = 1;

    /// ELF file types
    pub const ET_EXEC: u16 = 2; // Executable file
    pub const ET_DYN: u16 = 3; // Shared object file

    /// ELF machine types
    pub const EM_386: u16 = 3; // Intel 80386
    pub const EM_X86_64: u16 = 62; // AMD x86-64 architecture
    pub const EM_AARCH64: u16 = 183; // ARM AARCH64
    pub const EM_RISCV: u16 = 243; // RISC-V

    /// Program header types
    pub const PT_LOAD: u32 = 1; // Loadable segment
    pub const PT_NOTE: u32 = 4; // Auxiliary information
    pub const PT_GNU_STACK: u32 = 0x6474e551; // Indicates stack executability

    /// Size of the identification block at the start of the file
    pub const EI_NIDENT: usize = 16;
    pub const EI_CLASS: usize = 4;
    pub const EI_DATA: usize = 5;
    pub const EI_VERSION: usize = 6;

    /// Encoded sizes of the 64-bit structures
    pub const ELF64_HEADER_SIZE: usize = 64;
    pub const ELF64_PHDR_SIZE: usize = 56;
}

use constants::*;

/// Machine identifier the loader accepts, fixed by the architecture it runs on
#[cfg(target_arch = "x86_64")]
pub const TARGET_MACHINE: u16 = EM_X86_64;
#[cfg(target_arch = "aarch64")]
pub const TARGET_MACHINE: u16 = EM_AARCH64;
#[cfg(target_arch = "riscv64")]
pub const TARGET_MACHINE: u16 = EM_RISCV;
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "riscv64")))]
pub const TARGET_MACHINE: u16 = EM_386;

bitflags! {
    /// Program header permission flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SegmentFlags: u32 {
        const EXECUTE = 0x1;
        const WRITE = 0x2;
        const READ = 0x4;
    }
}

/// ELF64 header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    /// Identification block: magic, class, data encoding, ident version, ABI
    pub ident: [u8; EI_NIDENT],
    /// File type
    pub file_type: u16,
    /// Machine architecture
    pub machine: u16,
    /// ELF version
    pub version: u32,
    /// Entry point virtual address
    pub entry_point: u64,
    /// Program header table file offset
    pub program_header_offset: u64,
    /// Section header table file offset
    pub section_header_offset: u64,
    /// Processor-specific flags
    pub flags: u32,
    /// ELF header size
    pub header_size: u16,
    /// Program header entry size
    pub program_header_size: u16,
    /// Program header entry count
    pub program_header_count: u16,
}

impl ImageHeader {
    /// Decode the fixed 64-byte header
    pub fn parse(bytes: &[u8; ELF64_HEADER_SIZE]) -> Self {
        let mut ident = [0u8; EI_NIDENT];
        ident.copy_from_slice(&bytes[..EI_NIDENT]);

        Self {
            ident,
            file_type: read_u16(bytes, 16),
            machine: read_u16(bytes, 18),
            version: read_u32(bytes, 20),
            entry_point: read_u64(bytes, 24),
            program_header_offset: read_u64(bytes, 32),
            section_header_offset: read_u64(bytes, 40),
            flags: read_u32(bytes, 48),
            header_size: read_u16(bytes, 52),
            program_header_size: read_u16(bytes, 54),
            program_header_count: read_u16(bytes, 56),
        }
    }

    pub fn magic(&self) -> &[u8] {
        &self.ident[..4]
    }

    pub fn class(&self) -> u8 {
        self.ident[EI_CLASS]
    }

    pub fn data_encoding(&self) -> u8 {
        self.ident[EI_DATA]
    }

    pub fn ident_version(&self) -> u8 {
        self.ident[EI_VERSION]
    }

    /// Total byte length of the program header table
    pub fn program_header_table_len(&self) -> usize {
        self.program_header_size as usize * self.program_header_count as usize
    }
}

/// ELF64 program header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentDescriptor {
    /// Segment type
    pub segment_type: u32,
    /// Segment flags
    pub flags: SegmentFlags,
    /// File offset
    pub file_offset: u64,
    /// Virtual address
    pub virtual_address: u64,
    /// Physical address
    pub physical_address: u64,
    /// Segment size in file
    pub file_size: u64,
    /// Segment size in memory
    pub mem_size: u64,
    /// Segment alignment
    pub alignment: u64,
}

impl SegmentDescriptor {
    /// Decode one table entry; trailing bytes of larger entries are ignored
    pub fn parse(entry: &[u8]) -> Result<Self> {
        if entry.len() < ELF64_PHDR_SIZE {
            return Err(BootError::FormatInvalid("Program header entry too small"));
        }

        Ok(Self {
            segment_type: read_u32(entry, 0),
            flags: SegmentFlags::from_bits_truncate(read_u32(entry, 4)),
            file_offset: read_u64(entry, 8),
            virtual_address: read_u64(entry, 16),
            physical_address: read_u64(entry, 24),
            file_size: read_u64(entry, 32),
            mem_size: read_u64(entry, 40),
            alignment: read_u64(entry, 48),
        })
    }

    pub fn is_loadable(&self) -> bool {
        self.segment_type == PT_LOAD
    }
}

/// Walk a raw program header table at the stride recorded in the header
pub fn segment_descriptors<'a>(
    header: &ImageHeader,
    table: &'a [u8],
) -> impl Iterator<Item = Result<SegmentDescriptor>> + 'a {
    let stride = header.program_header_size as usize;
    let count = header.program_header_count as usize;

    (0..count).map(move |index| {
        let start = index * stride;
        table
            .get(start..start + stride)
            .ok_or(BootError::FormatInvalid("Program header table truncated"))
            .and_then(SegmentDescriptor::parse)
    })
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(raw)
}
