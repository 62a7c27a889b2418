// Shared test fixtures: an in-memory firmware and image builders

#![allow(dead_code)]

use std::collections::HashMap;
use std::ptr::NonNull;

use aderina_bootloader::kernel_if::elf64::TARGET_MACHINE;
use aderina_bootloader::{
    BootError, BootFile, DisplayMode, FileService, GraphicsService, PhysicalAllocator, Result,
};

pub const PAGE: usize = 4096;

/// Physical window backed by the fake firmware
pub const ARENA_BASE: u64 = 0x10_0000;
pub const ARENA_SIZE: usize = 0x40_0000;

/// Fill pattern of never-written arena memory
pub const POISON: u8 = 0xAA;

pub const PF_X: u32 = 0x1;
pub const PF_W: u32 = 0x2;
pub const PF_R: u32 = 0x4;

pub const PT_LOAD: u32 = 1;
pub const PT_NOTE: u32 = 4;

/// x86 `hlt` followed by a jump back to it
pub const HALT_LOOP: [u8; 3] = [0xF4, 0xEB, 0xFD];

pub struct FakeFile {
    data: Vec<u8>,
    position: usize,
}

impl BootFile for FakeFile {
    fn read_exact(&mut self, buffer: &mut [u8]) -> Result<()> {
        let end = self
            .position
            .checked_add(buffer.len())
            .filter(|end| *end <= self.data.len())
            .ok_or(BootError::ReadFailed)?;
        buffer.copy_from_slice(&self.data[self.position..end]);
        self.position = end;
        Ok(())
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        self.position = usize::try_from(offset).map_err(|_| BootError::ReadFailed)?;
        Ok(())
    }

    fn size(&mut self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }
}

/// Firmware double: files in a map, physical memory in a poisoned arena
pub struct FakeFirmware {
    files: HashMap<String, Vec<u8>>,
    arena: Box<[u8]>,
    reserved: Vec<(u64, u64)>,
    display: Option<DisplayMode>,
    pool_exhausted: bool,
    pub page_allocations: usize,
    pub pool_allocations: usize,
    pub display_queries: usize,
}

impl FakeFirmware {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            arena: vec![POISON; ARENA_SIZE].into_boxed_slice(),
            reserved: Vec::new(),
            display: None,
            pool_exhausted: false,
            page_allocations: 0,
            pool_allocations: 0,
            display_queries: 0,
        }
    }

    pub fn with_file(mut self, path: &str, data: Vec<u8>) -> Self {
        self.files.insert(path.to_string(), data);
        self
    }

    pub fn with_display(mut self, mode: DisplayMode) -> Self {
        self.display = Some(mode);
        self
    }

    pub fn with_pool_exhausted(mut self) -> Self {
        self.pool_exhausted = true;
        self
    }

    /// Bytes of physical memory at `address`
    pub fn memory(&self, address: u64, len: usize) -> &[u8] {
        let start = (address - ARENA_BASE) as usize;
        &self.arena[start..start + len]
    }

    pub fn reserved_ranges(&self) -> &[(u64, u64)] {
        &self.reserved
    }
}

impl FileService for FakeFirmware {
    type File = FakeFile;

    fn open(&mut self, path: &str) -> Result<FakeFile> {
        let data = self.files.get(path).ok_or(BootError::FileNotFound)?;
        Ok(FakeFile {
            data: data.clone(),
            position: 0,
        })
    }
}

impl PhysicalAllocator for FakeFirmware {
    fn allocate_at(&mut self, address: u64, pages: usize) -> Result<NonNull<u8>> {
        let end = address + (pages * PAGE) as u64;
        if address % PAGE as u64 != 0
            || address < ARENA_BASE
            || end > ARENA_BASE + ARENA_SIZE as u64
        {
            return Err(BootError::AllocationFailure);
        }
        if self
            .reserved
            .iter()
            .any(|&(base, limit)| address < limit && base < end)
        {
            return Err(BootError::AllocationFailure);
        }

        self.reserved.push((address, end));
        self.page_allocations += 1;
        let offset = (address - ARENA_BASE) as usize;
        NonNull::new(self.arena[offset..].as_mut_ptr()).ok_or(BootError::AllocationFailure)
    }

    fn allocate_pool(&mut self, bytes: usize) -> Result<NonNull<u8>> {
        if self.pool_exhausted {
            return Err(BootError::AllocationFailure);
        }
        self.pool_allocations += 1;
        // Pool blocks are never returned, same as on real firmware
        let block: &'static mut [u64] = Box::leak(vec![0u64; bytes.div_ceil(8).max(1)].into_boxed_slice());
        NonNull::new(block.as_mut_ptr().cast::<u8>()).ok_or(BootError::AllocationFailure)
    }
}

impl GraphicsService for FakeFirmware {
    fn query_display_mode(&mut self) -> Result<DisplayMode> {
        self.display_queries += 1;
        self.display.ok_or(BootError::ProtocolNotFound)
    }
}

pub fn qemu_display() -> DisplayMode {
    DisplayMode {
        frame_buffer_base: 0x8000_0000,
        frame_buffer_size: 1024 * 768 * 4,
        horizontal_resolution: 1024,
        vertical_resolution: 768,
        pixels_per_scan_line: 1024,
    }
}

/// One program header plus the bytes it maps
#[derive(Debug, Clone)]
pub struct TestSegment {
    pub segment_type: u32,
    pub flags: u32,
    pub file_offset: u64,
    pub physical_address: u64,
    pub data: Vec<u8>,
    pub mem_size: u64,
}

impl TestSegment {
    pub fn code(file_offset: u64, physical_address: u64, data: Vec<u8>, mem_size: u64) -> Self {
        Self {
            segment_type: PT_LOAD,
            flags: PF_R | PF_X,
            file_offset,
            physical_address,
            data,
            mem_size,
        }
    }

    pub fn data(file_offset: u64, physical_address: u64, data: Vec<u8>, mem_size: u64) -> Self {
        Self {
            flags: PF_R | PF_W,
            ..Self::code(file_offset, physical_address, data, mem_size)
        }
    }
}

pub const EHDR_SIZE: usize = 64;
pub const PHDR_SIZE: usize = 56;

/// Assemble a little-endian ELF64 executable with its program headers at 64
pub fn build_image(entry: u64, segments: &[TestSegment]) -> Vec<u8> {
    let table_end = EHDR_SIZE + PHDR_SIZE * segments.len();
    let data_end = segments
        .iter()
        .map(|segment| segment.file_offset as usize + segment.data.len())
        .max()
        .unwrap_or(0);
    let mut image = vec![0u8; table_end.max(data_end)];

    image[..4].copy_from_slice(&[0x7F, b'E', b'L', b'F']);
    image[4] = 2; // 64-bit
    image[5] = 1; // little-endian
    image[6] = 1; // ident version
    put_u16(&mut image, 16, 2); // executable
    put_u16(&mut image, 18, TARGET_MACHINE);
    put_u32(&mut image, 20, 1);
    put_u64(&mut image, 24, entry);
    put_u64(&mut image, 32, EHDR_SIZE as u64);
    put_u16(&mut image, 52, EHDR_SIZE as u16);
    put_u16(&mut image, 54, PHDR_SIZE as u16);
    put_u16(&mut image, 56, segments.len() as u16);

    for (index, segment) in segments.iter().enumerate() {
        let at = EHDR_SIZE + index * PHDR_SIZE;
        put_u32(&mut image, at, segment.segment_type);
        put_u32(&mut image, at + 4, segment.flags);
        put_u64(&mut image, at + 8, segment.file_offset);
        put_u64(&mut image, at + 16, segment.physical_address);
        put_u64(&mut image, at + 24, segment.physical_address);
        put_u64(&mut image, at + 32, segment.data.len() as u64);
        put_u64(&mut image, at + 40, segment.mem_size);
        put_u64(&mut image, at + 48, PAGE as u64);

        let start = segment.file_offset as usize;
        image[start..start + segment.data.len()].copy_from_slice(&segment.data);
    }

    image
}

/// PSF1 container with a recognisable glyph pattern
pub fn build_font(mode: u8, glyph_size: u8) -> Vec<u8> {
    let glyphs = if mode == 1 { 512 } else { 256 };
    let mut font = vec![0x36, 0x04, mode, glyph_size];
    font.extend((0..glyphs * glyph_size as usize).map(|i| (i % 251) as u8));
    font
}

pub fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u64(buf: &mut [u8], at: usize, value: u64) {
    buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
}
