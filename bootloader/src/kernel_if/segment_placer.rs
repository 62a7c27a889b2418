//! Segment placement
//!
//! Materializes every loadable segment of a validated image at the physical
//! address it was linked for. The whole descriptor table is planned and
//! checked before the first page is requested, so a malformed image never
//! leaves a partial placement behind.

use arrayvec::ArrayVec;
use core::slice;

use super::elf64::{ImageHeader, SegmentDescriptor, SegmentFlags, segment_descriptors};
use crate::config::{MAX_SEGMENTS, PAGE_SIZE};
use crate::error::{BootError, Result};
use crate::utils::boot_traits::{BootFile, PhysicalAllocator};
use crate::utils::mem_util::{align_down, page_offset, size_to_pages};

/// A segment committed to physical memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedSegment {
    /// Physical address the segment was linked for
    pub physical_base: u64,
    pub virtual_base: u64,
    /// Pages reserved, counted from the page containing `physical_base`
    pub page_count: usize,
    pub bytes_copied: u64,
    pub memory_size: u64,
    pub flags: SegmentFlags,
}

impl LoadedSegment {
    pub fn allocation_base(&self) -> u64 {
        align_down(self.physical_base)
    }

    /// Whether `address` falls inside the segment's in-memory image
    pub fn contains(&self, address: u64) -> bool {
        address >= self.physical_base && address - self.physical_base < self.memory_size
    }

    pub fn is_executable(&self) -> bool {
        self.flags.contains(SegmentFlags::EXECUTE)
    }
}

/// Result of placing a whole kernel image
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub entry_point: u64,
    segments: ArrayVec<LoadedSegment, MAX_SEGMENTS>,
}

impl LoadedImage {
    pub fn segments(&self) -> &[LoadedSegment] {
        &self.segments
    }

    /// Return the entry address once it is known to land in loaded code
    pub fn verify_entry(&self) -> Result<u64> {
        if self.entry_point == 0 {
            return Err(BootError::EntryOutsideImage);
        }

        self.segments
            .iter()
            .any(|segment| segment.is_executable() && segment.contains(self.entry_point))
            .then_some(self.entry_point)
            .ok_or(BootError::EntryOutsideImage)
    }
}

/// A loadable segment that passed every check and awaits allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedSegment {
    pub descriptor: SegmentDescriptor,
    pub allocation_base: u64,
    pub page_count: usize,
}

impl PlannedSegment {
    fn allocation_end(&self) -> u64 {
        self.allocation_base + (self.page_count * PAGE_SIZE) as u64
    }
}

/// Select and check the loadable entries of `table`
///
/// `image_size` bounds every segment's file range. The returned plan is
/// sorted by physical address and free of overlapping page ranges.
pub fn plan_segments(
    header: &ImageHeader,
    table: &[u8],
    image_size: u64,
) -> Result<ArrayVec<PlannedSegment, MAX_SEGMENTS>> {
    let mut plan = ArrayVec::<PlannedSegment, MAX_SEGMENTS>::new();

    for descriptor in segment_descriptors(header, table) {
        let descriptor = descriptor?;
        if !descriptor.is_loadable() {
            continue;
        }

        if descriptor.mem_size < descriptor.file_size {
            return Err(BootError::FormatInvalid("Segment file size exceeds memory size"));
        }

        let file_end = descriptor
            .file_offset
            .checked_add(descriptor.file_size)
            .ok_or(BootError::FormatInvalid("Segment data out of bounds"))?;
        if file_end > image_size {
            return Err(BootError::FormatInvalid("Segment data out of bounds"));
        }

        if descriptor.mem_size == 0 {
            log::debug!("Skipping empty segment at {:#x}", descriptor.physical_address);
            continue;
        }

        // Reject targets that wrap the physical address space
        let span = page_offset(descriptor.physical_address).saturating_add(descriptor.mem_size);
        let page_count = size_to_pages(span);
        let allocation_base = align_down(descriptor.physical_address);
        if page_count
            .checked_mul(PAGE_SIZE as u64)
            .and_then(|len| allocation_base.checked_add(len))
            .is_none()
        {
            log::error!(
                "Segment at {:#x} extends past the physical address space",
                descriptor.physical_address
            );
            return Err(BootError::AllocationFailure);
        }

        plan.try_push(PlannedSegment {
            descriptor,
            allocation_base,
            page_count: page_count as usize,
        })
        .map_err(|_| BootError::FormatInvalid("Too many loadable segments"))?;
    }

    if plan.is_empty() {
        return Err(BootError::NoLoadableSegments);
    }

    plan.sort_unstable_by_key(|segment| segment.allocation_base);
    for pair in plan.windows(2) {
        if pair[0].allocation_end() > pair[1].allocation_base {
            log::error!(
                "Segments at {:#x} and {:#x} overlap",
                pair[0].descriptor.physical_address,
                pair[1].descriptor.physical_address
            );
            return Err(BootError::AllocationFailure);
        }
    }

    Ok(plan)
}

/// Places loadable segments through a physical allocator
pub struct SegmentPlacer<'a, A: PhysicalAllocator + ?Sized> {
    allocator: &'a mut A,
}

impl<'a, A: PhysicalAllocator + ?Sized> SegmentPlacer<'a, A> {
    pub fn new(allocator: &'a mut A) -> Self {
        Self { allocator }
    }

    /// Load every loadable segment described by `table` out of `file`
    pub fn place<F: BootFile + ?Sized>(
        &mut self,
        header: &ImageHeader,
        table: &[u8],
        file: &mut F,
    ) -> Result<LoadedImage> {
        let image_size = file.size()?;
        let plan = plan_segments(header, table, image_size)?;

        let mut segments = ArrayVec::new();
        for planned in &plan {
            segments.push(self.load_segment(planned, file)?);
        }

        Ok(LoadedImage {
            entry_point: header.entry_point,
            segments,
        })
    }

    fn load_segment<F: BootFile + ?Sized>(
        &mut self,
        planned: &PlannedSegment,
        file: &mut F,
    ) -> Result<LoadedSegment> {
        let descriptor = &planned.descriptor;

        let base = self
            .allocator
            .allocate_at(planned.allocation_base, planned.page_count)
            .map_err(|err| {
                log::error!(
                    "Cannot reserve {} pages at {:#x}: {}",
                    planned.page_count,
                    planned.allocation_base,
                    err
                );
                BootError::AllocationFailure
            })?;

        // SAFETY: the allocator hands out `page_count` whole pages at `base`
        // that nothing else references, and they are never released.
        let region =
            unsafe { slice::from_raw_parts_mut(base.as_ptr(), planned.page_count * PAGE_SIZE) };

        let start = page_offset(descriptor.physical_address) as usize;
        let file_end = start + descriptor.file_size as usize;
        let mem_end = start + descriptor.mem_size as usize;

        log::debug!(
            "Loading segment: file offset {:#x}, size {:#x} -> paddr {:#x} ({} pages)",
            descriptor.file_offset,
            descriptor.file_size,
            descriptor.physical_address,
            planned.page_count
        );

        file.seek(descriptor.file_offset)?;
        file.read_exact(&mut region[start..file_end])?;
        region[file_end..mem_end].fill(0);

        Ok(LoadedSegment {
            physical_base: descriptor.physical_address,
            virtual_base: descriptor.virtual_address,
            page_count: planned.page_count,
            bytes_copied: descriptor.file_size,
            memory_size: descriptor.mem_size,
            flags: descriptor.flags,
        })
    }
}
