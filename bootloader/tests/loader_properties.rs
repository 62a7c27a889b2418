// Property tests for placement, header rejection and font sizing

mod common;

use aderina_bootloader::graphics::psf_font::GlyphFontLoader;
use aderina_bootloader::kernel_if::elf64::ImageHeader;
use aderina_bootloader::{BootConfig, BootError, BootFile, FileService, HandoffCoordinator, SegmentPlacer};
use common::*;
use proptest::prelude::*;

/// Header byte offsets and a value that makes each field invalid
fn corruptions() -> impl Strategy<Value = (usize, u8)> {
    prop_oneof![
        (0usize..4).prop_flat_map(|at| (Just(at), any::<u8>())),
        Just((4, 1)),
        Just((4, 0)),
        Just((5, 2)),
        Just((6, 0)),
        Just((16, 3)),
        Just((16, 1)),
        Just((18, 0)),
        Just((20, 0)),
        Just((20, 2)),
    ]
}

fn segments_strategy() -> impl Strategy<Value = Vec<(usize, usize, Vec<u8>)>> {
    // (page index, extra bss bytes, content)
    prop::collection::vec(
        (0usize..4, 0usize..PAGE, prop::collection::vec(any::<u8>(), 1..512)),
        1..4,
    )
    .prop_map(|mut entries| {
        entries.sort_by_key(|entry| entry.0);
        entries.dedup_by_key(|entry| entry.0);
        entries
    })
}

proptest! {
    #[test]
    fn prop_segments_land_at_their_addresses(entries in segments_strategy()) {
        // Each segment owns two pages so page-rounded ranges never touch
        let segments: Vec<TestSegment> = entries
            .iter()
            .enumerate()
            .map(|(index, (slot, bss, content))| {
                let paddr = 0x20_0000 + (*slot as u64) * 2 * PAGE as u64;
                let mem_size = (content.len() + bss) as u64;
                let segment = TestSegment::data(
                    0x1000 * (index as u64 + 1),
                    paddr,
                    content.clone(),
                    mem_size,
                );
                if index == 0 { TestSegment { flags: PF_R | PF_X, ..segment } } else { segment }
            })
            .collect();
        let entry = segments[0].physical_address;
        let image = build_image(entry, &segments);

        let mut firmware = FakeFirmware::new().with_file("kernel.elf", image);
        {
            let mut file = firmware.open("kernel.elf").unwrap();
            let mut raw = [0u8; EHDR_SIZE];
            file.read_exact(&mut raw).unwrap();
            let header = ImageHeader::parse(&raw);
            let mut table = vec![0u8; header.program_header_table_len()];
            file.seek(header.program_header_offset).unwrap();
            file.read_exact(&mut table).unwrap();

            let loaded = SegmentPlacer::new(&mut firmware)
                .place(&header, &table, &mut file)
                .unwrap();
            prop_assert_eq!(loaded.segments().len(), segments.len());
            prop_assert_eq!(loaded.verify_entry(), Ok(entry));
        }

        for segment in &segments {
            let copied = firmware.memory(segment.physical_address, segment.data.len());
            prop_assert_eq!(copied, &segment.data[..]);
            let tail_len = segment.mem_size as usize - segment.data.len();
            let tail = firmware.memory(
                segment.physical_address + segment.data.len() as u64,
                tail_len,
            );
            prop_assert!(tail.iter().all(|&b| b == 0));
        }
        prop_assert_eq!(firmware.page_allocations, segments.len());
    }

    #[test]
    fn prop_corrupted_header_never_allocates((at, value) in corruptions()) {
        let mut image = build_image(
            0x20_0000,
            &[TestSegment::code(0x1000, 0x20_0000, vec![0xF4; 0x50], 0x1000)],
        );
        prop_assume!(image[at] != value);
        image[at] = value;

        let mut firmware = FakeFirmware::new().with_file("kernel.elf", image);
        let result = HandoffCoordinator::new(&mut firmware, BootConfig::default()).prepare();

        prop_assert!(matches!(result, Err(BootError::FormatInvalid(_))));
        prop_assert_eq!(firmware.page_allocations, 0);
        prop_assert_eq!(firmware.pool_allocations, 0);
    }

    #[test]
    fn prop_mismatched_font_identifier(a in any::<u8>(), b in any::<u8>()) {
        prop_assume!([a, b] != [0x36, 0x04]);
        let mut font = build_font(0, 16);
        font[0] = a;
        font[1] = b;

        let mut firmware = FakeFirmware::new().with_file("font.psf", font);
        let result = GlyphFontLoader::new(&mut firmware).load("font.psf");

        prop_assert_eq!(result.err(), Some(BootError::FontFormatInvalid));
        prop_assert_eq!(firmware.pool_allocations, 0);
    }

    #[test]
    fn prop_font_table_matches_mode(mode in 0u8..=2, glyph_size in 1u8..=32) {
        let mut firmware = FakeFirmware::new().with_file("font.psf", build_font(mode, glyph_size));
        let font = GlyphFontLoader::new(&mut firmware).load("font.psf").unwrap();

        let count = if mode == 1 { 512 } else { 256 };
        prop_assert_eq!(font.glyph_count(), count);
        prop_assert_eq!(font.glyphs().len(), count * glyph_size as usize);
        prop_assert_eq!(font.glyphs().len() % glyph_size as usize, 0);
    }
}

#[test]
fn test_font_mode_0_size_16() {
    let mut firmware = FakeFirmware::new().with_file("font.psf", build_font(0, 16));
    let font = GlyphFontLoader::new(&mut firmware).load("font.psf").unwrap();

    assert_eq!(font.header().glyph_size, 16);
    assert_eq!(font.glyph_count(), 256);
    assert_eq!(font.glyphs().len(), 4096);
    assert_eq!(font.glyph(1).unwrap(), &build_font(0, 16)[4 + 16..4 + 32]);
    assert!(font.glyph(256).is_none());
}

#[test]
fn test_font_mode_1_size_16() {
    let mut firmware = FakeFirmware::new().with_file("font.psf", build_font(1, 16));
    let font = GlyphFontLoader::new(&mut firmware).load("font.psf").unwrap();

    assert_eq!(font.glyph_count(), 512);
    assert_eq!(font.glyphs().len(), 8192);
}

#[test]
fn test_font_handoff_record_points_at_pool_data() {
    let mut firmware = FakeFirmware::new().with_file("font.psf", build_font(0, 8));
    let font = GlyphFontLoader::new(&mut firmware).load("font.psf").unwrap();

    let record = unsafe { &*font.as_handoff_ptr() };
    assert_eq!(record.glyph_buffer, font.glyphs().as_ptr());
    assert_eq!(unsafe { (*record.header).glyph_size }, 8);
    // Header, glyph table and handoff record
    assert_eq!(firmware.pool_allocations, 3);
}

#[test]
fn test_missing_font() {
    let mut firmware = FakeFirmware::new();
    let result = GlyphFontLoader::new(&mut firmware).load("zap-ext-light16.psf");
    assert_eq!(result.err(), Some(BootError::FontNotFound));
}

#[test]
fn test_short_glyph_table_rejected() {
    let mut font = build_font(1, 16);
    font.truncate(4 + 4096);
    let mut firmware = FakeFirmware::new().with_file("font.psf", font);

    let result = GlyphFontLoader::new(&mut firmware).load("font.psf");
    assert_eq!(result.err(), Some(BootError::FontFormatInvalid));
    assert_eq!(firmware.pool_allocations, 0);
}

#[test]
fn test_zero_glyph_size_rejected() {
    let mut firmware = FakeFirmware::new().with_file("font.psf", vec![0x36, 0x04, 0, 0]);
    let result = GlyphFontLoader::new(&mut firmware).load("font.psf");
    assert_eq!(result.err(), Some(BootError::FontFormatInvalid));
}

#[test]
fn test_glyph_index_out_of_range() {
    let mut firmware = FakeFirmware::new().with_file("font.psf", build_font(1, 16));
    let font = GlyphFontLoader::new(&mut firmware).load("font.psf").unwrap();

    assert_eq!(font.glyph(511).unwrap().len(), 16);
    assert!(font.glyph(512).is_none());
    assert!(font.glyph(usize::MAX).is_none());
    assert!(font.glyph(usize::MAX / 16).is_none());
}
