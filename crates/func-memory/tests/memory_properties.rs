//! End-to-end properties of the seeded functional memory.

use func_memory::{
    AddressLayout, DumpFormatter, ErrorKind, MemoryError, MemoryImage, Segment, CODE_SEGMENT_NAME,
};
use log as _;
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn wide_layout() -> AddressLayout {
    AddressLayout::new(64, 40, 12, 12)
}

fn empty(layout: AddressLayout) -> MemoryImage {
    MemoryImage::new("test", &[], layout).expect("valid layout")
}

#[test]
fn text_segment_seeding_scenario() {
    let segments = [Segment::new(
        CODE_SEGMENT_NAME,
        0x40_0000,
        [0x11, 0x22, 0x33, 0x44],
    )];
    let image = MemoryImage::new("prog.elf", &segments, AddressLayout::default())
        .expect("valid layout");

    assert_eq!(image.name(), "prog.elf");
    assert_eq!(image.code_start_addr(), 0x40_0000);
    assert_eq!(image.loaded_range(), (0x40_0000, 0x40_0003));
    assert_eq!(image.read(0x40_0000, 4), Ok(0x1122_3344));
}

#[test]
fn segments_are_written_in_order_so_later_bytes_win() {
    let segments = [
        Segment::new(".data", 0x1000, [0xAA, 0xBB]),
        Segment::new(".text", 0x1001, [0xCC]),
    ];
    let image =
        MemoryImage::new("prog", &segments, AddressLayout::default()).expect("valid layout");
    assert_eq!(image.read(0x1000, 2), Ok(0xAACC));
}

#[test]
fn last_code_segment_wins() {
    let segments = [
        Segment::new(".text", 0x1000, [1]),
        Segment::new(".text", 0x8000, [2]),
    ];
    let image =
        MemoryImage::new("prog", &segments, AddressLayout::default()).expect("valid layout");
    assert_eq!(image.code_start_addr(), 0x8000);
}

#[test]
fn sparsity_is_preserved_in_a_64_bit_space() {
    let mut image = empty(wide_layout());
    image.write_byte(0x0000_0000_0000_0010, 0x01);
    image.write_byte(0xFFFF_FFFF_0000_0020, 0x02);

    assert_eq!(image.space().allocated_sets(), 2);
    assert_eq!(image.space().allocated_pages(), 2);

    let dump = DumpFormatter::render(&image);
    let body: Vec<&str> = dump.lines().skip(6).collect();
    assert_eq!(
        body,
        vec![
            " 0x0",
            "   `--------0x0",
            "              `--------0x10:  00000001",
            "             ",
            "",
            " 0xffffffff00",
            "   `--------0x0",
            "              `--------0x20:  00000010",
            "             ",
            "",
        ]
    );
}

#[test]
fn address_zero_reads_and_writes_like_any_other() {
    let mut image = empty(AddressLayout::default());
    image.write(0xBEEF, 0, 2).expect("valid width");
    assert_eq!(image.read(0, 2), Ok(0xBEEF));
}

#[test]
fn writes_wrap_at_the_top_of_a_full_64_bit_space() {
    let mut image = empty(wide_layout());
    image.write(0x0102, u64::MAX, 2).expect("valid width");
    assert_eq!(image.read_byte(u64::MAX), Ok(0x01));
    assert_eq!(image.read_byte(0), Ok(0x02));
    assert_eq!(image.read(u64::MAX, 2), Ok(0x0102));
}

#[rstest]
#[case(AddressLayout::new(32, 10, 10, 10))]
#[case(AddressLayout::new(72, 40, 20, 12))]
#[case(AddressLayout::new(64, 0, 0, 64))]
fn inconsistent_layouts_fail_before_simulation(#[case] layout: AddressLayout) {
    let error = MemoryImage::new("prog", &[Segment::new(".text", 0x10, [1])], layout)
        .expect_err("layout must be rejected");
    assert_eq!(error.kind(), ErrorKind::Configuration);
}

#[test]
fn unmapped_error_names_the_missing_byte() {
    let mut image = empty(AddressLayout::default());
    image.write(0x1122_3344, 0x500, 4).expect("valid width");
    let error = image.read(0x502, 4).expect_err("bytes past 0x503 are unwritten");
    assert_eq!(
        error,
        MemoryError::UnmappedAddress {
            addr: 0x504,
            access_addr: 0x502,
            num_bytes: 4,
        }
    );
    assert_eq!(
        error.to_string(),
        "read from unmapped address 0x504 (4-byte access at 0x502)"
    );
}

proptest! {
    #[test]
    fn never_written_bytes_are_unmapped(
        written in prop::collection::btree_set(any::<u64>(), 0..32),
        target in any::<u64>(),
    ) {
        let mut image = empty(wide_layout());
        for addr in &written {
            image.write_byte(*addr, 0);
        }
        if written.contains(&target) {
            prop_assert_eq!(image.read_byte(target), Ok(0));
        } else {
            prop_assert_eq!(
                image.read_byte(target),
                Err(MemoryError::unmapped_byte(target))
            );
        }
    }

    #[test]
    fn repeated_writes_never_duplicate_allocations(
        addrs in prop::collection::vec(any::<u64>(), 1..16),
        repeats in 1_usize..4,
    ) {
        let mut once = empty(wide_layout());
        let mut many = empty(wide_layout());
        for addr in &addrs {
            once.write_byte(*addr, 0x5A);
            for _ in 0..repeats {
                many.write_byte(*addr, 0x5A);
            }
        }
        prop_assert_eq!(once.space().allocated_sets(), many.space().allocated_sets());
        prop_assert_eq!(once.space().allocated_pages(), many.space().allocated_pages());
        prop_assert_eq!(once, many);
    }

    #[test]
    fn multi_byte_roundtrip_in_wide_space(addr in any::<u64>(), num_bytes in 1_u8..=8, raw in any::<u64>()) {
        let mut image = empty(wide_layout());
        let value = raw.checked_shr(64 - 8 * u32::from(num_bytes)).unwrap_or(0);
        image.write(value, addr, num_bytes).expect("valid width");
        prop_assert_eq!(image.read(addr, num_bytes), Ok(value));
    }
}
