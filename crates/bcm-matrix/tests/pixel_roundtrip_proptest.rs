//! Property-based tests for pixel packing.
//! Verifies invariants hold for random coordinates and colours, not just fixed
//! examples.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use bcm_matrix::color::rescale;
use bcm_matrix::config::MURUM_LUX;
use bcm_matrix::layout::bits::COLOR_MASK;
use bcm_matrix::{BitPlaneLayout, ControlStyle, PhysicalAddress, Quantized, Remapper, Rotation};
use embedded_graphics::pixelcolor::{Rgb565, RgbColor};
use proptest::prelude::*;
use std::collections::HashMap;

fn fresh(planes: u8, style: ControlStyle) -> (BitPlaneLayout, Vec<u8>) {
    let mut layout = BitPlaneLayout::new(MURUM_LUX, planes).unwrap();
    let mut buf = vec![0u8; layout.buffer_len()];
    layout.initialize(&mut buf, style).unwrap();
    (layout, buf)
}

fn planes() -> impl Strategy<Value = u8> {
    prop_oneof![Just(1u8), Just(2u8), Just(4u8)]
}

fn style() -> impl Strategy<Value = ControlStyle> {
    (0u8..4).prop_map(ControlStyle::from)
}

fn rgb565(raw: u16) -> Rgb565 {
    Rgb565::new(
        (raw >> 11) as u8 & 0x1F,
        (raw >> 5) as u8 & 0x3F,
        raw as u8 & 0x1F,
    )
}

/// Every physical address of the chain, segment by segment.
fn physical_addresses() -> impl Iterator<Item = PhysicalAddress> {
    let g = MURUM_LUX;
    (0..g.segments).flat_map(move |segment| {
        let first = (g.segments - 1 - segment) * g.segment_width;
        (0..g.segment_height()).flat_map(move |row| {
            (first..first + g.segment_width).map(move |column| PhysicalAddress {
                segment,
                row,
                column,
            })
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// set_pixel then read-back through the remapper yields the quantized
    /// colour on every plane, and nothing outside the colour bits moves.
    #[test]
    fn pixel_round_trips(
        planes in planes(),
        style in style(),
        x in 0i32..64,
        y in 0i32..96,
        raw in any::<u16>(),
    ) {
        let (layout, mut buf) = fresh(planes, style);
        let before = buf.clone();
        let remap = Remapper::new(MURUM_LUX);
        let color = rgb565(raw);
        let q = Quantized::from_rgb565(color, planes);

        let addr = remap.map(x, y).unwrap();
        layout.write_pixel(&mut buf, addr, q);

        prop_assert_eq!(layout.read_pixel(&buf, addr), q);
        prop_assert_eq!(remap.unmap(addr), Some((x, y)));
        prop_assert_eq!(q.r, rescale(color.r(), 5, planes));
        for (now, was) in buf.iter().zip(before.iter()) {
            prop_assert_eq!(now & !COLOR_MASK, was & !COLOR_MASK);
        }
    }

    /// Writing a pixel never changes any other logical pixel.
    #[test]
    fn pixel_writes_are_isolated(
        planes in planes(),
        a in (0i32..64, 0i32..96),
        b in (0i32..64, 0i32..96),
    ) {
        prop_assume!(a != b);
        let (layout, mut buf) = fresh(planes, ControlStyle::Standard);
        let remap = Remapper::new(MURUM_LUX);
        let pa = remap.map(a.0, a.1).unwrap();
        let pb = remap.map(b.0, b.1).unwrap();

        layout.write_pixel(&mut buf, pb, Quantized::full(planes));
        layout.write_pixel(&mut buf, pa, Quantized::BLACK);
        prop_assert_eq!(layout.read_pixel(&buf, pb), Quantized::full(planes));
    }

    /// map is in range for every rotation and unmap inverts it.
    #[test]
    fn remap_round_trips_under_rotation(quarter in 0u8..4, x in 0i32..96, y in 0i32..96) {
        let mut remap = Remapper::new(MURUM_LUX);
        remap.set_rotation(Rotation::from(quarter));
        let (w, h) = remap.size();
        match remap.map(x, y) {
            Some(addr) => {
                prop_assert!((x as usize) < w && (y as usize) < h);
                prop_assert!(addr.column < MURUM_LUX.columns());
                prop_assert!(addr.row < MURUM_LUX.segment_height());
                prop_assert_eq!(remap.unmap(addr), Some((x, y)));
            }
            None => prop_assert!((x as usize) >= w || (y as usize) >= h),
        }
    }

    /// Coordinates off the logical canvas have no physical address.
    #[test]
    fn out_of_range_is_noop(x in -200i32..200, y in -200i32..200) {
        let remap = Remapper::new(MURUM_LUX);
        prop_assume!(!(0..64).contains(&x) || !(0..96).contains(&y));
        prop_assert_eq!(remap.map(x, y), None);
    }

    /// 100 writes into one buffer, then a scan of the whole chain rebuilds
    /// every logical pixel through the inverse remap: the last write to a
    /// coordinate wins and untouched pixels stay black.
    #[test]
    fn buffer_scan_rebuilds_every_pixel(
        planes in planes(),
        style in style(),
        writes in proptest::collection::vec((0i32..64, 0i32..96, any::<u16>()), 100),
    ) {
        let (layout, mut buf) = fresh(planes, style);
        let before = buf.clone();
        let remap = Remapper::new(MURUM_LUX);
        let mut expected = HashMap::new();

        for &(x, y, raw) in &writes {
            let q = Quantized::from_rgb565(rgb565(raw), planes);
            layout.write_pixel(&mut buf, remap.map(x, y).unwrap(), q);
            expected.insert((x, y), q);
        }

        let mut visited = 0usize;
        for addr in physical_addresses() {
            let (x, y) = remap.unmap(addr).unwrap();
            let want = expected.get(&(x, y)).copied().unwrap_or(Quantized::BLACK);
            prop_assert_eq!(layout.read_pixel(&buf, addr), want, "pixel ({}, {})", x, y);
            visited += 1;
        }
        prop_assert_eq!(visited, 64 * 96);
        for (now, was) in buf.iter().zip(before.iter()) {
            prop_assert_eq!(now & !COLOR_MASK, was & !COLOR_MASK);
        }
    }
}
