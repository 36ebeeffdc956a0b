//! Render-buffer integration tests: geometry, skeleton bytes and fills.
//!
//! Exercises the public panel API against the Murum Lux geometry and checks
//! the resulting bytes directly, the way the transfer engine would see them.
//!
//! Run with: cargo test -p bcm-matrix --test integration_layout

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use bcm_matrix::config::{DEFAULT_PLANES, MURUM_LUX, MURUM_LUX_FB_SIZE};
use bcm_matrix::layout::bits::{COLOR_MASK, OE, SCLK};
use bcm_matrix::{
    BitPlaneLayout, ControlStyle, MatrixError, MatrixPanel, PanelGeometry, Quantized,
    RefreshConfig,
};
use embedded_graphics::pixelcolor::{Rgb565, RgbColor};
use platform::mocks::SimulatedEngine;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn panel(storage: &mut [u8], style: ControlStyle) -> MatrixPanel<'_, SimulatedEngine> {
    let mut p = MatrixPanel::new(
        MURUM_LUX,
        DEFAULT_PLANES,
        storage,
        false,
        SimulatedEngine::instant(),
        RefreshConfig::default(),
    )
    .unwrap();
    p.initialize_layout(style).unwrap();
    p
}

fn skeleton(bytes: &[u8], layout: &BitPlaneLayout) -> Vec<u8> {
    let g = layout.geometry();
    bytes
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            let in_data = i < layout.tail_offset() && i % g.row_stride() < g.data_frame_len();
            if in_data {
                b & !COLOR_MASK
            } else {
                b
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Test: buffer sizing for the three-segment wall
// ---------------------------------------------------------------------------

/// 3 segments × 64 columns, 16 scan rows, 4 planes:
/// 4 × 16 × (192×2 + 6) + (192×2 + 6) = 25 350 bytes.
#[test]
fn test_murum_lux_buffer_len() {
    assert_eq!(MURUM_LUX.columns(), 192);
    assert_eq!(MURUM_LUX_FB_SIZE, 4 * 16 * (192 * 2 + 6) + (192 * 2 + 6));
    assert_eq!(MURUM_LUX_FB_SIZE, 25_350);

    let mut storage = vec![0u8; MURUM_LUX_FB_SIZE];
    let p = panel(&mut storage, ControlStyle::Standard);
    assert_eq!(p.front_buffer().len(), 25_350);
    assert_eq!(p.layout().tail_offset(), 4 * 16 * 390);
}

// ---------------------------------------------------------------------------
// Test: construction errors
// ---------------------------------------------------------------------------

#[test]
fn test_wrong_storage_len_is_rejected() {
    let mut storage = vec![0u8; MURUM_LUX_FB_SIZE + 1];
    let err = MatrixPanel::new(
        MURUM_LUX,
        DEFAULT_PLANES,
        &mut storage,
        false,
        SimulatedEngine::instant(),
        RefreshConfig::default(),
    )
    .err();
    assert_eq!(
        err,
        Some(MatrixError::BufferSize {
            expected: MURUM_LUX_FB_SIZE,
            actual: MURUM_LUX_FB_SIZE + 1
        })
    );
}

#[test]
fn test_plane_count_is_rejected() {
    let mut storage = vec![0u8; 16];
    let err = MatrixPanel::new(
        MURUM_LUX,
        9,
        &mut storage,
        false,
        SimulatedEngine::instant(),
        RefreshConfig::default(),
    )
    .err();
    assert_eq!(err, Some(MatrixError::PlaneCount(9)));
}

// ---------------------------------------------------------------------------
// Test: skeleton bytes
// ---------------------------------------------------------------------------

/// Every data byte pair is (OE?, OE?|SCLK), every control frame carries its
/// row address, and the tail is dark.
#[test]
fn test_skeleton_bytes() {
    let mut storage = vec![0xFFu8; MURUM_LUX_FB_SIZE];
    let p = panel(&mut storage, ControlStyle::Standard);
    let layout = *p.layout();
    let buf = p.front_buffer();

    for plane in 0..DEFAULT_PLANES {
        for row in 0..MURUM_LUX.scan_rows {
            let span = layout.oe_span(layout.previous_plane(plane, row));
            for column in 0..MURUM_LUX.columns() {
                let off = layout.data_offset(plane, row, column);
                let oe = if column < span { OE } else { 0 };
                assert_eq!(buf[off], oe, "plane {plane} row {row} col {column}");
                assert_eq!(buf[off + 1], oe | SCLK);
            }
            let ctl = layout.control_offset(plane, row);
            assert_eq!(
                &buf[ctl..ctl + 6],
                &ControlStyle::Standard.control_frame(row)
            );
        }
    }

    let tail = layout.tail_offset();
    assert!(buf[tail..tail + MURUM_LUX.data_frame_len()]
        .iter()
        .all(|&b| b == 0));
    assert!(buf[tail..].iter().all(|&b| b & OE == 0));
}

/// OE on-time per plane doubles: 24, 48, 96, 192 columns.
#[test]
fn test_bcm_weighting() {
    let layout = BitPlaneLayout::new(MURUM_LUX, 4).unwrap();
    let spans: Vec<usize> = (0..4).map(|k| layout.oe_span(k)).collect();
    assert_eq!(spans, vec![24, 48, 96, 192]);
}

#[test]
fn test_initialize_layout_is_idempotent() {
    let mut storage = vec![0u8; MURUM_LUX_FB_SIZE];
    let mut p = panel(&mut storage, ControlStyle::InvertedOeLatchLast);
    let once = p.front_buffer().to_vec();
    p.initialize_layout(ControlStyle::InvertedOeLatchLast).unwrap();
    assert_eq!(p.front_buffer(), &once[..]);
}

/// An out-of-table style index builds the same buffer as the default style.
#[test]
fn test_unknown_style_index_uses_default() {
    let mut a = vec![0u8; MURUM_LUX_FB_SIZE];
    let mut b = vec![0u8; MURUM_LUX_FB_SIZE];
    let pa = panel(&mut a, ControlStyle::from(42));
    let pb = panel(&mut b, ControlStyle::Standard);
    assert_eq!(pa.front_buffer(), pb.front_buffer());
}

// ---------------------------------------------------------------------------
// Test: fills
// ---------------------------------------------------------------------------

#[test]
fn test_fill_black_equals_fresh_layout() {
    let mut storage = vec![0u8; MURUM_LUX_FB_SIZE];
    let mut p = panel(&mut storage, ControlStyle::Standard);
    let fresh = p.front_buffer().to_vec();

    p.set_pixel(3, 3, Rgb565::CYAN);
    p.set_pixel(60, 90, Rgb565::MAGENTA);
    p.fill_screen(Rgb565::BLACK);
    assert_eq!(p.front_buffer(), &fresh[..]);
}

#[test]
fn test_fill_white_equals_slow_path() {
    let mut fast = vec![0u8; MURUM_LUX_FB_SIZE];
    let mut slow = vec![0u8; MURUM_LUX_FB_SIZE];
    let mut pf = panel(&mut fast, ControlStyle::Standard);
    let mut ps = panel(&mut slow, ControlStyle::Standard);

    pf.fill_screen(Rgb565::WHITE);
    let white = Quantized::full(DEFAULT_PLANES);
    for y in 0..96 {
        for x in 0..64 {
            ps.set_pixel_quantized(x, y, white);
        }
    }
    assert_eq!(pf.front_buffer(), ps.front_buffer());
}

#[test]
fn test_fill_other_colour_writes_every_pixel() {
    let mut storage = vec![0u8; MURUM_LUX_FB_SIZE];
    let mut p = panel(&mut storage, ControlStyle::Standard);
    let layout = *p.layout();
    let before = skeleton(p.front_buffer(), &layout);

    p.fill_screen(Rgb565::new(31, 0, 16));
    let expected = Quantized { r: 15, g: 0, b: 8 };
    for y in 0..96 {
        for x in 0..64 {
            assert_eq!(p.get_pixel(x, y), Some(expected));
        }
    }
    assert_eq!(skeleton(p.front_buffer(), &layout), before);
}

/// Pixel writes on an inverted-OE layout leave OE polarity untouched.
#[test]
fn test_pixels_preserve_inverted_skeleton() {
    let mut storage = vec![0u8; MURUM_LUX_FB_SIZE];
    let mut p = panel(&mut storage, ControlStyle::InvertedOe);
    let layout = *p.layout();
    let before = skeleton(p.front_buffer(), &layout);

    for i in 0..64 {
        p.set_pixel(i, i, Rgb565::YELLOW);
        p.set_pixel(63 - i, 95 - i, Rgb565::BLUE);
    }
    assert_eq!(skeleton(p.front_buffer(), &layout), before);
}

// ---------------------------------------------------------------------------
// Test: small geometry, 1 plane
// ---------------------------------------------------------------------------

#[test]
fn test_single_plane_single_segment() {
    let g = PanelGeometry::new(1, 16, 8);
    let mut storage = vec![0u8; g.buffer_len(1)];
    let mut p = MatrixPanel::new(
        g,
        1,
        &mut storage,
        false,
        SimulatedEngine::instant(),
        RefreshConfig::default(),
    )
    .unwrap();
    p.initialize_layout(ControlStyle::Standard).unwrap();
    p.set_pixel(15, 15, Rgb565::WHITE);
    assert_eq!(p.get_pixel(15, 15), Some(Quantized { r: 1, g: 1, b: 1 }));
    // single plane: OE lit across the whole row
    assert!(p.front_buffer()[..32].chunks(2).all(|c| c[0] & OE != 0));
}

// ---------------------------------------------------------------------------
// Test: diagnostic dump
// ---------------------------------------------------------------------------

#[test]
fn test_dump_matrix_format() {
    let g = PanelGeometry::new(1, 2, 1);
    let mut storage = vec![0u8; g.buffer_len(1)];
    let mut p = MatrixPanel::new(
        g,
        1,
        &mut storage,
        false,
        SimulatedEngine::instant(),
        RefreshConfig::default(),
    )
    .unwrap();
    p.initialize_layout(ControlStyle::Standard).unwrap();

    let mut out = String::new();
    p.dump_matrix(&mut out).unwrap();
    // one row frame (4 data + 6 control) + tail (4 + 6) = 20 bytes
    assert_eq!(
        out,
        "static const uint8_t img[] = {\n\
         \x20 0x80,0xC0,0x80,0xC0,0x00,0x20,0x10,0x30,\n\
         \x20 0x80,0xA0,0x00,0x00,0x00,0x00,0x00,0x20,\n\
         \x20 0x00,0x20,0x00,0x20\n\
         };\n"
    );
}
