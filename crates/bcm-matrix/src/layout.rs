//! Bit-plane render-buffer layout.
//!
//! The render buffer is a self-clocking byte stream: the transfer engine
//! copies it one byte per trigger onto an 8-bit port, and every clock edge the
//! panel needs is already encoded in the bytes. Two byte kinds share the port:
//!
//! ```text
//!              bit: 7    6     5     4    3    2    1    0
//! Data-Frame byte:  OE   SCLK  B2    G2   R2   B1   G1   R1
//! Control byte:     OE   0     CCLK  LAT  D    C    B    A
//! ```
//!
//! Control bytes are captured by an external latch clocked on CCLK, so the
//! colour/shift lines that share bits 0..=5 are never disturbed while a
//! Control-Frame goes past (SCLK stays low).
//!
//! # Binary code modulation
//!
//! Plane `k` holds bit `k` of every channel and must stay lit for `2^k` time
//! units. The stream runs at a constant byte rate, so the weighting comes from
//! the OE bit inside the *next* row frame's data bytes: while that frame
//! shifts in, the row latched by the previous frame is displayed for a prefix
//! of `columns >> (planes - 1 - k)` columns and dark for the rest.

use crate::color::Quantized;
use crate::config::MAX_PLANES;
use crate::error::MatrixError;
use crate::geometry::{PanelGeometry, CONTROL_FRAME_LEN, DATA_BYTES_PER_COLUMN};
use crate::remap::PhysicalAddress;

/// Output-port bit assignments.
pub mod bits {
    /// Upper-half red.
    pub const R1: u8 = 1 << 0;
    /// Upper-half green.
    pub const G1: u8 = 1 << 1;
    /// Upper-half blue.
    pub const B1: u8 = 1 << 2;
    /// Lower-half red.
    pub const R2: u8 = 1 << 3;
    /// Lower-half green.
    pub const G2: u8 = 1 << 4;
    /// Lower-half blue.
    pub const B2: u8 = 1 << 5;
    /// Shift clock (data bytes only).
    pub const SCLK: u8 = 1 << 6;
    /// Output enable (both byte kinds).
    pub const OE: u8 = 1 << 7;

    /// Row-select address A..D (control bytes only).
    pub const ADDR_MASK: u8 = 0x0F;
    /// Latch strobe (control bytes only).
    pub const LAT: u8 = 1 << 4;
    /// Control-latch clock (control bytes only).
    pub const CCLK: u8 = 1 << 5;

    /// Colour lines for the upper half of a segment.
    pub const UPPER: u8 = R1 | G1 | B1;
    /// Colour lines for the lower half of a segment.
    pub const LOWER: u8 = R2 | G2 | B2;
    /// Every colour line.
    pub const COLOR_MASK: u8 = UPPER | LOWER;
}

use bits::{CCLK, COLOR_MASK, LAT, OE, SCLK};

/// Control-Frame wiring variant.
///
/// Board revisions differ in OE polarity and in whether the latch strobe is
/// issued before or after output is re-enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ControlStyle {
    /// Active-high OE; latch, then enable.
    #[default]
    Standard = 0,
    /// Active-high OE; enable, then latch.
    LatchLast = 1,
    /// Active-low OE; latch, then enable.
    InvertedOe = 2,
    /// Active-low OE; enable, then latch.
    InvertedOeLatchLast = 3,
}

impl From<u8> for ControlStyle {
    /// Unknown indices fall back to [`ControlStyle::Standard`].
    fn from(index: u8) -> Self {
        match index {
            1 => Self::LatchLast,
            2 => Self::InvertedOe,
            3 => Self::InvertedOeLatchLast,
            _ => Self::Standard,
        }
    }
}

struct StyleTemplate {
    /// Control-Frame bytes before the row address is ORed in.
    control: [u8; CONTROL_FRAME_LEN],
    /// OE level that blanks the panel.
    oe_off: u8,
}

/// Indexed by `ControlStyle as usize`.
const STYLE_TABLE: [StyleTemplate; 4] = [
    StyleTemplate {
        control: [0, CCLK, LAT, LAT | CCLK, OE, OE | CCLK],
        oe_off: 0,
    },
    StyleTemplate {
        control: [0, CCLK, OE, OE | CCLK, LAT, LAT | CCLK],
        oe_off: 0,
    },
    StyleTemplate {
        control: [OE, OE | CCLK, OE | LAT, OE | LAT | CCLK, 0, CCLK],
        oe_off: OE,
    },
    StyleTemplate {
        control: [OE, OE | CCLK, 0, CCLK, OE | LAT, OE | LAT | CCLK],
        oe_off: OE,
    },
];

impl ControlStyle {
    #[allow(clippy::indexing_slicing)] // discriminants are 0..=3
    fn template(self) -> &'static StyleTemplate {
        &STYLE_TABLE[self as usize]
    }

    /// OE level that blanks the panel.
    pub fn oe_off(self) -> u8 {
        self.template().oe_off
    }

    /// OE level that lights the panel.
    pub fn oe_on(self) -> u8 {
        self.template().oe_off ^ OE
    }

    /// Control-Frame for scan row `row`.
    pub fn control_frame(self, row: usize) -> [u8; CONTROL_FRAME_LEN] {
        #[allow(clippy::cast_possible_truncation)] // masked to four bits
        let addr = (row as u8) & bits::ADDR_MASK;
        self.template().control.map(|b| b | addr)
    }

    /// Control-Frame that clocks the control latch without latching a row,
    /// holding OE off.
    pub fn tail_control_frame(self) -> [u8; CONTROL_FRAME_LEN] {
        let off = self.oe_off();
        [off, off | CCLK, off, off | CCLK, off, off | CCLK]
    }
}

/// Packs pixels into, and builds the clock/control skeleton of, render
/// buffers for one geometry and plane count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitPlaneLayout {
    geometry: PanelGeometry,
    planes: u8,
    style: ControlStyle,
}

// Offsets are products of geometry dimensions and indices bounded by them;
// every buffer access goes through `get`/`get_mut` or chunk iterators.
#[allow(clippy::arithmetic_side_effects)]
impl BitPlaneLayout {
    /// Layout for `geometry` with `planes` brightness planes.
    ///
    /// The chain width must be a multiple of `2^(planes - 1)` so every plane's
    /// OE span is exactly twice the one below it.
    pub fn new(geometry: PanelGeometry, planes: u8) -> Result<Self, MatrixError> {
        if !geometry.is_valid() {
            return Err(MatrixError::Geometry);
        }
        if planes == 0 || planes > MAX_PLANES {
            return Err(MatrixError::PlaneCount(planes));
        }
        let lsb_divisor = 1usize << (planes - 1);
        if geometry.columns() % lsb_divisor != 0 {
            return Err(MatrixError::PlaneCount(planes));
        }
        Ok(Self {
            geometry,
            planes,
            style: ControlStyle::Standard,
        })
    }

    /// Panel geometry.
    pub const fn geometry(&self) -> PanelGeometry {
        self.geometry
    }

    /// Brightness planes per channel.
    pub const fn planes(&self) -> u8 {
        self.planes
    }

    /// Style used by the last [`initialize`](Self::initialize).
    pub const fn style(&self) -> ControlStyle {
        self.style
    }

    /// Exact render-buffer length.
    pub const fn buffer_len(&self) -> usize {
        self.geometry.buffer_len(self.planes)
    }

    /// Columns during which OE is held on while the frame after a plane-`plane`
    /// row shifts in. Zero for a plane this layout does not have.
    pub fn oe_span(&self, plane: u8) -> usize {
        match self.planes.checked_sub(1).and_then(|top| top.checked_sub(plane)) {
            Some(shift) => (self.geometry.columns() >> shift).max(1),
            None => 0,
        }
    }

    /// Plane whose row is latched by the frame preceding `(plane, scan_row)`
    /// in stream order. The tail frame latches nothing and is skipped, so the
    /// first frame of plane 0 follows the last frame of the top plane.
    pub fn previous_plane(&self, plane: u8, scan_row: usize) -> u8 {
        let plane = plane % self.planes;
        if scan_row > 0 {
            plane
        } else {
            (plane + self.planes - 1) % self.planes
        }
    }

    /// Byte offset of `column`'s first Data-Frame byte in `(plane, scan_row)`.
    pub fn data_offset(&self, plane: u8, scan_row: usize, column: usize) -> usize {
        usize::from(plane) * self.geometry.plane_size()
            + scan_row * self.geometry.row_stride()
            + column * DATA_BYTES_PER_COLUMN
    }

    /// Byte offset of the Control-Frame in `(plane, scan_row)`.
    pub fn control_offset(&self, plane: u8, scan_row: usize) -> usize {
        usize::from(plane) * self.geometry.plane_size()
            + scan_row * self.geometry.row_stride()
            + self.geometry.data_frame_len()
    }

    /// Byte offset of the tail frame.
    pub fn tail_offset(&self) -> usize {
        usize::from(self.planes) * self.geometry.plane_size()
    }

    /// Write the clock/control skeleton: every Data-Frame cleared to no colour
    /// with SCLK on every second byte and the plane-weighted OE prefix, every
    /// Control-Frame addressed for its scan row, and the dark tail frame.
    ///
    /// Overwrites any pixel data. Running it twice yields the same bytes.
    pub fn initialize(&mut self, buf: &mut [u8], style: ControlStyle) -> Result<(), MatrixError> {
        self.check_len(buf)?;
        self.style = style;

        let g = self.geometry;
        let data_len = g.data_frame_len();
        let (on, off) = (style.oe_on(), style.oe_off());
        let frame_count = usize::from(self.planes) * g.scan_rows;
        let mut frames = buf.chunks_exact_mut(g.row_stride());

        for (index, frame) in frames.by_ref().take(frame_count).enumerate() {
            #[allow(clippy::cast_possible_truncation)] // index / scan_rows < planes <= 8
            let plane = (index / g.scan_rows) as u8;
            let scan_row = index % g.scan_rows;
            let (data, control) = frame.split_at_mut(data_len);
            let span = self.oe_span(self.previous_plane(plane, scan_row));
            for (column, pair) in data.chunks_exact_mut(DATA_BYTES_PER_COLUMN).enumerate() {
                let oe = if column < span { on } else { off };
                for (i, byte) in pair.iter_mut().enumerate() {
                    *byte = if i == 0 { oe } else { oe | SCLK };
                }
            }
            control.copy_from_slice(&style.control_frame(scan_row));
        }

        if let Some(tail) = frames.next() {
            let (data, control) = tail.split_at_mut(data_len);
            data.fill(off);
            control.copy_from_slice(&style.tail_control_frame());
        }

        debug!(
            "bcm: layout initialized ({} planes, {} bytes, style {})",
            self.planes,
            self.buffer_len(),
            style as u8
        );
        Ok(())
    }

    /// Store `color` at `addr`, touching only that half's colour bits.
    ///
    /// Addresses outside the chain are ignored.
    pub fn write_pixel(&self, buf: &mut [u8], addr: PhysicalAddress, color: Quantized) {
        if !self.contains(addr) {
            return;
        }
        let (scan_row, lanes) = self.lanes(addr.row);
        let mask = lanes[0] | lanes[1] | lanes[2];
        for plane in 0..self.planes {
            let (r, g, b) = color.plane_bits(plane);
            let value = (if r { lanes[0] } else { 0 })
                | (if g { lanes[1] } else { 0 })
                | (if b { lanes[2] } else { 0 });
            let offset = self.data_offset(plane, scan_row, addr.column);
            let end = offset + DATA_BYTES_PER_COLUMN;
            if let Some(pair) = buf.get_mut(offset..end) {
                for byte in pair {
                    *byte = (*byte & !mask) | value;
                }
            }
        }
    }

    /// Read back the colour stored at `addr` (from the SCLK-low byte).
    ///
    /// Addresses outside the chain read as black.
    pub fn read_pixel(&self, buf: &[u8], addr: PhysicalAddress) -> Quantized {
        let mut q = Quantized::BLACK;
        if !self.contains(addr) {
            return q;
        }
        let (scan_row, lanes) = self.lanes(addr.row);
        for plane in 0..self.planes {
            let offset = self.data_offset(plane, scan_row, addr.column);
            let byte = buf.get(offset).copied().unwrap_or(0);
            if byte & lanes[0] != 0 {
                q.r |= 1 << plane;
            }
            if byte & lanes[1] != 0 {
                q.g |= 1 << plane;
            }
            if byte & lanes[2] != 0 {
                q.b |= 1 << plane;
            }
        }
        q
    }

    /// Set (`lit`) or clear every colour bit of every plane in one pass,
    /// leaving clock, OE and Control-Frames untouched.
    pub fn fill_uniform(&self, buf: &mut [u8], lit: bool) {
        let g = self.geometry;
        let value = if lit { COLOR_MASK } else { 0 };
        let frames = usize::from(self.planes) * g.scan_rows;
        for frame in buf.chunks_exact_mut(g.row_stride()).take(frames) {
            for byte in frame.iter_mut().take(g.data_frame_len()) {
                *byte = (*byte & !COLOR_MASK) | value;
            }
        }
    }

    /// True when `addr` names a pixel of this chain.
    pub fn contains(&self, addr: PhysicalAddress) -> bool {
        addr.row < self.geometry.segment_height() && addr.column < self.geometry.columns()
    }

    /// Scan row and `[r, g, b]` port bits for a physical row.
    fn lanes(&self, row: usize) -> (usize, [u8; 3]) {
        let scan_rows = self.geometry.scan_rows;
        if row < scan_rows {
            (row, [bits::R1, bits::G1, bits::B1])
        } else {
            (row - scan_rows, [bits::R2, bits::G2, bits::B2])
        }
    }

    fn check_len(&self, buf: &[u8]) -> Result<(), MatrixError> {
        if buf.len() == self.buffer_len() {
            Ok(())
        } else {
            Err(self.size_error(buf.len()))
        }
    }

    fn size_error(&self, actual: usize) -> MatrixError {
        MatrixError::BufferSize {
            expected: self.buffer_len(),
            actual,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use crate::config::MURUM_LUX;

    fn small() -> BitPlaneLayout {
        BitPlaneLayout::new(PanelGeometry::new(2, 4, 2), 3).unwrap()
    }

    #[test]
    fn test_rejects_bad_plane_count() {
        assert_eq!(
            BitPlaneLayout::new(MURUM_LUX, 0),
            Err(MatrixError::PlaneCount(0))
        );
        assert_eq!(
            BitPlaneLayout::new(MURUM_LUX, 9),
            Err(MatrixError::PlaneCount(9))
        );
        assert_eq!(
            BitPlaneLayout::new(PanelGeometry::new(1, 8, 0), 4),
            Err(MatrixError::Geometry)
        );
    }

    #[test]
    fn test_initialize_rejects_wrong_len() {
        let mut layout = small();
        let mut buf = vec![0u8; layout.buffer_len() - 1];
        assert_eq!(
            layout.initialize(&mut buf, ControlStyle::Standard),
            Err(MatrixError::BufferSize {
                expected: layout.buffer_len(),
                actual: layout.buffer_len() - 1
            })
        );
    }

    #[test]
    fn test_control_frame_standard() {
        let frame = ControlStyle::Standard.control_frame(5);
        assert_eq!(frame, [5, 5 | CCLK, 5 | LAT, 5 | LAT | CCLK, 5 | OE, 5 | OE | CCLK]);
    }

    #[test]
    fn test_latch_last_swaps_pairs() {
        let standard = ControlStyle::Standard.control_frame(3);
        let last = ControlStyle::LatchLast.control_frame(3);
        assert_eq!(&standard[..2], &last[..2]);
        assert_eq!(&standard[2..4], &last[4..6]);
        assert_eq!(&standard[4..6], &last[2..4]);
    }

    #[test]
    fn test_inverted_oe_levels() {
        assert_eq!(ControlStyle::InvertedOe.oe_off(), OE);
        assert_eq!(ControlStyle::InvertedOe.oe_on(), 0);
        assert_eq!(ControlStyle::Standard.oe_on(), OE);
    }

    #[test]
    fn test_unknown_style_falls_back() {
        assert_eq!(ControlStyle::from(7), ControlStyle::Standard);
        assert_eq!(ControlStyle::from(255), ControlStyle::Standard);
        assert_eq!(ControlStyle::from(3), ControlStyle::InvertedOeLatchLast);
    }

    #[test]
    fn test_oe_span_doubles_per_plane() {
        let layout = BitPlaneLayout::new(MURUM_LUX, 4).unwrap();
        assert_eq!(layout.oe_span(0), 24);
        assert_eq!(layout.oe_span(1), 48);
        assert_eq!(layout.oe_span(2), 96);
        assert_eq!(layout.oe_span(3), 192);
    }

    /// Plane counts whose weights would not halve exactly are refused; every
    /// accepted count yields a doubling span ladder ending at the full width.
    #[test]
    fn test_oe_spans_are_binary_weights() {
        assert_eq!(
            BitPlaneLayout::new(MURUM_LUX, 8),
            Err(MatrixError::PlaneCount(8))
        );
        assert_eq!(
            BitPlaneLayout::new(PanelGeometry::new(1, 4, 1), 4),
            Err(MatrixError::PlaneCount(4))
        );

        let geometries = [
            MURUM_LUX,
            PanelGeometry::new(1, 4, 1),
            PanelGeometry::new(2, 8, 2),
            PanelGeometry::new(4, 64, 16),
        ];
        for g in geometries {
            for planes in 1..=MAX_PLANES {
                let Ok(layout) = BitPlaneLayout::new(g, planes) else {
                    continue;
                };
                let spans: Vec<usize> = (0..planes).map(|k| layout.oe_span(k)).collect();
                assert_eq!(spans[usize::from(planes) - 1], g.columns());
                for k in 1..spans.len() {
                    assert_eq!(spans[k], 2 * spans[k - 1], "{g:?} planes {planes}");
                }
            }
        }
        // 256 columns carry all eight planes, plane 0 one column wide
        let wide = BitPlaneLayout::new(PanelGeometry::new(4, 64, 16), 8).unwrap();
        assert_eq!(wide.oe_span(0), 2);
    }

    /// Asking for a plane the layout does not have is not a panic.
    #[test]
    fn test_oe_span_out_of_range_plane() {
        let layout = BitPlaneLayout::new(MURUM_LUX, 4).unwrap();
        assert_eq!(layout.oe_span(4), 0);
        assert_eq!(layout.oe_span(u8::MAX), 0);
        assert_eq!(layout.previous_plane(u8::MAX, 0), 2);
    }

    #[test]
    fn test_previous_plane_wraps_over_tail() {
        let layout = small();
        assert_eq!(layout.previous_plane(0, 0), 2);
        assert_eq!(layout.previous_plane(1, 0), 0);
        assert_eq!(layout.previous_plane(1, 1), 1);
    }

    #[test]
    fn test_initialize_small_layout_bytes() {
        let mut layout = small();
        let mut buf = vec![0xAAu8; layout.buffer_len()];
        layout.initialize(&mut buf, ControlStyle::Standard).unwrap();

        // plane 0, row 0 follows plane 2: span = 8 >> 0 = 8, all columns lit
        let first = &buf[..16];
        for pair in first.chunks(2) {
            assert_eq!(pair, &[OE, OE | SCLK]);
        }
        // plane 0, row 1 follows plane 0: span = 8 >> 2 = 2
        let off = layout.data_offset(0, 1, 0);
        assert_eq!(&buf[off..off + 4], &[OE, OE | SCLK, OE, OE | SCLK]);
        assert_eq!(&buf[off + 4..off + 6], &[0, SCLK]);

        let ctl = layout.control_offset(0, 1);
        assert_eq!(&buf[ctl..ctl + 6], &ControlStyle::Standard.control_frame(1));

        let tail = layout.tail_offset();
        assert!(buf[tail..tail + 16].iter().all(|&b| b == 0));
        assert_eq!(&buf[tail + 16..], &[0, CCLK, 0, CCLK, 0, CCLK]);
    }

    #[test]
    fn test_inverted_tail_holds_oe_high() {
        let mut layout = small();
        let mut buf = vec![0u8; layout.buffer_len()];
        layout.initialize(&mut buf, ControlStyle::InvertedOe).unwrap();
        let tail = layout.tail_offset();
        assert!(buf[tail..tail + 16].iter().all(|&b| b == OE));
        assert!(buf[tail + 16..].iter().all(|&b| b & OE != 0));
        assert!(buf[tail + 16..].iter().all(|&b| b & LAT == 0));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut layout = BitPlaneLayout::new(MURUM_LUX, 4).unwrap();
        let mut a = vec![0u8; layout.buffer_len()];
        layout.initialize(&mut a, ControlStyle::LatchLast).unwrap();
        let once = a.clone();
        layout.initialize(&mut a, ControlStyle::LatchLast).unwrap();
        assert_eq!(a, once);
    }

    #[test]
    fn test_write_pixel_touches_only_its_half() {
        let mut layout = small();
        let mut buf = vec![0u8; layout.buffer_len()];
        layout.initialize(&mut buf, ControlStyle::Standard).unwrap();
        let before = buf.clone();

        let upper = PhysicalAddress { segment: 0, row: 1, column: 2 };
        let lower = PhysicalAddress { segment: 0, row: 3, column: 2 };
        layout.write_pixel(&mut buf, upper, Quantized { r: 0b101, g: 0, b: 0b111 });
        layout.write_pixel(&mut buf, lower, Quantized { r: 0, g: 0b010, b: 0 });

        assert_eq!(layout.read_pixel(&buf, upper), Quantized { r: 0b101, g: 0, b: 0b111 });
        assert_eq!(layout.read_pixel(&buf, lower), Quantized { r: 0, g: 0b010, b: 0 });

        for (i, (&now, &was)) in buf.iter().zip(before.iter()).enumerate() {
            assert_eq!(now & !COLOR_MASK, was & !COLOR_MASK, "byte {i}");
        }
        // plane 1 of row 1 holds only the lower-half green bit
        let off = layout.data_offset(1, 1, 2);
        assert_eq!(buf[off] & COLOR_MASK, bits::B1 | bits::G2);
        assert_eq!(buf[off + 1] & COLOR_MASK, bits::B1 | bits::G2);
    }

    #[test]
    fn test_fill_uniform_preserves_control() {
        let mut layout = small();
        let mut buf = vec![0u8; layout.buffer_len()];
        layout.initialize(&mut buf, ControlStyle::Standard).unwrap();
        let before = buf.clone();

        layout.fill_uniform(&mut buf, true);
        let stride = layout.geometry().row_stride();
        for (i, (&now, &was)) in buf.iter().zip(before.iter()).enumerate() {
            let in_data = i < layout.tail_offset() && i % stride < layout.geometry().data_frame_len();
            if in_data {
                assert_eq!(now, was | COLOR_MASK);
            } else {
                assert_eq!(now, was);
            }
        }

        layout.fill_uniform(&mut buf, false);
        assert_eq!(buf, before);
    }

    /// Addresses past the chain (column or row) are ignored by writes and read
    /// as black, leaving control frames and the next plane untouched.
    #[test]
    fn test_out_of_range_address_is_ignored() {
        let mut layout = BitPlaneLayout::new(MURUM_LUX, 4).unwrap();
        let mut buf = vec![0u8; layout.buffer_len()];
        layout.initialize(&mut buf, ControlStyle::Standard).unwrap();
        let before = buf.clone();

        let past_column = PhysicalAddress { segment: 0, row: 0, column: 192 };
        let past_row = PhysicalAddress { segment: 0, row: 32, column: 0 };
        let far_row = PhysicalAddress { segment: 0, row: 2 * 16 + 5, column: 7 };
        for addr in [past_column, past_row, far_row] {
            assert!(!layout.contains(addr));
            layout.write_pixel(&mut buf, addr, Quantized::full(4));
            assert_eq!(layout.read_pixel(&buf, addr), Quantized::BLACK);
        }

        assert_eq!(buf, before);
        let ctl = layout.control_offset(0, 0);
        assert_eq!(&buf[ctl..ctl + 6], &ControlStyle::Standard.control_frame(0));
    }
}
