//! Panel geometry and render-buffer sizing.
//!
//! The physical display is a daisy chain of identical HUB75-style segments.
//! Each segment is `segment_width` columns wide and `2 × scan_rows` rows tall:
//! one row-select address drives an upper-half row (R1/G1/B1 lines) and the
//! row `scan_rows` below it (R2/G2/B2 lines) at the same time.
//!
//! ```text
//! Render buffer (one per slot)
//!
//! ┌─ plane 0 ─────────────────────────────────────────────┐
//! │ row frame 0:  [data: 2 B × columns][control: 6 B]      │
//! │ row frame 1:  ...                                     │
//! │ row frame scan_rows-1                                 │
//! ├─ plane 1 … plane N-1 ─────────────────────────────────┤
//! └─ tail frame: [dark data: 2 B × columns][OE-off: 6 B] ─┘
//! ```

/// Bytes emitted per column in a Data-Frame (shift clock low, then high).
pub const DATA_BYTES_PER_COLUMN: usize = 2;

/// Bytes in a Control-Frame (address, latch and output-enable, each clocked).
pub const CONTROL_FRAME_LEN: usize = 6;

/// Largest scan-row count addressable through the four row-select lines.
pub const MAX_SCAN_ROWS: usize = 16;

/// Fixed, build-time description of the tiled panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelGeometry {
    /// Number of chained segments.
    pub segments: usize,
    /// Columns per segment (also the logical display width).
    pub segment_width: usize,
    /// Row-select addresses per segment (half the segment height).
    pub scan_rows: usize,
}

// Dimensions are build-time constants in the tens to hundreds; every product
// below stays far inside usize.
#[allow(clippy::arithmetic_side_effects)]
impl PanelGeometry {
    /// Describe a chain of `segments` panels, each `segment_width` wide and
    /// `2 × scan_rows` tall.
    pub const fn new(segments: usize, segment_width: usize, scan_rows: usize) -> Self {
        Self {
            segments,
            segment_width,
            scan_rows,
        }
    }

    /// True when every dimension is non-zero and the scan rows fit the
    /// address lines.
    pub const fn is_valid(&self) -> bool {
        self.segments > 0
            && self.segment_width > 0
            && self.scan_rows > 0
            && self.scan_rows <= MAX_SCAN_ROWS
    }

    /// Physical rows in one segment.
    pub const fn segment_height(&self) -> usize {
        self.scan_rows * 2
    }

    /// Columns in the whole shift chain.
    pub const fn columns(&self) -> usize {
        self.segments * self.segment_width
    }

    /// Unrotated logical width.
    pub const fn logical_width(&self) -> usize {
        self.segment_width
    }

    /// Unrotated logical height (segments stacked vertically).
    pub const fn logical_height(&self) -> usize {
        self.segments * self.segment_height()
    }

    /// Bytes in the Data-Frame of one row frame.
    pub const fn data_frame_len(&self) -> usize {
        self.columns() * DATA_BYTES_PER_COLUMN
    }

    /// Bytes in one row frame (Data-Frame followed by Control-Frame).
    pub const fn row_stride(&self) -> usize {
        self.data_frame_len() + CONTROL_FRAME_LEN
    }

    /// Bytes in one brightness plane.
    pub const fn plane_size(&self) -> usize {
        self.scan_rows * self.row_stride()
    }

    /// Bytes in the trailing dark frame.
    pub const fn tail_size(&self) -> usize {
        self.row_stride()
    }

    /// Exact render-buffer length for `planes` brightness planes.
    pub const fn buffer_len(&self, planes: u8) -> usize {
        planes as usize * self.plane_size() + self.tail_size()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn test_three_segment_buffer_len() {
        let g = PanelGeometry::new(3, 64, 16);
        assert_eq!(g.columns(), 192);
        assert_eq!(g.row_stride(), 192 * 2 + 6);
        assert_eq!(g.buffer_len(4), 4 * 16 * (192 * 2 + 6) + (192 * 2 + 6));
        assert_eq!(g.buffer_len(4), 25_350);
    }

    #[test]
    fn test_logical_surface_is_tall() {
        let g = PanelGeometry::new(3, 64, 16);
        assert_eq!(g.logical_width(), 64);
        assert_eq!(g.logical_height(), 96);
        assert_eq!(g.segment_height(), 32);
    }

    #[test]
    fn test_validity() {
        assert!(PanelGeometry::new(1, 32, 8).is_valid());
        assert!(!PanelGeometry::new(0, 32, 8).is_valid());
        assert!(!PanelGeometry::new(1, 0, 8).is_valid());
        assert!(!PanelGeometry::new(1, 32, 17).is_valid());
    }
}
