//! Logical → physical coordinate mapping.
//!
//! The segments hang one above the other, cabled serpentine: every odd
//! segment is mounted upside down, and the chain input enters at the bottom
//! segment, so the top segment's columns are the last ones shifted in.
//!
//! ```text
//!   logical (64×96)         shift stream (192 columns)
//!   ┌──────────┐ seg 0     ┌────────┬────────┬────────┐
//!   │          │           │ seg 2  │ seg 1  │ seg 0  │
//!   ├──────────┤ seg 1 ↻   │ 0..64  │ 64..128│128..192│
//!   │          │           └────────┴────────┴────────┘
//!   ├──────────┤ seg 2
//!   └──────────┘
//! ```

use crate::geometry::PanelGeometry;

/// Display rotation, applied before the segment transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rotation {
    /// Native orientation.
    #[default]
    Deg0,
    /// 90° clockwise; width and height swap.
    Deg90,
    /// Upside down.
    Deg180,
    /// 270° clockwise; width and height swap.
    Deg270,
}

impl Rotation {
    /// True for the orientations that swap width and height.
    pub const fn is_transposed(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

impl From<u8> for Rotation {
    /// Quarter turns, modulo 4.
    fn from(quarter_turns: u8) -> Self {
        match quarter_turns % 4 {
            1 => Self::Deg90,
            2 => Self::Deg180,
            3 => Self::Deg270,
            _ => Self::Deg0,
        }
    }
}

/// A pixel's position in the shift stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhysicalAddress {
    /// Segment the pixel lives on (0 = top of the logical surface).
    pub segment: usize,
    /// Physical row inside the segment, `0..2 × scan_rows`.
    pub row: usize,
    /// Column in the whole chain, `0..columns`.
    pub column: usize,
}

/// Maps logical pixel coordinates onto the physical chain and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remapper {
    geometry: PanelGeometry,
    rotation: Rotation,
}

// All arithmetic below runs on coordinates already bounds-checked against the
// geometry, so sums and differences stay within 0..columns / 0..height.
#[allow(
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
impl Remapper {
    /// Unrotated mapper for `geometry`.
    pub const fn new(geometry: PanelGeometry) -> Self {
        Self {
            geometry,
            rotation: Rotation::Deg0,
        }
    }

    /// Panel geometry this mapper was built for.
    pub const fn geometry(&self) -> PanelGeometry {
        self.geometry
    }

    /// Current rotation.
    pub const fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Change the rotation for subsequent mappings.
    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    /// Advertised `(width, height)` after rotation.
    pub const fn size(&self) -> (usize, usize) {
        let (w, h) = (
            self.geometry.logical_width(),
            self.geometry.logical_height(),
        );
        if self.rotation.is_transposed() {
            (h, w)
        } else {
            (w, h)
        }
    }

    /// Map a logical coordinate to its stream position.
    ///
    /// Returns `None` outside the (rotated) logical surface.
    pub fn map(&self, x: i32, y: i32) -> Option<PhysicalAddress> {
        let (w, h) = self.size();
        if x < 0 || y < 0 || x as usize >= w || y as usize >= h {
            return None;
        }
        let (x, y) = self.unrotate(x as usize, y as usize);

        let g = &self.geometry;
        let seg_h = g.segment_height();
        let segment = y / seg_h;
        let mut row = y % seg_h;
        let mut x = x;
        if segment % 2 == 1 {
            x = g.segment_width - 1 - x;
            row = seg_h - 1 - row;
        }
        let column = (g.segments - 1 - segment) * g.segment_width + x;
        Some(PhysicalAddress {
            segment,
            row,
            column,
        })
    }

    /// Inverse of [`map`](Self::map).
    ///
    /// Returns `None` when the address is outside the chain or its `segment`
    /// does not own `column`.
    pub fn unmap(&self, addr: PhysicalAddress) -> Option<(i32, i32)> {
        let g = &self.geometry;
        let seg_h = g.segment_height();
        if addr.segment >= g.segments || addr.row >= seg_h || addr.column >= g.columns() {
            return None;
        }
        if g.segments - 1 - addr.column / g.segment_width != addr.segment {
            return None;
        }
        let mut x = addr.column % g.segment_width;
        let mut row = addr.row;
        if addr.segment % 2 == 1 {
            x = g.segment_width - 1 - x;
            row = seg_h - 1 - row;
        }
        let y = addr.segment * seg_h + row;
        let (x, y) = self.rotate(x, y);
        Some((x as i32, y as i32))
    }

    /// Rotated logical → unrotated logical.
    fn unrotate(&self, x: usize, y: usize) -> (usize, usize) {
        let w = self.geometry.logical_width();
        let h = self.geometry.logical_height();
        match self.rotation {
            Rotation::Deg0 => (x, y),
            Rotation::Deg90 => (w - 1 - y, x),
            Rotation::Deg180 => (w - 1 - x, h - 1 - y),
            Rotation::Deg270 => (y, h - 1 - x),
        }
    }

    /// Unrotated logical → rotated logical.
    fn rotate(&self, x: usize, y: usize) -> (usize, usize) {
        let w = self.geometry.logical_width();
        let h = self.geometry.logical_height();
        match self.rotation {
            Rotation::Deg0 => (x, y),
            Rotation::Deg90 => (y, w - 1 - x),
            Rotation::Deg180 => (w - 1 - x, h - 1 - y),
            Rotation::Deg270 => (h - 1 - y, x),
        }
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
    use crate::config::MURUM_LUX;

    #[test]
    fn test_top_segment_is_last_in_chain() {
        let m = Remapper::new(MURUM_LUX);
        let p = m.map(0, 0).unwrap();
        assert_eq!(p, PhysicalAddress { segment: 0, row: 0, column: 128 });
    }

    #[test]
    fn test_odd_segment_is_rotated() {
        let m = Remapper::new(MURUM_LUX);
        // First pixel of the middle segment lands at its far corner.
        let p = m.map(0, 32).unwrap();
        assert_eq!(p, PhysicalAddress { segment: 1, row: 31, column: 64 + 63 });
        let p = m.map(63, 63).unwrap();
        assert_eq!(p, PhysicalAddress { segment: 1, row: 0, column: 64 });
    }

    #[test]
    fn test_bottom_segment_is_first_in_chain() {
        let m = Remapper::new(MURUM_LUX);
        let p = m.map(5, 64 + 17).unwrap();
        assert_eq!(p, PhysicalAddress { segment: 2, row: 17, column: 5 });
    }

    #[test]
    fn test_out_of_range() {
        let m = Remapper::new(MURUM_LUX);
        assert_eq!(m.map(-1, 0), None);
        assert_eq!(m.map(0, -1), None);
        assert_eq!(m.map(64, 0), None);
        assert_eq!(m.map(0, 96), None);
    }

    #[test]
    fn test_rotation_swaps_size() {
        let mut m = Remapper::new(MURUM_LUX);
        assert_eq!(m.size(), (64, 96));
        m.set_rotation(Rotation::Deg90);
        assert_eq!(m.size(), (96, 64));
        assert!(m.map(95, 63).is_some());
        assert_eq!(m.map(64, 64), None);
    }

    #[test]
    fn test_unmap_rejects_foreign_column() {
        let m = Remapper::new(MURUM_LUX);
        let bad = PhysicalAddress { segment: 0, row: 0, column: 0 };
        assert_eq!(m.unmap(bad), None);
    }

    #[test]
    fn test_round_trip_every_pixel_every_rotation() {
        for quarter in 0..4u8 {
            let mut m = Remapper::new(MURUM_LUX);
            m.set_rotation(Rotation::from(quarter));
            let (w, h) = m.size();
            for y in 0..h as i32 {
                for x in 0..w as i32 {
                    let p = m.map(x, y).unwrap();
                    assert_eq!(m.unmap(p), Some((x, y)));
                }
            }
        }
    }

    #[test]
    fn test_map_is_injective() {
        let m = Remapper::new(MURUM_LUX);
        let mut seen = std::collections::HashSet::new();
        for y in 0..96 {
            for x in 0..64 {
                let p = m.map(x, y).unwrap();
                assert!(seen.insert((p.row, p.column)));
            }
        }
        assert_eq!(seen.len(), 64 * 96);
    }
}
