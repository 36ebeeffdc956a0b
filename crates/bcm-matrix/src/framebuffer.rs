//! Render-buffer ownership and double buffering.
//!
//! Storage is handed in once by the caller (typically a `static`
//! [`platform::Align32`] array) and never resized. With double buffering the
//! region is split in two equal halves: pixel writes land in the back half
//! while the transfer engine streams the front half.

use embedded_graphics::pixelcolor::{Rgb565, RgbColor};

use crate::color::Quantized;
use crate::error::MatrixError;
use crate::layout::{BitPlaneLayout, ControlStyle};
use crate::remap::{Remapper, Rotation};

/// One or two render buffers plus the layout that packs them.
pub struct FrameBuffers<'a> {
    slots: [&'a mut [u8]; 2],
    double_buffered: bool,
    back: usize,
    layout: BitPlaneLayout,
    remap: Remapper,
    initialized: bool,
}

impl<'a> FrameBuffers<'a> {
    /// Take ownership of `storage`.
    ///
    /// `storage` must hold exactly one render buffer, or two when
    /// `double_buffered` is set.
    pub fn new(
        layout: BitPlaneLayout,
        storage: &'a mut [u8],
        double_buffered: bool,
    ) -> Result<Self, MatrixError> {
        let fb_size = layout.buffer_len();
        let expected = if double_buffered {
            fb_size.checked_mul(2).ok_or(MatrixError::Geometry)?
        } else {
            fb_size
        };
        if storage.len() != expected {
            return Err(MatrixError::BufferSize {
                expected,
                actual: storage.len(),
            });
        }

        // Single-buffered storage leaves the second slot empty and unused.
        let (first, second) = storage.split_at_mut(fb_size);
        Ok(Self {
            slots: [first, second],
            double_buffered,
            back: 0,
            layout,
            remap: Remapper::new(layout.geometry()),
            initialized: false,
        })
    }

    /// Packing rules for these buffers.
    pub fn layout(&self) -> &BitPlaneLayout {
        &self.layout
    }

    /// Logical → physical mapper.
    pub fn remapper(&self) -> &Remapper {
        &self.remap
    }

    /// Change the drawing rotation.
    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.remap.set_rotation(rotation);
    }

    /// True when back and front are distinct buffers.
    pub fn is_double_buffered(&self) -> bool {
        self.double_buffered
    }

    /// True once [`initialize_layout`](Self::initialize_layout) has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Build the clock/control skeleton in every buffer.
    pub fn initialize_layout(&mut self, style: ControlStyle) -> Result<(), MatrixError> {
        let Self {
            slots,
            double_buffered,
            layout,
            ..
        } = self;
        let used = if *double_buffered { 2 } else { 1 };
        for slot in slots.iter_mut().take(used) {
            layout.initialize(slot, style)?;
        }
        self.initialized = true;
        Ok(())
    }

    /// Store `color` at logical `(x, y)` in the back buffer. Out-of-range
    /// coordinates are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb565) {
        let q = Quantized::from_rgb565(color, self.layout.planes());
        self.set_pixel_quantized(x, y, q);
    }

    /// Like [`set_pixel`](Self::set_pixel) for a colour already reduced to the
    /// plane depth (e.g. through the gamma path).
    pub fn set_pixel_quantized(&mut self, x: i32, y: i32, color: Quantized) {
        if let Some(addr) = self.remap.map(x, y) {
            let layout = self.layout;
            layout.write_pixel(self.back_mut(), addr, color);
        }
    }

    /// Read the back buffer's colour at logical `(x, y)`.
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Quantized> {
        let addr = self.remap.map(x, y)?;
        Some(self.layout.read_pixel(self.back(), addr))
    }

    /// Paint the whole back buffer.
    ///
    /// Black and white take a bulk pass over the colour bits; any other colour
    /// is written pixel by pixel.
    pub fn fill_screen(&mut self, color: Rgb565) {
        if color == Rgb565::BLACK || color == Rgb565::WHITE {
            let layout = self.layout;
            layout.fill_uniform(self.back_mut(), color == Rgb565::WHITE);
            return;
        }
        let (w, h) = self.remap.size();
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let (w, h) = (w as i32, h as i32);
        let q = Quantized::from_rgb565(color, self.layout.planes());
        for y in 0..h {
            for x in 0..w {
                self.set_pixel_quantized(x, y, q);
            }
        }
    }

    /// Back buffer, for bulk writes that respect the row-frame layout.
    pub fn back_buffer(&mut self) -> &mut [u8] {
        self.back_mut()
    }

    /// Read-only view of the back buffer.
    #[allow(clippy::indexing_slicing)] // slot indices are 0 or 1
    pub fn back(&self) -> &[u8] {
        &*self.slots[self.back]
    }

    /// Buffer the transfer engine streams.
    #[allow(clippy::indexing_slicing)] // slot indices are 0 or 1
    pub fn front_buffer(&self) -> &[u8] {
        &*self.slots[self.front_index()]
    }

    /// Exchange back and front. With `copy_forward` the new back buffer starts
    /// as a copy of the new front. Single-buffered: no-op.
    ///
    /// Must only run while the engine is not streaming.
    pub fn flip(&mut self, copy_forward: bool) {
        if !self.double_buffered {
            return;
        }
        self.back = self.front_index();
        if copy_forward {
            let [a, b] = &mut self.slots;
            if self.back == 0 {
                a.copy_from_slice(&**b);
            } else {
                b.copy_from_slice(&**a);
            }
        }
    }

    fn front_index(&self) -> usize {
        if self.double_buffered {
            self.back ^ 1
        } else {
            self.back
        }
    }

    #[allow(clippy::indexing_slicing)] // slot indices are 0 or 1
    fn back_mut(&mut self) -> &mut [u8] {
        &mut *self.slots[self.back]
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
    use crate::geometry::PanelGeometry;

    fn layout() -> BitPlaneLayout {
        BitPlaneLayout::new(PanelGeometry::new(2, 8, 4), 4).unwrap()
    }

    #[test]
    fn test_rejects_wrong_storage() {
        let l = layout();
        let mut storage = vec![0u8; l.buffer_len()];
        let err = FrameBuffers::new(l, &mut storage, true).err();
        assert_eq!(
            err,
            Some(MatrixError::BufferSize {
                expected: 2 * l.buffer_len(),
                actual: l.buffer_len()
            })
        );
    }

    #[test]
    fn test_single_buffer_aliases_front_and_back() {
        let l = layout();
        let mut storage = vec![0u8; l.buffer_len()];
        let mut fb = FrameBuffers::new(l, &mut storage, false).unwrap();
        fb.initialize_layout(ControlStyle::Standard).unwrap();
        fb.set_pixel(1, 1, Rgb565::GREEN);
        assert_eq!(fb.back(), fb.front_buffer());
        fb.flip(true);
        assert_eq!(fb.get_pixel(1, 1), Some(Quantized { r: 0, g: 15, b: 0 }));
    }

    #[test]
    fn test_writes_land_in_back_only() {
        let l = layout();
        let mut storage = vec![0u8; 2 * l.buffer_len()];
        let mut fb = FrameBuffers::new(l, &mut storage, true).unwrap();
        fb.initialize_layout(ControlStyle::Standard).unwrap();
        let front = fb.front_buffer().to_vec();

        fb.set_pixel(3, 5, Rgb565::BLUE);
        assert_eq!(fb.front_buffer(), &front[..]);
        assert_ne!(fb.back(), &front[..]);
    }

    #[test]
    fn test_flip_without_copy_exposes_old_front() {
        let l = layout();
        let mut storage = vec![0u8; 2 * l.buffer_len()];
        let mut fb = FrameBuffers::new(l, &mut storage, true).unwrap();
        fb.initialize_layout(ControlStyle::Standard).unwrap();

        fb.set_pixel(0, 0, Rgb565::RED);
        fb.flip(false);
        assert_eq!(fb.get_pixel(0, 0), Some(Quantized::BLACK));
        fb.flip(false);
        assert_eq!(fb.get_pixel(0, 0), Some(Quantized { r: 15, g: 0, b: 0 }));
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let l = layout();
        let mut storage = vec![0u8; l.buffer_len()];
        let mut fb = FrameBuffers::new(l, &mut storage, false).unwrap();
        fb.initialize_layout(ControlStyle::Standard).unwrap();
        let before = fb.back().to_vec();
        fb.set_pixel(-1, 0, Rgb565::WHITE);
        fb.set_pixel(0, 1000, Rgb565::WHITE);
        assert_eq!(fb.back(), &before[..]);
        assert_eq!(fb.get_pixel(8, 0), None);
    }
}
