//! `MatrixPanel`: the application-facing driver.
//!
//! Ties the render storage, packing rules and refresh driver together and is
//! the only place that hands render-buffer addresses to the transfer engine.
//!
//! # Usage
//!
//! ```rust,ignore
//! static mut RENDER: Align32<[u8; 2 * MURUM_LUX_FB_SIZE]> = Align32([0; 2 * MURUM_LUX_FB_SIZE]);
//!
//! let mut panel = MatrixPanel::new(
//!     MURUM_LUX, DEFAULT_PLANES, unsafe { &mut *RENDER }, true,
//!     engine, RefreshConfig::default(),
//! )?;
//! panel.initialize_layout(ControlStyle::Standard)?;
//! panel.begin()?;
//!
//! loop {
//!     draw(&mut panel);
//!     panel.swap_buffers(false)?;
//!     panel.update_display()?; // from the periodic tick
//! }
//! ```

use core::fmt;

use embassy_time::Duration;
use embedded_graphics::pixelcolor::Rgb565;
use platform::dma::TransferEngine;

use crate::color::Quantized;
use crate::config::RefreshConfig;
use crate::dump::write_c_array;
use crate::error::MatrixError;
use crate::framebuffer::FrameBuffers;
use crate::geometry::PanelGeometry;
use crate::layout::{BitPlaneLayout, ControlStyle};
use crate::refresh::{RefreshDriver, RefreshState, RefreshStats};
use crate::remap::Rotation;

/// BCM LED-matrix driver over caller-provided render storage.
///
/// Dropping the panel forces the transfer engine off so it never reads the
/// storage after the borrow ends.
pub struct MatrixPanel<'a, E: TransferEngine> {
    buffers: FrameBuffers<'a>,
    driver: RefreshDriver<E>,
}

impl<'a, E: TransferEngine> MatrixPanel<'a, E> {
    /// Build a panel over `storage`.
    ///
    /// `storage` must be exactly one render buffer long (two when
    /// `double_buffered`); see [`PanelGeometry::buffer_len`].
    pub fn new(
        geometry: PanelGeometry,
        planes: u8,
        storage: &'a mut [u8],
        double_buffered: bool,
        engine: E,
        config: RefreshConfig,
    ) -> Result<Self, MatrixError> {
        let layout = BitPlaneLayout::new(geometry, planes)?;
        let buffers = FrameBuffers::new(layout, storage, double_buffered)?;
        Ok(Self {
            buffers,
            driver: RefreshDriver::new(engine, config),
        })
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Write the clock/control skeleton into every render buffer, erasing any
    /// pixels. Must run before [`begin`](Self::begin).
    pub fn initialize_layout(&mut self, style: ControlStyle) -> Result<(), MatrixError> {
        self.buffers.initialize_layout(style)
    }

    /// Start streaming the front buffer. No-op once started.
    pub fn begin(&mut self) -> Result<(), MatrixError> {
        if !self.buffers.is_initialized() {
            return Err(MatrixError::NotInitialized);
        }
        let front = self.buffers.front_buffer();
        // SAFETY: `front` points into the storage borrowed for 'a; Drop
        // disarms the engine before that borrow ends.
        unsafe { self.driver.begin(front) }
    }

    /// Periodic service: re-arm the engine on the front buffer once the
    /// previous pass completed.
    pub fn update_display(&mut self) -> Result<RefreshState, MatrixError> {
        let front = self.buffers.front_buffer();
        // SAFETY: see `begin`.
        unsafe { self.driver.service(front) }
    }

    /// Wait for the in-flight pass to finish, exchange back and front, and
    /// resume streaming on the new front. With `copy_forward` the new back
    /// buffer starts as a copy of what is now displayed.
    ///
    /// Single-buffered panels return immediately. Fails with
    /// [`MatrixError::SwapTimeout`] if the pass does not finish within
    /// [`RefreshConfig::swap_timeout`]; the buffers are left unswapped.
    pub fn swap_buffers(&mut self, copy_forward: bool) -> Result<(), MatrixError> {
        if !self.buffers.is_double_buffered() {
            return Ok(());
        }
        let timeout = self.driver.config().swap_timeout;
        self.driver.wait_for_pass_end(timeout)?;
        self.buffers.flip(copy_forward);
        let front = self.buffers.front_buffer();
        // SAFETY: see `begin`.
        unsafe { self.driver.resume(front) }?;
        trace!("bcm: buffers swapped (copy_forward={})", copy_forward);
        Ok(())
    }

    /// Claim the render buffer while the engine is idle. Returns whether the
    /// claim is held; while held, [`update_display`](Self::update_display)
    /// does not re-arm.
    pub fn take_pattern_buffer(&mut self) -> bool {
        self.driver.take_pattern_buffer()
    }

    /// Release the claim and resume streaming. No-op when not held.
    pub fn release_pattern_buffer(&mut self) -> Result<(), MatrixError> {
        let front = self.buffers.front_buffer();
        // SAFETY: see `begin`.
        unsafe { self.driver.release_pattern_buffer(front) }
    }

    /// Time since the pattern buffer was last released.
    pub fn since_last_release(&self) -> Option<Duration> {
        self.driver.since_last_release()
    }

    // ─── Drawing ─────────────────────────────────────────────────────────────

    /// Store `color` at logical `(x, y)` in the back buffer. Out-of-range
    /// coordinates are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb565) {
        self.buffers.set_pixel(x, y, color);
    }

    /// Store an already-quantized colour (see [`Quantized::from_rgb888_gamma`]).
    pub fn set_pixel_quantized(&mut self, x: i32, y: i32, color: Quantized) {
        self.buffers.set_pixel_quantized(x, y, color);
    }

    /// Read back the back buffer's colour at `(x, y)`.
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Quantized> {
        self.buffers.get_pixel(x, y)
    }

    /// Paint the whole back buffer.
    pub fn fill_screen(&mut self, color: Rgb565) {
        self.buffers.fill_screen(color);
    }

    /// Back buffer, for bulk writes that respect the row-frame layout.
    pub fn back_buffer(&mut self) -> &mut [u8] {
        self.buffers.back_buffer()
    }

    /// Buffer the engine streams.
    pub fn front_buffer(&self) -> &[u8] {
        self.buffers.front_buffer()
    }

    /// Change the drawing rotation.
    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.buffers.set_rotation(rotation);
    }

    /// Current drawing rotation.
    pub fn rotation(&self) -> Rotation {
        self.buffers.remapper().rotation()
    }

    /// Logical `(width, height)` after rotation.
    pub fn logical_size(&self) -> (usize, usize) {
        self.buffers.remapper().size()
    }

    // ─── Diagnostics ─────────────────────────────────────────────────────────

    /// Write the back buffer as a C array initializer.
    pub fn dump_matrix<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        write_c_array(out, self.buffers.back())
    }

    /// Packing rules in use.
    pub fn layout(&self) -> &BitPlaneLayout {
        self.buffers.layout()
    }

    /// True when back and front are distinct buffers.
    pub fn is_double_buffered(&self) -> bool {
        self.buffers.is_double_buffered()
    }

    /// Refresh state as of the last poll.
    pub fn state(&self) -> RefreshState {
        self.driver.state()
    }

    /// Refresh counters.
    pub fn stats(&self) -> RefreshStats {
        self.driver.stats()
    }

    /// The transfer engine.
    pub fn engine(&self) -> &E {
        self.driver.engine()
    }

    /// The transfer engine, mutably.
    pub fn engine_mut(&mut self) -> &mut E {
        self.driver.engine_mut()
    }
}

impl<E: TransferEngine> Drop for MatrixPanel<'_, E> {
    fn drop(&mut self) {
        if self.driver.state() != RefreshState::Idle {
            // Nothing left to report the error to; shutdown logs it.
            let _ = self.driver.shutdown();
        }
    }
}
