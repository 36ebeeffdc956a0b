//! Bit-plane (BCM) framebuffer and DMA refresh pipeline for HUB75 LED matrices
//!
//! Drives a tiled RGB LED wall from a pre-encoded render buffer that a block
//! transfer engine streams, one byte per trigger, onto an 8-bit output port.
//! The CPU only writes pixels and re-arms the engine; every shift clock,
//! latch strobe and output-enable edge is already in the bytes.
//!
//! # Pipeline
//!
//! ```text
//! set_pixel(x, y, Rgb565)
//!   → color::Quantized        (planes bits per channel, optional gamma)
//!   → remap::Remapper         (rotation, serpentine segments, chain order)
//!   → layout::BitPlaneLayout  (bit k → plane k, both Data-Frame bytes)
//!   → framebuffer             (back buffer; front is streaming)
//!   → refresh::RefreshDriver  (Idle → Streaming ⇄ Done)
//!   → platform::TransferEngine
//! ```
//!
//! # Features
//!
//! - `std`: `std::error::Error` for [`MatrixError`]
//! - `defmt`: log through `defmt` and derive `defmt::Format` on public types
//! - `tracing`: log through `tracing` (host simulation)
//!
//! # Example
//!
//! ```ignore
//! use bcm_matrix::config::{MURUM_LUX, DEFAULT_PLANES, MURUM_LUX_FB_SIZE, RefreshConfig};
//! use bcm_matrix::{ControlStyle, MatrixPanel};
//! use embedded_graphics::pixelcolor::{Rgb565, RgbColor};
//!
//! let mut storage = vec![0u8; 2 * MURUM_LUX_FB_SIZE];
//! let mut panel = MatrixPanel::new(
//!     MURUM_LUX, DEFAULT_PLANES, &mut storage, true, engine, RefreshConfig::default(),
//! )?;
//! panel.initialize_layout(ControlStyle::Standard)?;
//! panel.begin()?;
//! panel.set_pixel(0, 0, Rgb565::RED);
//! panel.swap_buffers(true)?;
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(feature = "std")]
extern crate std;

// Must come first so the log macros are visible in every module below.
#[macro_use]
mod fmt;

pub mod color;
pub mod config;
pub mod dump;
pub mod error;
pub mod framebuffer;
pub mod geometry;
mod graphics;
pub mod layout;
pub mod panel;
pub mod refresh;
pub mod remap;

pub use color::{color333, color444, color888, color888_gamma, color_hsv, Quantized};
pub use config::RefreshConfig;
pub use error::MatrixError;
pub use geometry::PanelGeometry;
pub use layout::{BitPlaneLayout, ControlStyle};
pub use panel::MatrixPanel;
pub use refresh::{RefreshDriver, RefreshState, RefreshStats};
pub use remap::{PhysicalAddress, Remapper, Rotation};
