//! Hardware Abstraction Layer (HAL) for the Murum Lux LED matrix
//!
//! This crate provides the trait-based seam between the matrix driver and the
//! block-transfer hardware that streams its render buffer, enabling
//! development and testing without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application (drawing, scheduler tick)
//!         ↓
//! bcm-matrix (layout, double buffer, refresh driver)
//!         ↓
//! Platform HAL (this crate - TransferEngine capability)
//!         ↓
//! DMA channel backend (register-level, one per MCU)
//! ```
//!
//! # Features
//!
//! - `std`: Enable standard library support and the [`mocks`] module (pulls in `crc32fast`)
//!
//! # Example
//!
//! ```ignore
//! use platform::mocks::SimulatedEngine;
//! use platform::TransferEngine;
//!
//! let frame = [0u8; 64];
//! let mut engine = SimulatedEngine::instant();
//! // SAFETY: `frame` outlives the pass, which completes on the next poll.
//! unsafe { engine.arm(frame.as_ptr(), frame.len()) }.ok();
//! assert!(engine.is_done());
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
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)] // accessors: callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(feature = "std")]
extern crate std;

pub mod dma;
pub mod mocks;

pub use dma::{arm_buffer, Align32, DmaBuffer, TransferEngine};
