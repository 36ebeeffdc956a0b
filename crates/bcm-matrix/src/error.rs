//! Error types for the matrix driver.

use core::fmt;

/// Errors surfaced by the layout, buffer and refresh layers.
///
/// Out-of-range pixel writes are not errors; they are dropped silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MatrixError {
    /// Caller-provided storage does not match the computed buffer length.
    BufferSize {
        /// Bytes the layout requires.
        expected: usize,
        /// Bytes the caller supplied.
        actual: usize,
    },
    /// Plane count outside `1..=8`.
    PlaneCount(u8),
    /// Zero-sized panel or more scan rows than the address lines can select.
    Geometry,
    /// `begin` was called before `initialize_layout`.
    NotInitialized,
    /// The in-flight pass did not finish within the swap timeout.
    SwapTimeout,
    /// The transfer engine rejected an arm or disarm request.
    Engine,
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferSize { expected, actual } => write!(
                f,
                "render buffer size mismatch: expected {expected} bytes, got {actual}"
            ),
            Self::PlaneCount(n) => write!(f, "unsupported plane count {n} (expected 1..=8)"),
            Self::Geometry => f.write_str("invalid panel geometry"),
            Self::NotInitialized => f.write_str("layout not initialized before begin"),
            Self::SwapTimeout => f.write_str("timed out waiting for refresh pass to finish"),
            Self::Engine => f.write_str("transfer engine error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MatrixError {}
