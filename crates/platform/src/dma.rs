//! DMA abstraction layer
//!
//! The LED matrix is refreshed by a block-transfer engine that copies the
//! render buffer, one byte per trigger, into an 8-bit output port. The CPU
//! never touches the port while a pass is in flight; it only arms the engine,
//! polls for completion and re-arms it.
//!
//! Register-level details (channel enable bits, source/destination size
//! registers, trigger selection) belong to a single backend implementing
//! [`TransferEngine`]. Everything above this trait is hardware-agnostic and
//! runs on the host against [`crate::mocks::SimulatedEngine`].

/// Block-transfer engine capability.
///
/// One *pass* streams `len` bytes starting at the registered source pointer
/// to the output port and then disarms itself. The engine has no notion of
/// cancellation: once armed, a pass always runs to completion.
pub trait TransferEngine {
    /// Error type
    type Error: core::fmt::Debug;

    /// Register `source` as the pass source and start streaming it.
    ///
    /// # Safety
    ///
    /// The `len` bytes at `source` must stay allocated until [`is_done`]
    /// reports completion of this pass. The caller may keep writing to the
    /// region (the engine streams whatever is in memory when each byte is
    /// fetched), but must not free or move it.
    ///
    /// [`is_done`]: TransferEngine::is_done
    unsafe fn arm(&mut self, source: *const u8, len: usize) -> Result<(), Self::Error>;

    /// Check whether the current pass has completed (engine disarmed).
    ///
    /// An engine that has never been armed reports `true`.
    fn is_done(&self) -> bool;

    /// Force the channel off. Only meaningful between passes.
    fn disarm(&mut self) -> Result<(), Self::Error>;
}

impl<T: TransferEngine + ?Sized> TransferEngine for &mut T {
    type Error = T::Error;

    unsafe fn arm(&mut self, source: *const u8, len: usize) -> Result<(), Self::Error> {
        // SAFETY: forwarded from the caller's contract.
        unsafe { T::arm(self, source, len) }
    }

    fn is_done(&self) -> bool {
        T::is_done(self)
    }

    fn disarm(&mut self) -> Result<(), Self::Error> {
        T::disarm(self)
    }
}

/// DMA buffer trait (read-only access)
pub trait DmaBuffer {
    /// Get buffer pointer
    fn as_ptr(&self) -> *const u8;

    /// Get buffer length
    fn len(&self) -> usize;

    /// Check if buffer is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DmaBuffer for &[u8] {
    fn as_ptr(&self) -> *const u8 {
        (*self).as_ptr()
    }

    fn len(&self) -> usize {
        (*self).len()
    }
}

impl DmaBuffer for &mut [u8] {
    fn as_ptr(&self) -> *const u8 {
        (**self).as_ptr()
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Start a pass over `buffer`.
///
/// # Safety
///
/// Same contract as [`TransferEngine::arm`]: `buffer`'s storage must outlive
/// the pass.
pub unsafe fn arm_buffer<E, B>(engine: &mut E, buffer: &B) -> Result<(), E::Error>
where
    E: TransferEngine + ?Sized,
    B: DmaBuffer + ?Sized,
{
    // SAFETY: forwarded from the caller's contract.
    unsafe { engine.arm(buffer.as_ptr(), buffer.len()) }
}

/// A `#[repr(align(32))]` wrapper for statically allocated render buffers.
///
/// Keeps the buffer start on a cache-line / burst boundary so the transfer
/// engine can fetch it without split bursts.
///
/// # Example
///
/// ```
/// use platform::dma::Align32;
///
/// static mut RENDER: Align32<[u8; 4096]> = Align32([0u8; 4096]);
/// ```
#[derive(Clone, Copy)]
#[repr(align(32))]
pub struct Align32<T>(
    /// The inner value. Must be public so callers can construct and destructure the wrapper.
    pub T,
);

impl<T> core::ops::Deref for Align32<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> core::ops::DerefMut for Align32<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}
