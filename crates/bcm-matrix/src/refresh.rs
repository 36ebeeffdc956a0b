//! Refresh driver: keeps the transfer engine streaming the front buffer.
//!
//! # Pass lifecycle
//!
//! ```text
//!          begin            engine done
//!   Idle ─────────▶ Streaming ─────────▶ Done
//!                      ▲                  │
//!                      └──── re-arm ──────┘
//!                  (update_display / swap / release)
//! ```
//!
//! There is no abort: once armed, a pass runs to completion, so `Streaming`
//! never returns to `Idle`. Everything that must not race the engine (buffer
//! flips, pattern-buffer claims) waits for `Done`.
//!
//! The application calls the service routine from its periodic tick. If two
//! ticks are further apart than [`RefreshConfig::epoch_budget`] the panel has
//! sat dark (or frozen on one row) for longer than a refresh epoch; that is
//! counted and logged but not treated as an error.

use embassy_time::{Duration, Instant};
use platform::dma::{arm_buffer, TransferEngine};

use crate::config::RefreshConfig;
use crate::error::MatrixError;

// ─── State ───────────────────────────────────────────────────────────────────

/// Where the transfer engine is in its pass cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RefreshState {
    /// Never armed.
    Idle,
    /// A pass is in flight; the front buffer is being read.
    Streaming,
    /// The last pass finished and the engine disarmed itself.
    Done,
}

/// Counters for diagnostics. All saturate instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RefreshStats {
    /// Passes observed to complete.
    pub passes: u32,
    /// Successful arm requests (first pass included).
    pub arms: u32,
    /// Service ticks that arrived later than the epoch budget.
    pub latency_violations: u32,
}

// ─── Driver ──────────────────────────────────────────────────────────────────

/// Owns the transfer engine and sequences its passes.
///
/// Arming takes the source buffer as a plain slice, so the driver itself
/// never holds a reference into render storage. Those entry points are
/// crate-private and `unsafe`: the caller (the panel) guarantees the slice's
/// storage outlives the pass.
pub struct RefreshDriver<E: TransferEngine> {
    engine: E,
    state: RefreshState,
    config: RefreshConfig,
    pattern_held: bool,
    last_service: Option<Instant>,
    last_release: Option<Instant>,
    stats: RefreshStats,
}

impl<E: TransferEngine> RefreshDriver<E> {
    /// Wrap `engine`; nothing is armed until `begin`.
    pub fn new(engine: E, config: RefreshConfig) -> Self {
        Self {
            engine,
            state: RefreshState::Idle,
            config,
            pattern_held: false,
            last_service: None,
            last_release: None,
            stats: RefreshStats::default(),
        }
    }

    /// Current pass state (as of the last poll).
    pub fn state(&self) -> RefreshState {
        self.state
    }

    /// Timing configuration.
    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Diagnostic counters.
    pub fn stats(&self) -> RefreshStats {
        self.stats
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The wrapped engine, mutably (for backend-specific controls).
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// True while the pattern buffer is claimed and re-arming is suspended.
    pub fn is_pattern_held(&self) -> bool {
        self.pattern_held
    }

    /// Time since the pattern buffer was last released, or `None` if it never
    /// was.
    pub fn since_last_release(&self) -> Option<Duration> {
        self.last_release.map(|t| t.elapsed())
    }

    /// Check the engine and advance `Streaming → Done` if the pass finished.
    pub fn poll(&mut self) -> RefreshState {
        if self.state == RefreshState::Streaming && self.engine.is_done() {
            self.state = RefreshState::Done;
            self.stats.passes = self.stats.passes.saturating_add(1);
        }
        self.state
    }

    /// Arm the first pass. No-op once streaming has started.
    ///
    /// # Safety
    ///
    /// `front`'s storage must stay allocated until the pass completes.
    pub(crate) unsafe fn begin(&mut self, front: &[u8]) -> Result<(), MatrixError> {
        if self.state != RefreshState::Idle {
            return Ok(());
        }
        // SAFETY: forwarded from the caller's contract.
        unsafe { self.arm(front) }?;
        info!("bcm: refresh started ({} bytes per pass)", front.len());
        Ok(())
    }

    /// Periodic service: record tick latency, then re-arm if the last pass
    /// finished and the pattern buffer is not held.
    ///
    /// # Safety
    ///
    /// `front`'s storage must stay allocated until the pass completes.
    pub(crate) unsafe fn service(&mut self, front: &[u8]) -> Result<RefreshState, MatrixError> {
        let now = Instant::now();
        if let Some(prev) = self.last_service.replace(now) {
            let gap = now.saturating_duration_since(prev);
            if self.state != RefreshState::Idle && gap > self.config.epoch_budget {
                self.stats.latency_violations = self.stats.latency_violations.saturating_add(1);
                warn!(
                    "bcm: service gap {} ms exceeds {} ms refresh epoch",
                    gap.as_millis(),
                    self.config.epoch_budget.as_millis()
                );
            }
        }

        // SAFETY: forwarded from the caller's contract.
        unsafe { self.resume(front) }
    }

    /// Re-arm on `front` if the last pass finished and the pattern buffer is
    /// not held. Does not start a never-begun driver.
    ///
    /// # Safety
    ///
    /// `front`'s storage must stay allocated until the pass completes.
    pub(crate) unsafe fn resume(&mut self, front: &[u8]) -> Result<RefreshState, MatrixError> {
        if self.poll() == RefreshState::Done && !self.pattern_held {
            // SAFETY: forwarded from the caller's contract.
            unsafe { self.arm(front) }?;
        }
        Ok(self.state)
    }

    /// Spin until the in-flight pass (if any) completes, for at most
    /// `timeout`.
    pub fn wait_for_pass_end(&mut self, timeout: Duration) -> Result<(), MatrixError> {
        if self.poll() != RefreshState::Streaming {
            return Ok(());
        }
        let deadline = Instant::now()
            .checked_add(timeout)
            .unwrap_or(Instant::MAX);
        loop {
            if self.poll() != RefreshState::Streaming {
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!(
                    "bcm: pass still streaming after {} ms, giving up",
                    timeout.as_millis()
                );
                return Err(MatrixError::SwapTimeout);
            }
            core::hint::spin_loop();
        }
    }

    /// Claim the render buffer for exclusive use. Succeeds (and stays
    /// claimed) only while the engine is not streaming; re-arming is
    /// suspended until the claim is released.
    pub fn take_pattern_buffer(&mut self) -> bool {
        if self.pattern_held {
            return true;
        }
        if self.poll() == RefreshState::Streaming {
            return false;
        }
        self.pattern_held = true;
        trace!("bcm: pattern buffer taken");
        true
    }

    /// Drop the claim and resume streaming `front`. No-op when not held; a
    /// driver that was never begun stays idle.
    ///
    /// # Safety
    ///
    /// `front`'s storage must stay allocated until the pass completes.
    pub(crate) unsafe fn release_pattern_buffer(&mut self, front: &[u8]) -> Result<(), MatrixError> {
        if !self.pattern_held {
            return Ok(());
        }
        if self.state == RefreshState::Done {
            // SAFETY: forwarded from the caller's contract.
            unsafe { self.arm(front) }?;
        }
        self.last_release = Some(Instant::now());
        self.pattern_held = false;
        trace!("bcm: pattern buffer released");
        Ok(())
    }

    /// Force the channel off. Used on teardown only.
    pub(crate) fn shutdown(&mut self) -> Result<(), MatrixError> {
        self.engine.disarm().map_err(|_| {
            warn!("bcm: transfer engine refused to disarm");
            MatrixError::Engine
        })
    }

    /// # Safety
    ///
    /// `front`'s storage must stay allocated until the pass completes.
    unsafe fn arm(&mut self, front: &[u8]) -> Result<(), MatrixError> {
        // SAFETY: forwarded from the caller's contract.
        unsafe { arm_buffer(&mut self.engine, &front) }.map_err(|_| {
            warn!("bcm: transfer engine rejected arm");
            MatrixError::Engine
        })?;
        self.state = RefreshState::Streaming;
        self.stats.arms = self.stats.arms.saturating_add(1);
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::undocumented_unsafe_blocks,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use platform::mocks::{Completion, SimulatedEngine};

    fn driver(completion: Completion) -> RefreshDriver<SimulatedEngine> {
        RefreshDriver::new(SimulatedEngine::new(completion), RefreshConfig::default())
    }

    // ── Test A ────────────────────────────────────────────────────────────────
    /// A fresh driver is idle and polling does not move it.
    #[test]
    fn test_initial_state_is_idle() {
        let mut d = driver(Completion::AfterPolls(0));
        assert_eq!(d.state(), RefreshState::Idle);
        assert_eq!(d.poll(), RefreshState::Idle);
    }

    // ── Test B ────────────────────────────────────────────────────────────────
    /// begin arms once; a second begin does not re-arm.
    #[test]
    fn test_begin_arms_once() {
        let buf = [0u8; 32];
        let mut d = driver(Completion::Manual);
        unsafe { d.begin(&buf) }.unwrap();
        assert_eq!(d.state(), RefreshState::Streaming);
        unsafe { d.begin(&buf) }.unwrap();
        assert_eq!(d.engine().arm_count(), 1);
        assert_eq!(d.engine().last_source(), Some((buf.as_ptr(), buf.len())));
    }

    // ── Test C ────────────────────────────────────────────────────────────────
    /// Streaming → Done → Streaming through the service routine.
    #[test]
    fn test_service_rearms_after_done() {
        let buf = [0u8; 32];
        let mut d = driver(Completion::Manual);
        unsafe { d.begin(&buf) }.unwrap();

        assert_eq!(unsafe { d.service(&buf) }.unwrap(), RefreshState::Streaming);
        assert_eq!(d.engine().arm_count(), 1);

        d.engine_mut().complete();
        assert_eq!(unsafe { d.service(&buf) }.unwrap(), RefreshState::Streaming);
        assert_eq!(d.engine().arm_count(), 2);
        assert_eq!(d.stats().passes, 1);
    }

    // ── Test D ────────────────────────────────────────────────────────────────
    /// No sequence of polls and services ever takes Streaming back to Idle.
    #[test]
    fn test_streaming_never_returns_to_idle() {
        let buf = [0u8; 8];
        let mut d = driver(Completion::AfterPolls(2));
        unsafe { d.begin(&buf) }.unwrap();
        for i in 0..50 {
            let state = if i % 3 == 0 {
                unsafe { d.service(&buf) }.unwrap()
            } else {
                d.poll()
            };
            assert_ne!(state, RefreshState::Idle);
        }
    }

    // ── Test E ────────────────────────────────────────────────────────────────
    /// wait_for_pass_end times out on a stalled engine.
    #[test]
    fn test_wait_times_out_on_stall() {
        let buf = [0u8; 8];
        let mut d = driver(Completion::Never);
        unsafe { d.begin(&buf) }.unwrap();
        let started = Instant::now();
        assert_eq!(
            d.wait_for_pass_end(Duration::from_millis(5)),
            Err(MatrixError::SwapTimeout)
        );
        assert!(started.elapsed() >= Duration::from_millis(5));
        assert_eq!(d.state(), RefreshState::Streaming);
    }

    // ── Test F ────────────────────────────────────────────────────────────────
    /// Pattern-buffer claim is refused while streaming and suppresses re-arm.
    #[test]
    fn test_pattern_buffer_hold() {
        let buf = [0u8; 8];
        let mut d = driver(Completion::Manual);
        unsafe { d.begin(&buf) }.unwrap();
        assert!(!d.take_pattern_buffer());

        d.engine_mut().complete();
        assert!(d.take_pattern_buffer());
        assert!(d.since_last_release().is_none());

        assert_eq!(unsafe { d.service(&buf) }.unwrap(), RefreshState::Done);
        assert_eq!(d.engine().arm_count(), 1);

        unsafe { d.release_pattern_buffer(&buf) }.unwrap();
        assert_eq!(d.state(), RefreshState::Streaming);
        assert_eq!(d.engine().arm_count(), 2);
        assert!(d.since_last_release().is_some());
        assert!(!d.is_pattern_held());
    }

    // ── Test G ────────────────────────────────────────────────────────────────
    /// An engine arm failure surfaces as MatrixError::Engine and leaves the
    /// state unchanged.
    #[test]
    fn test_arm_failure_maps_to_engine_error() {
        let buf = [0u8; 8];
        let mut d = driver(Completion::AfterPolls(0));
        d.engine_mut().fail_next_arm();
        assert_eq!(unsafe { d.begin(&buf) }, Err(MatrixError::Engine));
        assert_eq!(d.state(), RefreshState::Idle);
        unsafe { d.begin(&buf) }.unwrap();
        assert_eq!(d.state(), RefreshState::Streaming);
    }

    // ── Test H ────────────────────────────────────────────────────────────────
    /// A service tick later than the epoch budget is counted, not failed.
    #[test]
    fn test_late_service_counts_violation() {
        let buf = [0u8; 8];
        let config = RefreshConfig {
            epoch_budget: Duration::from_millis(1),
            ..RefreshConfig::default()
        };
        let mut d = RefreshDriver::new(SimulatedEngine::instant(), config);
        unsafe { d.begin(&buf) }.unwrap();
        unsafe { d.service(&buf) }.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        unsafe { d.service(&buf) }.unwrap();
        assert_eq!(d.stats().latency_violations, 1);
    }

    // ── Test I ────────────────────────────────────────────────────────────────
    /// A claim taken before begin is released without starting the stream.
    #[test]
    fn test_release_before_begin_stays_idle() {
        let buf = [0u8; 8];
        let mut d = driver(Completion::AfterPolls(0));
        assert!(d.take_pattern_buffer());
        unsafe { d.release_pattern_buffer(&buf) }.unwrap();
        assert_eq!(d.state(), RefreshState::Idle);
        assert_eq!(d.engine().arm_count(), 0);
        assert!(d.since_last_release().is_some());
    }
}
