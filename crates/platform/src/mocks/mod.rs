//! Mock implementations for testing
//!
//! [`SimulatedEngine`] stands in for the DMA channel that streams the render
//! buffer to the panel port. It never touches a port; it only tracks the
//! arm/complete cycle and fingerprints the source region so tests can check
//! what a pass would have put on the wire.

#![cfg(any(test, feature = "std"))]

use core::cell::Cell;

use crate::dma::TransferEngine;

/// How a [`SimulatedEngine`] pass reaches completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Complete after `n` calls to `is_done` (0 = complete on the first poll).
    AfterPolls(u32),
    /// Only complete when [`SimulatedEngine::complete`] is called.
    Manual,
    /// Never complete: models a hung channel or a lost completion flag.
    Never,
}

/// Error injected by [`SimulatedEngine::fail_next_arm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedFault;

/// Simulated block-transfer engine
pub struct SimulatedEngine {
    completion: Completion,
    source: *const u8,
    len: usize,
    armed: Cell<bool>,
    polls_left: Cell<u32>,
    passes_completed: Cell<usize>,
    armed_crc: u32,
    completed_crc: Cell<Option<u32>>,
    arm_count: usize,
    disarm_count: usize,
    fail_next_arm: bool,
}

impl SimulatedEngine {
    /// Create a new engine whose passes complete after `completion`.
    pub fn new(completion: Completion) -> Self {
        Self {
            completion,
            source: core::ptr::null(),
            len: 0,
            armed: Cell::new(false),
            polls_left: Cell::new(0),
            passes_completed: Cell::new(0),
            armed_crc: 0,
            completed_crc: Cell::new(None),
            arm_count: 0,
            disarm_count: 0,
            fail_next_arm: false,
        }
    }

    /// Engine whose passes complete on the first poll.
    pub fn instant() -> Self {
        Self::new(Completion::AfterPolls(0))
    }

    /// Change the completion behaviour for the current and later passes.
    pub fn set_completion(&mut self, completion: Completion) {
        self.completion = completion;
        if let Completion::AfterPolls(n) = completion {
            self.polls_left.set(n);
        }
    }

    /// Make the next `arm` call fail with [`SimulatedFault`].
    pub fn fail_next_arm(&mut self) {
        self.fail_next_arm = true;
    }

    /// Finish the in-flight pass now, regardless of the completion mode.
    pub fn complete(&mut self) {
        if self.armed.get() {
            self.finish_pass();
        }
    }

    /// True while a pass is in flight.
    pub fn is_armed(&self) -> bool {
        self.armed.get()
    }

    /// Number of successful `arm` calls.
    pub fn arm_count(&self) -> usize {
        self.arm_count
    }

    /// Number of explicit `disarm` calls.
    pub fn disarm_count(&self) -> usize {
        self.disarm_count
    }

    /// Number of passes that ran to completion.
    pub fn passes_completed(&self) -> usize {
        self.passes_completed.get()
    }

    /// Address and length registered by the most recent `arm`.
    pub fn last_source(&self) -> Option<(*const u8, usize)> {
        if self.source.is_null() {
            None
        } else {
            Some((self.source, self.len))
        }
    }

    /// CRC32 of the source region as it was when the last pass was armed.
    pub fn armed_crc(&self) -> u32 {
        self.armed_crc
    }

    /// CRC32 of the source region as it was when the last pass completed.
    pub fn completed_crc(&self) -> Option<u32> {
        self.completed_crc.get()
    }

    fn source_crc(&self) -> u32 {
        if self.source.is_null() {
            return 0;
        }
        // SAFETY: the `arm` contract keeps the region allocated until the
        // pass completes, and this is only called while armed.
        let bytes = unsafe { core::slice::from_raw_parts(self.source, self.len) };
        crc32fast::hash(bytes)
    }

    fn finish_pass(&self) {
        self.completed_crc.set(Some(self.source_crc()));
        self.armed.set(false);
        self.passes_completed
            .set(self.passes_completed.get().saturating_add(1));
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::instant()
    }
}

impl TransferEngine for SimulatedEngine {
    type Error = SimulatedFault;

    unsafe fn arm(&mut self, source: *const u8, len: usize) -> Result<(), Self::Error> {
        if self.fail_next_arm {
            self.fail_next_arm = false;
            return Err(SimulatedFault);
        }
        self.source = source;
        self.len = len;
        self.armed_crc = self.source_crc();
        self.completed_crc.set(None);
        if let Completion::AfterPolls(n) = self.completion {
            self.polls_left.set(n);
        }
        self.armed.set(true);
        self.arm_count = self.arm_count.saturating_add(1);
        Ok(())
    }

    fn is_done(&self) -> bool {
        if !self.armed.get() {
            return true;
        }
        match self.completion {
            Completion::AfterPolls(_) => {
                let left = self.polls_left.get();
                if left == 0 {
                    self.finish_pass();
                    true
                } else {
                    self.polls_left.set(left.saturating_sub(1));
                    false
                }
            }
            Completion::Manual | Completion::Never => false,
        }
    }

    fn disarm(&mut self) -> Result<(), Self::Error> {
        self.armed.set(false);
        self.disarm_count = self.disarm_count.saturating_add(1);
        Ok(())
    }
}
