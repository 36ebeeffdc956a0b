//! Property-based tests for the simulated transfer engine.
//! Verifies the arm/complete cycle for every poll budget, not just fixed
//! examples.
//!
//! Run with: cargo test -p platform --features std --test simulated_engine

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use platform::mocks::{Completion, SimulatedEngine};
use platform::{arm_buffer, DmaBuffer, TransferEngine};

proptest::proptest! {
    /// AfterPolls(n) reports done on exactly the (n+1)th poll.
    #[test]
    fn completes_on_poll_n_plus_one(n in 0u32..64, data in proptest::collection::vec(proptest::num::u8::ANY, 1..256)) {
        let mut engine = SimulatedEngine::new(Completion::AfterPolls(n));
        unsafe { engine.arm(data.as_ptr(), data.len()) }.unwrap();

        for _ in 0..n {
            assert!(!engine.is_done());
        }
        assert!(engine.is_done());
        assert!(!engine.is_armed());
        assert_eq!(engine.passes_completed(), 1);
        assert_eq!(engine.completed_crc(), Some(crc32fast::hash(&data)));
    }

    /// The armed fingerprint covers exactly the registered region.
    #[test]
    fn armed_crc_matches_source(data in proptest::collection::vec(proptest::num::u8::ANY, 0..512)) {
        let mut engine = SimulatedEngine::new(Completion::Manual);
        let src: &[u8] = &data;
        unsafe { arm_buffer(&mut engine, &src) }.unwrap();

        assert_eq!(engine.armed_crc(), crc32fast::hash(&data));
        assert_eq!(engine.last_source(), Some((src.as_ptr(), src.len())));
        assert_eq!(DmaBuffer::len(&src), data.len());
    }

    /// Re-arming resets the poll budget for every pass.
    #[test]
    fn rearm_resets_poll_budget(n in 0u32..16, passes in 1usize..8) {
        let data = [0xA5u8; 32];
        let mut engine = SimulatedEngine::new(Completion::AfterPolls(n));
        for _ in 0..passes {
            unsafe { engine.arm(data.as_ptr(), data.len()) }.unwrap();
            let mut polls = 1u32;
            while !engine.is_done() {
                polls += 1;
            }
            assert_eq!(polls, n + 1);
        }
        assert_eq!(engine.arm_count(), passes);
        assert_eq!(engine.passes_completed(), passes);
    }
}

/// A stalled engine stays armed until forced off.
#[test]
fn test_never_completes_until_disarmed() {
    let data = [1u8; 8];
    let mut engine = SimulatedEngine::new(Completion::Never);
    unsafe { engine.arm(data.as_ptr(), data.len()) }.unwrap();
    for _ in 0..1000 {
        assert!(!engine.is_done());
    }
    engine.disarm().unwrap();
    assert!(engine.is_done());
    assert_eq!(engine.disarm_count(), 1);
    assert_eq!(engine.passes_completed(), 0);
}
