//! Refresh-pipeline integration tests: lifecycle, double buffering, swaps,
//! pattern-buffer claims and teardown, all against `SimulatedEngine`.
//!
//! Run with: cargo test -p bcm-matrix --test integration_refresh

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use bcm_matrix::config::{DEFAULT_PLANES, MURUM_LUX, MURUM_LUX_FB_SIZE};
use bcm_matrix::{ControlStyle, MatrixError, MatrixPanel, Quantized, RefreshConfig, RefreshState};
use embassy_time::Duration;
use embedded_graphics::pixelcolor::{Rgb565, RgbColor};
use platform::mocks::{Completion, SimulatedEngine};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const RED: Quantized = Quantized { r: 15, g: 0, b: 0 };

fn double(storage: &mut [u8], engine: SimulatedEngine) -> MatrixPanel<'_, SimulatedEngine> {
    let config = RefreshConfig {
        swap_timeout: Duration::from_millis(20),
        ..RefreshConfig::default()
    };
    let mut p = MatrixPanel::new(MURUM_LUX, DEFAULT_PLANES, storage, true, engine, config).unwrap();
    p.initialize_layout(ControlStyle::Standard).unwrap();
    p
}

// ---------------------------------------------------------------------------
// Test: lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_begin_requires_layout() {
    let mut storage = vec![0u8; MURUM_LUX_FB_SIZE];
    let mut p = MatrixPanel::new(
        MURUM_LUX,
        DEFAULT_PLANES,
        &mut storage,
        false,
        SimulatedEngine::instant(),
        RefreshConfig::default(),
    )
    .unwrap();
    assert_eq!(p.begin(), Err(MatrixError::NotInitialized));
    assert_eq!(p.state(), RefreshState::Idle);
    assert_eq!(p.engine().arm_count(), 0);
}

#[test]
fn test_begin_streams_front_buffer() {
    let mut storage = vec![0u8; 2 * MURUM_LUX_FB_SIZE];
    let mut p = double(&mut storage, SimulatedEngine::new(Completion::Manual));
    p.begin().unwrap();
    assert_eq!(p.state(), RefreshState::Streaming);
    let front = p.front_buffer();
    assert_eq!(
        p.engine().last_source(),
        Some((front.as_ptr(), MURUM_LUX_FB_SIZE))
    );
}

/// update_display before begin does not start the stream.
#[test]
fn test_update_before_begin_stays_idle() {
    let mut storage = vec![0u8; 2 * MURUM_LUX_FB_SIZE];
    let mut p = double(&mut storage, SimulatedEngine::instant());
    assert_eq!(p.update_display().unwrap(), RefreshState::Idle);
    assert_eq!(p.engine().arm_count(), 0);
}

/// The service routine keeps the stream alive; the state is never Idle once
/// streaming has begun.
#[test]
fn test_update_display_keeps_streaming() {
    let mut storage = vec![0u8; 2 * MURUM_LUX_FB_SIZE];
    let mut p = double(&mut storage, SimulatedEngine::new(Completion::AfterPolls(1)));
    p.begin().unwrap();
    for _ in 0..20 {
        let state = p.update_display().unwrap();
        assert_ne!(state, RefreshState::Idle);
    }
    assert!(p.stats().passes >= 5);
    assert_eq!(p.stats().arms, p.stats().passes + 1);
}

// ---------------------------------------------------------------------------
// Test: double buffering
// ---------------------------------------------------------------------------

/// A pass already armed streams the bytes that were there when it started;
/// later back-buffer writes do not reach it.
#[test]
fn test_armed_pass_does_not_see_back_writes() {
    let mut storage = vec![0u8; 2 * MURUM_LUX_FB_SIZE];
    let mut p = double(&mut storage, SimulatedEngine::new(Completion::Manual));
    p.begin().unwrap();

    p.fill_screen(Rgb565::WHITE);
    p.set_pixel(10, 10, Rgb565::RED);

    p.engine_mut().complete();
    assert_eq!(p.engine().completed_crc(), Some(p.engine().armed_crc()));
}

#[test]
fn test_swap_with_copy_forward_keeps_pixel() {
    let mut storage = vec![0u8; 2 * MURUM_LUX_FB_SIZE];
    let mut p = double(&mut storage, SimulatedEngine::instant());
    p.begin().unwrap();

    p.set_pixel(0, 0, Rgb565::RED);
    p.swap_buffers(true).unwrap();

    assert_eq!(p.get_pixel(0, 0), Some(RED));
    assert_eq!(p.state(), RefreshState::Streaming);
    // the engine now streams the buffer that was drawn into
    let front = p.front_buffer();
    assert_eq!(
        p.engine().last_source(),
        Some((front.as_ptr(), MURUM_LUX_FB_SIZE))
    );
}

#[test]
fn test_swap_without_copy_shows_previous_front() {
    let mut storage = vec![0u8; 2 * MURUM_LUX_FB_SIZE];
    let mut p = double(&mut storage, SimulatedEngine::instant());
    p.begin().unwrap();

    p.set_pixel(0, 0, Rgb565::RED);
    let old_front = p.front_buffer().as_ptr();
    p.swap_buffers(false).unwrap();

    assert_ne!(p.front_buffer().as_ptr(), old_front);
    // the red pixel is on screen, the new back buffer is the old blank front
    assert_eq!(p.get_pixel(0, 0), Some(Quantized::BLACK));
    p.swap_buffers(false).unwrap();
    assert_eq!(p.get_pixel(0, 0), Some(RED));
}

/// A stalled engine turns the swap into a bounded failure and leaves the
/// buffers where they were.
#[test]
fn test_swap_times_out_on_stalled_engine() {
    let mut storage = vec![0u8; 2 * MURUM_LUX_FB_SIZE];
    let mut p = double(&mut storage, SimulatedEngine::new(Completion::Never));
    p.begin().unwrap();
    p.set_pixel(1, 1, Rgb565::RED);
    let front = p.front_buffer().as_ptr();

    assert_eq!(p.swap_buffers(true), Err(MatrixError::SwapTimeout));
    assert_eq!(p.front_buffer().as_ptr(), front);
    assert_eq!(p.get_pixel(1, 1), Some(RED));
    assert_eq!(p.state(), RefreshState::Streaming);
}

/// Swap before begin just flips; nothing is armed.
#[test]
fn test_swap_before_begin() {
    let mut storage = vec![0u8; 2 * MURUM_LUX_FB_SIZE];
    let mut p = double(&mut storage, SimulatedEngine::instant());
    p.swap_buffers(false).unwrap();
    assert_eq!(p.state(), RefreshState::Idle);
    assert_eq!(p.engine().arm_count(), 0);
}

#[test]
fn test_single_buffer_swap_is_noop() {
    let mut storage = vec![0u8; MURUM_LUX_FB_SIZE];
    let mut p = MatrixPanel::new(
        MURUM_LUX,
        DEFAULT_PLANES,
        &mut storage,
        false,
        SimulatedEngine::new(Completion::Never),
        RefreshConfig::default(),
    )
    .unwrap();
    p.initialize_layout(ControlStyle::Standard).unwrap();
    p.begin().unwrap();
    p.set_pixel(2, 2, Rgb565::GREEN);
    assert!(!p.is_double_buffered());
    assert_eq!(p.swap_buffers(true), Ok(()));
    assert_eq!(p.get_pixel(2, 2), Some(Quantized { r: 0, g: 15, b: 0 }));
}

// ---------------------------------------------------------------------------
// Test: pattern buffer
// ---------------------------------------------------------------------------

#[test]
fn test_pattern_buffer_suspends_refresh() {
    let mut storage = vec![0u8; 2 * MURUM_LUX_FB_SIZE];
    let mut p = double(&mut storage, SimulatedEngine::new(Completion::Manual));
    p.begin().unwrap();

    assert!(!p.take_pattern_buffer(), "claim must fail mid-pass");
    p.engine_mut().complete();
    assert!(p.take_pattern_buffer());

    for _ in 0..3 {
        assert_eq!(p.update_display().unwrap(), RefreshState::Done);
    }
    assert_eq!(p.engine().arm_count(), 1);

    p.release_pattern_buffer().unwrap();
    assert_eq!(p.state(), RefreshState::Streaming);
    assert_eq!(p.engine().arm_count(), 2);
    assert!(p.since_last_release().unwrap() < Duration::from_secs(5));
}

// ---------------------------------------------------------------------------
// Test: teardown
// ---------------------------------------------------------------------------

#[test]
fn test_drop_disarms_streaming_engine() {
    let mut engine = SimulatedEngine::new(Completion::Never);
    {
        let mut storage = vec![0u8; MURUM_LUX_FB_SIZE];
        let mut p = MatrixPanel::new(
            MURUM_LUX,
            DEFAULT_PLANES,
            &mut storage,
            false,
            &mut engine,
            RefreshConfig::default(),
        )
        .unwrap();
        p.initialize_layout(ControlStyle::Standard).unwrap();
        p.begin().unwrap();
    }
    assert_eq!(engine.disarm_count(), 1);
    assert!(!engine.is_armed());
}

#[test]
fn test_drop_idle_panel_leaves_engine_alone() {
    let mut engine = SimulatedEngine::instant();
    {
        let mut storage = vec![0u8; MURUM_LUX_FB_SIZE];
        let _p = MatrixPanel::new(
            MURUM_LUX,
            DEFAULT_PLANES,
            &mut storage,
            false,
            &mut engine,
            RefreshConfig::default(),
        )
        .unwrap();
    }
    assert_eq!(engine.disarm_count(), 0);
}
