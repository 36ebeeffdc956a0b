//! Murum Lux refresh simulation
//!
//! Draws a hue sweep with a framed border into the back buffer, swaps it to
//! the front and services the refresh loop against a simulated transfer
//! engine, then prints the refresh counters and the first bytes of the
//! render buffer as a C array.
//!
//! Run with: cargo run -p bcm-matrix --example simulated_refresh --features std,tracing
//! Set RUST_LOG=trace to see swaps and pattern-buffer claims.

#![allow(clippy::arithmetic_side_effects, clippy::use_debug)]

use embedded_graphics::pixelcolor::{Rgb565, RgbColor};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use tracing_subscriber::EnvFilter;

use bcm_matrix::color::color_hsv;
use bcm_matrix::config::{DEFAULT_PLANES, MURUM_LUX, MURUM_LUX_FB_SIZE};
use bcm_matrix::{ControlStyle, MatrixPanel, RefreshConfig, Rotation};
use platform::mocks::{Completion, SimulatedEngine};

const FRAMES: i32 = 24;
const TICKS_PER_FRAME: usize = 8;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Murum Lux - refresh simulation");
    println!(
        "Wall: {} segments of {}x{} (1/{} scan), {} planes, {} bytes per buffer\n",
        MURUM_LUX.segments,
        MURUM_LUX.segment_width,
        MURUM_LUX.segment_height(),
        MURUM_LUX.scan_rows,
        DEFAULT_PLANES,
        MURUM_LUX_FB_SIZE,
    );

    let mut storage = vec![0u8; 2 * MURUM_LUX_FB_SIZE];
    let engine = SimulatedEngine::new(Completion::AfterPolls(2));
    let mut panel = MatrixPanel::new(
        MURUM_LUX,
        DEFAULT_PLANES,
        &mut storage,
        true,
        engine,
        RefreshConfig::default(),
    )?;
    panel.initialize_layout(ControlStyle::Standard)?;
    panel.set_rotation(Rotation::Deg0);
    panel.begin()?;

    let (width, height) = panel.logical_size();
    let (width, height) = (i32::try_from(width)?, i32::try_from(height)?);

    for frame in 0..FRAMES {
        for y in 0..height {
            let hue = (y * 1536 / height + frame * 64) % 1536;
            let color = color_hsv(hue, 255, 255, true);
            for x in 0..width {
                panel.set_pixel(x, y, color);
            }
        }
        Rectangle::new(Point::zero(), panel.size())
            .into_styled(PrimitiveStyle::with_stroke(Rgb565::WHITE, 1))
            .draw(&mut panel)?;

        panel.swap_buffers(false)?;
        for _ in 0..TICKS_PER_FRAME {
            panel.update_display()?;
        }
    }

    // Hold the pattern buffer for one frame, the way an external pattern
    // generator would, then hand it back.
    while !panel.take_pattern_buffer() {
        panel.update_display()?;
    }
    panel.release_pattern_buffer()?;

    let stats = panel.stats();
    println!(
        "passes: {}  arms: {}  late ticks: {}  state: {:?}\n",
        stats.passes,
        stats.arms,
        stats.latency_violations,
        panel.state(),
    );

    let mut dump = String::new();
    panel.dump_matrix(&mut dump)?;
    for line in dump.lines().take(6) {
        println!("{line}");
    }
    println!("  ...");

    Ok(())
}
