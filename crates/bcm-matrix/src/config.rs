//! Build-time configuration for the Murum Lux wall panel.

use embassy_time::Duration;

use crate::geometry::PanelGeometry;

/// Three 64×32 HUB75 segments, 1/16 scan, stacked into a 64×96 surface.
pub const MURUM_LUX: PanelGeometry = PanelGeometry::new(3, 64, 16);

/// Default brightness planes (4 bits per channel, 16 levels).
pub const DEFAULT_PLANES: u8 = 4;

/// Most planes a render buffer can carry (8 bits per channel).
pub const MAX_PLANES: u8 = 8;

/// Render-buffer length for [`MURUM_LUX`] at [`DEFAULT_PLANES`].
pub const MURUM_LUX_FB_SIZE: usize = MURUM_LUX.buffer_len(DEFAULT_PLANES);

/// Default swap timeout (ms). A full pass at the default plane count takes
/// well under 10 ms, so 100 ms only trips on a stalled engine.
pub const SWAP_TIMEOUT_MS: u64 = 100;

/// Default refresh epoch (ms): longest tolerated gap between two service
/// ticks before the stream is considered late.
pub const EPOCH_BUDGET_MS: u64 = 30;

/// Runtime timing knobs for the refresh driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Upper bound on how long `swap_buffers` waits for the in-flight pass.
    pub swap_timeout: Duration,
    /// Service-tick gap above which a latency violation is recorded.
    pub epoch_budget: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            swap_timeout: Duration::from_millis(SWAP_TIMEOUT_MS),
            epoch_budget: Duration::from_millis(EPOCH_BUDGET_MS),
        }
    }
}
