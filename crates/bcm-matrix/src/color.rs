//! Colour quantization and packing helpers.
//!
//! The render buffer stores `planes` bits per channel. Every source format is
//! reduced to that depth by [`Quantized`]; the `color*` helpers build
//! [`Rgb565`] values from the narrower or wider formats applications tend to
//! carry around.

use embedded_graphics::pixelcolor::{Rgb565, RgbColor};

/// Channel depths of [`Rgb565`].
const R5: u8 = 5;
const G6: u8 = 6;
const B5: u8 = 5;

/// Hue steps in one turn of the [`color_hsv`] wheel.
pub const HUE_STEPS: i32 = 1536;

/// Gamma 2.5 lookup, 8-bit input to 8-bit linear-light output.
///
/// Built at compile time in integer arithmetic so the crate needs no float
/// support: `out = round(255 · (i / 255)^2.5)`.
pub static GAMMA8: [u8; 256] = gamma_table();

// Integer-only: isqrt result < 2^16, i² · s < 2^33. u64 never overflows.
#[allow(
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    clippy::indexing_slicing
)]
const fn gamma_table() -> [u8; 256] {
    const DENOM: u64 = 255 * 255 * 256;
    let mut table = [0u8; 256];
    let mut i = 0usize;
    while i < 256 {
        let x = i as u64;
        // sqrt(i · 255) in 8.8 fixed point
        let s = isqrt(x * 255 * 65_536);
        table[i] = ((x * x * s + DENOM / 2) / DENOM) as u8;
        i += 1;
    }
    table
}

#[allow(clippy::arithmetic_side_effects)]
const fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut lo = 1u64;
    let mut hi = if n < (1 << 32) { n } else { 1 << 32 };
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if mid <= n / mid {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

/// Rescale a `from_bits`-wide value to `to_bits`, truncating when narrowing
/// and replicating the high bits when widening.
///
/// Both widths must be in `1..=8`.
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
pub const fn rescale(value: u8, from_bits: u8, to_bits: u8) -> u8 {
    let value = (value as u16) & ((1u16 << from_bits) - 1);
    if to_bits <= from_bits {
        return (value >> (from_bits - to_bits)) as u8;
    }
    let mut out = 0u16;
    let mut filled = 0u8;
    while filled < to_bits {
        out = (out << from_bits) | value;
        filled += from_bits;
    }
    (out >> (filled - to_bits)) as u8
}

/// A colour reduced to the render buffer's per-channel depth.
///
/// Each channel holds a `planes`-bit value; bit `k` lands in plane `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Quantized {
    /// Red level.
    pub r: u8,
    /// Green level.
    pub g: u8,
    /// Blue level.
    pub b: u8,
}

impl Quantized {
    /// All channels off.
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };

    /// Every channel at full scale for `planes` bits.
    pub const fn full(planes: u8) -> Self {
        let max = rescale(0xFF, 8, planes);
        Self {
            r: max,
            g: max,
            b: max,
        }
    }

    /// Quantize an RGB565 sample without gamma correction.
    pub fn from_rgb565(color: Rgb565, planes: u8) -> Self {
        Self {
            r: rescale(color.r(), R5, planes),
            g: rescale(color.g(), G6, planes),
            b: rescale(color.b(), B5, planes),
        }
    }

    /// Quantize an 8/8/8 sample without gamma correction.
    pub const fn from_rgb888(r: u8, g: u8, b: u8, planes: u8) -> Self {
        Self {
            r: rescale(r, 8, planes),
            g: rescale(g, 8, planes),
            b: rescale(b, 8, planes),
        }
    }

    /// Quantize an 8/8/8 sample through the gamma 2.5 table.
    pub fn from_rgb888_gamma(r: u8, g: u8, b: u8, planes: u8) -> Self {
        Self::from_rgb888(gamma(r), gamma(g), gamma(b), planes)
    }

    /// Channel bits `(r, g, b)` stored in plane `plane`.
    pub const fn plane_bits(self, plane: u8) -> (bool, bool, bool) {
        (
            (self.r >> plane) & 1 != 0,
            (self.g >> plane) & 1 != 0,
            (self.b >> plane) & 1 != 0,
        )
    }
}

/// Gamma-correct one 8-bit channel.
#[allow(clippy::indexing_slicing)] // u8 index into a 256-entry table
pub fn gamma(level: u8) -> u8 {
    GAMMA8[usize::from(level)]
}

/// Promote a 3/3/3 colour to RGB565, replicating the high bits.
pub fn color333(r: u8, g: u8, b: u8) -> Rgb565 {
    Rgb565::new(rescale(r, 3, R5), rescale(g, 3, G6), rescale(b, 3, B5))
}

/// Promote a 4/4/4 colour to RGB565, replicating the high bits.
pub fn color444(r: u8, g: u8, b: u8) -> Rgb565 {
    Rgb565::new(rescale(r, 4, R5), rescale(g, 4, G6), rescale(b, 4, B5))
}

/// Decimate an 8/8/8 colour to RGB565.
pub fn color888(r: u8, g: u8, b: u8) -> Rgb565 {
    Rgb565::new(r >> 3, g >> 2, b >> 3)
}

/// Decimate an 8/8/8 colour to RGB565, gamma-correcting each channel first.
pub fn color888_gamma(r: u8, g: u8, b: u8) -> Rgb565 {
    color888(gamma(r), gamma(g), gamma(b))
}

/// Colour-wheel helper.
///
/// `hue` wraps modulo [`HUE_STEPS`] (negative values count backwards from
/// red); red, yellow, green, cyan, blue and magenta sit 256 steps apart.
/// `sat` and `val` are 0..=255. With `gamma_correct` the result is passed
/// through [`GAMMA8`] after the value scaling.
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn color_hsv(hue: i32, sat: u8, val: u8, gamma_correct: bool) -> Rgb565 {
    // rem_euclid keeps the hue in 0..1536 for any sign.
    let hue = hue.rem_euclid(HUE_STEPS) as u16;
    let lo = (hue & 0xFF) as u8;
    let (r, g, b) = match hue >> 8 {
        0 => (255, lo, 0),
        1 => (255 - lo, 255, 0),
        2 => (0, 255, lo),
        3 => (0, 255 - lo, 255),
        4 => (lo, 0, 255),
        _ => (255, 0, 255 - lo),
    };

    // Saturation and value in 1..=256 so each scale is a shift.
    let s1 = u16::from(sat) + 1;
    let desaturate = |c: u8| 255 - (((255 - u16::from(c)) * s1) >> 8) as u8;
    let v1 = u16::from(val) + 1;
    let scale = |c: u8| ((u16::from(c) * v1) >> 8) as u8;

    let (r, g, b) = (scale(desaturate(r)), scale(desaturate(g)), scale(desaturate(b)));
    if gamma_correct {
        color888_gamma(r, g, b)
    } else {
        color888(r, g, b)
    }
}

#[cfg(test)]
#[allow(
    clippy::indexing_slicing,
    clippy::unwrap_used,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;

    #[test]
    fn test_gamma_endpoints_and_monotonic() {
        assert_eq!(GAMMA8[0], 0);
        assert_eq!(GAMMA8[255], 255);
        for pair in GAMMA8.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        // 0.5^2.5 ≈ 0.177
        assert!((44..=46).contains(&GAMMA8[128]));
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(255 * 255 * 65_536), 255 * 256);
    }

    #[test]
    fn test_rescale_narrow_and_widen() {
        assert_eq!(rescale(0b1_0110, 5, 4), 0b1011);
        assert_eq!(rescale(0b1_0110, 5, 8), 0b1011_0101);
        assert_eq!(rescale(0b101, 3, 5), 0b10110);
        assert_eq!(rescale(1, 1, 8), 0xFF);
        assert_eq!(rescale(0xFF, 8, 1), 1);
    }

    #[test]
    fn test_quantize_rgb565_four_planes() {
        let q = Quantized::from_rgb565(Rgb565::RED, 4);
        assert_eq!(q, Quantized { r: 15, g: 0, b: 0 });
        assert_eq!(Quantized::from_rgb565(Rgb565::WHITE, 4), Quantized::full(4));
        assert_eq!(Quantized::from_rgb565(Rgb565::BLACK, 4), Quantized::BLACK);
    }

    #[test]
    fn test_quantize_rgb888_linear() {
        assert_eq!(Quantized::from_rgb888(0, 0, 0, 4), Quantized::BLACK);
        assert_eq!(Quantized::from_rgb888(255, 255, 255, 4), Quantized::full(4));
        assert_eq!(
            Quantized::from_rgb888(0x80, 0x40, 0xF0, 4),
            Quantized { r: 8, g: 4, b: 15 }
        );
        assert_eq!(Quantized::from_rgb888(0x80, 0x7F, 0, 1), Quantized { r: 1, g: 0, b: 0 });
    }

    /// Gamma quantizer: black stays black, full stays full, the output never
    /// decreases with input and always fits the plane depth.
    #[test]
    fn test_quantize_rgb888_gamma() {
        for planes in 1..=8u8 {
            assert_eq!(Quantized::from_rgb888_gamma(0, 0, 0, planes), Quantized::BLACK);
            assert_eq!(
                Quantized::from_rgb888_gamma(255, 255, 255, planes),
                Quantized::full(planes)
            );

            let limit = 1u16 << planes;
            let mut previous = 0u8;
            for level in 0..=255u8 {
                let q = Quantized::from_rgb888_gamma(level, level, level, planes);
                assert!(u16::from(q.r) < limit, "planes {planes} level {level}");
                assert_eq!((q.r, q.g), (q.b, q.b));
                assert!(q.r >= previous, "planes {planes} level {level}");
                previous = q.r;
            }
        }
        // mid-grey is darkened by the curve: 0x80 → GAMMA8 ≈ 45 → 2 of 15
        assert_eq!(Quantized::from_rgb888_gamma(0x80, 0x80, 0x80, 4).r, 2);
        assert!(Quantized::from_rgb888(0x80, 0x80, 0x80, 4).r > 2);
    }

    #[test]
    fn test_plane_bits() {
        let q = Quantized { r: 0b1010, g: 0b0001, b: 0 };
        assert_eq!(q.plane_bits(0), (false, true, false));
        assert_eq!(q.plane_bits(1), (true, false, false));
        assert_eq!(q.plane_bits(3), (true, false, false));
    }

    #[test]
    fn test_color333_matches_bit_replication() {
        // 3 bits: 0b101 -> 5 bits 0b10110, 6 bits 0b101101
        let c = color333(5, 5, 5);
        assert_eq!((c.r(), c.g(), c.b()), (0b10110, 0b10_1101, 0b10110));
        assert_eq!(color333(7, 7, 7), Rgb565::WHITE);
    }

    #[test]
    fn test_color444_full_scale() {
        assert_eq!(color444(15, 15, 15), Rgb565::WHITE);
        assert_eq!(color444(0, 0, 0), Rgb565::BLACK);
    }

    #[test]
    fn test_color888() {
        assert_eq!(color888(255, 0, 0), Rgb565::RED);
        assert_eq!(color888(0x80, 0x80, 0x80), Rgb565::new(16, 32, 16));
        assert_eq!(color888_gamma(255, 255, 255), Rgb565::WHITE);
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(color_hsv(0, 255, 255, false), Rgb565::RED);
        assert_eq!(color_hsv(512, 255, 255, false), Rgb565::GREEN);
        assert_eq!(color_hsv(1024, 255, 255, false), Rgb565::BLUE);
        // wraps in both directions
        assert_eq!(color_hsv(1536, 255, 255, false), Rgb565::RED);
        assert_eq!(color_hsv(-1024, 255, 255, false), Rgb565::GREEN);
    }

    #[test]
    fn test_hsv_zero_value_is_black() {
        assert_eq!(color_hsv(300, 255, 0, false), Rgb565::BLACK);
        assert_eq!(color_hsv(300, 255, 0, true), Rgb565::BLACK);
    }

    #[test]
    fn test_hsv_zero_saturation_is_grey() {
        let c = color_hsv(700, 0, 255, false);
        assert_eq!(c.r(), 31);
        assert_eq!(c.b(), 31);
    }
}
