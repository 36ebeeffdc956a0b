//! embedded-graphics integration.
//!
//! Lets any `embedded_graphics` drawable render straight into the back
//! buffer: `Text::new(..).draw(&mut panel)`.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Pixel, Size};
use platform::dma::TransferEngine;

use crate::panel::MatrixPanel;

impl<E: TransferEngine> DrawTarget for MatrixPanel<'_, E> {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, color);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill_screen(color);
        Ok(())
    }
}

impl<E: TransferEngine> OriginDimensions for MatrixPanel<'_, E> {
    fn size(&self) -> Size {
        let (w, h) = self.logical_size();
        #[allow(clippy::cast_possible_truncation)] // panel dimensions are < 2^16
        let (w, h) = (w as u32, h as u32);
        Size::new(w, h)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]
mod tests {
    use embedded_graphics::pixelcolor::RgbColor;
    use embedded_graphics::prelude::{Dimensions, Point, Primitive};
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
    use embedded_graphics::Drawable;
    use platform::mocks::SimulatedEngine;

    use super::*;
    use crate::color::Quantized;
    use crate::config::{RefreshConfig, DEFAULT_PLANES, MURUM_LUX, MURUM_LUX_FB_SIZE};
    use crate::layout::ControlStyle;
    use crate::remap::Rotation;

    fn panel(storage: &mut [u8]) -> MatrixPanel<'_, SimulatedEngine> {
        let mut p = MatrixPanel::new(
            MURUM_LUX,
            DEFAULT_PLANES,
            storage,
            false,
            SimulatedEngine::instant(),
            RefreshConfig::default(),
        )
        .unwrap();
        p.initialize_layout(ControlStyle::Standard).unwrap();
        p
    }

    #[test]
    fn test_bounding_box_follows_rotation() {
        let mut storage = vec![0u8; MURUM_LUX_FB_SIZE];
        let mut p = panel(&mut storage);
        assert_eq!(p.bounding_box().size, Size::new(64, 96));
        p.set_rotation(Rotation::Deg270);
        assert_eq!(p.bounding_box().size, Size::new(96, 64));
    }

    #[test]
    fn test_draw_rectangle() {
        let mut storage = vec![0u8; MURUM_LUX_FB_SIZE];
        let mut p = panel(&mut storage);
        Rectangle::new(Point::new(10, 40), Size::new(3, 2))
            .into_styled(PrimitiveStyle::with_fill(Rgb565::RED))
            .draw(&mut p)
            .unwrap();
        let red = Quantized { r: 15, g: 0, b: 0 };
        assert_eq!(p.get_pixel(10, 40), Some(red));
        assert_eq!(p.get_pixel(12, 41), Some(red));
        assert_eq!(p.get_pixel(13, 41), Some(Quantized::BLACK));
        assert_eq!(p.get_pixel(9, 40), Some(Quantized::BLACK));
    }

    #[test]
    fn test_clear_uses_fill() {
        let mut storage = vec![0u8; MURUM_LUX_FB_SIZE];
        let mut p = panel(&mut storage);
        p.clear(Rgb565::WHITE).unwrap();
        assert_eq!(p.get_pixel(63, 95), Some(Quantized::full(DEFAULT_PLANES)));
    }
}
