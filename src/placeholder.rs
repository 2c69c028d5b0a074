//! The frame shown when an image is not available.

use crate::coord::ImageCoordinate;
use crate::labels::Labels;
use crate::render::{PixelBuffer, Rect, Size};

use embedded_graphics::Drawable;
use embedded_graphics::Pixel;
use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::geometry::{OriginDimensions, Point};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_10X20;
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use std::convert::Infallible;

const TEXT_COLOR: Rgb888 = Rgb888::new(255, 255, 255);
const OVERLAY_TEXT_COLOR: Rgb888 = Rgb888::new(240, 240, 240);
const OVERLAY_ALPHA: u8 = 160;
const OVERLAY_PADDING: i32 = 12;
const OVERLAY_GAP: i32 = 6;
const OVERLAY_MARGIN: i32 = 10;
const CHAR_WIDTH: i32 = 10;
const LINE_HEIGHT: i32 = 20;

impl OriginDimensions for PixelBuffer {
    fn size(&self) -> embedded_graphics::geometry::Size {
        embedded_graphics::geometry::Size::new(self.width(), self.height())
    }
}

impl DrawTarget for PixelBuffer {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set_pixel(point.x as u32, point.y as u32, [color.r(), color.g(), color.b(), 255]);
            }
        }
        Ok(())
    }
}

/// Render the "missing image" frame for `coord`.
///
/// Shows the missing file name and the switch positions in the middle of
/// the surface, with a labels box in the top-left corner.
pub fn missing_image_frame(surface: Size, file_name: &str, coord: ImageCoordinate, labels: &Labels) -> PixelBuffer {
    let mut frame = PixelBuffer::black(surface);
    let center = Point::new(surface.width as i32 / 2, surface.height as i32 / 2);
    let style = MonoTextStyle::new(&FONT_10X20, TEXT_COLOR);
    let centered = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build();

    let message = format!("Missing: {file_name}");
    let [a, b, c] = coord.digits();
    let positions = format!("Switches: {}-{}-{}", a + 1, b + 1, c + 1);

    // Drawing into a PixelBuffer cannot fail.
    let _ = Text::with_text_style(&message, center, style, centered).draw(&mut frame);
    let _ = Text::with_text_style(&positions, center + Point::new(0, 60), style, centered).draw(&mut frame);

    draw_labels_overlay(&mut frame, &labels.for_coordinate(coord));
    frame
}

/// Draw a translucent box of text lines in the top-left corner.
fn draw_labels_overlay(frame: &mut PixelBuffer, lines: &[&str]) {
    if lines.is_empty() {
        return;
    }
    let widest = lines.iter().map(|l| l.chars().count() as i32).max().unwrap_or(0);
    let count = lines.len() as i32;
    let box_rect = Rect {
        x: OVERLAY_MARGIN,
        y: OVERLAY_MARGIN,
        width: (widest * CHAR_WIDTH + OVERLAY_PADDING * 2) as u32,
        height: (count * LINE_HEIGHT + OVERLAY_GAP * (count - 1) + OVERLAY_PADDING * 2) as u32,
    };
    let shade = PixelBuffer::solid(Size::new(box_rect.width, box_rect.height), [0, 0, 0, 255]);
    frame.blend_from(&shade, box_rect, OVERLAY_ALPHA);

    let style = MonoTextStyle::new(&FONT_10X20, OVERLAY_TEXT_COLOR);
    for (i, line) in lines.iter().enumerate() {
        let y = OVERLAY_MARGIN + OVERLAY_PADDING + i as i32 * (LINE_HEIGHT + OVERLAY_GAP);
        let origin = Point::new(OVERLAY_MARGIN + OVERLAY_PADDING, y);
        let _ = Text::with_baseline(line, origin, style, Baseline::Top).draw(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_frame_draws_text() {
        let surface = Size::new(320, 200);
        let frame = missing_image_frame(surface, "1-2-3.jpeg", ImageCoordinate::new(1, 2, 3), &Labels::default());
        assert_eq!(frame.size(), surface);

        let lit = frame.pixels().chunks(4).filter(|px| px[0] > 200).count();
        assert!(lit > 0);
        // Bottom-right corner stays black.
        assert_eq!(frame.pixel(319, 199), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_draw_target_clips() {
        let mut buffer = PixelBuffer::black(Size::new(2, 2));
        buffer
            .draw_iter([
                Pixel(Point::new(-1, 0), Rgb888::WHITE),
                Pixel(Point::new(5, 5), Rgb888::WHITE),
                Pixel(Point::new(1, 1), Rgb888::WHITE),
            ])
            .unwrap();
        assert_eq!(buffer.pixel(1, 1), Some([255, 255, 255, 255]));
        assert_eq!(buffer.pixel(0, 0), Some([0, 0, 0, 255]));
    }
}
