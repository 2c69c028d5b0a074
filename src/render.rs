//! Pixel buffers, placement and the crossfade renderer.

use crate::error::ArtboxError;

use log::trace;
use std::sync::Arc;
use std::time::Duration;

/// Default crossfade length.
pub const DEFAULT_CROSSFADE_DURATION: Duration = Duration::from_millis(400);

/// Default crossfade frame rate.
pub const DEFAULT_CROSSFADE_FPS: u32 = 60;

// =============================================================================
// Geometry
// =============================================================================

/// A width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A placed rectangle on the surface. The origin may be negative when an
/// image overhangs the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Scale factor that fits `image` inside `surface` preserving aspect ratio.
pub fn fit_scale(surface: Size, image: Size) -> f64 {
    if image.width == 0 || image.height == 0 {
        return 1.0;
    }
    let sx = surface.width as f64 / image.width as f64;
    let sy = surface.height as f64 / image.height as f64;
    sx.min(sy)
}

/// The size `image` takes once fitted into `surface` (never below 1x1).
pub fn fit_size(surface: Size, image: Size) -> Size {
    let scale = fit_scale(surface, image);
    if scale == 1.0 {
        return image;
    }
    Size::new(
        ((image.width as f64 * scale) as u32).max(1),
        ((image.height as f64 * scale) as u32).max(1),
    )
}

/// Center a `size` rectangle on `surface`.
pub fn centered(surface: Size, size: Size) -> Rect {
    Rect {
        x: (surface.width as i32 - size.width as i32) / 2,
        y: (surface.height as i32 - size.height as i32) / 2,
        width: size.width,
        height: size.height,
    }
}

// =============================================================================
// Pixel Buffer
// =============================================================================

/// An RGBA8 pixel buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// A buffer filled with one color.
    pub fn solid(size: Size, rgba: [u8; 4]) -> Self {
        let count = size.width as usize * size.height as usize;
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width: size.width,
            height: size.height,
            pixels,
        }
    }

    /// An opaque black buffer.
    pub fn black(size: Size) -> Self {
        Self::solid(size, [0, 0, 0, 255])
    }

    /// Wrap raw RGBA bytes. Returns `None` if the length does not match.
    pub fn from_rgba(size: Size, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != size.width as usize * size.height as usize * 4 {
            return None;
        }
        Some(Self {
            width: size.width,
            height: size.height,
            pixels,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Raw RGBA bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consume the buffer, returning its RGBA bytes.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// The pixel at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]])
    }

    /// Overwrite the pixel at `(x, y)`; ignored outside the buffer.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }

    /// Draw `src` at `rect` with global opacity `alpha` (0-255), clipped to
    /// this buffer. The source's own alpha channel is honoured.
    pub fn blend_from(&mut self, src: &PixelBuffer, rect: Rect, alpha: u8) {
        if alpha == 0 {
            return;
        }
        let x0 = rect.x.max(0);
        let y0 = rect.y.max(0);
        let x1 = (rect.x + src.width as i32).min(self.width as i32);
        let y1 = (rect.y + src.height as i32).min(self.height as i32);

        for y in y0..y1 {
            let sy = (y - rect.y) as usize;
            for x in x0..x1 {
                let sx = (x - rect.x) as usize;
                let si = (sy * src.width as usize + sx) * 4;
                let di = (y as usize * self.width as usize + x as usize) * 4;

                let a = src.pixels[si + 3] as u32 * alpha as u32 / 255;
                if a == 255 {
                    self.pixels[di..di + 3].copy_from_slice(&src.pixels[si..si + 3]);
                } else if a > 0 {
                    for c in 0..3 {
                        let s = src.pixels[si + c] as u32;
                        let d = self.pixels[di + c] as u32;
                        self.pixels[di + c] = ((s * a + d * (255 - a) + 127) / 255) as u8;
                    }
                }
                self.pixels[di + 3] = 255;
            }
        }
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// A scaled image and where it sits on the surface.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    /// The scaled pixels.
    pub buffer: Arc<PixelBuffer>,
    /// Placement on the surface.
    pub rect: Rect,
}

impl PlacedImage {
    /// Center `buffer` on `surface`.
    pub fn centered(surface: Size, buffer: Arc<PixelBuffer>) -> Self {
        let rect = centered(surface, buffer.size());
        Self { buffer, rect }
    }
}

/// Composite one frame: black, the fully opaque previous image, then the
/// next image at `alpha`.
pub fn compose(surface: Size, previous: Option<&PlacedImage>, next: &PlacedImage, alpha: u8) -> PixelBuffer {
    let mut frame = PixelBuffer::black(surface);
    if let Some(previous) = previous {
        frame.blend_from(&previous.buffer, previous.rect, 255);
    }
    frame.blend_from(&next.buffer, next.rect, alpha);
    frame
}

// =============================================================================
// Frame Sink
// =============================================================================

/// A surface that shows finished frames.
pub trait FrameSink {
    /// Surface dimensions.
    fn size(&self) -> Size;

    /// Show a frame.
    fn present(&mut self, frame: PixelBuffer) -> Result<(), ArtboxError>;

    /// Wait between crossfade frames.
    fn wait(&mut self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn size(&self) -> Size {
        (**self).size()
    }

    fn present(&mut self, frame: PixelBuffer) -> Result<(), ArtboxError> {
        (**self).present(frame)
    }

    fn wait(&mut self, interval: Duration) {
        (**self).wait(interval)
    }
}

// =============================================================================
// Crossfade Renderer
// =============================================================================

/// Crossfade settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossfadeSettings {
    /// Crossfade on image changes; direct cuts when `false`.
    pub enabled: bool,
    /// Length of a crossfade.
    pub duration: Duration,
    /// Frames per second during a crossfade.
    pub fps: u32,
}

impl Default for CrossfadeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            duration: DEFAULT_CROSSFADE_DURATION,
            fps: DEFAULT_CROSSFADE_FPS,
        }
    }
}

/// Presents images, blending from the previously shown one.
#[derive(Debug)]
pub struct CrossfadeRenderer {
    settings: CrossfadeSettings,
    previous: Option<PlacedImage>,
}

impl CrossfadeRenderer {
    /// Create a renderer with nothing on screen yet.
    pub fn new(settings: CrossfadeSettings) -> Self {
        Self {
            settings,
            previous: None,
        }
    }

    /// Number of blending steps: `max(1, floor(fps * duration))`.
    ///
    /// A crossfade presents one more frame than this (both endpoints).
    pub fn steps(&self) -> u32 {
        let steps = (self.settings.fps as f64 * self.settings.duration.as_secs_f64()) as u32;
        steps.max(1)
    }

    /// Whether an image is remembered for the next crossfade.
    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    /// Forget the previous image so the next one cuts in.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Present `buffer`, crossfading from the previous image when possible.
    ///
    /// Returns the number of frames presented.
    pub fn present<S>(&mut self, sink: &mut S, buffer: Arc<PixelBuffer>) -> Result<usize, ArtboxError>
    where
        S: FrameSink + ?Sized,
    {
        let surface = sink.size();
        let next = PlacedImage::centered(surface, buffer);

        let previous = match self.previous.take() {
            Some(previous) if self.settings.enabled && !self.settings.duration.is_zero() => previous,
            _ => {
                sink.present(compose(surface, None, &next, 255))?;
                self.previous = Some(next);
                return Ok(1);
            }
        };

        let steps = self.steps();
        let interval = Duration::from_secs_f64(1.0 / self.settings.fps.max(1) as f64);
        trace!("crossfade over {} steps", steps);

        for i in 0..=steps {
            let alpha = (255 * i / steps) as u8;
            let frame = compose(surface, Some(&previous), &next, alpha);
            if let Err(e) = sink.present(frame) {
                self.previous = Some(previous);
                return Err(e);
            }
            if i < steps {
                sink.wait(interval);
            }
        }

        self.previous = Some(next);
        Ok(steps as usize + 1)
    }

    /// Cut to a frame that is not an image (e.g. a placeholder).
    ///
    /// Nothing is remembered, so the next image also cuts in rather than
    /// fading from this frame.
    pub fn cut_to<S>(&mut self, sink: &mut S, frame: PixelBuffer) -> Result<(), ArtboxError>
    where
        S: FrameSink + ?Sized,
    {
        self.previous = None;
        sink.present(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSink;

    fn image(size: Size, rgba: [u8; 4]) -> Arc<PixelBuffer> {
        Arc::new(PixelBuffer::solid(size, rgba))
    }

    #[test]
    fn test_fit_scale_preserves_aspect() {
        let surface = Size::new(1920, 1080);
        assert_eq!(fit_scale(surface, Size::new(1024, 1024)), 1080.0 / 1024.0);
        assert_eq!(fit_size(surface, Size::new(1024, 1024)), Size::new(1080, 1080));
        assert_eq!(fit_size(surface, Size::new(3840, 1080)), Size::new(1920, 540));
        assert_eq!(fit_size(surface, Size::new(1920, 1080)), Size::new(1920, 1080));
    }

    #[test]
    fn test_centered_rect() {
        let rect = centered(Size::new(1920, 1080), Size::new(1080, 1080));
        assert_eq!(rect, Rect { x: 420, y: 0, width: 1080, height: 1080 });
    }

    #[test]
    fn test_compose_blends_over_previous() {
        let surface = Size::new(4, 2);
        let old = PlacedImage::centered(surface, image(surface, [200, 0, 0, 255]));
        let new = PlacedImage::centered(surface, image(surface, [0, 100, 0, 255]));

        let start = compose(surface, Some(&old), &new, 0);
        assert_eq!(start.pixel(0, 0), Some([200, 0, 0, 255]));

        let end = compose(surface, Some(&old), &new, 255);
        assert_eq!(end.pixel(3, 1), Some([0, 100, 0, 255]));

        let mid = compose(surface, Some(&old), &new, 128);
        let [r, g, _, _] = mid.pixel(1, 1).unwrap();
        assert!((99..=101).contains(&r));
        assert!((49..=51).contains(&g));
    }

    #[test]
    fn test_compose_letterboxes_in_black() {
        let surface = Size::new(6, 2);
        let new = PlacedImage::centered(surface, image(Size::new(2, 2), [9, 9, 9, 255]));
        let frame = compose(surface, None, &new, 255);
        assert_eq!(frame.pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(frame.pixel(2, 0), Some([9, 9, 9, 255]));
        assert_eq!(frame.pixel(5, 1), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_first_image_is_a_direct_cut() {
        let mut sink = MockSink::new(Size::new(8, 8));
        let mut renderer = CrossfadeRenderer::new(CrossfadeSettings::default());

        let frames = renderer.present(&mut sink, image(Size::new(8, 8), [1, 2, 3, 255])).unwrap();
        assert_eq!(frames, 1);
        assert_eq!(sink.frames().len(), 1);
        assert!(sink.waits().is_empty());
        assert!(renderer.has_previous());
    }

    #[test]
    fn test_crossfade_frame_sequence() {
        let mut sink = MockSink::new(Size::new(4, 4));
        let mut renderer = CrossfadeRenderer::new(CrossfadeSettings::default());
        assert_eq!(renderer.steps(), 24);

        renderer.present(&mut sink, image(Size::new(4, 4), [0, 0, 0, 255])).unwrap();
        let frames = renderer.present(&mut sink, image(Size::new(4, 4), [255, 255, 255, 255])).unwrap();
        assert_eq!(frames, 25);

        let fade = &sink.frames()[1..];
        assert_eq!(fade.len(), 25);
        assert_eq!(fade[0].pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(fade[24].pixel(0, 0), Some([255, 255, 255, 255]));
        let reds: Vec<u8> = fade.iter().map(|f| f.pixel(0, 0).unwrap()[0]).collect();
        assert!(reds.windows(2).all(|w| w[0] <= w[1]));

        assert_eq!(sink.waits().len(), 24);
        assert!(sink.waits().iter().all(|w| *w == Duration::from_secs_f64(1.0 / 60.0)));
    }

    #[test]
    fn test_disabled_or_zero_duration_cuts() {
        for settings in [
            CrossfadeSettings { enabled: false, ..Default::default() },
            CrossfadeSettings { duration: Duration::ZERO, ..Default::default() },
        ] {
            let mut sink = MockSink::new(Size::new(2, 2));
            let mut renderer = CrossfadeRenderer::new(settings);
            renderer.present(&mut sink, image(Size::new(2, 2), [1, 1, 1, 255])).unwrap();
            let frames = renderer.present(&mut sink, image(Size::new(2, 2), [2, 2, 2, 255])).unwrap();
            assert_eq!(frames, 1);
            assert_eq!(sink.frames().len(), 2);
        }
    }

    #[test]
    fn test_cut_to_forgets_previous() {
        let mut sink = MockSink::new(Size::new(2, 2));
        let mut renderer = CrossfadeRenderer::new(CrossfadeSettings::default());
        renderer.present(&mut sink, image(Size::new(2, 2), [1, 1, 1, 255])).unwrap();

        renderer.cut_to(&mut sink, PixelBuffer::black(Size::new(2, 2))).unwrap();
        assert!(!renderer.has_previous());

        let frames = renderer.present(&mut sink, image(Size::new(2, 2), [2, 2, 2, 255])).unwrap();
        assert_eq!(frames, 1);
    }
}
