//! Display pipeline: applies controller ticks to the screen and the LCD.

use crate::cache::ImageCache;
use crate::controller::Tick;
use crate::error::{ArtboxError, ImageError};
use crate::labels::Labels;
use crate::lcd::{LcdWriter, lcd_lines};
use crate::loader::ImageLoader;
use crate::modes::ImageSetLayout;
use crate::placeholder::missing_image_frame;
use crate::render::{CrossfadeRenderer, FrameSink};

use log::{debug, info};

/// What a tick put on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presented {
    /// Nothing was redrawn.
    Unchanged,
    /// An image was shown using `frames` frames.
    Image {
        /// Frames presented (1 for a direct cut).
        frames: usize,
    },
    /// The image was not available; the placeholder was shown.
    Placeholder,
}

/// Owns everything between the controller and the outputs.
pub struct DisplayPipeline<L, S> {
    layout: ImageSetLayout,
    cache: ImageCache<L>,
    renderer: CrossfadeRenderer,
    sink: S,
    lcd: Option<Box<dyn LcdWriter>>,
    labels: Option<Labels>,
}

impl<L, S> DisplayPipeline<L, S>
where
    L: ImageLoader,
    S: FrameSink,
{
    /// Build a pipeline. The cache target is set to the sink size.
    pub fn new(layout: ImageSetLayout, mut cache: ImageCache<L>, renderer: CrossfadeRenderer, sink: S) -> Self {
        cache.set_target(sink.size());
        Self {
            layout,
            cache,
            renderer,
            sink,
            lcd: None,
            labels: None,
        }
    }

    /// Mirror selections on a character LCD.
    pub fn with_lcd(mut self, lcd: Box<dyn LcdWriter>) -> Self {
        self.lcd = Some(lcd);
        self
    }

    /// Use `labels` for LCD lines and the placeholder overlay.
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Apply one controller tick.
    ///
    /// Missing or undecodable images show the placeholder; that is not an
    /// error. Only a failing frame sink is.
    pub fn apply(&mut self, tick: &Tick) -> Result<Presented, ArtboxError> {
        if tick.mode_changed {
            info!("switching to {}, dropping cached images", tick.mode_id);
            self.cache.clear();
        }
        if !tick.redraw {
            return Ok(Presented::Unchanged);
        }

        let path = self.layout.resolve(tick.mode_id, tick.coordinate);
        let presented = match self.cache.get(&path) {
            Ok(buffer) => {
                let frames = self.renderer.present(&mut self.sink, buffer)?;
                Presented::Image { frames }
            }
            Err(e) => {
                match &e {
                    ImageError::NotFound(_) => debug!("{}", e),
                    ImageError::Decode { .. } => info!("{}", e),
                }
                let file_name = path
                    .file_name()
                    .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
                let default_labels;
                let labels = match &self.labels {
                    Some(labels) => labels,
                    None => {
                        default_labels = Labels::default();
                        &default_labels
                    }
                };
                let frame = missing_image_frame(self.sink.size(), &file_name, tick.coordinate, labels);
                self.renderer.cut_to(&mut self.sink, frame)?;
                Presented::Placeholder
            }
        };

        if let Some(lcd) = self.lcd.as_mut() {
            let lines = lcd_lines(tick.display_mode, tick.coordinate, self.labels.as_ref());
            if let Err(e) = lcd.write_lines(&lines) {
                debug!("lcd update skipped: {}", e);
            }
        }

        Ok(presented)
    }

    /// Blank the LCD, ignoring failures.
    pub fn clear_lcd(&mut self) {
        if let Some(lcd) = self.lcd.as_mut()
            && let Err(e) = lcd.clear()
        {
            debug!("lcd clear skipped: {}", e);
        }
    }

    /// The image layout.
    pub fn layout(&self) -> &ImageSetLayout {
        &self.layout
    }

    /// The image cache.
    pub fn cache(&self) -> &ImageCache<L> {
        &self.cache
    }

    /// The frame sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The frame sink, mutably.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
