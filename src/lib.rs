//! Display controller for the Art Box installation.
//!
//! Three six-position rotary switches pick one of 216 images, a three-way
//! switch picks the image set, and after a stretch of inactivity the display
//! runs a slideshow until someone turns a switch again. A 20x4 character LCD
//! mirrors the selection.
//!
//! The crate is split into a pure core and thin seams to the outside world:
//!
//! - [`InteractionController`] decides, tick by tick, what should be on
//!   screen. It does no I/O.
//! - [`DisplayPipeline`] turns a [`Tick`] into pixels: it resolves the file,
//!   fetches it through the [`ImageCache`], and crossfades or cuts to it
//!   through a [`FrameSink`].
//! - [`SwitchPoller`] samples the switches over a [`SharedBus`] on its own
//!   thread and hands positions over through a [`SwitchSnapshot`].
//!
//! # Example
//!
//! ```no_run
//! use artbox_core::{
//!     Config, CrossfadeRenderer, DisplayPipeline, FsImageLoader, ImageCache, ImageSetLayout,
//!     InteractionController, MockSink, SwitchSnapshot,
//! };
//! use std::time::Instant;
//!
//! fn main() -> Result<(), artbox_core::ArtboxError> {
//!     let config = Config::default();
//!     let snapshot = SwitchSnapshot::new();
//!     let mut controller = InteractionController::new(config.timing());
//!     let mut pipeline = DisplayPipeline::new(
//!         ImageSetLayout::new("/srv/artbox/images", &config.image_extension),
//!         ImageCache::new(FsImageLoader::new(), config.surface(), config.cache_capacity),
//!         CrossfadeRenderer::new(config.crossfade()),
//!         MockSink::new(config.surface()),
//!     );
//!
//!     loop {
//!         let positions = snapshot.load();
//!         let tick = controller.tick(Instant::now(), positions.coordinate(), positions.mode());
//!         pipeline.apply(&tick)?;
//!         std::thread::sleep(config.frame_interval());
//!     }
//! }
//! ```
//!
//! # Testing
//!
//! The [`MockI2c`], [`MockPin`], [`MockLoader`], [`MockSink`] and
//! [`MockLcd`] doubles stand in for hardware, files and the window:
//!
//! ```
//! use artbox_core::{ImageCoordinate, InteractionController, ModeId};
//! use std::time::Instant;
//!
//! let mut controller = InteractionController::default();
//! let tick = controller.tick(Instant::now(), ImageCoordinate::new(1, 2, 3), ModeId::One);
//! assert!(tick.redraw);
//! assert_eq!(controller.current_display_coordinate(), ImageCoordinate::new(1, 2, 3));
//! ```

#![warn(missing_docs)]

mod bus;
mod cache;
mod config;
mod controller;
mod coord;
mod display;
mod error;
mod labels;
mod lcd;
mod loader;
mod mock;
mod modes;
mod placeholder;
mod poller;
mod render;
mod state;
mod switch;

// Re-export public API
pub use bus::{DEFAULT_CHANNEL_SETTLE, DEFAULT_MUX_ADDRESS, MAX_CHANNEL, SharedBus, SwitchSource};
pub use cache::{DEFAULT_CACHE_CAPACITY, ImageCache};
pub use config::{BusConfig, Config, DEFAULT_SWITCH_ADDRESS, MAX_DURATION_SECS, MAX_FRAME_RATE};
pub use controller::{
    DEFAULT_INACTIVITY_TIMEOUT, DEFAULT_SCREENSAVER_INTERVAL, InteractionController, ScreensaverTiming, Tick,
};
pub use coord::{DIGITS, IMAGE_COUNT, ImageCoordinate};
pub use display::{DisplayPipeline, Presented};
pub use error::{ArtboxError, ImageError};
pub use labels::Labels;
pub use lcd::{CharLcd, DEFAULT_LCD_ADDRESS, LCD_COLUMNS, LCD_ROWS, LcdWriter, lcd_lines};
pub use loader::{FsImageLoader, ImageLoader};
pub use mock::{BusEvent, MockI2c, MockLcd, MockLoader, MockPin, MockSink};
pub use modes::{FixedMode, ImageSetLayout, ModeId, ModeSource, ThreeWaySwitch};
pub use placeholder::missing_image_frame;
pub use poller::{DEFAULT_POLL_INTERVAL, SwitchPoller, SwitchPositions, SwitchSnapshot};
pub use render::{
    CrossfadeRenderer, CrossfadeSettings, DEFAULT_CROSSFADE_DURATION, DEFAULT_CROSSFADE_FPS, FrameSink,
    PixelBuffer, PlacedImage, Rect, Size, centered, compose, fit_scale, fit_size,
};
pub use state::{ControllerState, DisplayMode};
pub use switch::{SwitchDevice, SwitchPosition, decode_position};
