//! Controller state snapshot.

use crate::coord::ImageCoordinate;
use crate::modes::ModeId;

use std::time::Instant;

/// What drives the displayed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// The image follows the switches.
    Live,
    /// The image advances on a timer; switches only wake the display.
    #[default]
    Screensaver,
}

/// The state owned by [`InteractionController`](crate::InteractionController).
///
/// Only `tick` mutates it. A fresh state starts idle, in [`DisplayMode::Screensaver`].
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    /// Current display mode.
    pub display_mode: DisplayMode,
    /// Last coordinate read from the switches (`None` before the first tick).
    pub last_switch: Option<ImageCoordinate>,
    /// Coordinate currently on screen.
    pub displayed: ImageCoordinate,
    /// When the switches last moved.
    pub last_interaction: Option<Instant>,
    /// Screensaver position as a linear index (0-215).
    pub cursor: u16,
    /// When the screensaver last advanced.
    pub last_advance: Option<Instant>,
    /// Current image-set mode.
    pub mode_id: ModeId,
    /// Mode before the most recent mode change.
    pub previous_mode_id: ModeId,
}
