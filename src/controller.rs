//! Interaction and screensaver state machine.
//!
//! The controller is a transition function over an explicit
//! [`ControllerState`]. It performs no I/O: callers pass in the clock, the
//! switch coordinate and the mode, and act on the returned [`Tick`].

use crate::coord::{IMAGE_COUNT, ImageCoordinate};
use crate::modes::ModeId;
use crate::state::{ControllerState, DisplayMode};

use log::{debug, info};
use std::time::{Duration, Instant};

/// Inactivity before the screensaver starts.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

/// Time each image stays up while the screensaver runs.
pub const DEFAULT_SCREENSAVER_INTERVAL: Duration = Duration::from_secs(3);

/// Screensaver timing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreensaverTiming {
    /// Inactivity before switching from live to screensaver.
    pub inactivity_timeout: Duration,
    /// Interval between screensaver advances.
    pub advance_interval: Duration,
}

impl Default for ScreensaverTiming {
    fn default() -> Self {
        Self {
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            advance_interval: DEFAULT_SCREENSAVER_INTERVAL,
        }
    }
}

/// The outcome of one controller step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// The coordinate that should be on screen.
    pub coordinate: ImageCoordinate,
    /// The current display mode.
    pub display_mode: DisplayMode,
    /// The current image-set mode.
    pub mode_id: ModeId,
    /// The screen should be redrawn for `coordinate`.
    pub redraw: bool,
    /// The image-set mode changed; cached images must be dropped.
    pub mode_changed: bool,
}

/// Decides, each tick, what should be on screen.
#[derive(Debug, Clone)]
pub struct InteractionController {
    timing: ScreensaverTiming,
    state: ControllerState,
}

impl InteractionController {
    /// Create a controller in its idle startup state (screensaver).
    pub fn new(timing: ScreensaverTiming) -> Self {
        Self::with_state(timing, ControllerState::default())
    }

    /// Create a controller resuming from a given state.
    pub fn with_state(timing: ScreensaverTiming, state: ControllerState) -> Self {
        Self { timing, state }
    }

    /// The timing parameters.
    pub fn timing(&self) -> ScreensaverTiming {
        self.timing
    }

    /// The full controller state.
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// The coordinate currently on screen.
    pub fn current_display_coordinate(&self) -> ImageCoordinate {
        self.state.displayed
    }

    /// The current display mode.
    pub fn current_display_mode(&self) -> DisplayMode {
        self.state.display_mode
    }

    /// Advance the state machine.
    ///
    /// `switch` is the coordinate currently selected on the panel and
    /// `mode` the image set selected by the mode switch.
    pub fn tick(&mut self, now: Instant, switch: ImageCoordinate, mode: ModeId) -> Tick {
        let Some(last_switch) = self.state.last_switch else {
            return self.baseline(now, switch, mode);
        };

        let mut redraw = false;

        // Mode changes never touch the display mode or the inactivity timer.
        let mode_changed = mode != self.state.mode_id;
        if mode_changed {
            info!("image set changed: {} -> {}", self.state.mode_id, mode);
            self.state.previous_mode_id = self.state.mode_id;
            self.state.mode_id = mode;
            redraw = true;
        }

        let moved = switch != last_switch;
        if moved {
            self.state.last_switch = Some(switch);
            self.state.last_interaction = Some(now);
        }

        let exited = moved && self.state.display_mode == DisplayMode::Screensaver;
        if exited {
            info!("switch moved, leaving screensaver");
            self.state.display_mode = DisplayMode::Live;
        }

        if self.state.display_mode == DisplayMode::Live && self.state.displayed != switch {
            self.state.displayed = switch;
            redraw = true;
        }

        let mut entered = false;
        if self.state.display_mode == DisplayMode::Live && self.idle_for(now) >= self.timing.inactivity_timeout {
            self.state.display_mode = DisplayMode::Screensaver;
            self.state.cursor = self.state.displayed.to_index();
            self.state.last_advance = Some(now);
            entered = true;
            redraw = true;
            info!("inactive, starting screensaver at {}", self.state.displayed);
        }

        if self.state.display_mode == DisplayMode::Screensaver
            && !exited
            && !entered
            && self.since_advance(now) >= self.timing.advance_interval
        {
            self.state.cursor = (self.state.cursor + 1) % IMAGE_COUNT;
            self.state.displayed = ImageCoordinate::from_index(self.state.cursor);
            self.state.last_advance = Some(now);
            redraw = true;
            debug!("screensaver advanced to {}", self.state.displayed);
        }

        self.outcome(redraw, mode_changed)
    }

    /// First observation: record everything as the baseline.
    ///
    /// The initial switch reading is not movement, so the controller stays in
    /// whatever display mode it started in.
    fn baseline(&mut self, now: Instant, switch: ImageCoordinate, mode: ModeId) -> Tick {
        debug!("baseline switch reading {} in {}", switch, mode);
        self.state.last_switch = Some(switch);
        self.state.displayed = switch;
        self.state.cursor = switch.to_index();
        self.state.last_interaction = Some(now);
        self.state.last_advance = Some(now);
        self.state.mode_id = mode;
        self.state.previous_mode_id = mode;
        self.outcome(true, false)
    }

    fn idle_for(&self, now: Instant) -> Duration {
        self.state
            .last_interaction
            .map_or(Duration::ZERO, |at| now.saturating_duration_since(at))
    }

    fn since_advance(&self, now: Instant) -> Duration {
        self.state
            .last_advance
            .map_or(Duration::MAX, |at| now.saturating_duration_since(at))
    }

    fn outcome(&self, redraw: bool, mode_changed: bool) -> Tick {
        Tick {
            coordinate: self.state.displayed,
            display_mode: self.state.display_mode,
            mode_id: self.state.mode_id,
            redraw,
            mode_changed,
        }
    }
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(ScreensaverTiming::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = DEFAULT_INACTIVITY_TIMEOUT;
    const INTERVAL: Duration = DEFAULT_SCREENSAVER_INTERVAL;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    /// A controller that has seen a baseline and then one movement to `coord`
    /// at `t0`, leaving it live.
    fn live_at(t0: Instant, coord: ImageCoordinate) -> InteractionController {
        let mut controller = InteractionController::default();
        controller.tick(t0, ImageCoordinate::new(0, 0, 0), ModeId::One);
        let tick = controller.tick(t0, coord, ModeId::One);
        assert_eq!(tick.display_mode, DisplayMode::Live);
        controller
    }

    #[test]
    fn test_starts_in_screensaver() {
        let controller = InteractionController::default();
        assert_eq!(controller.current_display_mode(), DisplayMode::Screensaver);
    }

    #[test]
    fn test_first_tick_is_baseline() {
        let t0 = Instant::now();
        let mut controller = InteractionController::default();

        let tick = controller.tick(t0, ImageCoordinate::new(3, 1, 4), ModeId::Two);
        assert_eq!(tick.display_mode, DisplayMode::Screensaver);
        assert_eq!(tick.coordinate, ImageCoordinate::new(3, 1, 4));
        assert!(tick.redraw);
        assert!(!tick.mode_changed);
        assert_eq!(controller.state().cursor, ImageCoordinate::new(3, 1, 4).to_index());
    }

    #[test]
    fn test_identical_ticks_are_idempotent() {
        let t0 = Instant::now();
        let coord = ImageCoordinate::new(2, 2, 2);
        let mut controller = live_at(t0, coord);

        let first = controller.tick(t0 + secs(1), coord, ModeId::One);
        let second = controller.tick(t0 + secs(1), coord, ModeId::One);
        assert_eq!(first.coordinate, second.coordinate);
        assert_eq!(first.display_mode, second.display_mode);
        assert!(!second.redraw);
        assert!(!second.mode_changed);
    }

    #[test]
    fn test_idempotent_in_screensaver() {
        let t0 = Instant::now();
        let mut controller = InteractionController::default();
        controller.tick(t0, ImageCoordinate::new(0, 0, 0), ModeId::One);

        let a = controller.tick(t0 + INTERVAL, ImageCoordinate::new(0, 0, 0), ModeId::One);
        let b = controller.tick(t0 + INTERVAL, ImageCoordinate::new(0, 0, 0), ModeId::One);
        assert!(a.redraw);
        assert!(!b.redraw);
        assert_eq!(a.coordinate, b.coordinate);
        assert_eq!(b.display_mode, DisplayMode::Screensaver);
    }

    #[test]
    fn test_movement_exits_screensaver_and_adopts_switches() {
        let t0 = Instant::now();
        let mut controller = InteractionController::default();
        controller.tick(t0, ImageCoordinate::new(0, 0, 0), ModeId::One);

        let tick = controller.tick(t0 + secs(1), ImageCoordinate::new(5, 0, 2), ModeId::One);
        assert_eq!(tick.display_mode, DisplayMode::Live);
        assert_eq!(tick.coordinate, ImageCoordinate::new(5, 0, 2));
        assert!(tick.redraw);
        assert_eq!(controller.state().last_interaction, Some(t0 + secs(1)));
    }

    #[test]
    fn test_exit_does_not_advance_in_same_tick() {
        let t0 = Instant::now();
        let mut controller = InteractionController::default();
        controller.tick(t0, ImageCoordinate::new(0, 0, 0), ModeId::One);

        // Well past the advance interval, but the switches moved.
        let tick = controller.tick(t0 + INTERVAL * 4, ImageCoordinate::new(1, 1, 1), ModeId::One);
        assert_eq!(tick.coordinate, ImageCoordinate::new(1, 1, 1));
        assert_eq!(tick.display_mode, DisplayMode::Live);
    }

    #[test]
    fn test_live_follows_switches() {
        let t0 = Instant::now();
        let mut controller = live_at(t0, ImageCoordinate::new(1, 0, 0));

        let tick = controller.tick(t0 + secs(2), ImageCoordinate::new(1, 3, 0), ModeId::One);
        assert_eq!(tick.coordinate, ImageCoordinate::new(1, 3, 0));
        assert!(tick.redraw);
    }

    #[test]
    fn test_inactivity_boundary() {
        let t0 = Instant::now();
        let coord = ImageCoordinate::new(2, 3, 4);
        let mut controller = live_at(t0, coord);

        let before = controller.tick(t0 + TIMEOUT - secs(1), coord, ModeId::One);
        assert_eq!(before.display_mode, DisplayMode::Live);

        let at = controller.tick(t0 + TIMEOUT, coord, ModeId::One);
        assert_eq!(at.display_mode, DisplayMode::Screensaver);
        assert_eq!(at.coordinate, coord);
        assert!(at.redraw);
        assert_eq!(controller.state().cursor, coord.to_index());
        assert_ne!(controller.state().cursor, 0);
    }

    #[test]
    fn test_screensaver_entry_does_not_advance_immediately() {
        let t0 = Instant::now();
        let coord = ImageCoordinate::new(0, 0, 3);
        let mut controller = live_at(t0, coord);

        controller.tick(t0 + TIMEOUT, coord, ModeId::One);
        let next = controller.tick(t0 + TIMEOUT + INTERVAL - secs(1), coord, ModeId::One);
        assert_eq!(next.coordinate, coord);
        assert!(!next.redraw);

        let advanced = controller.tick(t0 + TIMEOUT + INTERVAL, coord, ModeId::One);
        assert_eq!(advanced.coordinate, ImageCoordinate::new(0, 0, 4));
    }

    #[test]
    fn test_screensaver_cycles_in_index_order() {
        let t0 = Instant::now();
        let start = ImageCoordinate::from_index(210);
        let mut controller = InteractionController::default();
        controller.tick(t0, start, ModeId::One);

        let k = controller.state().cursor;
        let n = 10u16;
        for i in 1..=n as u32 {
            controller.tick(t0 + INTERVAL * i, start, ModeId::One);
        }
        assert_eq!(controller.state().cursor, (k + n) % IMAGE_COUNT);
        assert_eq!(
            controller.current_display_coordinate(),
            ImageCoordinate::from_index((k + n) % IMAGE_COUNT)
        );
    }

    #[test]
    fn test_mode_change_keeps_display_mode_and_timer() {
        let t0 = Instant::now();
        let coord = ImageCoordinate::new(4, 4, 4);
        let mut controller = live_at(t0, coord);

        let tick = controller.tick(t0 + secs(10), coord, ModeId::Three);
        assert!(tick.mode_changed);
        assert!(tick.redraw);
        assert_eq!(tick.display_mode, DisplayMode::Live);
        assert_eq!(tick.coordinate, coord);
        assert_eq!(tick.mode_id, ModeId::Three);
        assert_eq!(controller.state().previous_mode_id, ModeId::One);
        assert_eq!(controller.state().last_interaction, Some(t0));

        let again = controller.tick(t0 + secs(11), coord, ModeId::Three);
        assert!(!again.mode_changed);
        assert!(!again.redraw);
    }

    #[test]
    fn test_mode_change_in_screensaver_stays_in_screensaver() {
        let t0 = Instant::now();
        let coord = ImageCoordinate::new(0, 0, 0);
        let mut controller = InteractionController::default();
        controller.tick(t0, coord, ModeId::One);

        let tick = controller.tick(t0 + secs(1), coord, ModeId::Two);
        assert!(tick.mode_changed);
        assert_eq!(tick.display_mode, DisplayMode::Screensaver);
        assert_eq!(tick.coordinate, coord);
    }
}
