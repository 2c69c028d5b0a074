//! Image-set modes and the 3-way mode switch.

use crate::coord::ImageCoordinate;
use crate::error::ArtboxError;

use embedded_hal::digital::{Error as _, InputPin};
use log::warn;
use std::fmt;
use std::path::{Path, PathBuf};

// =============================================================================
// Mode Id
// =============================================================================

/// One of the three image sets, selected by the 3-way switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModeId {
    /// Image set `mode-1`.
    #[default]
    One,
    /// Image set `mode-2`.
    Two,
    /// Image set `mode-3`.
    Three,
}

impl ModeId {
    /// The mode number (1-3).
    pub fn number(self) -> u8 {
        match self {
            ModeId::One => 1,
            ModeId::Two => 2,
            ModeId::Three => 3,
        }
    }

    /// The image-set directory name, e.g. `mode-2`.
    pub fn dir_name(self) -> String {
        format!("mode-{}", self.number())
    }

    /// Map a 3-way switch position (0, 1 or 2) to a mode.
    ///
    /// The table follows the panel wiring: 1 -> mode 1, 0 -> mode 2,
    /// 2 -> mode 3. Unknown positions select mode 1.
    pub fn from_switch_position(position: u8) -> Self {
        match position {
            1 => ModeId::One,
            0 => ModeId::Two,
            2 => ModeId::Three,
            _ => ModeId::One,
        }
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode {}", self.number())
    }
}

// =============================================================================
// Mode Switch
// =============================================================================

/// A source of 3-way switch positions (0, 1 or 2).
pub trait ModeSource: Send {
    /// Sample the switch position.
    fn read_position(&mut self) -> Result<u8, ArtboxError>;
}

/// An ON-OFF-ON toggle wired to two active-low inputs with pull-ups.
///
/// Only `a` low reads as position 1, only `b` low as position 2; the centre
/// (neither) and the impossible both-low case read as position 0.
pub struct ThreeWaySwitch<A, B> {
    a: A,
    b: B,
}

impl<A, B> ThreeWaySwitch<A, B>
where
    A: InputPin,
    B: InputPin,
{
    /// Create a switch from its two input pins.
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}

impl<A, B> ModeSource for ThreeWaySwitch<A, B>
where
    A: InputPin + Send,
    B: InputPin + Send,
{
    fn read_position(&mut self) -> Result<u8, ArtboxError> {
        let a_active = self.a.is_low().map_err(|e| ArtboxError::Gpio(e.kind()))?;
        let b_active = self.b.is_low().map_err(|e| ArtboxError::Gpio(e.kind()))?;

        Ok(match (a_active, b_active) {
            (true, false) => 1,
            (false, true) => 2,
            _ => 0,
        })
    }
}

/// A mode source for panels without a mode switch.
#[derive(Debug, Clone, Copy)]
pub struct FixedMode(pub u8);

impl ModeSource for FixedMode {
    fn read_position(&mut self) -> Result<u8, ArtboxError> {
        Ok(self.0)
    }
}

// =============================================================================
// Image Set Layout
// =============================================================================

/// Resolves coordinates to image files under an image root.
///
/// Mode `N` reads from `root/mode-N/`. When that directory is missing the
/// base directory (`root/` itself) is used instead; the reported mode is
/// unaffected. Each fallback is counted and the first one per mode is logged
/// as a warning so misconfigured installs are visible.
#[derive(Debug)]
pub struct ImageSetLayout {
    root: PathBuf,
    extension: String,
    warned: [bool; 3],
    fallbacks: u64,
}

impl ImageSetLayout {
    /// Create a layout rooted at `root` using image files with `extension`.
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            warned: [false; 3],
            fallbacks: 0,
        }
    }

    /// The image root (also the base directory).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the file for `coord` under `mode`.
    pub fn resolve(&mut self, mode: ModeId, coord: ImageCoordinate) -> PathBuf {
        let file_name = coord.file_name(&self.extension);
        let mode_dir = self.root.join(mode.dir_name());
        if mode_dir.is_dir() {
            return mode_dir.join(file_name);
        }

        self.fallbacks += 1;
        let slot = (mode.number() - 1) as usize;
        if !self.warned[slot] {
            self.warned[slot] = true;
            warn!(
                "image set {} not found, falling back to {}",
                mode_dir.display(),
                self.root.display()
            );
        }
        self.root.join(file_name)
    }

    /// How many resolutions fell back to the base directory.
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPin;
    use std::fs;

    fn temp_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("artbox-modes-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        root
    }

    #[test]
    fn test_position_table_follows_wiring() {
        assert_eq!(ModeId::from_switch_position(1), ModeId::One);
        assert_eq!(ModeId::from_switch_position(0), ModeId::Two);
        assert_eq!(ModeId::from_switch_position(2), ModeId::Three);
        assert_eq!(ModeId::from_switch_position(7), ModeId::One);
    }

    #[test]
    fn test_three_way_switch_positions() {
        let mut switch = ThreeWaySwitch::new(MockPin::new(true), MockPin::new(true));
        assert_eq!(switch.read_position().unwrap(), 0);

        let mut switch = ThreeWaySwitch::new(MockPin::new(false), MockPin::new(true));
        assert_eq!(switch.read_position().unwrap(), 1);

        let mut switch = ThreeWaySwitch::new(MockPin::new(true), MockPin::new(false));
        assert_eq!(switch.read_position().unwrap(), 2);

        let mut switch = ThreeWaySwitch::new(MockPin::new(false), MockPin::new(false));
        assert_eq!(switch.read_position().unwrap(), 0);
    }

    #[test]
    fn test_three_way_switch_reports_gpio_failure() {
        let mut switch = ThreeWaySwitch::new(MockPin::failing(), MockPin::new(true));
        assert!(matches!(switch.read_position(), Err(ArtboxError::Gpio(_))));
    }

    #[test]
    fn test_layout_uses_mode_directory() {
        let root = temp_root("present");
        fs::create_dir_all(root.join("mode-2")).unwrap();

        let mut layout = ImageSetLayout::new(&root, "jpeg");
        let path = layout.resolve(ModeId::Two, ImageCoordinate::new(1, 2, 3));
        assert_eq!(path, root.join("mode-2").join("1-2-3.jpeg"));
        assert_eq!(layout.fallback_count(), 0);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_layout_falls_back_to_base_directory() {
        let root = temp_root("missing");

        let mut layout = ImageSetLayout::new(&root, "png");
        let path = layout.resolve(ModeId::Three, ImageCoordinate::new(0, 0, 5));
        assert_eq!(path, root.join("0-0-5.png"));
        layout.resolve(ModeId::Three, ImageCoordinate::new(0, 1, 5));
        assert_eq!(layout.fallback_count(), 2);

        let _ = fs::remove_dir_all(&root);
    }
}
