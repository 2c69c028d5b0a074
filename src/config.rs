//! Runtime configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! is a valid configuration.

use crate::bus::{DEFAULT_CHANNEL_SETTLE, DEFAULT_MUX_ADDRESS, MAX_CHANNEL};
use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::controller::ScreensaverTiming;
use crate::error::ArtboxError;
use crate::lcd::DEFAULT_LCD_ADDRESS;
use crate::render::{CrossfadeSettings, Size};
use crate::switch::SwitchDevice;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Longest accepted duration setting, in seconds (one day).
pub const MAX_DURATION_SECS: f64 = 86_400.0;

/// Highest accepted frame rate for presentation and crossfades.
pub const MAX_FRAME_RATE: u32 = 240;

/// Default PCF8574 address of the switch expanders.
pub const DEFAULT_SWITCH_ADDRESS: u8 = 0x24;

/// Hardware wiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// I2C character device.
    pub device: String,
    /// PCA9548A address.
    pub mux_address: u8,
    /// Switch expander address (the same on every channel).
    pub switch_address: u8,
    /// Multiplexer channels of switches 1, 2 and 3.
    pub switch_channels: [u8; 3],
    /// Multiplexer channel of the LCD, or `None` without an LCD.
    pub lcd_channel: Option<u8>,
    /// LCD backpack address.
    pub lcd_address: u8,
    /// Channel settle time in milliseconds.
    pub settle_ms: u64,
    /// GPIO character device of the mode switch.
    pub gpio_chip: String,
    /// GPIO lines of the 3-way switch (A, B), or `None` without one.
    pub mode_pins: Option<[u32; 2]>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            device: "/dev/i2c-1".to_string(),
            mux_address: DEFAULT_MUX_ADDRESS,
            switch_address: DEFAULT_SWITCH_ADDRESS,
            switch_channels: [1, 2, 0],
            lcd_channel: Some(3),
            lcd_address: DEFAULT_LCD_ADDRESS,
            settle_ms: DEFAULT_CHANNEL_SETTLE.as_millis() as u64,
            gpio_chip: "/dev/gpiochip0".to_string(),
            mode_pins: Some([0, 5]),
        }
    }
}

impl BusConfig {
    /// The three switch devices, in switch order.
    pub fn switch_devices(&self) -> [SwitchDevice; 3] {
        self.switch_channels
            .map(|channel| SwitchDevice::new(channel, self.switch_address))
    }

    /// Channel settle time.
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Display controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds without switch movement before the screensaver starts.
    pub inactivity_timeout_secs: f64,
    /// Seconds each screensaver image stays up.
    pub screensaver_interval_secs: f64,
    /// Images kept in memory.
    pub cache_capacity: usize,
    /// Crossfade between images.
    pub crossfade: bool,
    /// Crossfade length in seconds.
    pub crossfade_secs: f64,
    /// Crossfade frame rate.
    pub crossfade_fps: u32,
    /// Presentation loop rate.
    pub frame_rate: u32,
    /// Switch sampling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// Image file extension.
    pub image_extension: String,
    /// Hardware wiring.
    pub bus: BusConfig,
}

impl Default for Config {
    fn default() -> Self {
        let timing = ScreensaverTiming::default();
        let crossfade = CrossfadeSettings::default();
        Self {
            inactivity_timeout_secs: timing.inactivity_timeout.as_secs_f64(),
            screensaver_interval_secs: timing.advance_interval.as_secs_f64(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            crossfade: crossfade.enabled,
            crossfade_secs: crossfade.duration.as_secs_f64(),
            crossfade_fps: crossfade.fps,
            frame_rate: 30,
            poll_interval_ms: 100,
            width: 1920,
            height: 1080,
            image_extension: "jpeg".to_string(),
            bus: BusConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ArtboxError> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ArtboxError> {
        let invalid = |field, reason| Err(ArtboxError::InvalidConfig { field, reason });

        if !self.inactivity_timeout_secs.is_finite() || self.inactivity_timeout_secs <= 0.0 {
            return invalid("inactivity_timeout_secs", "must be positive");
        }
        if self.inactivity_timeout_secs > MAX_DURATION_SECS {
            return invalid("inactivity_timeout_secs", "must be at most one day");
        }
        if !self.screensaver_interval_secs.is_finite() || self.screensaver_interval_secs <= 0.0 {
            return invalid("screensaver_interval_secs", "must be positive");
        }
        if self.screensaver_interval_secs > MAX_DURATION_SECS {
            return invalid("screensaver_interval_secs", "must be at most one day");
        }
        if !self.crossfade_secs.is_finite() || self.crossfade_secs < 0.0 {
            return invalid("crossfade_secs", "must not be negative");
        }
        if self.crossfade_secs > MAX_DURATION_SECS {
            return invalid("crossfade_secs", "must be at most one day");
        }
        if !(1..=MAX_FRAME_RATE).contains(&self.crossfade_fps) {
            return invalid("crossfade_fps", "must be 1-240");
        }
        if !(1..=MAX_FRAME_RATE).contains(&self.frame_rate) {
            return invalid("frame_rate", "must be 1-240");
        }
        if self.poll_interval_ms == 0 {
            return invalid("poll_interval_ms", "must be at least 1");
        }
        if self.cache_capacity == 0 {
            return invalid("cache_capacity", "must be at least 1");
        }
        if self.width == 0 || self.height == 0 {
            return invalid("width/height", "must be non-zero");
        }
        if self.image_extension.is_empty() {
            return invalid("image_extension", "must not be empty");
        }
        if self.bus.switch_channels.iter().any(|&c| c > MAX_CHANNEL) {
            return invalid("bus.switch_channels", "must be 0-7");
        }
        if self.bus.lcd_channel.is_some_and(|c| c > MAX_CHANNEL) {
            return invalid("bus.lcd_channel", "must be 0-7");
        }
        Ok(())
    }

    /// Screensaver timing.
    ///
    /// Values no [`Duration`] can hold fall back to the defaults; call
    /// [`Config::validate`] to reject them instead.
    pub fn timing(&self) -> ScreensaverTiming {
        let defaults = ScreensaverTiming::default();
        ScreensaverTiming {
            inactivity_timeout: seconds(self.inactivity_timeout_secs, defaults.inactivity_timeout),
            advance_interval: seconds(self.screensaver_interval_secs, defaults.advance_interval),
        }
    }

    /// Crossfade settings.
    pub fn crossfade(&self) -> CrossfadeSettings {
        let defaults = CrossfadeSettings::default();
        CrossfadeSettings {
            enabled: self.crossfade,
            duration: seconds(self.crossfade_secs, defaults.duration),
            fps: self.crossfade_fps,
        }
    }

    /// Surface size.
    pub fn surface(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Switch sampling interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Time between presentation ticks.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1) as f64)
    }
}

fn seconds(value: f64, fallback: Duration) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_installation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timing(), ScreensaverTiming::default());
        assert_eq!(config.crossfade(), CrossfadeSettings::default());
        assert_eq!(config.surface(), Size::new(1920, 1080));
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(
            config.bus.switch_devices(),
            [
                SwitchDevice::new(1, 0x24),
                SwitchDevice::new(2, 0x24),
                SwitchDevice::new(0, 0x24)
            ]
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"inactivity_timeout_secs": 60, "bus": {"lcd_channel": null}}"#).unwrap();
        assert_eq!(config.timing().inactivity_timeout, Duration::from_secs(60));
        assert_eq!(config.timing().advance_interval, Duration::from_secs(3));
        assert_eq!(config.bus.lcd_channel, None);
        assert_eq!(config.bus.mux_address, 0x70);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = Config {
            frame_rate: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ArtboxError::InvalidConfig { field: "frame_rate", .. })
        ));

        let mut config = Config::default();
        config.bus.switch_channels = [1, 2, 9];
        assert!(config.validate().is_err());

        let config = Config {
            screensaver_interval_secs: -1.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_durations_are_rejected() {
        let config: Config = serde_json::from_str(r#"{"inactivity_timeout_secs": 1e20}"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ArtboxError::InvalidConfig {
                field: "inactivity_timeout_secs",
                ..
            })
        ));
        assert_eq!(config.timing(), ScreensaverTiming::default());

        let config = Config {
            crossfade_secs: f64::MAX,
            ..Config::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.crossfade().duration, CrossfadeSettings::default().duration);

        let config = Config {
            crossfade_fps: 1_000_000,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ArtboxError::InvalidConfig { field: "crossfade_fps", .. })
        ));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let path = std::env::temp_dir().join(format!("artbox-config-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(&path), Err(ArtboxError::Json(_))));
        let _ = std::fs::remove_file(&path);
    }
}
