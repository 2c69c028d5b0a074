//! Character LCD text.
//!
//! A 20x4 HD44780 panel behind a PCF8574 "backpack", reached through the
//! shared bus. LCD output is best effort; callers log and drop failures.

use crate::bus::SharedBus;
use crate::coord::ImageCoordinate;
use crate::error::ArtboxError;
use crate::labels::Labels;
use crate::state::DisplayMode;

use embedded_hal::i2c::I2c;
use log::debug;
use std::time::Duration;

/// Characters per row.
pub const LCD_COLUMNS: usize = 20;

/// Number of rows.
pub const LCD_ROWS: usize = 4;

/// Default backpack address.
pub const DEFAULT_LCD_ADDRESS: u8 = 0x27;

/// A text display of up to four 20-character lines.
pub trait LcdWriter: Send {
    /// Replace the display contents. Extra lines are ignored and long lines
    /// are truncated.
    fn write_lines(&mut self, lines: &[String]) -> Result<(), ArtboxError>;

    /// Blank the display.
    fn clear(&mut self) -> Result<(), ArtboxError>;
}

/// The LCD text for a displayed coordinate.
///
/// The title names the display mode; the remaining lines show the switch
/// labels, or raw positions when no labels file is configured.
pub fn lcd_lines(mode: DisplayMode, coord: ImageCoordinate, labels: Option<&Labels>) -> Vec<String> {
    let title = match mode {
        DisplayMode::Live => "*** INTER-ACTIVE ***",
        DisplayMode::Screensaver => "*** SCREEN-SAVER ***",
    };

    let mut lines = vec![title.to_string()];
    match labels {
        Some(labels) => lines.extend(labels.for_coordinate(coord).iter().map(|l| fit_line(l))),
        None => lines.extend(
            coord
                .digits()
                .iter()
                .enumerate()
                .map(|(i, d)| format!("SW{}: Pos {}", i + 1, d + 1)),
        ),
    }
    lines
}

/// Truncate to the panel width.
pub fn fit_line(text: &str) -> String {
    text.chars().take(LCD_COLUMNS).collect()
}

// =============================================================================
// HD44780 over PCF8574
// =============================================================================

// Backpack pin mapping: P0 = RS, P1 = RW, P2 = E, P3 = backlight, P4-P7 = D4-D7.
const RS: u8 = 0x01;
const ENABLE: u8 = 0x04;
const BACKLIGHT: u8 = 0x08;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE: u8 = 0x06;
const CMD_DISPLAY_ON: u8 = 0x0C;
const CMD_FUNCTION_4BIT_2LINE: u8 = 0x28;
const CMD_SET_DDRAM: u8 = 0x80;

const ROW_OFFSETS: [u8; LCD_ROWS] = [0x00, 0x40, 0x14, 0x54];

/// An HD44780 character LCD on a multiplexer channel of the shared bus.
pub struct CharLcd<I2C> {
    bus: SharedBus<I2C>,
    channel: u8,
    address: u8,
    initialized: bool,
}

impl<I2C> CharLcd<I2C>
where
    I2C: I2c,
{
    /// Create a handle. The panel is initialized on first use.
    pub fn new(bus: SharedBus<I2C>, channel: u8, address: u8) -> Self {
        Self {
            bus,
            channel,
            address,
            initialized: false,
        }
    }

    fn run<F>(&mut self, op: F) -> Result<(), ArtboxError>
    where
        F: FnOnce(&mut I2C, u8) -> Result<(), I2C::Error>,
    {
        let needs_init = !self.initialized;
        let result = self.bus.with_device(self.channel, self.address, |i2c, address| {
            if needs_init {
                init(i2c, address)?;
            }
            op(i2c, address)
        });
        match &result {
            Ok(()) => self.initialized = true,
            Err(e) => {
                debug!("lcd transfer failed: {}", e);
                self.initialized = false;
            }
        }
        result
    }
}

impl<I2C> LcdWriter for CharLcd<I2C>
where
    I2C: I2c + Send,
{
    fn write_lines(&mut self, lines: &[String]) -> Result<(), ArtboxError> {
        let rows: Vec<String> = (0..LCD_ROWS)
            .map(|row| {
                let text = lines.get(row).map_or("", String::as_str);
                format!("{:<width$}", fit_line(text), width = LCD_COLUMNS)
            })
            .collect();

        self.run(|i2c, address| {
            for (row, text) in rows.iter().enumerate() {
                command(i2c, address, CMD_SET_DDRAM | ROW_OFFSETS[row])?;
                for ch in text.chars() {
                    let byte = if ch.is_ascii() { ch as u8 } else { b'?' };
                    send(i2c, address, byte, RS)?;
                }
            }
            Ok(())
        })
    }

    fn clear(&mut self) -> Result<(), ArtboxError> {
        self.run(|i2c, address| {
            command(i2c, address, CMD_CLEAR)?;
            std::thread::sleep(Duration::from_millis(2));
            Ok(())
        })
    }
}

fn init<I2C: I2c>(i2c: &mut I2C, address: u8) -> Result<(), I2C::Error> {
    std::thread::sleep(Duration::from_millis(50));
    // Force 8-bit mode three times, then switch to 4-bit.
    for _ in 0..3 {
        write_nibble(i2c, address, 0x30, 0)?;
        std::thread::sleep(Duration::from_millis(5));
    }
    write_nibble(i2c, address, 0x20, 0)?;
    command(i2c, address, CMD_FUNCTION_4BIT_2LINE)?;
    command(i2c, address, CMD_DISPLAY_ON)?;
    command(i2c, address, CMD_CLEAR)?;
    std::thread::sleep(Duration::from_millis(2));
    command(i2c, address, CMD_ENTRY_MODE)
}

fn command<I2C: I2c>(i2c: &mut I2C, address: u8, value: u8) -> Result<(), I2C::Error> {
    send(i2c, address, value, 0)
}

fn send<I2C: I2c>(i2c: &mut I2C, address: u8, value: u8, mode: u8) -> Result<(), I2C::Error> {
    write_nibble(i2c, address, value & 0xF0, mode)?;
    write_nibble(i2c, address, (value << 4) & 0xF0, mode)
}

fn write_nibble<I2C: I2c>(i2c: &mut I2C, address: u8, nibble: u8, mode: u8) -> Result<(), I2C::Error> {
    let data = nibble | mode | BACKLIGHT;
    i2c.write(address, &[data | ENABLE])?;
    i2c.write(address, &[data])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::DEFAULT_MUX_ADDRESS;
    use crate::mock::{BusEvent, MockI2c};

    #[test]
    fn test_live_lines_with_labels() {
        let labels = Labels::new(
            (0..6).map(|i| format!("SCENE {i} WITH A VERY LONG NAME")).collect(),
            (0..6).map(|i| format!("STYLE {i}")).collect(),
            (0..6).map(|i| format!("ACT {i}")).collect(),
        )
        .unwrap();

        let lines = lcd_lines(DisplayMode::Live, ImageCoordinate::new(1, 2, 3), Some(&labels));
        assert_eq!(lines[0], "*** INTER-ACTIVE ***");
        assert_eq!(lines[1], "SCENE 1 WITH A VERY ");
        assert_eq!(lines[1].len(), LCD_COLUMNS);
        assert_eq!(lines[2], "STYLE 2");
        assert_eq!(lines[3], "ACT 3");
    }

    #[test]
    fn test_screensaver_lines_without_labels() {
        let lines = lcd_lines(DisplayMode::Screensaver, ImageCoordinate::new(0, 5, 2), None);
        assert_eq!(
            lines,
            vec!["*** SCREEN-SAVER ***", "SW1: Pos 1", "SW2: Pos 6", "SW3: Pos 3"]
        );
    }

    #[test]
    fn test_char_lcd_writes_on_its_channel() {
        let i2c = MockI2c::new();
        let bus = SharedBus::new(i2c.clone(), DEFAULT_MUX_ADDRESS, Duration::ZERO);
        let mut lcd = CharLcd::new(bus, 3, DEFAULT_LCD_ADDRESS);

        lcd.write_lines(&["HELLO".to_string()]).unwrap();

        let events = i2c.events();
        assert_eq!(events.first(), Some(&BusEvent::Select(3)));
        assert!(events.iter().skip(1).all(|e| matches!(
            e,
            BusEvent::Write { channel: 3, address: DEFAULT_LCD_ADDRESS, .. }
        )));
        // Every byte is clocked with the backlight on.
        assert!(events.iter().skip(1).all(|e| match e {
            BusEvent::Write { bytes, .. } => bytes.iter().all(|b| b & BACKLIGHT != 0),
            _ => false,
        }));
    }

    #[test]
    fn test_char_lcd_failure_is_reported() {
        let i2c = MockI2c::new();
        i2c.fail_device(3, DEFAULT_LCD_ADDRESS);
        let bus = SharedBus::new(i2c, DEFAULT_MUX_ADDRESS, Duration::ZERO);
        let mut lcd = CharLcd::new(bus, 3, DEFAULT_LCD_ADDRESS);

        assert!(lcd.clear().is_err());
    }
}
