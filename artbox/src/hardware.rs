//! Linux hardware: the I2C switch panel, the LCD and the mode switch.

use anyhow::Context;
use artbox_core::{BusConfig, CharLcd, LcdWriter, ModeSource, SharedBus, SwitchPoller, SwitchSnapshot, ThreeWaySwitch};
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::{CdevPin, I2cdev};
use log::{info, warn};
use std::time::Duration;

/// Everything opened on the panel.
pub struct Hardware {
    pub poller: SwitchPoller,
    pub lcd: Option<Box<dyn LcdWriter>>,
}

/// Open the bus, start polling the switches and set up the LCD.
///
/// A missing mode switch is not fatal; the panel then stays on mode 1.
pub fn open(config: &BusConfig, snapshot: SwitchSnapshot, poll_interval: Duration) -> anyhow::Result<Hardware> {
    let i2c = I2cdev::new(&config.device).with_context(|| format!("opening I2C bus {}", config.device))?;
    let bus = SharedBus::new(i2c, config.mux_address, config.settle());
    info!("opened I2C bus {} (mux at 0x{:02X})", config.device, config.mux_address);

    let mode_source = match config.mode_pins {
        Some([a, b]) => match open_mode_switch(&config.gpio_chip, a, b) {
            Ok(switch) => Some(Box::new(switch) as Box<dyn ModeSource>),
            Err(e) => {
                warn!("mode switch unavailable, staying on mode 1: {:#}", e);
                None
            }
        },
        None => None,
    };

    let lcd = config
        .lcd_channel
        .map(|channel| Box::new(CharLcd::new(bus.clone(), channel, config.lcd_address)) as Box<dyn LcdWriter>);

    let poller = SwitchPoller::spawn(
        Box::new(bus),
        config.switch_devices(),
        mode_source,
        poll_interval,
        snapshot,
    )
    .context("starting switch poller")?;

    Ok(Hardware { poller, lcd })
}

fn open_mode_switch(path: &str, a: u32, b: u32) -> anyhow::Result<ThreeWaySwitch<CdevPin, CdevPin>> {
    let mut chip = Chip::new(path).with_context(|| format!("opening GPIO chip {path}"))?;
    let mut input = |offset: u32, consumer: &str| -> anyhow::Result<CdevPin> {
        let line = chip
            .get_line(offset)
            .with_context(|| format!("getting GPIO line {offset}"))?;
        let handle = line
            .request(LineRequestFlags::INPUT, 0, consumer)
            .with_context(|| format!("requesting GPIO line {offset}"))?;
        CdevPin::new(handle).with_context(|| format!("creating pin for GPIO line {offset}"))
    };

    let pin_a = input(a, "artbox-mode-a")?;
    let pin_b = input(b, "artbox-mode-b")?;
    info!("mode switch on GPIO lines {} and {}", a, b);
    Ok(ThreeWaySwitch::new(pin_a, pin_b))
}
