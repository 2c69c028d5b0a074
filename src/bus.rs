//! The shared, multiplexed I2C bus.
//!
//! One physical bus reaches every device through a PCA9548A multiplexer.
//! Selecting a channel is a bus-wide side effect, so a channel select and
//! the transfer that depends on it must happen under the same lock. All
//! consumers (switch poller, LCD writer) go through one [`SharedBus`]
//! handle, never the raw bus.

use crate::error::ArtboxError;
use crate::switch::SwitchDevice;

use embedded_hal::i2c::{Error as _, I2c};
use log::trace;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Default PCA9548A address.
pub const DEFAULT_MUX_ADDRESS: u8 = 0x70;

/// Time allowed for the multiplexer to switch channels.
pub const DEFAULT_CHANNEL_SETTLE: Duration = Duration::from_millis(10);

/// Highest multiplexer channel.
pub const MAX_CHANNEL: u8 = 7;

/// A source of raw switch bytes.
pub trait SwitchSource: Send {
    /// Read the raw expander byte of `device`.
    fn read_switch_byte(&mut self, device: SwitchDevice) -> Result<u8, ArtboxError>;
}

struct BusInner<I2C> {
    i2c: I2C,
    mux_address: u8,
    settle: Duration,
}

/// A cloneable handle to the multiplexed bus.
pub struct SharedBus<I2C> {
    inner: Arc<Mutex<BusInner<I2C>>>,
}

impl<I2C> Clone for SharedBus<I2C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I2C> SharedBus<I2C>
where
    I2C: I2c,
{
    /// Take ownership of the bus.
    pub fn new(i2c: I2C, mux_address: u8, settle: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                i2c,
                mux_address,
                settle,
            })),
        }
    }

    /// Select `channel`, then run `op` against the device at `address`,
    /// holding the bus for both steps.
    pub fn with_device<T, F>(&self, channel: u8, address: u8, op: F) -> Result<T, ArtboxError>
    where
        F: FnOnce(&mut I2C, u8) -> Result<T, I2C::Error>,
    {
        if channel > MAX_CHANNEL {
            return Err(ArtboxError::InvalidChannel(channel));
        }

        let mut bus = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mux_address = bus.mux_address;
        bus.i2c
            .write(mux_address, &[1 << channel])
            .map_err(|e| ArtboxError::Bus {
                channel,
                address: mux_address,
                kind: e.kind(),
            })?;
        if !bus.settle.is_zero() {
            std::thread::sleep(bus.settle);
        }
        trace!("selected channel {}", channel);

        op(&mut bus.i2c, address).map_err(|e| ArtboxError::Bus {
            channel,
            address,
            kind: e.kind(),
        })
    }

    /// Select a multiplexer channel.
    pub fn select_channel(&self, channel: u8) -> Result<(), ArtboxError> {
        let mux_address = self.inner.lock().unwrap_or_else(PoisonError::into_inner).mux_address;
        self.with_device(channel, mux_address, |_, _| Ok(()))
    }

    /// Read one byte from the device at `address` on `channel`.
    pub fn read_byte(&self, channel: u8, address: u8) -> Result<u8, ArtboxError> {
        self.with_device(channel, address, |i2c, address| {
            let mut buf = [0u8; 1];
            i2c.read(address, &mut buf)?;
            Ok(buf[0])
        })
    }

    /// Write bytes to the device at `address` on `channel`.
    pub fn write(&self, channel: u8, address: u8, bytes: &[u8]) -> Result<(), ArtboxError> {
        self.with_device(channel, address, |i2c, address| i2c.write(address, bytes))
    }
}

impl<I2C> SwitchSource for SharedBus<I2C>
where
    I2C: I2c + Send,
{
    fn read_switch_byte(&mut self, device: SwitchDevice) -> Result<u8, ArtboxError> {
        self.read_byte(device.channel, device.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{BusEvent, MockI2c};

    #[test]
    fn test_read_selects_channel_first() {
        let i2c = MockI2c::new();
        i2c.set_byte(2, 0x24, 0xFB);
        let bus = SharedBus::new(i2c.clone(), DEFAULT_MUX_ADDRESS, Duration::ZERO);

        assert_eq!(bus.read_byte(2, 0x24).unwrap(), 0xFB);
        assert_eq!(
            i2c.events(),
            vec![BusEvent::Select(2), BusEvent::Read { channel: 2, address: 0x24 }]
        );
    }

    #[test]
    fn test_invalid_channel_is_rejected() {
        let bus = SharedBus::new(MockI2c::new(), DEFAULT_MUX_ADDRESS, Duration::ZERO);
        assert!(matches!(bus.read_byte(8, 0x24), Err(ArtboxError::InvalidChannel(8))));
    }

    #[test]
    fn test_read_failure_reports_device() {
        let i2c = MockI2c::new();
        i2c.fail_device(1, 0x24);
        let mut bus = SharedBus::new(i2c, DEFAULT_MUX_ADDRESS, Duration::ZERO);

        match bus.read_switch_byte(SwitchDevice::new(1, 0x24)) {
            Err(ArtboxError::Bus { channel, address, .. }) => {
                assert_eq!(channel, 1);
                assert_eq!(address, 0x24);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_select_and_transfer_never_interleave() {
        let i2c = MockI2c::new();
        for channel in 0..3 {
            i2c.set_byte(channel, 0x24, 0xFE);
        }
        let bus = SharedBus::new(i2c.clone(), DEFAULT_MUX_ADDRESS, Duration::ZERO);

        let handles: Vec<_> = (0..3u8)
            .map(|channel| {
                let bus = bus.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        bus.read_byte(channel, 0x24).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let events = i2c.events();
        assert_eq!(events.len(), 300);
        for pair in events.chunks(2) {
            match pair {
                [BusEvent::Select(selected), BusEvent::Read { channel, .. }] => {
                    assert_eq!(selected, channel)
                }
                other => panic!("interleaved bus access: {other:?}"),
            }
        }
    }
}
