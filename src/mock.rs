//! Test doubles for the hardware and display seams.
//!
//! These let the controller, cache, renderer and pipeline run without an
//! I2C bus, GPIO pins, image files or a window.
//!
//! # Example
//!
//! ```
//! use artbox_core::{MockI2c, SharedBus, DEFAULT_MUX_ADDRESS};
//! use std::time::Duration;
//!
//! let i2c = MockI2c::new();
//! i2c.set_byte(1, 0x24, 0xFB);
//! let bus = SharedBus::new(i2c, DEFAULT_MUX_ADDRESS, Duration::ZERO);
//! assert_eq!(bus.read_byte(1, 0x24).unwrap(), 0xFB);
//! ```

use crate::bus::DEFAULT_MUX_ADDRESS;
use crate::error::{ArtboxError, ImageError};
use crate::lcd::LcdWriter;
use crate::loader::ImageLoader;
use crate::render::{FrameSink, PixelBuffer, Size};

use embedded_hal::i2c::{self, NoAcknowledgeSource, Operation};
use embedded_hal::digital;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

// =============================================================================
// I2C
// =============================================================================

/// A bus transfer observed by [`MockI2c`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// The multiplexer was switched to a channel.
    Select(u8),
    /// A device was read.
    Read {
        /// Selected channel.
        channel: u8,
        /// Device address.
        address: u8,
    },
    /// Bytes were written to a device.
    Write {
        /// Selected channel.
        channel: u8,
        /// Device address.
        address: u8,
        /// The bytes written.
        bytes: Vec<u8>,
    },
}

#[derive(Default)]
struct I2cState {
    selected: Option<u8>,
    bytes: HashMap<(u8, u8), u8>,
    failing: HashSet<(u8, u8)>,
    events: Vec<BusEvent>,
}

/// An I2C bus with a PCA9548A at the default address and devices behind it.
///
/// Clones share state, so a test can keep one handle while the bus under
/// test owns another. Reads from devices without a configured byte fail
/// with "no acknowledge", like an unplugged expander.
#[derive(Clone, Default)]
pub struct MockI2c {
    state: Arc<Mutex<I2cState>>,
}

impl MockI2c {
    /// An empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the device at `address` on `channel` read as `byte`.
    pub fn set_byte(&self, channel: u8, address: u8, byte: u8) {
        self.lock().bytes.insert((channel, address), byte);
    }

    /// Make every transfer to the device at `address` on `channel` fail.
    pub fn fail_device(&self, channel: u8, address: u8) {
        self.lock().failing.insert((channel, address));
    }

    /// Every transfer so far, in order.
    pub fn events(&self) -> Vec<BusEvent> {
        self.lock().events.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, I2cState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl i2c::ErrorType for MockI2c {
    type Error = i2c::ErrorKind;
}

impl i2c::I2c for MockI2c {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        let mut state = self.lock();

        if address == DEFAULT_MUX_ADDRESS {
            for op in operations.iter() {
                if let Operation::Write(bytes) = op
                    && let Some(mask) = bytes.first()
                {
                    let channel = mask.trailing_zeros() as u8;
                    state.selected = Some(channel);
                    state.events.push(BusEvent::Select(channel));
                }
            }
            return Ok(());
        }

        let channel = state.selected.ok_or(i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))?;
        if state.failing.contains(&(channel, address)) {
            return Err(i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        for op in operations.iter_mut() {
            match op {
                Operation::Read(buf) => {
                    let byte = *state
                        .bytes
                        .get(&(channel, address))
                        .ok_or(i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))?;
                    buf.fill(byte);
                    state.events.push(BusEvent::Read { channel, address });
                }
                Operation::Write(bytes) => {
                    state.events.push(BusEvent::Write {
                        channel,
                        address,
                        bytes: bytes.to_vec(),
                    });
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// GPIO
// =============================================================================

/// An input pin with a settable level.
#[derive(Clone)]
pub struct MockPin {
    high: Arc<AtomicBool>,
    failing: bool,
}

impl MockPin {
    /// A pin reading `high`.
    pub fn new(high: bool) -> Self {
        Self {
            high: Arc::new(AtomicBool::new(high)),
            failing: false,
        }
    }

    /// A pin whose reads always fail.
    pub fn failing() -> Self {
        Self {
            high: Arc::new(AtomicBool::new(true)),
            failing: true,
        }
    }

    /// Change the level seen by every clone of this pin.
    pub fn set_high(&self, high: bool) {
        self.high.store(high, Ordering::SeqCst);
    }
}

impl digital::ErrorType for MockPin {
    type Error = digital::ErrorKind;
}

impl digital::InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        if self.failing {
            return Err(digital::ErrorKind::Other);
        }
        Ok(self.high.load(Ordering::SeqCst))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

// =============================================================================
// Images
// =============================================================================

/// An image loader serving solid-colour images from memory.
///
/// Unknown paths load as [`ImageError::NotFound`]. Loaded images keep their
/// stored size; the target size is ignored.
#[derive(Default)]
pub struct MockLoader {
    images: Mutex<HashMap<PathBuf, (Size, [u8; 4])>>,
    loads: Mutex<HashMap<PathBuf, usize>>,
}

impl MockLoader {
    /// A loader with no images.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a solid image at `path`.
    pub fn insert(&self, path: impl Into<PathBuf>, size: Size, rgba: [u8; 4]) {
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), (size, rgba));
    }

    /// How many times `path` was requested.
    pub fn load_count(&self, path: &Path) -> usize {
        self.loads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}

impl ImageLoader for MockLoader {
    fn load_and_scale(&self, path: &Path, _target: Size) -> Result<PixelBuffer, ImageError> {
        *self
            .loads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_path_buf())
            .or_default() += 1;

        let images = self.images.lock().unwrap_or_else(PoisonError::into_inner);
        let (size, rgba) = images.get(path).ok_or_else(|| ImageError::NotFound(path.to_path_buf()))?;
        Ok(PixelBuffer::solid(*size, *rgba))
    }
}

// =============================================================================
// Frame Sink
// =============================================================================

/// A frame sink that records every frame and never sleeps.
#[derive(Debug)]
pub struct MockSink {
    size: Size,
    frames: Vec<PixelBuffer>,
    waits: Vec<Duration>,
    fail: bool,
}

impl MockSink {
    /// A sink of the given size.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            frames: Vec::new(),
            waits: Vec::new(),
            fail: false,
        }
    }

    /// Make every subsequent present fail.
    pub fn set_failing(&mut self, fail: bool) {
        self.fail = fail;
    }

    /// Frames presented so far.
    pub fn frames(&self) -> &[PixelBuffer] {
        &self.frames
    }

    /// The last frame presented.
    pub fn last_frame(&self) -> Option<&PixelBuffer> {
        self.frames.last()
    }

    /// Requested waits so far.
    pub fn waits(&self) -> &[Duration] {
        &self.waits
    }

    /// Forget recorded frames and waits.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.waits.clear();
    }
}

impl FrameSink for MockSink {
    fn size(&self) -> Size {
        self.size
    }

    fn present(&mut self, frame: PixelBuffer) -> Result<(), ArtboxError> {
        if self.fail {
            return Err(ArtboxError::Present("mock sink failure".to_string()));
        }
        self.frames.push(frame);
        Ok(())
    }

    fn wait(&mut self, interval: Duration) {
        self.waits.push(interval);
    }
}

// =============================================================================
// LCD
// =============================================================================

/// An LCD that records what was written.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct MockLcd {
    lines: Arc<Mutex<Vec<Vec<String>>>>,
    clears: Arc<Mutex<usize>>,
    failing: Arc<AtomicBool>,
}

impl MockLcd {
    /// A working LCD.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make writes fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    /// Every successful write, oldest first.
    pub fn writes(&self) -> Vec<Vec<String>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The most recent successful write.
    pub fn last_write(&self) -> Option<Vec<String>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }

    /// Number of successful clears.
    pub fn clear_count(&self) -> usize {
        *self.clears.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self) -> Result<(), ArtboxError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ArtboxError::Bus {
                channel: 3,
                address: crate::lcd::DEFAULT_LCD_ADDRESS,
                kind: i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            });
        }
        Ok(())
    }
}

impl LcdWriter for MockLcd {
    fn write_lines(&mut self, lines: &[String]) -> Result<(), ArtboxError> {
        self.check()?;
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(lines.to_vec());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ArtboxError> {
        self.check()?;
        *self.clears.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
