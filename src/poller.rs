//! Background switch sampling.
//!
//! The poll thread reads the three rotary switches and the mode switch and
//! publishes the result as one packed atomic word. The presentation side
//! loads the word once per tick, so it never sees a coordinate assembled
//! from two different sweeps.

use crate::bus::SwitchSource;
use crate::coord::ImageCoordinate;
use crate::modes::{ModeId, ModeSource};
use crate::switch::{SwitchDevice, decode_position};

use log::{debug, info};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Default time between sweeps.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Switch positions at startup, before the first successful read.
const INITIAL_POSITION: u8 = 1;

/// One sweep's worth of switch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchPositions {
    /// Rotary switch detents, 1-6.
    pub positions: [u8; 3],
    /// 3-way mode switch position, 0-2.
    pub mode_position: u8,
}

impl SwitchPositions {
    /// The selected image coordinate.
    pub fn coordinate(&self) -> ImageCoordinate {
        ImageCoordinate::from_positions(self.positions)
    }

    /// The selected image set.
    pub fn mode(&self) -> ModeId {
        ModeId::from_switch_position(self.mode_position)
    }

    fn pack(self) -> u32 {
        let [p1, p2, p3] = self.positions;
        u32::from_le_bytes([p1, p2, p3, self.mode_position])
    }

    fn unpack(word: u32) -> Self {
        let [p1, p2, p3, mode_position] = word.to_le_bytes();
        Self {
            positions: [p1, p2, p3],
            mode_position,
        }
    }
}

impl Default for SwitchPositions {
    fn default() -> Self {
        Self {
            positions: [INITIAL_POSITION; 3],
            mode_position: INITIAL_POSITION,
        }
    }
}

/// Latest switch state, shared between threads.
#[derive(Debug, Clone)]
pub struct SwitchSnapshot {
    word: Arc<AtomicU32>,
}

impl SwitchSnapshot {
    /// A snapshot holding the startup positions.
    pub fn new() -> Self {
        Self {
            word: Arc::new(AtomicU32::new(SwitchPositions::default().pack())),
        }
    }

    /// Read the current positions.
    pub fn load(&self) -> SwitchPositions {
        SwitchPositions::unpack(self.word.load(Ordering::Acquire))
    }

    /// Replace all positions at once.
    pub fn store(&self, positions: SwitchPositions) {
        self.word.store(positions.pack(), Ordering::Release);
    }

    /// Set one rotary switch (slot 0-2) to a detent (1-6).
    ///
    /// Out-of-range slots and detents are ignored.
    pub fn set_position(&self, slot: usize, position: u8) {
        if slot > 2 || !(1..=6).contains(&position) {
            return;
        }
        self.update(|p| p.positions[slot] = position);
    }

    /// Set the mode switch position (0-2). Out-of-range values are ignored.
    pub fn set_mode_position(&self, position: u8) {
        if position > 2 {
            return;
        }
        self.update(|p| p.mode_position = position);
    }

    /// Merge one sweep into the current word.
    ///
    /// Only fields the sweep actually read are overwritten, so keyboard
    /// writes that land while the sweep is on the bus survive.
    fn publish(&self, readings: Readings) {
        self.update(|p| *p = readings.apply_to(*p));
    }

    fn update<F: Fn(&mut SwitchPositions)>(&self, f: F) {
        let _ = self.word.fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
            let mut positions = SwitchPositions::unpack(word);
            f(&mut positions);
            Some(positions.pack())
        });
    }
}

impl Default for SwitchSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// What one sweep managed to read. `None` fields were not read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Readings {
    positions: [Option<u8>; 3],
    mode_position: Option<u8>,
}

impl Readings {
    fn apply_to(self, mut positions: SwitchPositions) -> SwitchPositions {
        for (slot, reading) in self.positions.into_iter().enumerate() {
            if let Some(position) = reading {
                positions.positions[slot] = position;
            }
        }
        if let Some(position) = self.mode_position {
            positions.mode_position = position;
        }
        positions
    }
}

/// Samples switches once. Kept separate from the thread for testing.
struct Sampler {
    source: Box<dyn SwitchSource>,
    devices: [SwitchDevice; 3],
    mode_source: Option<Box<dyn ModeSource>>,
}

impl Sampler {
    /// Indeterminate and failed reads come back as `None`.
    fn sweep(&mut self) -> Readings {
        let mut readings = Readings::default();
        for (slot, device) in self.devices.iter().enumerate() {
            match self.source.read_switch_byte(*device) {
                Ok(raw) => readings.positions[slot] = decode_position(raw).detent(),
                Err(e) => debug!("switch {} read failed: {}", slot + 1, e),
            }
        }
        if let Some(mode_source) = self.mode_source.as_mut() {
            match mode_source.read_position() {
                Ok(position) => readings.mode_position = Some(position),
                Err(e) => debug!("mode switch read failed: {}", e),
            }
        }
        readings
    }
}

/// Handle to the running poll thread.
///
/// Dropping the handle stops and joins the thread.
pub struct SwitchPoller {
    snapshot: SwitchSnapshot,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SwitchPoller {
    /// Start polling `devices` (switches 1-3, in order) through `source`.
    pub fn spawn(
        source: Box<dyn SwitchSource>,
        devices: [SwitchDevice; 3],
        mode_source: Option<Box<dyn ModeSource>>,
        interval: Duration,
        snapshot: SwitchSnapshot,
    ) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let mut sampler = Sampler {
            source,
            devices,
            mode_source,
        };

        let thread = {
            let snapshot = snapshot.clone();
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("switch-poller".to_string())
                .spawn(move || {
                    info!("switch poller started ({:?} interval)", interval);
                    while running.load(Ordering::Acquire) {
                        let readings = sampler.sweep();
                        snapshot.publish(readings);
                        std::thread::sleep(interval);
                    }
                    debug!("switch poller stopped");
                })?
        };

        Ok(Self {
            snapshot,
            running,
            thread: Some(thread),
        })
    }

    /// The snapshot this poller publishes to.
    pub fn snapshot(&self) -> &SwitchSnapshot {
        &self.snapshot
    }

    /// Whether the poll thread is still running.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal the thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                debug!("switch poller panicked");
            }
        }
    }
}

impl Drop for SwitchPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
