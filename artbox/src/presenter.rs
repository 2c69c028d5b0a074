//! The presentation thread and the frame slot it hands frames through.

use artbox_core::{
    ArtboxError, DisplayPipeline, FrameSink, ImageLoader, InteractionController, PixelBuffer, Presented, Size,
    SwitchSnapshot,
};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Latest finished frame, waiting for the window to pick it up.
#[derive(Clone, Default)]
pub struct FrameSlot {
    frame: Arc<Mutex<Option<PixelBuffer>>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the newest frame, if one arrived since the last call.
    pub fn take(&self) -> Option<PixelBuffer> {
        self.frame.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn put(&self, frame: PixelBuffer) {
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
    }
}

/// A [`FrameSink`] that publishes into a [`FrameSlot`].
///
/// Frames the window has not collected yet are replaced, so a slow window
/// skips crossfade steps instead of falling behind.
pub struct SlotSink {
    slot: FrameSlot,
    size: Size,
}

impl SlotSink {
    pub fn new(slot: FrameSlot, size: Size) -> Self {
        Self { slot, size }
    }
}

impl FrameSink for SlotSink {
    fn size(&self) -> Size {
        self.size
    }

    fn present(&mut self, frame: PixelBuffer) -> Result<(), ArtboxError> {
        if frame.size() != self.size {
            return Err(ArtboxError::Present(format!(
                "frame is {}x{}, surface is {}x{}",
                frame.width(),
                frame.height(),
                self.size.width,
                self.size.height
            )));
        }
        self.slot.put(frame);
        Ok(())
    }
}

/// Runs the controller and display pipeline at a fixed tick rate.
pub struct Presenter<L, S> {
    running: Arc<AtomicBool>,
    thread: JoinHandle<DisplayPipeline<L, S>>,
}

impl<L, S> Presenter<L, S>
where
    L: ImageLoader + 'static,
    S: FrameSink + Send + 'static,
{
    pub fn spawn(
        mut controller: InteractionController,
        mut pipeline: DisplayPipeline<L, S>,
        snapshot: SwitchSnapshot,
        frame_interval: Duration,
    ) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let thread = std::thread::Builder::new()
            .name("presenter".to_string())
            .spawn(move || {
                info!("presentation loop started ({:?} per tick)", frame_interval);
                while flag.load(Ordering::Acquire) {
                    let started = Instant::now();
                    let positions = snapshot.load();
                    let tick = controller.tick(started, positions.coordinate(), positions.mode());

                    match pipeline.apply(&tick) {
                        Ok(Presented::Unchanged) => {}
                        Ok(presented) => debug!("{} ({:?}): {:?}", tick.coordinate, tick.display_mode, presented),
                        Err(e) => warn!("failed to present {}: {}", tick.coordinate, e),
                    }

                    if let Some(remaining) = frame_interval.checked_sub(started.elapsed()) {
                        std::thread::sleep(remaining);
                    }
                }
                debug!("presentation loop stopped");
                pipeline
            })?;

        Ok(Self { running, thread })
    }

    /// Stop the loop and hand back the pipeline, or `None` if the loop
    /// panicked.
    pub fn stop(self) -> Option<DisplayPipeline<L, S>> {
        self.running.store(false, Ordering::Release);
        self.thread.join().ok()
    }
}
