//! Example: Drive the controller with a simulated switch panel.
//!
//! Run with: `RUST_LOG=debug cargo run --example simulate_panel`

use artbox_core::{
    ArtboxError, CrossfadeRenderer, CrossfadeSettings, DEFAULT_MUX_ADDRESS, DEFAULT_SWITCH_ADDRESS, DisplayPipeline,
    FixedMode, ImageCache, ImageCoordinate, ImageSetLayout, InteractionController, MockI2c, MockLcd, MockLoader,
    MockSink, ScreensaverTiming, SharedBus, Size, SwitchDevice, SwitchPoller, SwitchSnapshot,
};
use std::time::{Duration, Instant};

/// Detent byte for positions 1-6.
fn detent(position: u8) -> u8 {
    !(1 << (position - 1))
}

fn main() -> Result<(), ArtboxError> {
    // Initialize logging (optional)
    env_logger::init();

    let surface = Size::new(64, 36);
    let root = std::env::temp_dir().join("artbox-simulation");

    // Every other image exists, so the placeholder shows up too
    let loader = MockLoader::new();
    for index in (0..216u16).step_by(2) {
        let coord = ImageCoordinate::from_index(index);
        loader.insert(root.join(coord.file_name("jpeg")), surface, [index as u8, 64, 128, 255]);
    }

    // Wire up a simulated panel: three switches and the multiplexer
    let i2c = MockI2c::new();
    let devices = [
        SwitchDevice::new(1, DEFAULT_SWITCH_ADDRESS),
        SwitchDevice::new(2, DEFAULT_SWITCH_ADDRESS),
        SwitchDevice::new(0, DEFAULT_SWITCH_ADDRESS),
    ];
    for device in devices {
        i2c.set_byte(device.channel, device.address, detent(1));
    }
    let bus = SharedBus::new(i2c.clone(), DEFAULT_MUX_ADDRESS, Duration::ZERO);
    let mut poller = SwitchPoller::spawn(
        Box::new(bus),
        devices,
        Some(Box::new(FixedMode(1))),
        Duration::from_millis(5),
        SwitchSnapshot::new(),
    )?;

    let lcd = MockLcd::new();
    let mut pipeline = DisplayPipeline::new(
        ImageSetLayout::new(&root, "jpeg"),
        ImageCache::new(loader, surface, 25),
        CrossfadeRenderer::new(CrossfadeSettings::default()),
        MockSink::new(surface),
    )
    .with_lcd(Box::new(lcd.clone()));

    // Short timings so the screensaver kicks in quickly
    let mut controller = InteractionController::new(ScreensaverTiming {
        inactivity_timeout: Duration::from_millis(300),
        advance_interval: Duration::from_millis(100),
    });

    println!("Simulating 1 second of panel activity...");
    let start = Instant::now();
    let mut turned = false;
    while start.elapsed() < Duration::from_secs(1) {
        // Turn switch 2 to position 4 after a moment
        if !turned && start.elapsed() > Duration::from_millis(100) {
            i2c.set_byte(2, DEFAULT_SWITCH_ADDRESS, detent(4));
            turned = true;
        }

        let positions = poller.snapshot().load();
        let tick = controller.tick(Instant::now(), positions.coordinate(), positions.mode());
        let presented = pipeline.apply(&tick)?;
        if tick.redraw {
            println!(
                "{:>5} ms  {:<11} {}  {:?}",
                start.elapsed().as_millis(),
                format!("{:?}", tick.display_mode),
                tick.coordinate,
                presented
            );
        }
        std::thread::sleep(Duration::from_millis(33));
    }

    poller.stop();
    println!("Frames presented: {}", pipeline.sink().frames().len());
    if let Some(lines) = lcd.last_write() {
        println!("LCD:");
        for line in lines {
            println!("  {}", line);
        }
    }

    Ok(())
}
