mod hardware;
mod presenter;
mod signals;

use anyhow::Context;
use artbox_core::{
    Config, CrossfadeRenderer, DisplayPipeline, FsImageLoader, ImageCache, ImageSetLayout, InteractionController,
    Labels, SwitchSnapshot,
};
use clap::Parser;
use iced::keyboard::{self, Event as KeyboardEvent, Key, key::Named};
use iced::widget::{container, image, text};
use iced::{Color, ContentFit, Element, Length, Subscription, Task, Theme};
use log::{error, info, warn};
use presenter::{FrameSlot, Presenter, SlotSink};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How often the window checks for a new frame.
const FRAME_POLL: Duration = Duration::from_millis(16);

#[derive(Parser, Debug)]
#[command(author, version, about = "Art Box switch-driven image display")]
struct Args {
    /// Image root (holds mode-1, mode-2, mode-3).
    #[arg(long, default_value = "images")]
    images: PathBuf,

    /// Labels file for the LCD and placeholder overlay.
    #[arg(long)]
    labels: Option<PathBuf>,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// I2C device, overriding the configuration.
    #[arg(long)]
    i2c: Option<String>,

    /// Run without the switch panel; use the keyboard instead.
    #[arg(long)]
    no_hardware: bool,

    /// Surface width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Surface height in pixels.
    #[arg(long)]
    height: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = load_config(&args);
    let labels = find_labels(&args).map(|path| Labels::load_or_default(&path));
    let snapshot = SwitchSnapshot::new();

    let hardware = if args.no_hardware {
        info!("hardware disabled, keyboard preview only");
        None
    } else {
        match hardware::open(&config.bus, snapshot.clone(), config.poll_interval()) {
            Ok(hardware) => Some(hardware),
            Err(e) => {
                error!("switch panel unavailable, keyboard preview only: {:#}", e);
                None
            }
        }
    };
    let (mut poller, lcd) = match hardware {
        Some(hw) => (Some(hw.poller), hw.lcd),
        None => (None, None),
    };

    let surface = config.surface();
    let slot = FrameSlot::new();
    let mut pipeline = DisplayPipeline::new(
        ImageSetLayout::new(&args.images, &config.image_extension),
        ImageCache::new(FsImageLoader::new(), surface, config.cache_capacity),
        CrossfadeRenderer::new(config.crossfade()),
        SlotSink::new(slot.clone(), surface),
    );
    if let Some(lcd) = lcd {
        pipeline = pipeline.with_lcd(lcd);
    }
    if let Some(labels) = labels {
        pipeline = pipeline.with_labels(labels);
    }

    info!("showing images from {}", args.images.display());
    let presenter = Presenter::spawn(
        InteractionController::new(config.timing()),
        pipeline,
        snapshot.clone(),
        config.frame_interval(),
    )
    .context("starting presentation thread")?;

    let window = iced::application(
        move || ArtboxApp::new(slot.clone(), snapshot.clone()),
        ArtboxApp::update,
        ArtboxApp::view,
    )
    .title("Art Box")
    .window_size(iced::Size::new(surface.width as f32, surface.height as f32))
    .subscription(ArtboxApp::subscription)
    .theme(ArtboxApp::theme)
    .run();

    // Presentation first, then the poller, then the LCD.
    let pipeline = presenter.stop();
    if let Some(poller) = poller.as_mut() {
        poller.stop();
    }
    if let Some(mut pipeline) = pipeline {
        pipeline.clear_lcd();
    }
    info!("shut down");

    window.context("display window failed")
}

fn load_config(args: &Args) -> Config {
    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => {
                info!("loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("ignoring configuration {}: {}", path.display(), e);
                Config::default()
            }
        },
        None => Config::default(),
    };

    if let Some(device) = &args.i2c {
        config.bus.device = device.clone();
    }
    if let Some(width) = args.width.filter(|w| *w > 0) {
        config.width = width;
    }
    if let Some(height) = args.height.filter(|h| *h > 0) {
        config.height = height;
    }
    config
}

/// The labels file: `--labels`, or the first `labels.json` next to or
/// above the image root, or in the working directory.
fn find_labels(args: &Args) -> Option<PathBuf> {
    if let Some(path) = &args.labels {
        return Some(path.clone());
    }
    let candidates = [
        args.images.join("labels.json"),
        args.images.join("..").join("labels.json"),
        Path::new("labels.json").to_path_buf(),
    ];
    candidates.into_iter().find(|p| p.is_file())
}

fn shutdown_signal() -> impl iced::futures::Stream<Item = Message> {
    signals::shutdown_stream(Message::Shutdown)
}

struct ArtboxApp {
    slot: FrameSlot,
    snapshot: SwitchSnapshot,
    frame: Option<image::Handle>,
}

#[derive(Debug, Clone)]
enum Message {
    // Frame timer
    Frame,

    // Keyboard event
    KeyboardEvent(KeyboardEvent),

    // SIGINT or SIGTERM
    Shutdown(&'static str),
}

impl ArtboxApp {
    fn new(slot: FrameSlot, snapshot: SwitchSnapshot) -> Self {
        Self {
            slot,
            snapshot,
            frame: None,
        }
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Frame => {
                if let Some(frame) = self.slot.take() {
                    let (width, height) = (frame.width(), frame.height());
                    self.frame = Some(image::Handle::from_rgba(width, height, frame.into_pixels()));
                }
            }

            Message::KeyboardEvent(event) => {
                if let KeyboardEvent::KeyPressed { key, .. } = event {
                    match key.as_ref() {
                        Key::Named(Named::Escape) => return iced::exit(),
                        Key::Character(c) => self.preview_key(c),
                        _ => {}
                    }
                }
            }

            // Closing the window lets main run the shutdown sequence.
            Message::Shutdown(_) => return iced::exit(),
        }

        Task::none()
    }

    /// Keyboard stand-in for the switch panel.
    fn preview_key(&self, key: &str) {
        const ROWS: [&str; 3] = ["qwerty", "asdfgh", "zxcvbn"];

        let key = key.to_ascii_lowercase();
        let Some(ch) = key.chars().next() else {
            return;
        };
        for (slot, row) in ROWS.iter().enumerate() {
            if let Some(digit) = row.find(ch) {
                self.snapshot.set_position(slot, digit as u8 + 1);
                return;
            }
        }
        // Keys name the image set, not the raw switch position.
        match ch {
            '1' => self.snapshot.set_mode_position(1),
            '2' => self.snapshot.set_mode_position(0),
            '3' => self.snapshot.set_mode_position(2),
            _ => {}
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let content: Element<'_, Message> = match &self.frame {
            Some(handle) => image(handle.clone())
                .content_fit(ContentFit::Contain)
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => text("Starting...").size(24).into(),
        };

        container(content)
            .center(Length::Fill)
            .style(|_| container::Style {
                background: Some(Color::BLACK.into()),
                ..container::Style::default()
            })
            .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            iced::time::every(FRAME_POLL).map(|_| Message::Frame),
            keyboard::listen().map(Message::KeyboardEvent),
            Subscription::run(shutdown_signal),
        ])
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}
