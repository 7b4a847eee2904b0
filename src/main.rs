//! Kiosk Player - unattended looping video display
//!
//! Main entry point for the application. Exit code 0 is the operator "esc"
//! shutdown; exit code 1 is a fatal startup or playback error.

use std::path::PathBuf;
use std::time::Duration;

use eframe::egui;

use kiosk_player::app::KioskApp;
use kiosk_player::config::KioskConfig;
use kiosk_player::input::InputArbiter;
use kiosk_player::library::{self, VideoLibrary};
use kiosk_player::player::PlaybackController;

fn main() -> eframe::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("Starting Kiosk Player v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("kiosk.json"));
    let config = KioskConfig::load_or_default(&config_path);

    let (controller, key_tx) = match build_controller(&config) {
        Ok(parts) => parts,
        Err(e) => {
            log::error!("startup failed: {:#}", e);
            std::process::exit(1);
        }
    };

    // Configure native options
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Kiosk Player")
            .with_fullscreen(true),
        vsync: true,
        ..Default::default()
    };

    let tick_interval = config.tick_interval();
    eframe::run_native(
        "Kiosk Player",
        native_options,
        Box::new(move |_cc| Box::new(KioskApp::new(controller, key_tx, tick_interval))),
    )
}

/// Load the library and manifests, spawn the listeners and build the state
/// machine. Everything in here is fatal: the kiosk must not come up with a
/// partial library or a missing content video.
fn build_controller(
    config: &KioskConfig,
) -> anyhow::Result<(PlaybackController, crossbeam_channel::Sender<String>)> {
    let library = VideoLibrary::load(&config.video_dir)?;
    let close_pool = library::read_manifest(&config.close_manifest)?;
    let far_pool = library::read_manifest(&config.far_manifest)?;

    let arbiter = InputArbiter::new();
    let (key_tx, key_rx) = crossbeam_channel::unbounded();
    arbiter.listen_keyboard(key_rx);

    // a kiosk without its sensor still works from the keyboard
    match open_sensor_port(config) {
        Ok(port) => arbiter.listen_sensor(port),
        Err(e) => log::warn!("sensor disabled: {:#}", e),
    }

    let controller = PlaybackController::new(
        library,
        close_pool,
        far_pool,
        config.content_video.clone(),
        config.close_distance,
        arbiter,
    )?;
    Ok((controller, key_tx))
}

fn open_sensor_port(config: &KioskConfig) -> anyhow::Result<Box<dyn std::io::Read + Send>> {
    let port = serialport::new(&config.serial_port, config.baud_rate)
        .timeout(Duration::from_millis(250))
        .open()?;
    // drop whatever accumulated while the kiosk was down
    port.clear(serialport::ClearBuffer::Input)?;
    log::info!(
        "sensor connected on {} at {} baud",
        config.serial_port,
        config.baud_rate
    );
    Ok(Box::new(port))
}
