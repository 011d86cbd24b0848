use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use wristpoint::hid::TracingSink;
use wristpoint::persistence::{ProfileStore, TomlFileStore};
use wristpoint::pipeline::MousePipeline;
use wristpoint::sensors::simulated::{SimulatedOrientationSource, SimulatedRateSource};
use wristpoint::sensors::{
    CalibrationCollector, CalibrationHandle, CalibrationListener, CalibrationOutcome, Vector3,
};

const DEMO_DURATION: Duration = Duration::from_secs(3);

struct LogListener;

impl CalibrationListener for LogListener {
    fn on_calibration_complete(&self, success: bool) {
        if success {
            info!("Calibration finished");
        } else {
            warn!("Calibration failed, no gyroscope available");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let store: Arc<dyn ProfileStore> = Arc::new(TomlFileStore::in_config_dir()?);
    let settings = store.load_settings()?;
    info!("Loaded settings: {:?}", settings);

    let mut collector = CalibrationCollector::new(store.clone());
    if !collector.is_complete() {
        info!("No stored calibration, calibrating against the simulated gyroscope");
        let gyro = SimulatedRateSource::new(Vector3::new(0.002, -0.001, 0.0005), 0.0004);
        let handle = CalibrationHandle::spawn(collector, Box::new(gyro), Arc::new(LogListener));

        let (outcome, calibrated) = handle.join().await?;
        if outcome != CalibrationOutcome::Complete {
            return Err(eyre!("Calibration ended early: {:?}", outcome));
        }
        collector = calibrated;
    } else if let Some(at) = collector.completed_at() {
        info!("Using calibration from {}", at.format("%Y-%m-%d %H:%M"));
    }

    let orientation = SimulatedOrientationSource::circle(0.05, Duration::from_secs(2));
    let mut mouse = MousePipeline::new(
        Arc::new(TracingSink),
        &settings,
        collector.median(),
        Box::new(orientation),
    );
    mouse.start()?;

    let buttons = mouse.buttons();
    tokio::time::sleep(DEMO_DURATION / 2).await;
    buttons.middle_click();
    tokio::time::sleep(DEMO_DURATION / 2).await;

    mouse.stop().await?;
    info!("Session finished");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
