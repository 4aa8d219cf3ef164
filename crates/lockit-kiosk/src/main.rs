//! LockIt kiosk entry point.
//!
//! Scans a QR code carrying `userId-BoxId-pin`, and publishes the matching
//! unlock request to the box controllers over MQTT.
//!
//! # Usage
//!
//! ```text
//! lockit-kiosk [OPTIONS]
//!
//! Options:
//!   --config        <PATH>  TOML config file
//!   --mqtt-host     <URL>   Broker URL [default: mqtt://localhost:1883]
//!   --mqtt-username <NAME>  Broker username
//!   --mqtt-password <PASS>  Broker password
//!   --mqtt-topic    <TOPIC> Unlock topic [default: lockit/boxes]
//!   --refresh-hz    <HZ>    Scan ticks per second [default: 60]
//!   --image         <PATH>  Scan a still image instead of a camera
//!   --manual-entry  <MODE>  display-only | parse-and-publish
//!   --print-config          Print the effective configuration and exit
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                | Flag              |
//! |-------------------------|-------------------|
//! | `LOCKIT_CONFIG`         | `--config`        |
//! | `LOCKIT_MQTT_HOST`      | `--mqtt-host`     |
//! | `LOCKIT_MQTT_USERNAME`  | `--mqtt-username` |
//! | `LOCKIT_MQTT_PASSWORD`  | `--mqtt-password` |
//! | `LOCKIT_MQTT_TOPIC`     | `--mqtt-topic`    |
//! | `LOCKIT_REFRESH_HZ`     | `--refresh-hz`    |
//! | `LOCKIT_IMAGE`          | `--image`         |
//! | `LOCKIT_MANUAL_ENTRY`   | `--manual-entry`  |
//!
//! Precedence: flag, then environment, then config file, then built-in default.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- file + CLI/env overrides
//!  └─ MqttPublisher::connect() -- event loop on a Tokio task
//!  └─ ViewController::new()    -- camera, decoder, ticks, publish use case
//!  └─ run_console()            -- until `quit`, end of input, or Ctrl-C
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lockit_kiosk::application::publish_token::{PublishTokenUseCase, TokenPublisher};
use lockit_kiosk::application::scan_frames::FrameSource;
use lockit_kiosk::application::view_controller::{
    ControllerSettings, ManualEntryPolicy, ViewController,
};
use lockit_kiosk::infrastructure::camera::StillImageSource;
use lockit_kiosk::infrastructure::console::run_console;
use lockit_kiosk::infrastructure::decoder::RqrrDecoder;
use lockit_kiosk::infrastructure::messaging::MqttPublisher;
use lockit_kiosk::infrastructure::scheduler::IntervalScheduler;
use lockit_kiosk::infrastructure::storage::config::{load_config, render_config, KioskConfig};

/// How long runtime shutdown waits for a stdin read still in flight.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(200);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// LockIt QR intake kiosk.
///
/// Every option overrides the matching config-file value.
#[derive(Debug, Parser)]
#[command(
    name = "lockit-kiosk",
    about = "Scan a LockIt QR code and publish the unlock request over MQTT",
    version
)]
struct Cli {
    /// TOML configuration file.  Defaults to the platform config directory.
    #[arg(long, env = "LOCKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Broker URL (mqtt://, tcp://, mqtts://, ssl://, ws://, wss://).
    #[arg(long, env = "LOCKIT_MQTT_HOST")]
    mqtt_host: Option<String>,

    #[arg(long, env = "LOCKIT_MQTT_USERNAME")]
    mqtt_username: Option<String>,

    #[arg(long, env = "LOCKIT_MQTT_PASSWORD", hide_env_values = true)]
    mqtt_password: Option<String>,

    /// Topic unlock requests are published to.
    #[arg(long, env = "LOCKIT_MQTT_TOPIC")]
    mqtt_topic: Option<String>,

    /// Scan ticks per second while the camera is open.
    #[arg(long, env = "LOCKIT_REFRESH_HZ")]
    refresh_hz: Option<u32>,

    /// Scan this image file instead of a live camera.
    #[arg(long, env = "LOCKIT_IMAGE")]
    image: Option<PathBuf>,

    /// What a typed code does: `display-only` or `parse-and-publish`.
    #[arg(long, env = "LOCKIT_MANUAL_ENTRY")]
    manual_entry: Option<ManualEntryPolicy>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    /// Applies every flag that was given on top of `config`.
    fn apply_to(&self, config: &mut KioskConfig) {
        if let Some(host) = &self.mqtt_host {
            config.messaging.host = host.clone();
        }
        if let Some(username) = &self.mqtt_username {
            config.messaging.username = Some(username.clone());
        }
        if let Some(password) = &self.mqtt_password {
            config.messaging.password = Some(password.clone());
        }
        if let Some(topic) = &self.mqtt_topic {
            config.messaging.topic = topic.clone();
        }
        if let Some(hz) = self.refresh_hz {
            config.scanner.refresh_hz = hz;
        }
        if let Some(image) = &self.image {
            config.scanner.image = Some(image.clone());
        }
        if let Some(policy) = self.manual_entry {
            config.kiosk.manual_entry = policy;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// The runtime is built by hand rather than with `#[tokio::main]` so that
/// shutdown can use a timeout: a pending stdin read lives on a blocking
/// thread and would otherwise hold the process open after Ctrl-C.
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        load_config(cli.config.as_deref()).context("failed to load kiosk configuration")?;
    cli.apply_to(&mut config);

    if cli.print_config {
        print!("{}", render_config(&config).context("failed to render configuration")?);
        return Ok(());
    }

    // `RUST_LOG` wins; otherwise the configured level.  Logs go to stderr so
    // they do not interleave with the console views on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.kiosk.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build Tokio runtime")?;
    let result = runtime.block_on(run(config));
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
    result
}

async fn run(config: KioskConfig) -> anyhow::Result<()> {
    info!("LockIt kiosk starting");

    let (publisher, events) = MqttPublisher::connect(&config.messaging.connect_config())
        .with_context(|| format!("invalid broker URL '{}'", config.messaging.host))?;
    let publisher = Arc::new(publisher);

    let publish = PublishTokenUseCase::new(
        Arc::clone(&publisher) as Arc<dyn TokenPublisher>,
        config.messaging.topic.clone(),
        config.messaging.qos,
    );
    let mut controller = ViewController::new(
        frame_source(&config),
        Box::new(RqrrDecoder::new()),
        Box::new(IntervalScheduler::new(config.scanner.refresh_hz)),
        publish,
        ControllerSettings {
            facing: config.kiosk.facing,
            manual_entry: config.kiosk.manual_entry,
        },
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();

    tokio::select! {
        result = run_console(&mut controller, stdin, events, &mut stdout) => match result {
            Ok(exit) => info!(?exit, "console finished"),
            Err(e) => error!("console I/O failed: {e}"),
        },
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("failed to listen for Ctrl-C: {e}");
            }
            info!("shutdown signal received");
        }
    }

    controller.shutdown();
    publisher.disconnect().await;
    info!("LockIt kiosk stopped");
    Ok(())
}

/// Picks the frame source: a still image if configured, else the webcam
/// when built with the `camera` feature, else none (manual entry only).
fn frame_source(config: &KioskConfig) -> Box<dyn FrameSource> {
    if let Some(path) = &config.scanner.image {
        info!(path = %path.display(), "scanning still image");
        return Box::new(StillImageSource::from_path(path));
    }

    #[cfg(feature = "camera")]
    {
        Box::new(lockit_kiosk::infrastructure::camera::NokhwaCamera::new())
    }

    #[cfg(not(feature = "camera"))]
    {
        tracing::warn!("no camera support in this build; use --image or manual entry");
        Box::new(lockit_kiosk::infrastructure::camera::NoCamera)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
