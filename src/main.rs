//! Kontrol GW - Rust implementation
//!
//! Gateway driving a song player and sound engine from a MIDI control surface.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kontrol_gw::clock::MonotonicClock;
use kontrol_gw::gpio::{DisabledGpio, Gpio, SysfsGpio};
use kontrol_gw::midi::{MidiMessage, CC_BALANCE, CC_VOLUME};
use kontrol_gw::player::{ConsolePlayer, MidiOutPlayer, Player};
use kontrol_gw::surface::{self, SurfaceDriver};
use kontrol_gw::{sniffer, AppConfig, Engine, EngineSettings, Registry};

/// Kontrol Gateway - drive a song player from a MIDI control surface
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Print surface messages and the control they resolve to
    #[arg(long)]
    sniffer: bool,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level, args.log_json)?;

    info!("Starting Kontrol GW v{}...", env!("CARGO_PKG_VERSION"));

    if args.list_ports {
        surface::print_ports()?;
        return Ok(());
    }

    info!("Configuration file: {}", args.config);
    let config = AppConfig::load(&args.config).await?;
    info!("Configuration loaded successfully");

    if args.sniffer {
        sniffer::run_cli_sniffer(&config).await?;
        return Ok(());
    }

    run_app(config).await?;

    info!("Kontrol GW shutdown complete");
    Ok(())
}

/// Create the player: a MIDI sound module when configured, else the console
fn build_player(config: &AppConfig) -> Result<Arc<dyn Player>> {
    let transport = &config.transport;
    match &config.midi.synth_port {
        Some(pattern) => {
            let player = MidiOutPlayer::new(pattern, transport.ticks_per_beat, transport.initial_bpm);
            player
                .connect()
                .with_context(|| format!("Failed to open synth port '{}'", pattern))?;
            Ok(Arc::new(player))
        }
        None => {
            info!("No synth_port configured: playback commands are logged only");
            Ok(Arc::new(ConsolePlayer::new(
                "console",
                transport.ticks_per_beat,
                transport.initial_bpm,
            )))
        }
    }
}

/// Open the beat switch GPIO; failures leave the switch disabled
fn build_gpio(config: &AppConfig) -> Arc<dyn Gpio> {
    let Some(gpio) = &config.gpio else {
        info!("No GPIO configured: beat switch disabled");
        return Arc::new(DisabledGpio);
    };
    match SysfsGpio::open(&gpio.sysfs_root, gpio.switch_pin, gpio.led_pin) {
        Ok(sysfs) => Arc::new(sysfs),
        Err(e) => {
            warn!("GPIO unavailable, beat switch disabled: {}", e);
            Arc::new(DisabledGpio)
        }
    }
}

async fn run_app(config: AppConfig) -> Result<()> {
    info!("Starting main application loop...");

    let player = build_player(&config)?;
    let gpio = build_gpio(&config);

    let mut surface = SurfaceDriver::new(&config);
    surface.connect()?;
    let mut surface_rx = surface
        .take_event_receiver()
        .context("Surface event receiver already taken")?;
    let leds = surface.led_sink().context("Surface output not connected")?;

    let engine = Arc::new(
        Engine::new(
            Registry::build(&config.surface),
            player,
            EngineSettings::from_config(&config),
        )
        .with_leds(leds)
        .with_gpio(gpio.clone())
        .with_clock(Arc::new(MonotonicClock::new())),
    );
    engine.refresh_leds();
    info!("Engine ready with {} controls", engine.registry().len());

    // Song automation input: CC7/CC8 are ponderated, the rest is forwarded
    let (song_tx, mut song_rx) = mpsc::channel::<Vec<u8>>(1000);
    let _song_conn = match &config.midi.song_port {
        Some(pattern) => {
            let (connection, port_name) = surface::connect_input(
                "Kontrol-GW-Song-In",
                pattern,
                song_tx,
                |data| Some(data.to_vec()),
            )?;
            info!("Listening for song automation on {}", port_name);
            Some(connection)
        }
        None => {
            drop(song_tx);
            None
        }
    };

    let mut switch_tick = tokio::time::interval(config.timing.switch_poll());
    switch_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!("✅ Kontrol GW running (Ctrl+C to stop)");

    loop {
        tokio::select! {
            Some(event) = surface_rx.recv() => {
                let message = event.message;
                debug!("Surface {} ({:?} queued)", message, event.age());
                engine.dispatch(message.status, message.data1, message.data2);
            }
            Some(data) = song_rx.recv() => forward_song_message(&engine, &data),
            _ = switch_tick.tick(), if gpio.enabled() => {
                engine.on_switch_poll_tick();
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    engine.shutdown();
    surface.disconnect();
    Ok(())
}

fn forward_song_message(engine: &Engine, data: &[u8]) {
    match MidiMessage::parse(data) {
        Some(MidiMessage::ControlChange {
            channel,
            cc,
            value,
        }) if cc == CC_VOLUME || cc == CC_BALANCE => {
            let adjusted = engine.on_automation_cc(channel, cc, value);
            debug!("Song CC{} ch{} {} -> {}", cc, channel + 1, value, adjusted);
        }
        _ => {
            if let Err(e) = engine.player().forward_raw(data) {
                warn!("Failed to forward song message: {}", e);
            }
        }
    }
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .init();
    }

    Ok(())
}
