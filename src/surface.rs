//! Control surface driver
//!
//! Handles MIDI communication with the control surface: wire messages in,
//! button LED messages out.

use anyhow::{Context, Result};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::config::AppConfig;
use crate::engine::LedSink;
use crate::error::Error;
use crate::midi::{find_port_by_substring, format_hex, port_names, WireMessage};

/// Wire message received from the surface
#[derive(Debug, Clone, Copy)]
pub struct SurfaceEvent {
    pub timestamp: Instant,
    pub message: WireMessage,
}

impl SurfaceEvent {
    /// Stamp a raw input buffer on arrival; shorter than 3 bytes is dropped
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        WireMessage::from_bytes(data).map(|message| Self {
            timestamp: Instant::now(),
            message,
        })
    }

    /// Time spent between the input callback and now
    pub fn age(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Open an input port and forward every message to `tx`.
///
/// The callback never blocks: when the channel is full the message is
/// dropped.
pub fn connect_input<T, F>(
    client_name: &str,
    pattern: &str,
    tx: mpsc::Sender<T>,
    convert: F,
) -> Result<(MidiInputConnection<()>, String)>
where
    T: Send + 'static,
    F: Fn(&[u8]) -> Option<T> + Send + 'static,
{
    let midi_in = MidiInput::new(client_name).context("Failed to create MIDI input")?;
    debug!("Found {} MIDI input ports", midi_in.port_count());

    let (port, port_name) = find_port_by_substring(&midi_in, pattern)
        .ok_or_else(|| anyhow::anyhow!("Input port '{}' not found", pattern))?;

    let connection = midi_in
        .connect(
            &port,
            client_name,
            move |_timestamp, data, _| match convert(data) {
                Some(event) => {
                    if tx.try_send(event).is_err() {
                        debug!("Input queue full, dropped {}", format_hex(data));
                    }
                }
                None => trace!("Ignored input {}", format_hex(data)),
            },
            (),
        )
        .map_err(|e| anyhow::anyhow!("Failed to connect to input port '{}': {}", port_name, e))?;

    Ok((connection, port_name))
}

/// LED output towards the surface
pub struct SurfaceOutput {
    port_name: String,
    connection: Mutex<Option<MidiOutputConnection>>,
}

impl SurfaceOutput {
    /// Open the output port matching `pattern`
    pub fn connect(pattern: &str) -> Result<Self> {
        let midi_out =
            MidiOutput::new("Kontrol-GW-Surface-Out").context("Failed to create MIDI output")?;
        debug!("Found {} MIDI output ports", midi_out.port_count());

        let (port, port_name) = find_port_by_substring(&midi_out, pattern)
            .ok_or_else(|| anyhow::anyhow!("Output port '{}' not found", pattern))?;

        let connection = midi_out
            .connect(&port, "kontrol-gw-surface")
            .map_err(|e| anyhow::anyhow!("Failed to connect to output port '{}': {}", port_name, e))?;

        info!("Connected to surface output port: {}", port_name);
        Ok(Self {
            port_name,
            connection: Mutex::new(Some(connection)),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn close(&self) {
        if let Some(connection) = self.connection.lock().take() {
            connection.close();
        }
    }
}

impl LedSink for SurfaceOutput {
    fn send_led(&self, message: WireMessage) -> crate::error::Result<()> {
        let mut guard = self.connection.lock();
        let connection = guard
            .as_mut()
            .ok_or_else(|| Error::Port(format!("'{}' is closed", self.port_name)))?;
        connection.send(&message.to_bytes())?;
        trace!("LED → {}", message);
        Ok(())
    }
}

/// Control surface driver for hardware communication
pub struct SurfaceDriver {
    input_conn: Option<MidiInputConnection<()>>,
    output: Option<Arc<SurfaceOutput>>,
    event_tx: mpsc::Sender<SurfaceEvent>,
    event_rx: Option<mpsc::Receiver<SurfaceEvent>>,
    input_port_name: String,
    output_port_name: String,
}

impl SurfaceDriver {
    pub fn new(config: &AppConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(1000);
        Self {
            input_conn: None,
            output: None,
            event_tx,
            event_rx: Some(event_rx),
            input_port_name: config.midi.input_port.clone(),
            output_port_name: config.midi.output_port.clone(),
        }
    }

    /// Connect to the surface ports
    pub fn connect(&mut self) -> Result<()> {
        self.disconnect();

        info!(
            "Connecting to control surface - Input: '{}', Output: '{}'",
            self.input_port_name, self.output_port_name
        );

        let (input_conn, port_name) = connect_input(
            "Kontrol-GW-Surface-In",
            &self.input_port_name,
            self.event_tx.clone(),
            SurfaceEvent::from_bytes,
        )?;
        info!("Connected to surface input port: {}", port_name);
        self.input_conn = Some(input_conn);

        self.output = Some(Arc::new(SurfaceOutput::connect(&self.output_port_name)?));

        info!("✅ Control surface connected");
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if let Some(connection) = self.input_conn.take() {
            connection.close();
        }
        if let Some(output) = self.output.take() {
            output.close();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.input_conn.is_some() && self.output.is_some()
    }

    /// LED sink for the engine; `None` until connected
    pub fn led_sink(&self) -> Option<Arc<SurfaceOutput>> {
        self.output.clone()
    }

    /// Take the event receiver (for the main loop to consume)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<SurfaceEvent>> {
        self.event_rx.take()
    }
}

/// Print every MIDI input and output port
pub fn print_ports() -> Result<()> {
    let midi_in = MidiInput::new("Kontrol-GW-Discovery").context("Failed to create MIDI input")?;
    let midi_out =
        MidiOutput::new("Kontrol-GW-Discovery").context("Failed to create MIDI output")?;

    println!("\n=== MIDI Input Ports ===");
    for (i, name) in port_names(&midi_in).iter().enumerate() {
        println!("  {}: {}", i, name);
    }
    println!("\n=== MIDI Output Ports ===");
    for (i, name) in port_names(&midi_out).iter().enumerate() {
        println!("  {}: {}", i, name);
    }
    println!();
    Ok(())
}
