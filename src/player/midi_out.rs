//! MIDI output player
//!
//! Drives an external sound module over a MIDI port: control changes go out
//! as-is, transport commands as Start/Stop/Song Position Pointer. Tempo and
//! position are tracked by the shared [`Transport`] model.

use midir::{MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::{ExternalTempo, Player, Step, Transport};
use crate::error::{Error, Result};
use crate::midi::{find_port_by_substring, format_hex, MidiMessage};

/// Song Position Pointer counts sixteenth notes: four per beat
const SPP_UNITS_PER_BEAT: u64 = 4;

/// Largest value a Song Position Pointer can carry (14 bits)
const SPP_MAX: u64 = 0x3FFF;

pub struct MidiOutPlayer {
    name: String,
    port_pattern: String,
    transport: Transport,
    connection: Mutex<Option<MidiOutputConnection>>,
}

impl MidiOutPlayer {
    pub fn new(port_pattern: impl Into<String>, ticks_per_beat: u32, initial_bpm: u32) -> Self {
        let port_pattern = port_pattern.into();
        Self {
            name: format!("midi-out:{}", port_pattern),
            port_pattern,
            transport: Transport::new(ticks_per_beat, initial_bpm),
            connection: Mutex::new(None),
        }
    }

    /// Open the output port (substring match on the port name)
    pub fn connect(&self) -> Result<()> {
        let midi_out = MidiOutput::new("Kontrol-GW-Synth-Out")?;
        let (port, port_name) = find_port_by_substring(&midi_out, &self.port_pattern)
            .ok_or_else(|| Error::Port(format!("Output port '{}' not found", self.port_pattern)))?;

        let connection = midi_out.connect(&port, "kontrol-gw-synth")?;
        *self.connection.lock() = Some(connection);
        info!("Synth output connected: {}", port_name);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.lock().is_some()
    }

    pub fn disconnect(&self) {
        if let Some(connection) = self.connection.lock().take() {
            connection.close();
            debug!("Synth output '{}' closed", self.port_pattern);
        }
    }

    fn send(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.connection.lock();
        let connection = guard
            .as_mut()
            .ok_or_else(|| Error::Port(format!("'{}' is not connected", self.port_pattern)))?;
        trace!("→ {} {}", self.name, format_hex(data));
        connection.send(data)?;
        Ok(())
    }

    fn send_message(&self, message: MidiMessage) -> Result<()> {
        self.send(&message.encode())
    }

    fn song_position(&self, tick: u64) -> u16 {
        (tick * SPP_UNITS_PER_BEAT / self.transport.ticks_per_beat()).min(SPP_MAX) as u16
    }
}

impl Player for MidiOutPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn play(&self) -> Result<()> {
        if !self.transport.play() {
            return Ok(());
        }
        let message = if self.transport.current_tick() == 0 {
            MidiMessage::Start
        } else {
            MidiMessage::Continue
        };
        self.send_message(message)
    }

    fn stop(&self) -> Result<()> {
        if self.transport.stop() {
            self.send_message(MidiMessage::Stop)?;
        }
        Ok(())
    }

    fn seek(&self, tick: u64) -> Result<()> {
        self.transport.seek(tick);
        self.send_message(MidiMessage::SongPosition {
            position: self.song_position(tick),
        })
    }

    fn current_tick(&self) -> Option<u64> {
        Some(self.transport.current_tick())
    }

    fn current_tempo_per_beat(&self) -> Option<u64> {
        Some(self.transport.tempo_us())
    }

    fn current_bpm(&self) -> Option<u32> {
        Some(self.transport.bpm())
    }

    fn set_external_tempo(&self, tempo: ExternalTempo) -> Result<()> {
        match self.transport.set_tempo(tempo) {
            Some(tempo_us) => debug!("{}: tempo {} µs/beat", self.name, tempo_us),
            None => warn!("{}: ignoring invalid tempo {:?}", self.name, tempo),
        }
        Ok(())
    }

    fn send_control_change(&self, channel: u8, controller: u8, value: u8) -> Result<()> {
        self.send_message(MidiMessage::ControlChange {
            channel,
            cc: controller,
            value,
        })
    }

    fn step_song(&self, step: Step) -> Result<()> {
        let index = self.transport.step_song(step);
        info!("{}: song #{:02} selected", self.name, index);
        self.send_message(MidiMessage::SongPosition { position: 0 })
    }

    fn step_soundfont(&self, step: Step) -> Result<()> {
        let index = self.transport.step_soundfont(step);
        info!("{}: soundfont #{:02} selected", self.name, index);
        Ok(())
    }

    fn forward_raw(&self, data: &[u8]) -> Result<()> {
        self.send(data)
    }
}

impl Drop for MidiOutPlayer {
    fn drop(&mut self) {
        self.disconnect();
    }
}
