//! Configuration management for Kontrol GW
//!
//! Handles loading, parsing and validation of the YAML configuration file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub midi: MidiConfig,
    #[serde(default)]
    pub surface: SurfaceLayout,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpio: Option<GpioConfig>,
    #[serde(default)]
    pub transport: TransportConfig,
}

/// MIDI port configuration
///
/// Port names are matched as case-insensitive substrings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiConfig {
    /// Control surface input
    pub input_port: String,
    /// Control surface output (LED feedback)
    pub output_port: String,
    /// Sound engine output; playback is only logged when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synth_port: Option<String>,
    /// Song automation input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song_port: Option<String>,
}

/// Wire identities of the control surface, nanoKONTROL2 layout by default
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SurfaceLayout {
    #[serde(default = "default_status")]
    pub status: u8,
    #[serde(default = "default_slider_base")]
    pub slider_base: u8,
    #[serde(default = "default_knob_base")]
    pub knob_base: u8,
    #[serde(default = "default_solo_base")]
    pub solo_base: u8,
    #[serde(default = "default_mute_base")]
    pub mute_base: u8,
    #[serde(default = "default_rec_base")]
    pub rec_base: u8,
    #[serde(default = "default_play")]
    pub play: u8,
    #[serde(default = "default_stop")]
    pub stop: u8,
    #[serde(default = "default_rewind")]
    pub rewind: u8,
    #[serde(default = "default_forward")]
    pub forward: u8,
    #[serde(default = "default_record")]
    pub record: u8,
    #[serde(default = "default_cycle")]
    pub cycle: u8,
    #[serde(default = "default_track_left")]
    pub track_left: u8,
    #[serde(default = "default_track_right")]
    pub track_right: u8,
    #[serde(default = "default_set")]
    pub set: u8,
    #[serde(default = "default_marker_left")]
    pub marker_left: u8,
    #[serde(default = "default_marker_right")]
    pub marker_right: u8,
    /// Optional pad used as a tap-tempo input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tap_pad: Option<u8>,
}

impl Default for SurfaceLayout {
    fn default() -> Self {
        Self {
            status: default_status(),
            slider_base: default_slider_base(),
            knob_base: default_knob_base(),
            solo_base: default_solo_base(),
            mute_base: default_mute_base(),
            rec_base: default_rec_base(),
            play: default_play(),
            stop: default_stop(),
            rewind: default_rewind(),
            forward: default_forward(),
            record: default_record(),
            cycle: default_cycle(),
            track_left: default_track_left(),
            track_right: default_track_right(),
            set: default_set(),
            marker_left: default_marker_left(),
            marker_right: default_marker_right(),
            tap_pad: None,
        }
    }
}

impl SurfaceLayout {
    /// Every logical control's data byte with a label, strips expanded
    fn labelled_codes(&self) -> Vec<(String, u32)> {
        let mut codes = Vec::new();
        for strip in 0..crate::registry::STRIP_COUNT as u32 {
            codes.push((format!("slider {}", strip + 1), self.slider_base as u32 + strip));
            codes.push((format!("knob {}", strip + 1), self.knob_base as u32 + strip));
            codes.push((format!("solo {}", strip + 1), self.solo_base as u32 + strip));
            codes.push((format!("mute {}", strip + 1), self.mute_base as u32 + strip));
            codes.push((format!("rec {}", strip + 1), self.rec_base as u32 + strip));
        }
        let globals = [
            ("play", self.play),
            ("stop", self.stop),
            ("rewind", self.rewind),
            ("forward", self.forward),
            ("record", self.record),
            ("cycle", self.cycle),
            ("track_left", self.track_left),
            ("track_right", self.track_right),
            ("set", self.set),
            ("marker_left", self.marker_left),
            ("marker_right", self.marker_right),
        ];
        codes.extend(globals.iter().map(|(name, code)| (name.to_string(), *code as u32)));
        if let Some(tap) = self.tap_pad {
            codes.push(("tap_pad".to_string(), tap as u32));
        }
        codes
    }

    /// Reject out-of-range data bytes and controls sharing a wire identity
    pub fn validate(&self) -> Result<()> {
        if !(0x80..=0xEF).contains(&self.status) {
            anyhow::bail!(
                "Surface status byte 0x{:02X} is not a channel voice status",
                self.status
            );
        }

        let mut seen: HashMap<u32, String> = HashMap::new();
        for (name, code) in self.labelled_codes() {
            if code > 0x7F {
                anyhow::bail!("Surface control '{}' has invalid data byte {} (must be 0-127)", name, code);
            }
            if let Some(other) = seen.insert(code, name.clone()) {
                anyhow::bail!(
                    "Surface controls '{}' and '{}' share data byte 0x{:02X}",
                    other,
                    name,
                    code
                );
            }
        }
        Ok(())
    }
}

/// Debounce and polling timings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    #[serde(default = "default_antibounce_ms")]
    pub antibounce_ms: u64,
    #[serde(default = "default_led_pulse_ms")]
    pub led_pulse_ms: u64,
    #[serde(default = "default_switch_poll_ms")]
    pub switch_poll_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            antibounce_ms: default_antibounce_ms(),
            led_pulse_ms: default_led_pulse_ms(),
            switch_poll_ms: default_switch_poll_ms(),
        }
    }
}

impl TimingConfig {
    pub fn antibounce(&self) -> Duration {
        Duration::from_millis(self.antibounce_ms)
    }

    pub fn led_pulse(&self) -> Duration {
        Duration::from_millis(self.led_pulse_ms)
    }

    pub fn switch_poll(&self) -> Duration {
        Duration::from_millis(self.switch_poll_ms)
    }
}

/// External beat switch wiring
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GpioConfig {
    #[serde(default = "default_switch_pin")]
    pub switch_pin: u32,
    #[serde(default = "default_led_pin")]
    pub led_pin: u32,
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,
}

/// Transport button behaviour and the simulated transport
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Rewind/forward jump in ticks
    #[serde(default = "default_seek_step_ticks")]
    pub seek_step_ticks: u64,
    /// Tempo change per shifted rewind/forward press
    #[serde(default = "default_bpm_step")]
    pub bpm_step: u32,
    #[serde(default = "default_ticks_per_beat")]
    pub ticks_per_beat: u32,
    #[serde(default = "default_initial_bpm")]
    pub initial_bpm: u32,
    #[serde(default = "default_marker_capacity")]
    pub marker_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            seek_step_ticks: default_seek_step_ticks(),
            bpm_step: default_bpm_step(),
            ticks_per_beat: default_ticks_per_beat(),
            initial_bpm: default_initial_bpm(),
            marker_capacity: default_marker_capacity(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.midi.input_port.is_empty() {
            anyhow::bail!("MIDI input_port cannot be empty");
        }
        if self.midi.output_port.is_empty() {
            anyhow::bail!("MIDI output_port cannot be empty");
        }

        self.surface.validate().context("Invalid surface layout")?;

        if self.timing.switch_poll_ms == 0 {
            anyhow::bail!("timing.switch_poll_ms must be at least 1");
        }

        if let Some(gpio) = &self.gpio {
            if gpio.switch_pin == gpio.led_pin {
                anyhow::bail!("GPIO switch_pin and led_pin must differ (both {})", gpio.led_pin);
            }
        }

        let transport = &self.transport;
        if transport.ticks_per_beat == 0 {
            anyhow::bail!("transport.ticks_per_beat must be at least 1");
        }
        if transport.initial_bpm == 0 || transport.initial_bpm > crate::player::transport::MAX_BPM {
            anyhow::bail!("transport.initial_bpm {} is out of range", transport.initial_bpm);
        }
        if transport.marker_capacity == 0 {
            anyhow::bail!("transport.marker_capacity must be at least 1");
        }

        Ok(())
    }
}

fn default_status() -> u8 { 0xB0 }
fn default_slider_base() -> u8 { 0x00 }
fn default_knob_base() -> u8 { 0x10 }
fn default_solo_base() -> u8 { 0x20 }
fn default_mute_base() -> u8 { 0x30 }
fn default_rec_base() -> u8 { 0x40 }
fn default_play() -> u8 { 0x29 }
fn default_stop() -> u8 { 0x2A }
fn default_rewind() -> u8 { 0x2B }
fn default_forward() -> u8 { 0x2C }
fn default_record() -> u8 { 0x2D }
fn default_cycle() -> u8 { 0x2E }
fn default_track_left() -> u8 { 0x3A }
fn default_track_right() -> u8 { 0x3B }
fn default_set() -> u8 { 0x3C }
fn default_marker_left() -> u8 { 0x3D }
fn default_marker_right() -> u8 { 0x3E }
fn default_antibounce_ms() -> u64 { 250 }
fn default_led_pulse_ms() -> u64 { 200 }
fn default_switch_poll_ms() -> u64 { 5 }
fn default_switch_pin() -> u32 { 26 }
fn default_led_pin() -> u32 { 19 }
fn default_sysfs_root() -> PathBuf { PathBuf::from("/sys/class/gpio") }
fn default_seek_step_ticks() -> u64 { 1920 }
fn default_bpm_step() -> u32 { 2 }
fn default_ticks_per_beat() -> u32 { 480 }
fn default_initial_bpm() -> u32 { 120 }
fn default_marker_capacity() -> usize { crate::markers::DEFAULT_CAPACITY }
