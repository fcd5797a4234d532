//! Engine module - dispatch and real-time synchronization core
//!
//! The Engine owns everything the surface and the song act upon:
//! - the control registry and its toggle/shift state
//! - the 16-channel mixer shared by hardware and song automation
//! - tap-tempo, beat switch debounce and marker state
//!
//! Handlers are spread over submodules as `impl Engine` blocks. None of the
//! entry points fail: collaborator errors are logged and absorbed.

mod buttons;
mod dispatch;
mod mixer;
mod timing;

pub use dispatch::resolve;
pub use mixer::{ChannelState, Mixer};


use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::config::AppConfig;
use crate::debounce::SwitchDebounce;
use crate::error::Result;
use crate::gpio::{DisabledGpio, Gpio};
use crate::markers::MarkerTable;
use crate::midi::WireMessage;
use crate::player::Player;
use crate::registry::{ControlDescriptor, Registry};
use crate::tempo::TapTempo;

/// Receiver of button LED messages (the surface output port)
pub trait LedSink: Send + Sync {
    fn send_led(&self, message: WireMessage) -> Result<()>;
}

/// LED sink for setups without surface feedback
pub struct NullLedSink;

impl LedSink for NullLedSink {
    fn send_led(&self, _message: WireMessage) -> Result<()> {
        Ok(())
    }
}

/// Tunables taken from the configuration
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub seek_step_ticks: u64,
    pub bpm_step: u32,
    pub antibounce: Duration,
    pub led_pulse: Duration,
    pub marker_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            seek_step_ticks: 1920,
            bpm_step: 2,
            antibounce: crate::debounce::DEFAULT_ANTIBOUNCE,
            led_pulse: crate::debounce::DEFAULT_LED_PULSE,
            marker_capacity: crate::markers::DEFAULT_CAPACITY,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            seek_step_ticks: config.transport.seek_step_ticks,
            bpm_step: config.transport.bpm_step,
            antibounce: config.timing.antibounce(),
            led_pulse: config.timing.led_pulse(),
            marker_capacity: config.transport.marker_capacity,
        }
    }
}

/// Control-surface dispatch and timing engine
pub struct Engine {
    pub(crate) registry: Registry,
    pub(crate) mixer: Mixer,
    pub(crate) player: Arc<dyn Player>,
    pub(crate) leds: Arc<dyn LedSink>,
    pub(crate) gpio: Arc<dyn Gpio>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) settings: EngineSettings,
    pub(crate) tempo: Mutex<TapTempo>,
    pub(crate) debounce: Mutex<SwitchDebounce>,
    pub(crate) markers: Mutex<MarkerTable>,
    /// Mixer channel whose solo is engaged
    pub(crate) active_solo: Mutex<Option<usize>>,
}

impl Engine {
    /// Create an engine without LED feedback or GPIO, on the system clock
    pub fn new(registry: Registry, player: Arc<dyn Player>, settings: EngineSettings) -> Self {
        Self {
            registry,
            mixer: Mixer::new(),
            player,
            leds: Arc::new(NullLedSink),
            gpio: Arc::new(DisabledGpio),
            clock: Arc::new(MonotonicClock::new()),
            debounce: Mutex::new(SwitchDebounce::new(settings.antibounce, settings.led_pulse)),
            markers: Mutex::new(MarkerTable::new(settings.marker_capacity)),
            tempo: Mutex::new(TapTempo::new()),
            active_solo: Mutex::new(None),
            settings,
        }
    }

    pub fn with_leds(mut self, leds: Arc<dyn LedSink>) -> Self {
        self.leds = leds;
        self
    }

    pub fn with_gpio(mut self, gpio: Arc<dyn Gpio>) -> Self {
        self.gpio = gpio;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn player(&self) -> &Arc<dyn Player> {
        &self.player
    }

    pub fn markers(&self) -> MarkerTable {
        self.markers.lock().clone()
    }

    pub fn tap_tempo(&self) -> TapTempo {
        self.tempo.lock().clone()
    }

    pub fn active_solo(&self) -> Option<usize> {
        *self.active_solo.lock()
    }

    /// A new song was loaded: timing and marker state start over
    pub fn on_song_loaded(&self) {
        self.tempo.lock().clear();
        self.debounce.lock().reset();
        self.markers.lock().clear();
        info!("🔄 Song loaded: tempo, debounce and markers reset");
    }

    /// Stop playback on the way out
    pub fn shutdown(&self) {
        if let Err(e) = self.player.stop() {
            warn!("Failed to stop player '{}': {}", self.player.name(), e);
        }
    }

    /// Push the LED state of the controls currently in view to the surface
    pub fn refresh_leds(&self) {
        for descriptor in self.registry.singletons() {
            self.send_led(descriptor, descriptor.state());
        }
        self.refresh_transport_leds();
        for (index, strip) in self.registry.strips.iter().enumerate() {
            self.send_led(&strip.rec, strip.rec.state());
            self.refresh_strip_leds(index);
        }
    }

    /// Transport buttons of the selected bank are momentary: LEDs off
    pub(crate) fn refresh_transport_leds(&self) {
        let transport = self.registry.active_transport();
        for descriptor in [
            &transport.track_left,
            &transport.track_right,
            &transport.rewind,
            &transport.forward,
        ] {
            self.send_led(descriptor, false);
        }
    }

    /// Solo and mute LEDs of one strip, for its selected bank
    pub(crate) fn refresh_strip_leds(&self, strip: usize) {
        let Some(strip) = self.registry.strips.get(strip) else {
            return;
        };
        let bank = strip.active_bank();
        self.send_led(&bank.solo, bank.solo.state());
        self.send_led(&bank.mute, bank.mute.state());
    }

    pub(crate) fn send_led(&self, descriptor: &ControlDescriptor, on: bool) {
        let Some(message) = descriptor.led_message(on) else {
            return;
        };
        if let Err(e) = self.leds.send_led(message) {
            warn!("Failed to update LED of {}: {}", descriptor.label, e);
        }
    }
}
