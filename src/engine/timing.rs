//! Timing entry points: tap beats and beat switch polling

use tracing::{trace, warn};

use crate::gpio::Level;
use crate::tempo::BeatOutcome;

impl super::Engine {
    /// One beat signal from the tap pad or the debounced switch
    pub fn on_tap_beat(&self) -> BeatOutcome {
        let now_us = self.clock.now_us();
        self.tempo.lock().beat(now_us, self.player.as_ref())
    }

    /// Sample the beat switch once; returns true when a beat was accepted
    ///
    /// The switch is active-low. Read failures count as "not pressed" so the
    /// LED pulse still ends on time.
    pub fn on_switch_poll_tick(&self) -> bool {
        if !self.gpio.enabled() {
            return false;
        }

        let pressed = match self.gpio.read_switch_pin() {
            Ok(level) => level == Level::Low,
            Err(e) => {
                warn!("Beat switch read failed: {}", e);
                false
            }
        };

        let now_us = self.clock.now_us();
        let poll = self.debounce.lock().poll(now_us, pressed);

        if let Some(lit) = poll.led {
            if let Err(e) = self.gpio.write_led_pin(Level::from(lit)) {
                warn!("Beat LED write failed: {}", e);
            }
        }

        if poll.accepted {
            trace!("Beat switch press at {} µs", now_us);
            self.on_tap_beat();
        }
        poll.accepted
    }
}
