//! Beat switch anti-bounce and LED pulse
//!
//! A mechanical switch chatters for a few milliseconds on every actuation.
//! Presses closer together than the anti-bounce window are dropped, which
//! also caps the tappable tempo (250 ms ⇒ 240 BPM). The LED gives a short
//! fixed-length flash per accepted press, independent of the window.

use std::time::Duration;

/// Default anti-bounce window
pub const DEFAULT_ANTIBOUNCE: Duration = Duration::from_millis(250);

/// Default LED flash length
pub const DEFAULT_LED_PULSE: Duration = Duration::from_millis(200);

/// What one poll decided
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchPoll {
    /// The press counts as a beat
    pub accepted: bool,
    /// LED level to write, when it has to change
    pub led: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct SwitchDebounce {
    antibounce_us: u64,
    led_pulse_us: u64,
    /// Time of the last accepted press; 0 when none yet
    last_press_us: u64,
    led_lit: bool,
}

impl SwitchDebounce {
    pub fn new(antibounce: Duration, led_pulse: Duration) -> Self {
        Self {
            antibounce_us: antibounce.as_micros() as u64,
            led_pulse_us: led_pulse.as_micros() as u64,
            last_press_us: 0,
            led_lit: false,
        }
    }

    pub fn last_press_us(&self) -> u64 {
        self.last_press_us
    }

    pub fn led_lit(&self) -> bool {
        self.led_lit
    }

    /// Forget the last press; the LED state is left to the next poll
    pub fn reset(&mut self) {
        self.last_press_us = 0;
    }

    /// Evaluate the switch level sampled at `now_us`
    pub fn poll(&mut self, now_us: u64, pressed: bool) -> SwitchPoll {
        let mut outcome = SwitchPoll::default();

        if pressed
            && (self.last_press_us == 0
                || now_us.saturating_sub(self.last_press_us) >= self.antibounce_us)
        {
            self.last_press_us = now_us;
            outcome.accepted = true;
            if !self.led_lit {
                self.led_lit = true;
                outcome.led = Some(true);
            }
            return outcome;
        }

        if self.led_lit && now_us.saturating_sub(self.last_press_us) > self.led_pulse_us {
            self.led_lit = false;
            outcome.led = Some(false);
        }
        outcome
    }
}

impl Default for SwitchDebounce {
    fn default() -> Self {
        Self::new(DEFAULT_ANTIBOUNCE, DEFAULT_LED_PULSE)
    }
}
