//! Two-producer mixer: hardware positions and song automation
//!
//! Sliders/knobs and the song's CC7/CC8 write into the same channel. Each
//! write recomputes the ponderated value and emits it while the channel lock
//! is held, so an emitted value never mixes a stale and a fresh input.

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::midi::{CC_BALANCE, CC_VOLUME};
use crate::ponderation::{adjust_balance, adjust_volume, BALANCE_CENTER, MAX_VALUE};
use crate::registry::MIXER_CHANNELS;

/// Per-channel mixer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelState {
    /// Last hardware slider value
    pub slider: u8,
    /// Last hardware knob value
    pub knob: u8,
    /// Last CC7 sent by the song
    pub volume_automation: u8,
    /// Last CC8 sent by the song
    pub balance_automation: u8,
    /// Slider position saved when a solo engaged
    pub solo_snapshot: u8,
    /// Slider position saved when the channel was muted
    pub muted_snapshot: u8,
    /// Mute engaged; the slider is held at 0
    pub muted: bool,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            slider: MAX_VALUE,
            knob: BALANCE_CENTER,
            volume_automation: 100,
            balance_automation: BALANCE_CENTER,
            solo_snapshot: MAX_VALUE,
            muted_snapshot: MAX_VALUE,
            muted: false,
        }
    }
}

impl ChannelState {
    /// Volume to send: automation scaled by the slider
    pub fn volume(&self) -> u8 {
        adjust_volume(self.slider, self.volume_automation)
    }

    /// Balance to send: automation offset by the knob
    pub fn balance(&self) -> u8 {
        adjust_balance(self.knob, self.balance_automation)
    }
}

/// The 16 mixer channels, each behind its own lock
pub struct Mixer {
    channels: [Mutex<ChannelState>; MIXER_CHANNELS],
}

impl Mixer {
    pub fn new() -> Self {
        Self {
            channels: std::array::from_fn(|_| Mutex::new(ChannelState::default())),
        }
    }

    /// Lock one channel; `None` when out of range
    pub fn lock(&self, channel: usize) -> Option<MutexGuard<'_, ChannelState>> {
        self.channels.get(channel).map(|c| c.lock())
    }

    /// Copy of one channel's state
    pub fn snapshot(&self, channel: usize) -> Option<ChannelState> {
        self.lock(channel).map(|state| *state)
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Engine {
    /// Hardware slider moved
    pub(crate) fn on_slider(&self, channel: usize, value: u8) {
        let Some(mut state) = self.mixer.lock(channel) else {
            return;
        };
        state.slider = value;
        self.emit_volume(channel, &state);
    }

    /// Hardware knob moved
    pub(crate) fn on_knob(&self, channel: usize, value: u8) {
        let Some(mut state) = self.mixer.lock(channel) else {
            return;
        };
        state.knob = value;
        self.emit_balance(channel, &state);
    }

    /// Song automation entry point.
    ///
    /// CC7 and CC8 update the channel's automation value, and the ponderated
    /// result is sent to the player and returned. Any other controller, or a
    /// channel outside the mixer, is returned unmodified and not sent; the
    /// caller forwards it.
    pub fn on_automation_cc(&self, channel: u8, controller: u8, value: u8) -> u8 {
        let index = channel as usize;
        match controller {
            CC_VOLUME => {
                let Some(mut state) = self.mixer.lock(index) else {
                    return value;
                };
                state.volume_automation = value.min(MAX_VALUE);
                self.emit_volume(index, &state)
            }
            CC_BALANCE => {
                let Some(mut state) = self.mixer.lock(index) else {
                    return value;
                };
                state.balance_automation = value.min(MAX_VALUE);
                self.emit_balance(index, &state)
            }
            _ => value,
        }
    }

    /// Send the channel's ponderated volume; the caller holds the channel lock
    pub(crate) fn emit_volume(&self, channel: usize, state: &ChannelState) -> u8 {
        let volume = state.volume();
        debug!(
            channel = channel,
            slider = state.slider,
            automation = state.volume_automation,
            volume = volume,
            "Volume"
        );
        if let Err(e) = self
            .player
            .send_control_change(channel as u8, CC_VOLUME, volume)
        {
            warn!("Failed to send volume for channel {}: {}", channel, e);
        }
        volume
    }

    /// Send the channel's ponderated balance; the caller holds the channel lock
    pub(crate) fn emit_balance(&self, channel: usize, state: &ChannelState) -> u8 {
        let balance = state.balance();
        debug!(
            channel = channel,
            knob = state.knob,
            automation = state.balance_automation,
            balance = balance,
            "Balance"
        );
        if let Err(e) = self
            .player
            .send_control_change(channel as u8, CC_BALANCE, balance)
        {
            warn!("Failed to send balance for channel {}: {}", channel, e);
        }
        balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_channel_is_identity() {
        let state = ChannelState::default();
        assert_eq!(state.volume(), 100);
        assert_eq!(state.balance(), 64);
    }

    #[test]
    fn test_out_of_range_channel() {
        let mixer = Mixer::new();
        assert!(mixer.lock(MIXER_CHANNELS).is_none());
        assert!(mixer.snapshot(MIXER_CHANNELS - 1).is_some());
    }
}
