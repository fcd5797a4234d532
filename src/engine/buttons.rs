//! Toggle and momentary button handlers
//!
//! Toggles store bit 0 of the payload and echo it to their LED on every
//! event. Their side effects (solo, mute, bank switch) only run when the
//! state changes. Momentary buttons act on press and ignore release.
//!
//! Solo and mute both park sliders at 0. A channel's own level lives in
//! `solo_snapshot` while another channel is soloed, else in `muted_snapshot`
//! while muted, else in `slider`.

use tracing::{debug, info, warn};

use crate::player::Step;
use crate::registry::{
    mixer_channel, ControlDescriptor, MomentaryAction, ToggleAction, MIXER_CHANNELS,
};

impl super::Engine {
    pub(crate) fn on_toggle(&self, descriptor: &ControlDescriptor, action: ToggleAction, payload: u8) {
        let on = payload & 0x01 == 1;
        let was_on = descriptor.set_state(on);
        self.send_led(descriptor, on);

        if was_on == on {
            return;
        }

        match action {
            ToggleAction::Solo { strip, bank } => {
                let channel = mixer_channel(strip, bank) as usize;
                if on {
                    self.engage_solo(channel);
                } else {
                    self.release_solo(channel);
                }
            }
            ToggleAction::Mute { strip, bank } => {
                self.set_muted(mixer_channel(strip, bank) as usize, on);
            }
            ToggleAction::Rec { strip } => {
                self.refresh_strip_leds(strip as usize);
                info!("Strip {} on bank {}", strip + 1, on as u8);
            }
            ToggleAction::Cycle => {
                self.refresh_transport_leds();
                info!(
                    "Transport bank {}",
                    if on { "1 (soundfont / tempo)" } else { "0 (song / seek)" }
                );
            }
        }
    }

    /// Solo one channel: every other channel's slider is parked at 0
    fn engage_solo(&self, channel: usize) {
        let mut active = self.active_solo.lock();
        if let Some(previous) = active.take() {
            if previous != channel {
                self.restore_from_solo(previous);
                if let Some(solo) = self.registry.solo_for_channel(previous) {
                    solo.set_state(false);
                    self.send_led(solo, false);
                }
                debug!("Solo released on channel {} in favour of {}", previous, channel);
            }
        }

        for index in 0..MIXER_CHANNELS {
            let Some(mut state) = self.mixer.lock(index) else {
                continue;
            };
            state.solo_snapshot = if state.muted {
                state.muted_snapshot
            } else {
                state.slider
            };
            if index != channel {
                state.slider = 0;
                self.emit_volume(index, &state);
            }
        }
        *active = Some(channel);
        info!("🎚 Solo on channel {}", channel);
    }

    /// Leave solo if `channel` holds it
    fn release_solo(&self, channel: usize) {
        let mut active = self.active_solo.lock();
        if *active != Some(channel) {
            return;
        }
        self.restore_from_solo(channel);
        *active = None;
        info!("🎚 Solo off on channel {}", channel);
    }

    /// Give parked channels their level back; muted ones stay at 0
    fn restore_from_solo(&self, soloed: usize) {
        for index in (0..MIXER_CHANNELS).filter(|index| *index != soloed) {
            let Some(mut state) = self.mixer.lock(index) else {
                continue;
            };
            if state.muted {
                state.muted_snapshot = state.solo_snapshot;
            } else {
                state.slider = state.solo_snapshot;
            }
            self.emit_volume(index, &state);
        }
    }

    fn set_muted(&self, channel: usize, muted: bool) {
        let active = self.active_solo.lock();
        let parked = matches!(*active, Some(soloed) if soloed != channel);
        let Some(mut state) = self.mixer.lock(channel) else {
            return;
        };
        match (muted, parked) {
            (true, true) => state.muted_snapshot = state.solo_snapshot,
            (true, false) => {
                state.muted_snapshot = state.slider;
                state.slider = 0;
            }
            (false, true) => state.solo_snapshot = state.muted_snapshot,
            (false, false) => state.slider = state.muted_snapshot,
        }
        state.muted = muted;
        self.emit_volume(channel, &state);
        info!("🔇 Channel {} {}", channel, if muted { "muted" } else { "unmuted" });
    }

    pub(crate) fn on_momentary(&self, action: MomentaryAction, payload: u8) {
        if payload == 0 {
            return;
        }

        let result = match action {
            MomentaryAction::Play => self.player.seek(0).and_then(|_| self.player.play()),
            MomentaryAction::Stop => self.player.stop(),
            MomentaryAction::Record => {
                if self.tempo.lock().restore_initial_bpm(self.player.as_ref()).is_none() {
                    debug!("No song tempo captured yet; nothing to restore");
                }
                Ok(())
            }
            MomentaryAction::Set => {
                self.set_marker();
                Ok(())
            }
            MomentaryAction::MarkerLeft => {
                let target = self.markers.lock().left();
                self.seek_to_marker(target)
            }
            MomentaryAction::MarkerRight => {
                let target = self.markers.lock().right();
                self.seek_to_marker(target)
            }
            MomentaryAction::Tap => {
                self.on_tap_beat();
                Ok(())
            }
            MomentaryAction::TrackLeft { bank: 0 } => self.change_song(Step::Previous),
            MomentaryAction::TrackRight { bank: 0 } => self.change_song(Step::Next),
            MomentaryAction::TrackLeft { .. } => self.player.step_soundfont(Step::Previous),
            MomentaryAction::TrackRight { .. } => self.player.step_soundfont(Step::Next),
            MomentaryAction::Rewind { bank: 0 } => self.seek_relative(-1),
            MomentaryAction::Forward { bank: 0 } => self.seek_relative(1),
            MomentaryAction::Rewind { .. } => {
                self.nudge_tempo(-(self.settings.bpm_step as i32));
                Ok(())
            }
            MomentaryAction::Forward { .. } => {
                self.nudge_tempo(self.settings.bpm_step as i32);
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("{:?} failed on player '{}': {}", action, self.player.name(), e);
        }
    }

    fn change_song(&self, step: Step) -> crate::error::Result<()> {
        self.player.step_song(step)?;
        self.on_song_loaded();
        Ok(())
    }

    fn set_marker(&self) {
        let Some(tick) = self.player.current_tick() else {
            debug!("Marker not set: no playback position");
            return;
        };
        match self.markers.lock().set(tick) {
            Some(slot) => info!("📍 Marker {} at tick {}", slot + 1, tick),
            None if tick == 0 => debug!("Marker not set at tick 0"),
            None => debug!("Marker table full; tick {} dropped", tick),
        }
    }

    fn seek_to_marker(&self, target: Option<u64>) -> crate::error::Result<()> {
        match target {
            Some(tick) => {
                info!("📍 Jump to marker at tick {}", tick);
                self.player.seek(tick)
            }
            None => Ok(()),
        }
    }

    /// Seek `direction` steps of `seek_step_ticks`, never before the start
    fn seek_relative(&self, direction: i64) -> crate::error::Result<()> {
        let Some(tick) = self.player.current_tick() else {
            return Ok(());
        };
        let step = self.settings.seek_step_ticks as i64 * direction;
        let target = (tick as i64).saturating_add(step).max(0) as u64;
        self.player.seek(target)
    }

    fn nudge_tempo(&self, delta: i32) {
        self.tempo.lock().nudge_bpm(self.player.as_ref(), delta);
    }
}
