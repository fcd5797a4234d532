//! Transport model shared by the bundled players
//!
//! Tracks play state, tempo and position without a synthesis engine. The
//! position advances with wall-clock time while playing.

use parking_lot::Mutex;
use std::time::Instant;

use super::{ExternalTempo, Step};

/// Highest BPM the transport accepts, mirroring the player's own ceiling
pub const MAX_BPM: u32 = 60_000_000;

struct TransportState {
    playing: bool,
    tempo_us: u64,
    /// Tick at `anchor`
    anchor_tick: u64,
    /// When `anchor_tick` was reached; only meaningful while playing
    anchor: Instant,
    song_index: usize,
    soundfont_index: usize,
}

/// Simulated song transport
pub struct Transport {
    ticks_per_beat: u64,
    state: Mutex<TransportState>,
}

impl Transport {
    pub fn new(ticks_per_beat: u32, initial_bpm: u32) -> Self {
        let tempo_us = ExternalTempo::Bpm(initial_bpm.max(1))
            .micros_per_beat()
            .unwrap_or(500_000);
        Self {
            ticks_per_beat: ticks_per_beat.max(1) as u64,
            state: Mutex::new(TransportState {
                playing: false,
                tempo_us,
                anchor_tick: 0,
                anchor: Instant::now(),
                song_index: 0,
                soundfont_index: 0,
            }),
        }
    }

    pub fn ticks_per_beat(&self) -> u64 {
        self.ticks_per_beat
    }

    fn tick_at(&self, state: &TransportState, now: Instant) -> u64 {
        if !state.playing {
            return state.anchor_tick;
        }
        let elapsed_us = now.duration_since(state.anchor).as_micros() as u64;
        state.anchor_tick + elapsed_us * self.ticks_per_beat / state.tempo_us
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    /// Start playing; returns false when already playing
    pub fn play(&self) -> bool {
        let mut state = self.state.lock();
        if state.playing {
            return false;
        }
        state.playing = true;
        state.anchor = Instant::now();
        true
    }

    /// Stop playing, freezing the position; returns false when already stopped
    pub fn stop(&self) -> bool {
        let mut state = self.state.lock();
        if !state.playing {
            return false;
        }
        let now = Instant::now();
        state.anchor_tick = self.tick_at(&state, now);
        state.playing = false;
        true
    }

    pub fn seek(&self, tick: u64) {
        let mut state = self.state.lock();
        state.anchor_tick = tick;
        state.anchor = Instant::now();
    }

    pub fn current_tick(&self) -> u64 {
        let state = self.state.lock();
        self.tick_at(&state, Instant::now())
    }

    pub fn tempo_us(&self) -> u64 {
        self.state.lock().tempo_us
    }

    pub fn bpm(&self) -> u32 {
        (60_000_000 / self.state.lock().tempo_us) as u32
    }

    /// Apply a new tempo, re-anchoring so the position stays continuous.
    /// Returns the applied tempo in microseconds per beat.
    pub fn set_tempo(&self, tempo: ExternalTempo) -> Option<u64> {
        let tempo = match tempo {
            ExternalTempo::Bpm(bpm) => ExternalTempo::Bpm(bpm.min(MAX_BPM)),
            other => other,
        };
        let tempo_us = tempo.micros_per_beat()?;
        let mut state = self.state.lock();
        let now = Instant::now();
        state.anchor_tick = self.tick_at(&state, now);
        state.anchor = now;
        state.tempo_us = tempo_us;
        Some(tempo_us)
    }

    /// Move the song cursor; the index never goes below zero
    pub fn step_song(&self, step: Step) -> usize {
        let mut state = self.state.lock();
        state.song_index = stepped(state.song_index, step);
        state.anchor_tick = 0;
        state.anchor = Instant::now();
        state.song_index
    }

    /// Move the soundfont cursor; the index never goes below zero
    pub fn step_soundfont(&self, step: Step) -> usize {
        let mut state = self.state.lock();
        state.soundfont_index = stepped(state.soundfont_index, step);
        state.soundfont_index
    }
}

fn stepped(index: usize, step: Step) -> usize {
    match step {
        Step::Previous => index.saturating_sub(1),
        Step::Next => index.saturating_add(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_position_is_frozen() {
        let transport = Transport::new(480, 120);
        transport.seek(960);
        assert_eq!(transport.current_tick(), 960);
        assert!(!transport.is_playing());
    }

    #[test]
    fn test_play_stop_transitions() {
        let transport = Transport::new(480, 120);
        assert!(transport.play());
        assert!(!transport.play());
        assert!(transport.stop());
        assert!(!transport.stop());
    }

    #[test]
    fn test_tempo_conversion() {
        let transport = Transport::new(480, 120);
        assert_eq!(transport.tempo_us(), 500_000);
        assert_eq!(transport.set_tempo(ExternalTempo::MicrosPerBeat(400_000)), Some(400_000));
        assert_eq!(transport.bpm(), 150);
        assert_eq!(transport.set_tempo(ExternalTempo::Bpm(0)), None);
        assert_eq!(transport.tempo_us(), 400_000);
    }

    #[test]
    fn test_song_index_floors_at_zero() {
        let transport = Transport::new(480, 120);
        assert_eq!(transport.step_song(Step::Previous), 0);
        assert_eq!(transport.step_song(Step::Next), 1);
        assert_eq!(transport.step_soundfont(Step::Next), 1);
        assert_eq!(transport.step_soundfont(Step::Previous), 0);
    }
}
