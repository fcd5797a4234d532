//! Tap-tempo estimation driven by beat signals
//!
//! Each beat signal (external switch or tap pad) measures the interval since
//! the previous one and imposes it on the player as the new beat length.
//!
//! ```text
//! Idle ──beat──▶ Tracking ──beat (elapsed ≤ 1.75 × tempo)──▶ Tracking (tempo := elapsed)
//!   ▲                │
//!   └──beat (elapsed > 1.75 × tempo: a beat was missed)──┘
//! ```

use tracing::{debug, info, warn};

use crate::player::{ExternalTempo, Player};
use crate::player::transport::MAX_BPM;

/// Result of feeding one beat signal to [`TapTempo::beat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatOutcome {
    /// Player had no tempo to compare against; nothing changed
    TempoUnavailable,
    /// First beat since reset; the next one will be measured
    Armed { tempo_us: u64 },
    /// Interval accepted and sent to the player
    Applied { tempo_us: u64 },
    /// Interval too long to be a single beat; tracking restarted
    MissedBeat { elapsed_us: u64 },
}

/// Longest interval still taken as one beat: 1.75 × the current beat length
pub fn missed_beat_limit(tempo_us: u64) -> u64 {
    tempo_us + (tempo_us >> 1) + (tempo_us >> 2)
}

/// Tap-tempo tracker
#[derive(Debug, Clone, Default)]
pub struct TapTempo {
    /// Timestamp of the last accepted beat; 0 while idle
    last_beat_us: u64,
    /// Song tempo before any tapping, captured lazily
    initial_bpm: Option<u32>,
}

impl TapTempo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracking(&self) -> bool {
        self.last_beat_us != 0
    }

    pub fn last_beat_us(&self) -> u64 {
        self.last_beat_us
    }

    pub fn initial_bpm(&self) -> Option<u32> {
        self.initial_bpm
    }

    /// Back to idle; the captured song tempo is kept
    pub fn reset(&mut self) {
        self.last_beat_us = 0;
    }

    /// Forget everything, used when a new song is loaded
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Remember the song tempo the first time it is asked for
    pub fn capture_initial_bpm(&mut self, player: &dyn Player) -> Option<u32> {
        if self.initial_bpm.is_none() {
            self.initial_bpm = player.current_bpm();
            if let Some(bpm) = self.initial_bpm {
                debug!("Initial song tempo captured: {} BPM", bpm);
            }
        }
        self.initial_bpm
    }

    /// Feed one beat signal received at `now_us`
    pub fn beat(&mut self, now_us: u64, player: &dyn Player) -> BeatOutcome {
        let Some(tempo_us) = player.current_tempo_per_beat().filter(|t| *t > 0) else {
            debug!("Beat ignored: player reports no tempo");
            return BeatOutcome::TempoUnavailable;
        };

        if self.last_beat_us == 0 {
            self.capture_initial_bpm(player);
            // The previous beat is taken to be exactly one beat ago, so this
            // first measurement equals the running tempo and locks it in
            if let Err(e) = player.set_external_tempo(ExternalTempo::MicrosPerBeat(tempo_us)) {
                warn!("Failed to lock song tempo: {}", e);
            }
            self.last_beat_us = now_us.max(1);
            debug!("Tap tempo armed at {} µs/beat", tempo_us);
            return BeatOutcome::Armed { tempo_us };
        }

        let elapsed_us = now_us.saturating_sub(self.last_beat_us);
        if elapsed_us > missed_beat_limit(tempo_us) {
            info!(
                "Missed beat ({} µs since last tap, tempo {} µs): tap tempo reset",
                elapsed_us, tempo_us
            );
            self.last_beat_us = 0;
            return BeatOutcome::MissedBeat { elapsed_us };
        }

        if let Err(e) = player.set_external_tempo(ExternalTempo::MicrosPerBeat(elapsed_us)) {
            warn!("Failed to apply tapped tempo: {}", e);
        }
        self.last_beat_us = now_us;
        info!(
            "🥁 Tapped tempo: {} µs/beat ({:.1} BPM)",
            elapsed_us,
            60_000_000.0 / elapsed_us.max(1) as f64
        );
        BeatOutcome::Applied { tempo_us: elapsed_us }
    }

    /// Move the tempo by `delta` BPM, returning the new BPM.
    ///
    /// An unavailable player tempo counts as 0 BPM.
    pub fn nudge_bpm(&mut self, player: &dyn Player, delta: i32) -> u32 {
        self.capture_initial_bpm(player);
        let bpm = player.current_bpm().unwrap_or(0) as i64;
        let target = (bpm + delta as i64).clamp(1, MAX_BPM as i64) as u32;
        if let Err(e) = player.set_external_tempo(ExternalTempo::Bpm(target)) {
            warn!("Failed to change tempo: {}", e);
        }
        let at_initial = self.initial_bpm == Some(target);
        info!(
            "Tempo {} BPM{}",
            target,
            if at_initial { " (song tempo)" } else { "" }
        );
        target
    }

    /// Put back the song's own tempo, if it was ever captured
    pub fn restore_initial_bpm(&mut self, player: &dyn Player) -> Option<u32> {
        let bpm = self.initial_bpm.filter(|bpm| *bpm > 0)?;
        if let Err(e) = player.set_external_tempo(ExternalTempo::Bpm(bpm)) {
            warn!("Failed to restore song tempo: {}", e);
        }
        self.last_beat_us = 0;
        info!("Tempo restored to song tempo {} BPM", bpm);
        Some(bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::ConsolePlayer;

    const MS: u64 = 1_000;

    fn player_at(bpm: u32) -> ConsolePlayer {
        ConsolePlayer::new("test", 480, bpm)
    }

    #[test]
    fn test_missed_beat_limit() {
        assert_eq!(missed_beat_limit(500_000), 875_000);
        assert_eq!(missed_beat_limit(4), 7);
    }

    #[test]
    fn test_steady_taps_set_tempo() {
        let player = player_at(100);
        let mut tempo = TapTempo::new();
        let t0 = 10_000 * MS;

        assert_eq!(
            tempo.beat(t0, &player),
            BeatOutcome::Armed { tempo_us: 600_000 }
        );
        assert!(tempo.is_tracking());
        assert_eq!(tempo.initial_bpm(), Some(100));

        assert_eq!(
            tempo.beat(t0 + 500 * MS, &player),
            BeatOutcome::Applied { tempo_us: 500_000 }
        );
        assert_eq!(player.current_tempo_per_beat(), Some(500_000));
        assert_eq!(
            tempo.beat(t0 + 1000 * MS, &player),
            BeatOutcome::Applied { tempo_us: 500_000 }
        );
    }

    #[test]
    fn test_interval_just_under_limit_is_accepted() {
        let player = player_at(120);
        let mut tempo = TapTempo::new();
        tempo.beat(10_000 * MS, &player);
        tempo.beat(10_500 * MS, &player);
        assert_eq!(
            tempo.beat(10_500 * MS + 874 * MS, &player),
            BeatOutcome::Applied { tempo_us: 874_000 }
        );
    }

    #[test]
    fn test_interval_over_limit_resets() {
        let player = player_at(120);
        let mut tempo = TapTempo::new();
        tempo.beat(10_000 * MS, &player);
        tempo.beat(10_500 * MS, &player);
        assert_eq!(
            tempo.beat(10_500 * MS + 876 * MS, &player),
            BeatOutcome::MissedBeat { elapsed_us: 876_000 }
        );
        assert!(!tempo.is_tracking());
        assert_eq!(player.current_tempo_per_beat(), Some(500_000));
    }

    #[test]
    fn test_nudge_and_restore() {
        let player = player_at(120);
        let mut tempo = TapTempo::new();
        assert_eq!(tempo.nudge_bpm(&player, 2), 122);
        assert_eq!(tempo.nudge_bpm(&player, 2), 124);
        assert_eq!(tempo.initial_bpm(), Some(120));
        assert_eq!(tempo.restore_initial_bpm(&player), Some(120));
        assert_eq!(player.current_bpm(), Some(120));
    }

    #[test]
    fn test_nudge_never_reaches_zero() {
        let player = player_at(1);
        let mut tempo = TapTempo::new();
        assert_eq!(tempo.nudge_bpm(&player, -2), 1);
    }

    #[test]
    fn test_clear_forgets_initial_tempo() {
        let player = player_at(90);
        let mut tempo = TapTempo::new();
        tempo.beat(5_000 * MS, &player);
        tempo.clear();
        assert!(!tempo.is_tracking());
        assert_eq!(tempo.initial_bpm(), None);
        assert_eq!(tempo.restore_initial_bpm(&player), None);
    }
}
