//! Console player - logs every command for testing and debugging

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use super::{ExternalTempo, Player, Step, Transport};
use crate::error::Result;

/// ConsolePlayer logs all player commands and keeps a simulated transport
///
/// This is useful for:
/// - Trying the surface layout without a synth attached
/// - Debugging tempo and marker behaviour from the logs
pub struct ConsolePlayer {
    name: String,
    transport: Transport,
    /// Command counter for debugging
    command_count: AtomicU64,
}

impl ConsolePlayer {
    pub fn new(name: impl Into<String>, ticks_per_beat: u32, initial_bpm: u32) -> Self {
        Self {
            name: name.into(),
            transport: Transport::new(ticks_per_beat, initial_bpm),
            command_count: AtomicU64::new(0),
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn command_count(&self) -> u64 {
        self.command_count.load(Ordering::Relaxed)
    }

    fn count(&self) -> u64 {
        self.command_count.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Player for ConsolePlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn play(&self) -> Result<()> {
        let n = self.count();
        if self.transport.play() {
            info!("🎵 [{}] play from tick {} [cmd #{}]", self.name, self.transport.current_tick(), n);
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let n = self.count();
        if self.transport.stop() {
            info!("⏹ [{}] stop at tick {} [cmd #{}]", self.name, self.transport.current_tick(), n);
        }
        Ok(())
    }

    fn seek(&self, tick: u64) -> Result<()> {
        let n = self.count();
        self.transport.seek(tick);
        info!("⏩ [{}] seek to tick {} [cmd #{}]", self.name, tick, n);
        Ok(())
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
        let n = self.count();
        if let Some(tempo_us) = self.transport.set_tempo(tempo) {
            info!(
                "🥁 [{}] tempo {} µs/beat ({} BPM) [cmd #{}]",
                self.name,
                tempo_us,
                self.transport.bpm(),
                n
            );
        }
        Ok(())
    }

    fn send_control_change(&self, channel: u8, controller: u8, value: u8) -> Result<()> {
        let n = self.count();
        debug!(
            player = %self.name,
            channel = channel,
            controller = controller,
            value = value,
            cmd = n,
            "ConsolePlayer control change"
        );
        Ok(())
    }

    fn step_song(&self, step: Step) -> Result<()> {
        let index = self.transport.step_song(step);
        info!("📂 [{}] song #{:02}", self.name, index);
        Ok(())
    }

    fn step_soundfont(&self, step: Step) -> Result<()> {
        let index = self.transport.step_soundfont(step);
        info!("🎹 [{}] soundfont #{:02}", self.name, index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_player_counts_commands() {
        let player = ConsolePlayer::new("console", 480, 120);
        player.play().unwrap();
        player.seek(0).unwrap();
        player.send_control_change(0, 7, 100).unwrap();
        player.stop().unwrap();
        assert_eq!(player.command_count(), 4);
        assert!(!player.transport().is_playing());
    }

    #[test]
    fn test_console_player_reports_tempo() {
        let player = ConsolePlayer::new("console", 480, 100);
        assert_eq!(player.current_tempo_per_beat(), Some(600_000));
        player
            .set_external_tempo(ExternalTempo::MicrosPerBeat(500_000))
            .unwrap();
        assert_eq!(player.current_bpm(), Some(120));
    }
}
