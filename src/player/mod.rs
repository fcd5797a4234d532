//! Song player / sound engine collaborators
//!
//! The engine only talks to playback through the [`Player`] trait. Synthesis,
//! file playback and song/soundfont enumeration live behind it.

use crate::error::Result;
use tracing::info;

pub mod console;
pub mod midi_out;
pub mod transport;

pub use console::ConsolePlayer;
pub use midi_out::MidiOutPlayer;
pub use transport::Transport;

/// How an externally imposed tempo is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalTempo {
    /// Microseconds per beat (quarter note)
    MicrosPerBeat(u64),
    /// Beats per minute
    Bpm(u32),
}

impl ExternalTempo {
    /// Normalize to microseconds per beat; a zero BPM yields `None`
    pub fn micros_per_beat(self) -> Option<u64> {
        match self {
            ExternalTempo::MicrosPerBeat(us) if us > 0 => Some(us),
            ExternalTempo::Bpm(bpm) if bpm > 0 => Some(60_000_000 / bpm as u64),
            _ => None,
        }
    }
}

/// Direction for stepping through songs or soundfonts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Previous,
    Next,
}

/// Player trait - the playback service driven by the control surface
///
/// All methods take `&self` so a player can be shared as `Arc<dyn Player>`
/// between the surface input context and the automation context.
/// Implementations use interior mutability.
pub trait Player: Send + Sync {
    /// Player name for logs
    fn name(&self) -> &str;

    /// Start playback from the current position
    fn play(&self) -> Result<()>;

    /// Stop playback
    fn stop(&self) -> Result<()>;

    /// Move the playback position to `tick`
    fn seek(&self, tick: u64) -> Result<()>;

    /// Current playback position, `None` when no song is loaded
    fn current_tick(&self) -> Option<u64>;

    /// Current tempo in microseconds per beat, `None` when unavailable
    fn current_tempo_per_beat(&self) -> Option<u64>;

    /// Current tempo in BPM, `None` when unavailable
    fn current_bpm(&self) -> Option<u32>;

    /// Override the song tempo
    fn set_external_tempo(&self, tempo: ExternalTempo) -> Result<()>;

    /// Send a control change to the sound engine
    fn send_control_change(&self, channel: u8, controller: u8, value: u8) -> Result<()>;

    /// Select the previous/next song
    ///
    /// Default implementation: log only (player has no song list)
    fn step_song(&self, step: Step) -> Result<()> {
        info!("Player '{}': song {:?} requested (no song list)", self.name(), step);
        Ok(())
    }

    /// Select the previous/next soundfont
    ///
    /// Default implementation: log only (player has no soundfont list)
    fn step_soundfont(&self, step: Step) -> Result<()> {
        info!(
            "Player '{}': soundfont {:?} requested (no soundfont list)",
            self.name(),
            step
        );
        Ok(())
    }

    /// Forward a song message that the engine does not ponderate
    ///
    /// Default implementation: drop it
    fn forward_raw(&self, _data: &[u8]) -> Result<()> {
        Ok(())
    }
}
