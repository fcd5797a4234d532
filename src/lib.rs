//! Kontrol GW - control surface gateway for a song player and sound engine
//!
//! A nanoKONTROL-style surface drives playback, a 16-channel mixer whose
//! volume and balance are ponderated against the song's own automation, and
//! tap tempo from a pad or an external beat switch.

pub mod clock;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod gpio;
pub mod markers;
pub mod midi;
pub mod player;
pub mod ponderation;
pub mod registry;
pub mod sniffer;
pub mod surface;
pub mod tempo;

pub use config::AppConfig;
pub use engine::{Engine, EngineSettings, LedSink};
pub use error::{Error, Result};
pub use registry::Registry;
