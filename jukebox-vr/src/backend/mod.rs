//! Audio backend seam
//!
//! The engine never renders audio itself. It drives one [`AudioChannel`]
//! per layer through these traits: assign a clip, play it, set its gain,
//! ask whether it is still playing. Clip identifiers from the configuration
//! are resolved to [`Clip`] handles by the [`AudioBackend`].

pub mod simulated;

pub use simulated::{BackendCall, CallKind, SimulatedBackend};

use crate::error::Result;
use std::time::Duration;

/// Handle to an external audio resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clip {
    pub id: String,
    pub duration: Duration,
}

impl Clip {
    pub fn new(id: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: id.into(),
            duration,
        }
    }
}

/// One playback voice of the audio backend
///
/// Implementations are driven from async tasks, so they must be `Send +
/// Sync`; every call is a short, non-blocking command.
pub trait AudioChannel: Send + Sync {
    /// Start (or restart) the currently assigned clip from the beginning
    fn play(&mut self) -> Result<()>;

    /// Whether the assigned clip is still audible; never fails
    fn is_playing(&self) -> bool;

    /// Assign the clip the next `play` will start
    fn set_clip(&mut self, clip: &Clip) -> Result<()>;

    /// Apply a gain in 0.0..=1.0 to the live output
    fn set_volume(&mut self, volume: f32);

    /// Fire-and-forget overlay of a clip on this voice
    fn play_one_shot(&mut self, clip: &Clip) -> Result<()>;
}

/// Factory for clips and channels
pub trait AudioBackend: Send + Sync {
    /// Resolve a clip identifier; unknown ids are a backend error
    fn load_clip(&self, id: &str) -> Result<Clip>;

    /// Acquire the voice for layer `index`; called once per layer
    fn open_channel(&self, index: usize) -> Result<Box<dyn AudioChannel>>;
}
