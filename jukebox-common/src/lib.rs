//! # Jukebox Common Library
//!
//! Shared code for the vertical-remix jukebox:
//! - Configuration loading (TOML)
//! - Event types and the event bus
//! - Volume ramp math
//! - Session clock
//! - Error types

pub mod config;
pub mod error;
pub mod events;
pub mod ramp;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, JukeboxEvent, LoopPhase, SfxKind};
pub use ramp::{RampInterpolation, RampOverlap, RampProfile, RampStart};
pub use time::SessionClock;
