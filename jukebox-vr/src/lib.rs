//! Vertical-remix jukebox engine
//!
//! Plays N synchronized music layers: an intro once, then a seamlessly
//! repeating loop. Layers fade in and out with timed volume ramps, one-shot
//! effects overlay the lead layer, and a victory override takes the lead
//! layer over at full volume.
//!
//! - [`layers`]: the channel set and its phase swap
//! - [`scheduler`]: master loop and ramp tasks
//! - [`jukebox`]: the handle game code talks to
//! - [`backend`]: the seam to whatever actually plays audio

pub mod backend;
pub mod console;
pub mod error;
pub mod jukebox;
pub mod layers;
pub mod scheduler;

pub use error::{Error, Result};
pub use jukebox::Jukebox;
pub use layers::{ChannelSnapshot, LayerSet, LEAD_CHANNEL};
pub use scheduler::{RampId, SchedulerSettings, TransitionScheduler};
