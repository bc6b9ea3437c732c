//! Shared setup for jukebox integration tests
//!
//! Every test runs on tokio's paused clock, so sleeps advance virtual time
//! instantly and event timestamps (`session_ms`) are exact.

#![allow(dead_code)]

use jukebox_common::config::JukeboxConfig;
use jukebox_common::{JukeboxEvent, SessionClock};
use jukebox_vr::backend::SimulatedBackend;
use jukebox_vr::Jukebox;
use std::time::Duration;
use tokio::sync::broadcast;

/// Three layers: 10 s intro clips, 8 s loop clips, lead not auto-added
pub const THREE_LAYERS: &str = r#"
intro_clips = ["drums_intro", "bass_intro", "lead_intro"]
loop_clips = ["drums_loop", "bass_loop", "lead_loop"]
victory_clip = "victory"
damaged_sfx = "damaged"
ko_sfx = "ko"

[timing]
add_lead_on_start = false

[clips]
drums_intro = 10000
drums_loop = 8000
bass_intro = 10000
bass_loop = 8000
lead_intro = 10000
lead_loop = 8000
victory = 5000
damaged = 400
ko = 1200
"#;

/// Volume of one fully-added layer out of three
pub const LAYER_LEVEL: f32 = 1.0 / 3.0;

pub fn three_layer_config() -> JukeboxConfig {
    JukeboxConfig::from_toml_str(THREE_LAYERS).expect("test config must parse")
}

/// A jukebox wired to a simulated backend whose call log the test can read
pub struct TestRig {
    pub jukebox: Jukebox,
    pub backend: SimulatedBackend,
    pub events: broadcast::Receiver<JukeboxEvent>,
}

impl TestRig {
    pub fn new(config: JukeboxConfig) -> Self {
        Self::with_release_lag(config, Duration::ZERO)
    }

    /// Rig whose channels keep reporting "playing" for `lag` past clip end
    pub fn with_release_lag(config: JukeboxConfig, lag: Duration) -> Self {
        let clock = SessionClock::start();
        let backend = SimulatedBackend::new(config.clip_catalog(), clock).with_release_lag(lag);
        let jukebox = Jukebox::new(&backend, &config, clock).expect("jukebox must build");
        let events = jukebox.subscribe();
        Self {
            jukebox,
            backend,
            events,
        }
    }

    /// Every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<JukeboxEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub async fn volume(&self, index: usize) -> f32 {
        self.jukebox
            .layers()
            .read()
            .await
            .volume(index)
            .expect("channel index in range")
    }
}

/// Advance the paused clock
pub async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}
