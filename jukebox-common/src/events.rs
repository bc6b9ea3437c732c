//! Event types for the jukebox event system
//!
//! The engine reports what it does (loop cycles, the phase swap, ramps,
//! overrides) as [`JukeboxEvent`]s on an [`EventBus`]. Consumers are the
//! console front end, log sinks and tests.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Which clip set a layer is assigned
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoopPhase {
    /// Playing the one-shot introduction clips
    Intro,
    /// Playing the repeating loop clips
    Loop,
}

impl std::fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopPhase::Intro => write!(f, "intro"),
            LoopPhase::Loop => write!(f, "loop"),
        }
    }
}

/// One-shot sound effects played over the lead channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SfxKind {
    Damaged,
    Ko,
}

/// Jukebox event types
///
/// `session_ms` is the session clock reading when the event was emitted;
/// `timestamp` is wall-clock time for logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JukeboxEvent {
    /// Every layer was told to play its current clip
    CycleStarted {
        phase: LoopPhase,
        /// 0 for the intro, then 1, 2, ... for each loop pass
        cycle: u64,
        session_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// All layers moved from intro clips to loop clips
    PhaseSwapped {
        session_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A volume ramp was launched
    RampStarted {
        ramp_id: Uuid,
        channel: usize,
        from: f32,
        to: f32,
        session_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A volume ramp ran all of its steps
    RampCompleted {
        ramp_id: Uuid,
        channel: usize,
        /// Volume the channel held after the ramp's final write
        volume: f32,
        session_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A ramp was aborted before finishing (superseded or shut down)
    RampCancelled {
        ramp_id: Uuid,
        channel: usize,
        session_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The lead channel was taken over by the victory clip
    VictoryEngaged {
        session_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A one-shot effect was fired on the lead channel
    SfxTriggered {
        kind: SfxKind,
        session_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The scheduler stopped its background tasks
    SchedulerStopped {
        session_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl JukeboxEvent {
    /// Session clock reading carried by the event
    pub fn session_ms(&self) -> u64 {
        match self {
            JukeboxEvent::CycleStarted { session_ms, .. }
            | JukeboxEvent::PhaseSwapped { session_ms, .. }
            | JukeboxEvent::RampStarted { session_ms, .. }
            | JukeboxEvent::RampCompleted { session_ms, .. }
            | JukeboxEvent::RampCancelled { session_ms, .. }
            | JukeboxEvent::VictoryEngaged { session_ms, .. }
            | JukeboxEvent::SfxTriggered { session_ms, .. }
            | JukeboxEvent::SchedulerStopped { session_ms, .. } => *session_ms,
        }
    }
}

/// Central event distribution bus
///
/// Backed by `tokio::sync::broadcast`: publishing never blocks, slow
/// subscribers see `Lagged` instead of stalling the engine.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<JukeboxEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<JukeboxEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: JukeboxEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
