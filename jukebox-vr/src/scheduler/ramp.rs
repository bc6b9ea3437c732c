//! Volume ramp task
//!
//! One task per fade request. Step `k` is written at `start + k * slice` on
//! a fixed interval, so a ramp always spans its configured duration no
//! matter how long each lock acquisition takes.

use crate::layers::LayerSet;
use jukebox_common::{time, EventBus, JukeboxEvent, RampProfile, SessionClock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, error};
use uuid::Uuid;

/// Identifier handed back for every launched ramp
pub type RampId = Uuid;

/// State of one in-flight fade
#[derive(Debug, Clone)]
pub struct RampTask {
    pub id: RampId,
    pub channel_index: usize,
    pub start_volume: f32,
    pub end_volume: f32,
    pub elapsed: Duration,
    pub duration: Duration,
    pub steps: u32,
    /// Claim held on the channel when ramps supersede each other
    pub generation: Option<u64>,
}

impl RampTask {
    pub fn new(channel_index: usize, start_volume: f32, end_volume: f32, profile: &RampProfile) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel_index,
            start_volume,
            end_volume,
            elapsed: Duration::ZERO,
            duration: profile.duration,
            steps: profile.steps,
            generation: None,
        }
    }
}

/// Shared handles a ramp task needs
#[derive(Clone)]
pub(super) struct RampContext {
    pub layers: Arc<RwLock<LayerSet>>,
    pub events: EventBus,
    pub clock: SessionClock,
    pub profile: RampProfile,
}

/// Outcome of writing one step
enum StepWrite {
    Written,
    Skipped,
    Superseded,
}

async fn write_step(ctx: &RampContext, task: &RampTask, volume: f32) -> StepWrite {
    let mut layers = ctx.layers.write().await;

    if let Some(generation) = task.generation {
        match layers.ramp_generation(task.channel_index) {
            Ok(current) if current == generation => {}
            _ => return StepWrite::Superseded,
        }
    }

    // The victory override owns the lead channel
    if !layers.accepts_ramp(task.channel_index) {
        return StepWrite::Skipped;
    }

    match layers.set_volume(task.channel_index, volume) {
        Ok(_) => StepWrite::Written,
        Err(e) => {
            error!("Ramp {} failed to set volume: {}", task.id, e);
            StepWrite::Superseded
        }
    }
}

/// Run every step of `task`, then report completion
pub(super) async fn run_ramp(mut task: RampTask, ctx: RampContext) {
    let slice = ctx.profile.step_duration();
    let mut ticker = interval(slice);

    debug!(
        "Ramp {} on channel {}: {:.3} -> {:.3} over {} steps",
        task.id, task.channel_index, task.start_volume, task.end_volume, task.steps
    );

    for step in 0..task.steps {
        ticker.tick().await;

        let volume = ctx
            .profile
            .volume_at(task.start_volume, task.end_volume, step);
        if let StepWrite::Superseded = write_step(&ctx, &task, volume).await {
            debug!("Ramp {} superseded at step {}", task.id, step);
            return;
        }
        task.elapsed += slice;
    }

    // Wait out the final slice before declaring the ramp done
    ticker.tick().await;

    if ctx.profile.settle_on_target {
        if let StepWrite::Superseded = write_step(&ctx, &task, task.end_volume).await {
            return;
        }
    }

    let expected = ctx.profile.final_volume(task.start_volume, task.end_volume);
    let volume = ctx
        .layers
        .read()
        .await
        .volume(task.channel_index)
        .unwrap_or(expected);

    // A later ramp or the victory override may own the channel by now
    if (volume - expected).abs() > f32::EPSILON {
        debug!(
            "Ramp {} on channel {} finished at {:.4}, its own last write was {:.4}",
            task.id, task.channel_index, volume, expected
        );
    } else {
        debug!(
            "Ramp {} on channel {} complete at {:.4}",
            task.id, task.channel_index, volume
        );
    }
    ctx.events.emit_lossy(JukeboxEvent::RampCompleted {
        ramp_id: task.id,
        channel: task.channel_index,
        volume,
        session_ms: ctx.clock.elapsed_ms(),
        timestamp: time::now(),
    });
}
