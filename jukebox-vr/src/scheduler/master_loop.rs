//! Master loop timer
//!
//! Plays the intro on every layer, waits for the lead channel to finish,
//! swaps all layers to their loop clips, then restarts the loop each time
//! the lead channel finishes again. Each wait has two stages: a coarse
//! sleep until the nominal clip end, then a per-frame poll until the lead
//! channel actually reports not-playing.

use crate::error::Result;
use crate::layers::LayerSet;
use jukebox_common::{time, EventBus, JukeboxEvent, LoopPhase, SessionClock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info};

pub(super) struct LoopContext {
    pub layers: Arc<RwLock<LayerSet>>,
    pub events: EventBus,
    pub clock: SessionClock,
    pub frame_interval: Duration,
    pub shutdown: watch::Receiver<bool>,
}

impl LoopContext {
    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// Play every layer and report when the lead clip should end
async fn start_cycle(ctx: &LoopContext, phase: LoopPhase, cycle: u64) -> Result<Instant> {
    let (started, nominal) = {
        let mut layers = ctx.layers.write().await;
        let started = Instant::now();
        layers.play_all()?;
        (started, layers.lead_clip_duration())
    };

    debug!(
        "Cycle {} ({}) started at {}ms, lead clip {:?}",
        cycle,
        phase,
        ctx.clock.offset_of(started).as_millis(),
        nominal
    );
    ctx.events.emit_lossy(JukeboxEvent::CycleStarted {
        phase,
        cycle,
        session_ms: ctx.clock.offset_of(started).as_millis() as u64,
        timestamp: time::now(),
    });

    Ok(started + nominal)
}

/// Wait for the lead channel to finish its clip
///
/// Returns false if shutdown was requested while waiting.
async fn wait_for_lead(ctx: &mut LoopContext, nominal_end: Instant) -> bool {
    if ctx.shutdown_requested() {
        return false;
    }

    tokio::select! {
        _ = sleep_until(nominal_end) => {}
        _ = ctx.shutdown.changed() => return false,
    }

    let mut polls = 0u32;
    loop {
        if ctx.shutdown_requested() {
            return false;
        }
        if !ctx.layers.read().await.lead_is_playing() {
            if polls > 0 {
                debug!("Lead channel ran {} frame(s) past its nominal end", polls);
            }
            return true;
        }

        polls += 1;
        tokio::select! {
            _ = sleep(ctx.frame_interval) => {}
            _ = ctx.shutdown.changed() => return false,
        }
    }
}

/// Drive the intro, the phase swap and the perpetual loop until shutdown
pub(super) async fn run_master_loop(mut ctx: LoopContext) -> Result<()> {
    info!("Master loop started");

    let intro_end = start_cycle(&ctx, LoopPhase::Intro, 0).await?;
    if !wait_for_lead(&mut ctx, intro_end).await {
        info!("Master loop stopped during intro");
        return Ok(());
    }

    ctx.layers.write().await.swap_to_loop_phase()?;
    ctx.events.emit_lossy(JukeboxEvent::PhaseSwapped {
        session_ms: ctx.clock.elapsed_ms(),
        timestamp: time::now(),
    });

    let mut cycle = 0u64;
    loop {
        cycle += 1;
        let loop_end = start_cycle(&ctx, LoopPhase::Loop, cycle).await?;
        if !wait_for_lead(&mut ctx, loop_end).await {
            info!("Master loop stopped after {} loop cycle(s)", cycle);
            return Ok(());
        }
    }
}
