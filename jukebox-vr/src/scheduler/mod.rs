//! Transition scheduler
//!
//! Runs the time-based behaviors of the jukebox as tokio tasks:
//! - one long-lived master loop task (intro, phase swap, perpetual loop)
//! - one short-lived task per volume ramp
//!
//! Both kinds of task reach the [`LayerSet`] only through one
//! `Arc<RwLock<_>>`, and every write (a ramp step, a loop restart, the
//! phase swap) happens inside a single lock acquisition. A ramp step
//! therefore never observes half a phase swap, and concurrent ramps on one
//! channel resolve to whichever step was written last.

mod master_loop;
mod ramp;

pub use ramp::{RampId, RampTask};

use crate::error::{Error, Result};
use crate::layers::LayerSet;
use jukebox_common::{time, EventBus, JukeboxEvent, RampOverlap, RampProfile, SessionClock};
use master_loop::{run_master_loop, LoopContext};
use ramp::{run_ramp, RampContext};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Timing and policy knobs for the scheduler
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    pub ramp: RampProfile,
    pub overlap: RampOverlap,
    /// Poll period while waiting for the lead channel to stop
    pub frame_interval: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            ramp: RampProfile::default(),
            overlap: RampOverlap::Concurrent,
            frame_interval: Duration::from_millis(16),
        }
    }
}

struct RampHandle {
    id: RampId,
    handle: JoinHandle<()>,
}

/// In-flight ramp tasks per channel
type RampRegistry = HashMap<usize, Vec<RampHandle>>;

/// Drives the master loop and volume ramps over a shared [`LayerSet`]
pub struct TransitionScheduler {
    layers: Arc<RwLock<LayerSet>>,
    settings: SchedulerSettings,
    events: EventBus,
    clock: SessionClock,
    shutdown_tx: watch::Sender<bool>,
    master: Mutex<Option<JoinHandle<()>>>,
    ramps: Mutex<RampRegistry>,
    stopped: AtomicBool,
}

impl TransitionScheduler {
    pub fn new(
        layers: Arc<RwLock<LayerSet>>,
        settings: SchedulerSettings,
        events: EventBus,
        clock: SessionClock,
    ) -> Result<Self> {
        if settings.ramp.steps == 0 || settings.ramp.step_duration().is_zero() {
            return Err(Error::Configuration(format!(
                "ramp of {:?} in {} steps has no usable step length",
                settings.ramp.duration, settings.ramp.steps
            )));
        }
        if settings.frame_interval.is_zero() {
            return Err(Error::Configuration(
                "frame interval must be non-zero".to_string(),
            ));
        }

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            layers,
            settings,
            events,
            clock,
            shutdown_tx,
            master: Mutex::new(None),
            ramps: Mutex::new(HashMap::new()),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn layers(&self) -> &Arc<RwLock<LayerSet>> {
        &self.layers
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    fn ensure_running(&self) -> Result<()> {
        if self.stopped.load(Ordering::SeqCst) {
            Err(Error::InvalidState("scheduler has been shut down".to_string()))
        } else {
            Ok(())
        }
    }

    fn registry(&self) -> MutexGuard<'_, RampRegistry> {
        self.ramps.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawn the master loop task; valid once per scheduler
    pub async fn start_master_loop(&self) -> Result<()> {
        self.ensure_running()?;

        let mut master = self.master.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if master.is_some() {
            return Err(Error::InvalidState(
                "master loop is already running".to_string(),
            ));
        }

        let ctx = LoopContext {
            layers: Arc::clone(&self.layers),
            events: self.events.clone(),
            clock: self.clock,
            frame_interval: self.settings.frame_interval,
            shutdown: self.shutdown_tx.subscribe(),
        };

        *master = Some(tokio::spawn(async move {
            if let Err(e) = run_master_loop(ctx).await {
                error!("Master loop error: {}", e);
            }
        }));

        info!("Master loop task spawned");
        Ok(())
    }

    /// Launch a ramp of channel `index` from `from` to `to`
    ///
    /// Returns as soon as the task is spawned. Under
    /// [`RampOverlap::Supersede`] any ramp already running on the channel
    /// is cancelled first; under [`RampOverlap::Concurrent`] it keeps
    /// running alongside the new one.
    pub async fn ramp_volume(&self, index: usize, from: f32, to: f32) -> Result<RampId> {
        self.ensure_running()?;

        let mut task = RampTask::new(index, from, to, &self.settings.ramp);
        {
            let mut layers = self.layers.write().await;
            layers.check_index(index)?;
            layers.set_target_volume(index, to)?;
            if self.settings.overlap == RampOverlap::Supersede {
                task.generation = Some(layers.claim_ramps(index)?);
            }
        }

        if self.settings.overlap == RampOverlap::Supersede {
            self.cancel_ramps_on(index, "superseded");
        }

        let ramp_id = task.id;
        self.events.emit_lossy(JukeboxEvent::RampStarted {
            ramp_id,
            channel: index,
            from,
            to,
            session_ms: self.clock.elapsed_ms(),
            timestamp: time::now(),
        });

        let ctx = RampContext {
            layers: Arc::clone(&self.layers),
            events: self.events.clone(),
            clock: self.clock,
            profile: self.settings.ramp,
        };

        let mut registry = self.registry();
        let handles = registry.entry(index).or_default();
        handles.retain(|ramp| !ramp.handle.is_finished());
        handles.push(RampHandle {
            id: ramp_id,
            handle: tokio::spawn(run_ramp(task, ctx)),
        });

        Ok(ramp_id)
    }

    /// Number of ramps still running on channel `index`
    pub fn active_ramps(&self, index: usize) -> usize {
        self.registry()
            .get(&index)
            .map(|handles| handles.iter().filter(|ramp| !ramp.handle.is_finished()).count())
            .unwrap_or(0)
    }

    fn cancel_ramps_on(&self, index: usize, reason: &str) {
        let cancelled: Vec<RampHandle> = self.registry().remove(&index).unwrap_or_default();
        for ramp in cancelled {
            if ramp.handle.is_finished() {
                continue;
            }
            ramp.handle.abort();
            debug!("Ramp {} on channel {} {}", ramp.id, index, reason);
            self.events.emit_lossy(JukeboxEvent::RampCancelled {
                ramp_id: ramp.id,
                channel: index,
                session_ms: self.clock.elapsed_ms(),
                timestamp: time::now(),
            });
        }
    }

    /// Stop the master loop and abort every in-flight ramp
    ///
    /// Idempotent. Scheduling calls made afterwards fail with
    /// `InvalidState`.
    pub async fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down transition scheduler");

        // No receiver just means the master loop was never started
        let _ = self.shutdown_tx.send(true);

        let master = self
            .master
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = master {
            if let Err(e) = handle.await {
                warn!("Master loop task ended abnormally: {}", e);
            }
        }

        let channels: Vec<usize> = self.registry().keys().copied().collect();
        for index in channels {
            self.cancel_ramps_on(index, "cancelled by shutdown");
        }

        self.events.emit_lossy(JukeboxEvent::SchedulerStopped {
            session_ms: self.clock.elapsed_ms(),
            timestamp: time::now(),
        });
        info!("Transition scheduler stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for TransitionScheduler {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        for handles in self.registry().values() {
            for ramp in handles {
                ramp.handle.abort();
            }
        }
    }
}
