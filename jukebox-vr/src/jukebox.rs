//! Jukebox: the system handle
//!
//! Built once from configuration and an audio backend, then shared by
//! reference (usually in an `Arc`) with whatever drives the game events.
//! Owns the [`LayerSet`] and the [`TransitionScheduler`] and exposes the
//! external operations: bring layers in and out, fade everything, fire
//! one-shots, and the victory override.

use crate::backend::{AudioBackend, Clip};
use crate::error::{Error, Result};
use crate::layers::{ChannelSnapshot, LayerSet, LEAD_CHANNEL};
use crate::scheduler::{RampId, SchedulerSettings, TransitionScheduler};
use jukebox_common::config::{FadeAllScope, JukeboxConfig};
use jukebox_common::{time, EventBus, JukeboxEvent, RampStart, SessionClock, SfxKind};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

/// Vertical-remix jukebox
pub struct Jukebox {
    layers: Arc<RwLock<LayerSet>>,
    scheduler: TransitionScheduler,
    events: EventBus,
    clock: SessionClock,
    damaged_sfx: Clip,
    ko_sfx: Clip,
    ramp_start: RampStart,
    fade_all: FadeAllScope,
    add_lead_on_start: bool,
}

fn load_clips(backend: &dyn AudioBackend, ids: &[String]) -> Result<Vec<Clip>> {
    ids.iter().map(|id| backend.load_clip(id)).collect()
}

impl Jukebox {
    /// Resolve every configured clip and build the layer set
    ///
    /// Fails fast: a malformed configuration or a missing clip means the
    /// jukebox never starts.
    pub fn new(backend: &dyn AudioBackend, config: &JukeboxConfig, clock: SessionClock) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::Configuration(e.to_string()))?;

        let intro_clips = load_clips(backend, &config.intro_clips)?;
        let loop_clips = load_clips(backend, &config.loop_clips)?;
        let victory_clip = backend.load_clip(&config.victory_clip)?;
        let damaged_sfx = backend.load_clip(&config.damaged_sfx)?;
        let ko_sfx = backend.load_clip(&config.ko_sfx)?;

        let layers = LayerSet::initialize(
            backend,
            intro_clips,
            loop_clips,
            victory_clip,
            config.timing.baseline_volume,
        )?;
        let layers = Arc::new(RwLock::new(layers));

        let events = EventBus::new(config.timing.event_capacity);
        let settings = SchedulerSettings {
            ramp: config.ramp.profile(),
            overlap: config.ramp.overlap,
            frame_interval: config.timing.frame_interval(),
        };
        let scheduler = TransitionScheduler::new(Arc::clone(&layers), settings, events.clone(), clock)?;

        info!(
            "Jukebox ready: {} layers, ramp {:?}/{} steps ({:?}, {:?})",
            config.layer_count(),
            settings.ramp.duration,
            settings.ramp.steps,
            settings.ramp.interpolation,
            settings.overlap
        );

        Ok(Self {
            layers,
            scheduler,
            events,
            clock,
            damaged_sfx,
            ko_sfx,
            ramp_start: config.ramp.start,
            fade_all: config.timing.fade_all,
            add_lead_on_start: config.timing.add_lead_on_start,
        })
    }

    /// Start the master loop (and fade in the lead layer if configured)
    pub async fn start(&self) -> Result<()> {
        self.scheduler.start_master_loop().await?;
        if self.add_lead_on_start {
            self.add_speaker(LEAD_CHANNEL).await?;
        }
        info!("Jukebox started");
        Ok(())
    }

    /// Fade layer `index` in to its full level (1/N)
    pub async fn add_speaker(&self, index: usize) -> Result<RampId> {
        let (from, to) = {
            let layers = self.layers.read().await;
            layers.check_index(index)?;
            let from = match self.ramp_start {
                RampStart::Nominal => 0.0,
                RampStart::Current => layers.volume(index)?,
            };
            (from, layers.layer_level())
        };

        info!("Adding speaker {} ({:.3} -> {:.3})", index, from, to);
        self.scheduler.ramp_volume(index, from, to).await
    }

    /// Fade layer `index` out to silence
    pub async fn sub_speaker(&self, index: usize) -> Result<RampId> {
        let from = {
            let layers = self.layers.read().await;
            layers.check_index(index)?;
            match self.ramp_start {
                RampStart::Nominal => layers.layer_level(),
                RampStart::Current => layers.volume(index)?,
            }
        };

        info!("Removing speaker {} ({:.3} -> 0)", index, from);
        self.scheduler.ramp_volume(index, from, 0.0).await
    }

    /// Fade out the non-lead layers selected by the fade-all scope
    pub async fn fade_all_speakers(&self) -> Result<Vec<RampId>> {
        let count = self.layer_count().await;
        let last = match self.fade_all {
            FadeAllScope::NonLead => count,
            FadeAllScope::FirstNonLead => count.min(2),
        };

        let mut ramps = Vec::new();
        for index in 1..last {
            ramps.push(self.sub_speaker(index).await?);
        }
        if ramps.is_empty() {
            warn!("Fade-all requested with no non-lead layers");
        }
        Ok(ramps)
    }

    pub async fn trigger_damaged_sfx(&self) -> Result<()> {
        self.play_sfx(SfxKind::Damaged).await
    }

    pub async fn trigger_ko_sfx(&self) -> Result<()> {
        self.play_sfx(SfxKind::Ko).await
    }

    async fn play_sfx(&self, kind: SfxKind) -> Result<()> {
        let clip = match kind {
            SfxKind::Damaged => &self.damaged_sfx,
            SfxKind::Ko => &self.ko_sfx,
        };
        self.layers.write().await.play_lead_one_shot(clip)?;

        self.events.emit_lossy(JukeboxEvent::SfxTriggered {
            kind,
            session_ms: self.clock.elapsed_ms(),
            timestamp: time::now(),
        });
        Ok(())
    }

    /// Switch the lead layer to the victory clip at full volume
    pub async fn trigger_victory(&self) -> Result<()> {
        self.layers.write().await.trigger_victory_override()?;

        self.events.emit_lossy(JukeboxEvent::VictoryEngaged {
            session_ms: self.clock.elapsed_ms(),
            timestamp: time::now(),
        });
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JukeboxEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> Vec<ChannelSnapshot> {
        let mut channels = self.layers.read().await.snapshot();
        for channel in &mut channels {
            channel.active_ramps = self.scheduler.active_ramps(channel.index);
        }
        channels
    }

    pub async fn layer_count(&self) -> usize {
        self.layers.read().await.len()
    }

    pub fn layers(&self) -> &Arc<RwLock<LayerSet>> {
        &self.layers
    }

    pub fn scheduler(&self) -> &TransitionScheduler {
        &self.scheduler
    }

    pub fn clock(&self) -> SessionClock {
        self.clock
    }

    /// Stop the master loop and cancel in-flight ramps
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
        info!("Jukebox stopped");
    }
}
