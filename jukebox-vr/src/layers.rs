//! Layer set: the fixed collection of synchronized channels
//!
//! Owns every channel's clip assignment, phase and volume. All channels
//! change phase together in [`LayerSet::swap_to_loop_phase`]; channel 0
//! (the lead) is the single source of truth for loop length.
//!
//! The victory override takes the lead channel out of automatic control:
//! once engaged, loop restarts, the phase swap and ramp writes leave the
//! lead alone, and it no longer gates loop timing.

use crate::backend::{AudioBackend, AudioChannel, Clip};
use crate::error::{Error, Result};
use jukebox_common::LoopPhase;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Index of the channel that governs loop timing
pub const LEAD_CHANNEL: usize = 0;

/// One audio layer
pub struct Channel {
    index: usize,
    intro_clip: Clip,
    loop_clip: Clip,
    phase: LoopPhase,
    target_volume: f32,
    current_volume: f32,
    ramp_generation: u64,
    output: Box<dyn AudioChannel>,
}

impl Channel {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// Clip for the channel's current phase
    pub fn phase_clip(&self) -> &Clip {
        match self.phase {
            LoopPhase::Intro => &self.intro_clip,
            LoopPhase::Loop => &self.loop_clip,
        }
    }

    pub fn intro_clip(&self) -> &Clip {
        &self.intro_clip
    }

    pub fn loop_clip(&self) -> &Clip {
        &self.loop_clip
    }

    pub fn current_volume(&self) -> f32 {
        self.current_volume
    }

    pub fn target_volume(&self) -> f32 {
        self.target_volume
    }
}

/// Read-only view of one channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSnapshot {
    pub index: usize,
    pub phase: LoopPhase,
    pub clip: String,
    pub current_volume: f32,
    pub target_volume: f32,
    pub is_playing: bool,
    /// Whether the victory override owns this channel
    pub overridden: bool,
    /// Ramps still running on this channel (filled in by the scheduler owner)
    pub active_ramps: usize,
}

/// Fixed, ordered set of channels
pub struct LayerSet {
    channels: Vec<Channel>,
    victory_clip: Clip,
    lead_override: bool,
}

impl LayerSet {
    /// Acquire one channel per intro/loop pair and load the intro clips
    ///
    /// Every channel starts in the intro phase at `baseline_volume`. The lead
    /// channel's clips set the loop period, so both must have non-zero length.
    pub fn initialize(
        backend: &dyn AudioBackend,
        intro_clips: Vec<Clip>,
        loop_clips: Vec<Clip>,
        victory_clip: Clip,
        baseline_volume: f32,
    ) -> Result<Self> {
        if intro_clips.is_empty() {
            return Err(Error::Configuration(
                "at least one intro/loop clip pair is required".to_string(),
            ));
        }
        if intro_clips.len() != loop_clips.len() {
            return Err(Error::Configuration(format!(
                "{} intro clips but {} loop clips",
                intro_clips.len(),
                loop_clips.len()
            )));
        }

        let (lead_intro, lead_loop) = (&intro_clips[LEAD_CHANNEL], &loop_clips[LEAD_CHANNEL]);
        if lead_intro.duration.is_zero() || lead_loop.duration.is_zero() {
            return Err(Error::Configuration(format!(
                "lead clips '{}' and '{}' must both have non-zero length",
                lead_intro.id, lead_loop.id
            )));
        }

        let baseline = baseline_volume.clamp(0.0, 1.0);
        let mut channels = Vec::with_capacity(intro_clips.len());

        for (index, (intro_clip, loop_clip)) in intro_clips.into_iter().zip(loop_clips).enumerate() {
            let mut output = backend.open_channel(index)?;
            output.set_clip(&intro_clip)?;
            output.set_volume(baseline);
            debug!(
                "Channel {} ready: intro='{}' ({:?}), loop='{}' ({:?})",
                index, intro_clip.id, intro_clip.duration, loop_clip.id, loop_clip.duration
            );

            channels.push(Channel {
                index,
                intro_clip,
                loop_clip,
                phase: LoopPhase::Intro,
                target_volume: baseline,
                current_volume: baseline,
                ramp_generation: 0,
                output,
            });
        }

        info!("Layer set initialized with {} channels", channels.len());

        Ok(Self {
            channels,
            victory_clip,
            lead_override: false,
        })
    }

    /// Number of channels (N)
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Always false: a layer set has at least the lead channel
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Full volume of one layer in the mix: 1/N
    pub fn layer_level(&self) -> f32 {
        1.0 / self.channels.len() as f32
    }

    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    /// Phase shared by all channels (taken from the lead)
    pub fn phase(&self) -> LoopPhase {
        self.channels[LEAD_CHANNEL].phase
    }

    pub fn is_lead_overridden(&self) -> bool {
        self.lead_override
    }

    /// Fail with `IndexOutOfRange` unless `index` names a channel
    pub fn check_index(&self, index: usize) -> Result<()> {
        if index < self.channels.len() {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                index,
                count: self.channels.len(),
            })
        }
    }

    /// Whether `index` is currently driven by ramps
    pub fn accepts_ramp(&self, index: usize) -> bool {
        !(self.lead_override && index == LEAD_CHANNEL)
    }

    /// Move every channel to its loop clip
    ///
    /// Must run between playback cycles; the scheduler calls it under its
    /// write lock so no ramp step interleaves with the swap.
    pub fn swap_to_loop_phase(&mut self) -> Result<()> {
        if self.phase() == LoopPhase::Loop {
            return Err(Error::InvalidState(
                "layers are already in the loop phase".to_string(),
            ));
        }

        for channel in &mut self.channels {
            if !(self.lead_override && channel.index == LEAD_CHANNEL) {
                channel.output.set_clip(&channel.loop_clip)?;
            }
            channel.phase = LoopPhase::Loop;
        }

        info!("All {} channels swapped to loop clips", self.channels.len());
        Ok(())
    }

    /// Start every channel's current clip from the top
    pub fn play_all(&mut self) -> Result<()> {
        for channel in &mut self.channels {
            if self.lead_override && channel.index == LEAD_CHANNEL {
                continue;
            }
            channel.output.play()?;
        }
        Ok(())
    }

    /// Duration of the lead channel's clip for the current phase
    pub fn lead_clip_duration(&self) -> Duration {
        self.channels[LEAD_CHANNEL].phase_clip().duration
    }

    /// Whether the lead channel still gates the loop
    ///
    /// Reports false once the victory override has taken the lead.
    pub fn lead_is_playing(&self) -> bool {
        !self.lead_override && self.channels[LEAD_CHANNEL].output.is_playing()
    }

    /// Clamp `value` into [0, 1] and apply it to the channel's live gain
    pub fn set_volume(&mut self, index: usize, value: f32) -> Result<f32> {
        self.check_index(index)?;
        let volume = value.clamp(0.0, 1.0);
        let channel = &mut self.channels[index];
        channel.output.set_volume(volume);
        channel.current_volume = volume;
        Ok(volume)
    }

    /// Record where a newly launched ramp is heading
    pub fn set_target_volume(&mut self, index: usize, value: f32) -> Result<()> {
        self.check_index(index)?;
        self.channels[index].target_volume = value.clamp(0.0, 1.0);
        Ok(())
    }

    /// Invalidate every earlier ramp claim on the channel and return the new one
    pub fn claim_ramps(&mut self, index: usize) -> Result<u64> {
        self.check_index(index)?;
        let channel = &mut self.channels[index];
        channel.ramp_generation += 1;
        Ok(channel.ramp_generation)
    }

    /// Latest ramp claim on the channel
    pub fn ramp_generation(&self, index: usize) -> Result<u64> {
        self.check_index(index)?;
        Ok(self.channels[index].ramp_generation)
    }

    pub fn volume(&self, index: usize) -> Result<f32> {
        self.check_index(index)?;
        Ok(self.channels[index].current_volume)
    }

    /// Put the victory clip on the lead channel at full volume, now
    pub fn trigger_victory_override(&mut self) -> Result<()> {
        let victory_clip = self.victory_clip.clone();
        let lead = &mut self.channels[LEAD_CHANNEL];

        lead.output.set_clip(&victory_clip)?;
        lead.output.set_volume(1.0);
        lead.current_volume = 1.0;
        lead.target_volume = 1.0;
        lead.output.play()?;
        self.lead_override = true;

        info!("Victory override engaged on lead channel ('{}')", victory_clip.id);
        Ok(())
    }

    /// Overlay a one-shot clip on the lead channel
    pub fn play_lead_one_shot(&mut self, clip: &Clip) -> Result<()> {
        self.channels[LEAD_CHANNEL].output.play_one_shot(clip)
    }

    pub fn snapshot(&self) -> Vec<ChannelSnapshot> {
        self.channels
            .iter()
            .map(|channel| {
                let overridden = self.lead_override && channel.index == LEAD_CHANNEL;
                let clip = if overridden {
                    self.victory_clip.id.clone()
                } else {
                    channel.phase_clip().id.clone()
                };
                ChannelSnapshot {
                    index: channel.index,
                    phase: channel.phase,
                    clip,
                    current_volume: channel.current_volume,
                    target_volume: channel.target_volume,
                    is_playing: channel.output.is_playing(),
                    overridden,
                    active_ramps: 0,
                }
            })
            .collect()
    }
}
