//! In-process audio backend without a sound device
//!
//! Channels report `is_playing` from the session clock and the clip
//! duration found in the catalog, and every command is appended to a shared
//! call log. The console binary runs on it, and the tests read the call log
//! to check what the engine asked of the backend and when.

use super::{AudioBackend, AudioChannel, Clip};
use crate::error::{Error, Result};
use jukebox_common::SessionClock;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Command received by a simulated channel
#[derive(Debug, Clone, PartialEq)]
pub enum CallKind {
    SetClip(String),
    Play(String),
    SetVolume(f32),
    OneShot(String),
}

/// Entry in the simulated backend's call log
#[derive(Debug, Clone, PartialEq)]
pub struct BackendCall {
    pub channel: usize,
    pub session_ms: u64,
    pub kind: CallKind,
}

type CallLog = Arc<Mutex<Vec<BackendCall>>>;

fn lock_log(log: &CallLog) -> MutexGuard<'_, Vec<BackendCall>> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Backend whose channels play silently against the session clock
#[derive(Clone)]
pub struct SimulatedBackend {
    catalog: BTreeMap<String, Duration>,
    clock: SessionClock,
    calls: CallLog,
    release_lag: Duration,
    max_channels: Option<usize>,
}

impl SimulatedBackend {
    pub fn new(catalog: BTreeMap<String, Duration>, clock: SessionClock) -> Self {
        Self {
            catalog,
            clock,
            calls: Arc::new(Mutex::new(Vec::new())),
            release_lag: Duration::ZERO,
            max_channels: None,
        }
    }

    /// Keep channels reporting "playing" for `lag` past the clip's end
    pub fn with_release_lag(mut self, lag: Duration) -> Self {
        self.release_lag = lag;
        self
    }

    /// Refuse to open more than `max` channels
    pub fn with_max_channels(mut self, max: usize) -> Self {
        self.max_channels = Some(max);
        self
    }

    /// Snapshot of every command received so far
    pub fn calls(&self) -> Vec<BackendCall> {
        lock_log(&self.calls).clone()
    }

    /// Session times (ms) and clip ids of every `play` on one channel
    pub fn plays_on(&self, channel: usize) -> Vec<(u64, String)> {
        lock_log(&self.calls)
            .iter()
            .filter(|call| call.channel == channel)
            .filter_map(|call| match &call.kind {
                CallKind::Play(clip) => Some((call.session_ms, clip.clone())),
                _ => None,
            })
            .collect()
    }

    /// Every volume written to one channel, in order
    pub fn volumes_on(&self, channel: usize) -> Vec<f32> {
        lock_log(&self.calls)
            .iter()
            .filter(|call| call.channel == channel)
            .filter_map(|call| match call.kind {
                CallKind::SetVolume(volume) => Some(volume),
                _ => None,
            })
            .collect()
    }

    pub fn clock(&self) -> SessionClock {
        self.clock
    }
}

impl AudioBackend for SimulatedBackend {
    fn load_clip(&self, id: &str) -> Result<Clip> {
        self.catalog
            .get(id)
            .map(|duration| Clip::new(id, *duration))
            .ok_or_else(|| Error::Backend(format!("clip '{}' not found in catalog", id)))
    }

    fn open_channel(&self, index: usize) -> Result<Box<dyn AudioChannel>> {
        if let Some(max) = self.max_channels {
            if index >= max {
                return Err(Error::Backend(format!(
                    "no free voice for channel {} (limit {})",
                    index, max
                )));
            }
        }

        Ok(Box::new(SimulatedChannel {
            index,
            clip: None,
            started_at: None,
            release_lag: self.release_lag,
            clock: self.clock,
            calls: Arc::clone(&self.calls),
        }))
    }
}

struct SimulatedChannel {
    index: usize,
    clip: Option<Clip>,
    started_at: Option<Instant>,
    release_lag: Duration,
    clock: SessionClock,
    calls: CallLog,
}

impl SimulatedChannel {
    fn record(&self, kind: CallKind) {
        trace!("sim channel {}: {:?}", self.index, kind);
        lock_log(&self.calls).push(BackendCall {
            channel: self.index,
            session_ms: self.clock.elapsed_ms(),
            kind,
        });
    }
}

impl AudioChannel for SimulatedChannel {
    fn play(&mut self) -> Result<()> {
        let clip_id = match &self.clip {
            Some(clip) => clip.id.clone(),
            None => {
                return Err(Error::Backend(format!(
                    "channel {} has no clip assigned",
                    self.index
                )))
            }
        };
        self.started_at = Some(Instant::now());
        self.record(CallKind::Play(clip_id));
        Ok(())
    }

    fn is_playing(&self) -> bool {
        match (&self.clip, self.started_at) {
            (Some(clip), Some(started)) => started.elapsed() < clip.duration + self.release_lag,
            _ => false,
        }
    }

    fn set_clip(&mut self, clip: &Clip) -> Result<()> {
        // Assigning a clip stops whatever was playing
        self.clip = Some(clip.clone());
        self.started_at = None;
        self.record(CallKind::SetClip(clip.id.clone()));
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.record(CallKind::SetVolume(volume));
    }

    fn play_one_shot(&mut self, clip: &Clip) -> Result<()> {
        self.record(CallKind::OneShot(clip.id.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SimulatedBackend {
        let mut catalog = BTreeMap::new();
        catalog.insert("intro".to_string(), Duration::from_secs(2));
        catalog.insert("sting".to_string(), Duration::from_millis(300));
        SimulatedBackend::new(catalog, SessionClock::start())
    }

    #[test]
    fn test_unknown_clip_is_backend_error() {
        let result = backend().load_clip("missing");
        assert!(matches!(result, Err(Error::Backend(_))));
    }

    #[test]
    fn test_play_without_clip_fails() {
        let mut channel = backend().open_channel(0).unwrap();
        assert!(channel.play().is_err());
        assert!(!channel.is_playing());
    }

    #[test]
    fn test_channel_limit() {
        let backend = backend().with_max_channels(2);
        assert!(backend.open_channel(1).is_ok());
        assert!(matches!(backend.open_channel(2), Err(Error::Backend(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_playing_follows_clip_duration() {
        let backend = backend();
        let clip = backend.load_clip("intro").unwrap();
        let mut channel = backend.open_channel(0).unwrap();

        channel.set_clip(&clip).unwrap();
        channel.play().unwrap();
        assert!(channel.is_playing());

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert!(channel.is_playing());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!channel.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_lag_extends_playing_state() {
        let backend = backend().with_release_lag(Duration::from_millis(50));
        let clip = backend.load_clip("intro").unwrap();
        let mut channel = backend.open_channel(0).unwrap();

        channel.set_clip(&clip).unwrap();
        channel.play().unwrap();
        tokio::time::sleep(Duration::from_millis(2040)).await;
        assert!(channel.is_playing());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!channel.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_log_records_commands() {
        let backend = backend();
        let intro = backend.load_clip("intro").unwrap();
        let sting = backend.load_clip("sting").unwrap();
        let mut channel = backend.open_channel(3).unwrap();

        channel.set_clip(&intro).unwrap();
        channel.set_volume(0.25);
        tokio::time::sleep(Duration::from_millis(100)).await;
        channel.play().unwrap();
        channel.play_one_shot(&sting).unwrap();

        assert_eq!(backend.plays_on(3), vec![(100, "intro".to_string())]);
        assert_eq!(backend.volumes_on(3), vec![0.25]);
        let calls = backend.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[3].kind, CallKind::OneShot("sting".to_string()));
    }
}
