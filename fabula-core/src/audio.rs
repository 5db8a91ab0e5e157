//! Logical audio channel manager.
//!
//! Owns the music and ambient singleton channels plus a bounded
//! sound-effect pool. Switching tracks fades the outgoing source to
//! silence and ramps the incoming one from zero; the incoming ramp is a
//! linear curve sampled by `tick` into `SetVolume` events, the outgoing
//! fade rides on the `StopAudio` event's fade length. This module never
//! touches a device; decode/permission failures belong to the adapter
//! and are non-fatal. The only failure visible here is an unresolvable
//! asset id, which logs and drops the request.

use std::collections::VecDeque;

use fabula_doc::AssetKind;

use crate::config::AudioConfig;
use crate::event::OutputEvent;
use crate::runtime::assets::AssetSource;
use crate::runtime::patch::MusicPatch;
use crate::runtime::stage::ChannelState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelId {
    Music,
    Ambient,
}

impl ChannelId {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelId::Music => "music",
            ChannelId::Ambient => "ambient",
        }
    }
}

#[derive(Debug, Clone)]
struct Ramp {
    from: f32,
    to: f32,
    elapsed_ms: u64,
    duration_ms: u64,
}

impl Ramp {
    fn level(&self) -> f32 {
        if self.duration_ms == 0 {
            return self.to;
        }
        let t = (self.elapsed_ms as f32 / self.duration_ms as f32).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }

    fn done(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }
}

#[derive(Debug, Clone)]
struct Playing {
    asset_id: String,
    looping: bool,
    target_volume: f32,
    ramp: Option<Ramp>,
    position_ms: u64,
    paused: bool,
}

#[derive(Debug, Default)]
struct Channel {
    current: Option<Playing>,
    /// Detached source still fading out; kept so a restart mid-fade
    /// stays well-defined.
    outgoing: Option<Ramp>,
}

#[derive(Debug, Clone)]
struct SfxInstance {
    key: String,
}

pub struct AudioDirector {
    music: Channel,
    ambient: Channel,
    sfx: VecDeque<SfxInstance>,
    sfx_seq: u64,
    cfg: AudioConfig,
}

impl AudioDirector {
    pub fn new(cfg: AudioConfig) -> Self {
        Self {
            music: Channel::default(),
            ambient: Channel::default(),
            sfx: VecDeque::new(),
            sfx_seq: 0,
            cfg,
        }
    }

    fn channel_mut(&mut self, id: ChannelId) -> &mut Channel {
        match id {
            ChannelId::Music => &mut self.music,
            ChannelId::Ambient => &mut self.ambient,
        }
    }

    fn default_volume(&self, id: ChannelId) -> f32 {
        match id {
            ChannelId::Music => self.cfg.music_volume,
            ChannelId::Ambient => self.cfg.ambient_volume,
        }
    }

    fn default_fade_ms(&self) -> u64 {
        (self.cfg.crossfade_sec * 1000.0) as u64
    }

    /// Start (or switch to) a track on a singleton channel. Returns the
    /// declarative channel state for the session patch.
    pub fn play(
        &mut self,
        assets: &dyn AssetSource,
        id: ChannelId,
        asset_id: &str,
        looping: bool,
        volume: Option<f32>,
        fade_ms: Option<u64>,
        events: &mut Vec<OutputEvent>,
    ) -> ChannelState {
        let target_volume = volume.unwrap_or(self.default_volume(id));
        let fade_ms = fade_ms.unwrap_or(self.default_fade_ms());

        let Some(url) = assets.resolve(asset_id, AssetKind::Audio) else {
            log::warn!(
                "audio asset '{}' not found, ignoring play on {}",
                asset_id,
                id.name()
            );
            return self.state_of(id);
        };

        let channel = self.channel_mut(id);

        // Re-requesting the playing, unpaused track: bookkeeping only.
        if let Some(current) = &mut channel.current {
            if current.asset_id == asset_id && !current.paused {
                current.looping = looping;
                if (current.target_volume - target_volume).abs() > f32::EPSILON {
                    let level = current
                        .ramp
                        .as_ref()
                        .map(Ramp::level)
                        .unwrap_or(current.target_volume);
                    current.target_volume = target_volume;
                    current.ramp = Some(Ramp {
                        from: level,
                        to: target_volume,
                        elapsed_ms: 0,
                        duration_ms: fade_ms,
                    });
                }
                return self.state_of(id);
            }
        }

        if let Some(prev) = channel.current.take() {
            let level = prev
                .ramp
                .as_ref()
                .map(Ramp::level)
                .unwrap_or(prev.target_volume);
            events.push(OutputEvent::StopAudio {
                channel: id.name().to_string(),
                fade_sec: fade_ms as f32 / 1000.0,
            });
            channel.outgoing = Some(Ramp {
                from: level,
                to: 0.0,
                elapsed_ms: 0,
                duration_ms: fade_ms,
            });
        }

        channel.current = Some(Playing {
            asset_id: asset_id.to_string(),
            looping,
            target_volume,
            ramp: (fade_ms > 0).then_some(Ramp {
                from: 0.0,
                to: target_volume,
                elapsed_ms: 0,
                duration_ms: fade_ms,
            }),
            position_ms: 0,
            paused: false,
        });

        events.push(OutputEvent::PlayAudio {
            channel: id.name().to_string(),
            url,
            volume: if fade_ms > 0 { 0.0 } else { target_volume },
            fade_sec: 0.0,
            looping,
        });

        self.state_of(id)
    }

    pub fn stop(
        &mut self,
        id: ChannelId,
        fade_ms: Option<u64>,
        events: &mut Vec<OutputEvent>,
    ) -> ChannelState {
        let fade_ms = fade_ms.unwrap_or(self.default_fade_ms());
        let channel = self.channel_mut(id);

        if let Some(prev) = channel.current.take() {
            let level = prev
                .ramp
                .as_ref()
                .map(Ramp::level)
                .unwrap_or(prev.target_volume);
            events.push(OutputEvent::StopAudio {
                channel: id.name().to_string(),
                fade_sec: fade_ms as f32 / 1000.0,
            });
            channel.outgoing = Some(Ramp {
                from: level,
                to: 0.0,
                elapsed_ms: 0,
                duration_ms: fade_ms,
            });
        }

        self.state_of(id)
    }

    /// Fire-and-forget sound effect. Past capacity, the oldest instance
    /// is stopped and discarded before the new one is admitted.
    pub fn play_sfx(
        &mut self,
        assets: &dyn AssetSource,
        asset_id: &str,
        volume: Option<f32>,
        events: &mut Vec<OutputEvent>,
    ) {
        let Some(url) = assets.resolve(asset_id, AssetKind::Audio) else {
            log::warn!("sound effect '{}' not found, ignoring", asset_id);
            return;
        };

        while self.sfx.len() >= self.cfg.sfx_pool_size.max(1) {
            if let Some(oldest) = self.sfx.pop_front() {
                log::debug!("sfx pool full, evicting {}", oldest.key);
                events.push(OutputEvent::StopAudio {
                    channel: oldest.key,
                    fade_sec: 0.0,
                });
            }
        }

        self.sfx_seq += 1;
        let key = format!("sfx#{}", self.sfx_seq);
        events.push(OutputEvent::PlayAudio {
            channel: key.clone(),
            url,
            volume: volume.unwrap_or(self.cfg.sound_volume),
            fade_sec: 0.0,
            looping: false,
        });
        self.sfx.push_back(SfxInstance { key });
    }

    /// The adapter reports a finished fire-and-forget instance so its
    /// pool slot frees up early.
    pub fn sfx_finished(&mut self, key: &str) {
        self.sfx.retain(|s| s.key != key);
    }

    pub fn pause(&mut self, id: ChannelId) {
        if let Some(current) = &mut self.channel_mut(id).current {
            current.paused = true;
        }
    }

    pub fn resume(&mut self, id: ChannelId) {
        if let Some(current) = &mut self.channel_mut(id).current {
            current.paused = false;
        }
    }

    pub fn active_sfx(&self) -> usize {
        self.sfx.len()
    }

    pub fn is_fading(&self, id: ChannelId) -> bool {
        let channel = match id {
            ChannelId::Music => &self.music,
            ChannelId::Ambient => &self.ambient,
        };
        channel.outgoing.is_some()
            || channel
                .current
                .as_ref()
                .is_some_and(|c| c.ramp.is_some())
    }

    pub fn state_of(&self, id: ChannelId) -> ChannelState {
        let channel = match id {
            ChannelId::Music => &self.music,
            ChannelId::Ambient => &self.ambient,
        };
        match &channel.current {
            Some(p) => ChannelState {
                asset_id: Some(p.asset_id.clone()),
                looping: p.looping,
                volume: p.target_volume,
                position_ms: p.position_ms,
            },
            None => ChannelState::default(),
        }
    }

    /// Session end or full reset: silence everything immediately.
    pub fn stop_all(&mut self, events: &mut Vec<OutputEvent>) {
        for id in [ChannelId::Music, ChannelId::Ambient] {
            let channel = self.channel_mut(id);
            channel.outgoing = None;
            if channel.current.take().is_some() {
                events.push(OutputEvent::StopAudio {
                    channel: id.name().to_string(),
                    fade_sec: 0.0,
                });
            }
        }
        for sfx in self.sfx.drain(..) {
            events.push(OutputEvent::StopAudio {
                channel: sfx.key,
                fade_sec: 0.0,
            });
        }
    }

    /// Rebuild channels from a loaded session, resuming at the saved
    /// position.
    pub fn restore(
        &mut self,
        assets: &dyn AssetSource,
        music: &ChannelState,
        ambient: &ChannelState,
        events: &mut Vec<OutputEvent>,
    ) {
        self.stop_all(events);
        for (id, state) in [(ChannelId::Music, music), (ChannelId::Ambient, ambient)] {
            let Some(asset_id) = &state.asset_id else {
                continue;
            };
            let Some(url) = assets.resolve(asset_id, AssetKind::Audio) else {
                log::warn!("saved track '{}' no longer resolves", asset_id);
                continue;
            };
            self.channel_mut(id).current = Some(Playing {
                asset_id: asset_id.clone(),
                looping: state.looping,
                target_volume: state.volume,
                ramp: None,
                position_ms: state.position_ms,
                paused: false,
            });
            events.push(OutputEvent::PlayAudio {
                channel: id.name().to_string(),
                url,
                volume: state.volume,
                fade_sec: 0.0,
                looping: state.looping,
            });
        }
    }

    /// Sample ramps and advance playback positions. Returns the position
    /// refresh for the session patch when a position moved.
    pub fn tick(&mut self, dt_ms: u64, events: &mut Vec<OutputEvent>) -> Option<MusicPatch> {
        let mut patch = MusicPatch::default();
        let mut moved = false;

        for id in [ChannelId::Music, ChannelId::Ambient] {
            let channel = self.channel_mut(id);

            if let Some(current) = &mut channel.current {
                if !current.paused {
                    current.position_ms += dt_ms;
                    moved = true;
                }
                if let Some(ramp) = &mut current.ramp {
                    ramp.elapsed_ms += dt_ms;
                    events.push(OutputEvent::SetVolume {
                        channel: id.name().to_string(),
                        value: ramp.level(),
                    });
                    if ramp.done() {
                        current.ramp = None;
                    }
                }
            }

            if let Some(outgoing) = &mut channel.outgoing {
                outgoing.elapsed_ms += dt_ms;
                if outgoing.done() {
                    channel.outgoing = None;
                }
            }

            let position = channel.current.as_ref().map(|c| c.position_ms);
            match id {
                ChannelId::Music => patch.music_position_ms = position,
                ChannelId::Ambient => patch.ambient_position_ms = position,
            }
        }

        moved.then_some(patch)
    }
}
