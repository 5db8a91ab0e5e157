use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub project_path: String,
    pub save_path: String,
    pub log_path: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub master_volume: f32,
    pub music_volume: f32,
    pub ambient_volume: f32,
    pub sound_volume: f32,
    /// Crossfade length used when a channel switches tracks.
    pub crossfade_sec: f32,
    pub sfx_pool_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Dialogue/choice history entries kept per session.
    pub history_limit: usize,
    pub default_transition: String,
    pub default_transition_ms: u64,
    /// Commands scanned ahead of the cursor for asset preloading.
    pub preload_ahead: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            project_path: "project/".into(),
            save_path: "saves/".into(),
            log_path: "logs/".into(),
            log_level: "info".into(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            music_volume: 0.7,
            ambient_volume: 0.6,
            sound_volume: 0.8,
            crossfade_sec: 0.8,
            sfx_pool_size: 8,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            history_limit: 200,
            default_transition: "dissolve".into(),
            default_transition_ms: 300,
            preload_ahead: 20,
        }
    }
}
