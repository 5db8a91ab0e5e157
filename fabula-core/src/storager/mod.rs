//! Save slot codec.
//!
//! Slots are keyed by project id plus slot number; payloads are the
//! JSON-serializable session subset, so a save written today still
//! deserializes after the document model grows fields.
//! The persistence backend is pluggable, and a failed write flips the
//! store onto an in-memory table for the rest of the session: the user
//! keeps saving, the saves just may not survive a restart. An absent
//! slot is a normal empty state, not an error.

pub mod types;

use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;

use crate::config::SystemConfig;
use crate::runtime::ctx::Ctx;
use crate::storager::types::{FrameSnapshot, GlobalSave, SaveFile, SlotMeta};

pub trait SlotBackend {
    fn read(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn write(&mut self, key: &str, bytes: &[u8]) -> anyhow::Result<()>;
}

pub struct FsBackend {
    dir: PathBuf,
}

impl FsBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl SlotBackend for FsBackend {
    fn read(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read(&path)
            .map(Some)
            .with_context(|| format!("Failed to read save {:?}", path))
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create save dir {:?}", self.dir))?;
        let path = self.path(key);
        fs::write(&path, bytes).with_context(|| format!("Failed to write save {:?}", path))
    }
}

#[derive(Default)]
pub struct MemBackend {
    map: HashMap<String, Vec<u8>>,
}

impl SlotBackend for MemBackend {
    fn read(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.map.get(key).cloned())
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> anyhow::Result<()> {
        self.map.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

pub struct SlotStore {
    project_id: String,
    backend: Box<dyn SlotBackend>,
    /// Engaged after the first failed write; shadows the backend from
    /// then on.
    fallback: Option<MemBackend>,
}

impl SlotStore {
    /// Filesystem store under the configured save path.
    pub fn open(project_id: impl Into<String>) -> Self {
        let cfg: SystemConfig = fabula_shared::config::get("system");
        Self::with_backend(project_id, Box::new(FsBackend::new(cfg.save_path)))
    }

    pub fn with_backend(project_id: impl Into<String>, backend: Box<dyn SlotBackend>) -> Self {
        Self {
            project_id: project_id.into(),
            backend,
            fallback: None,
        }
    }

    fn key(&self, slot: u32) -> String {
        format!("{}_slot{}.sav", self.project_id, slot)
    }

    pub fn in_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Persist a session snapshot. Never fails the caller: a backend
    /// error degrades to the in-memory table.
    pub fn save(
        &mut self,
        slot: u32,
        ctx: &Ctx,
        stack: Vec<FrameSnapshot>,
        scene_name: String,
    ) -> SlotMeta {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let save = SaveFile {
            timestamp_ms,
            scene_name: scene_name.clone(),
            ctx: ctx.clone(),
            stack,
        };
        let bytes = serde_json::to_vec(&save).expect("session snapshot must serialize");

        let key = self.key(slot);
        if let Some(fallback) = &mut self.fallback {
            let _ = fallback.write(&key, &bytes);
        } else if let Err(e) = self.backend.write(&key, &bytes) {
            log::error!(
                "save slot {} write failed ({}), switching to in-memory slots",
                slot,
                e
            );
            let mut fallback = MemBackend::default();
            let _ = fallback.write(&key, &bytes);
            self.fallback = Some(fallback);
        }

        SlotMeta {
            slot,
            timestamp_ms,
            scene_name,
        }
    }

    /// `Ok(None)` when the slot has never been written.
    pub fn load(&self, slot: u32) -> anyhow::Result<Option<(Ctx, Vec<FrameSnapshot>)>> {
        let Some(save) = self.read_slot(slot)? else {
            return Ok(None);
        };
        Ok(Some((save.ctx, save.stack)))
    }

    pub fn slot_meta(&self, slot: u32) -> Option<SlotMeta> {
        let save = self.read_slot(slot).ok().flatten()?;
        Some(SlotMeta {
            slot,
            timestamp_ms: save.timestamp_ms,
            scene_name: save.scene_name,
        })
    }

    /// Metadata for the load menu; empty slots come back as `None`.
    pub fn slots(&self, max_slot: u32) -> Vec<Option<SlotMeta>> {
        (1..=max_slot).map(|s| self.slot_meta(s)).collect()
    }

    fn read_slot(&self, slot: u32) -> anyhow::Result<Option<SaveFile>> {
        let key = self.key(slot);
        let bytes = match &self.fallback {
            Some(fallback) => match fallback.read(&key)? {
                Some(bytes) => Some(bytes),
                None => self.backend.read(&key)?,
            },
            None => self.backend.read(&key)?,
        };
        let Some(bytes) = bytes else {
            return Ok(None);
        };
        let save: SaveFile = serde_json::from_slice(&bytes)
            .with_context(|| format!("Corrupt save in slot {}", slot))?;
        Ok(Some(save))
    }
}

fn get_save_path(filename: &str) -> PathBuf {
    let cfg: SystemConfig = fabula_shared::config::get("system");
    let dir = Path::new(&cfg.save_path);

    if !dir.exists() {
        let _ = fs::create_dir_all(dir);
    }

    dir.join(filename)
}

/// Player-wide settings (volumes, text speed) persist as JSON beside
/// the slots.
pub fn save_global(filename: &str, settings: &serde_json::Value) -> anyhow::Result<()> {
    let full_path = get_save_path(filename);
    let file = File::create(full_path)?;
    let mut writer = BufWriter::new(file);

    let save = GlobalSave {
        settings: settings.clone(),
    };

    serde_json::to_writer_pretty(&mut writer, &save)?;
    writer.flush()?;

    Ok(())
}

pub fn load_global(filename: &str) -> anyhow::Result<serde_json::Value> {
    let full_path = get_save_path(filename);

    if !full_path.exists() {
        return Ok(serde_json::Value::Null);
    }

    let file = File::open(full_path)?;
    let reader = BufReader::new(file);

    let save: GlobalSave = serde_json::from_reader(reader)?;
    Ok(save.settings)
}
