//! Project manager: loads, merges and indexes the editor's JSON
//! documents for a playable run.
//!
//! A project on disk is either a single `project.json` carrying its
//! scenes inline, or `project.json` plus any number of `*.scene.json`
//! files merged in path order. Structural lint findings are warnings;
//! duplicate scene ids abort the load because every navigation target
//! would be ambiguous.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use walkdir::WalkDir;

use fabula_doc::{Project, Scene, lint_project};

pub struct ProjectManager {
    project: Arc<Project>,
    pub source_cache: HashMap<String, String>,
}

impl ProjectManager {
    pub fn new() -> Self {
        Self {
            project: Arc::new(Project::default()),
            source_cache: HashMap::new(),
        }
    }

    pub fn project(&self) -> Arc<Project> {
        self.project.clone()
    }

    /// Load from a directory (or a bare `project.json` path).
    pub fn load(&mut self, root: impl AsRef<Path>) -> Result<()> {
        let root = root.as_ref();

        let mut project = if root.is_file() {
            self.read_project_file(root)?
        } else {
            info!("Scanning project at: {:?}", root);
            let manifest = root.join("project.json");
            let mut project = self.read_project_file(&manifest)?;

            let mut scene_files = Vec::new();
            for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
                let path = entry.path();
                if path.is_file()
                    && path
                        .file_name()
                        .is_some_and(|n| n.to_string_lossy().ends_with(".scene.json"))
                {
                    scene_files.push(path.to_path_buf());
                }
            }
            scene_files.sort();
            for path in scene_files {
                let scene = self.read_scene_file(&path)?;
                project.scenes.push(scene);
            }
            project
        };

        self.check_scene_collisions(&project)?;

        for issue in lint_project(&project) {
            match &issue.scene_id {
                Some(scene) => log::warn!("lint [{}]: {}", scene, issue.message),
                None => log::warn!("lint: {}", issue.message),
            }
        }

        if project.start_scene_id.is_none() {
            if let Some(first) = project.scenes.first() {
                log::info!("no start scene designated, using '{}'", first.id);
                project.start_scene_id = Some(first.id.clone());
            }
        }

        info!(
            "Project '{}' loaded. Scenes: {}, variables: {}, assets: {}",
            project.id,
            project.scenes.len(),
            project.variables.len(),
            project.assets.len()
        );

        self.project = Arc::new(project);
        Ok(())
    }

    fn read_project_file(&mut self, path: &Path) -> Result<Project> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read project document: {:?}", path))?;
        let project: Project = serde_json::from_str(&content)
            .with_context(|| format!("Malformed project document: {:?}", path))?;
        self.source_cache
            .insert(path.to_string_lossy().to_string(), content);
        Ok(project)
    }

    fn read_scene_file(&mut self, path: &Path) -> Result<Scene> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene document: {:?}", path))?;
        let scene: Scene = serde_json::from_str(&content)
            .with_context(|| format!("Malformed scene document: {:?}", path))?;
        self.source_cache
            .insert(path.to_string_lossy().to_string(), content);
        Ok(scene)
    }

    fn check_scene_collisions(&self, project: &Project) -> Result<()> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (idx, scene) in project.scenes.iter().enumerate() {
            if let Some(first) = seen.insert(scene.id.as_str(), idx) {
                anyhow::bail!(
                    "Scene collision detected!\n  Scene '{}' is declared at positions {} and {}",
                    scene.id,
                    first,
                    idx
                );
            }
        }
        Ok(())
    }
}

impl Default for ProjectManager {
    fn default() -> Self {
        Self::new()
    }
}
