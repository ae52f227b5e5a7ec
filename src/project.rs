// Saved graphic-novel projects, kept as one JSON array in a key/value store.
// Page, character and image payloads are opaque to the library.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::book::Orientation;
use crate::error::StoryError;
use crate::store::{load_json, save_json, KeyValueStore};

pub const PROJECTS_STORAGE_KEY: &str = "graphic-novel-projects";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    pub gutter: f32,
    pub page_size: String,
    pub orientation: Orientation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    pub id: String,
    pub name: String,
    pub pages: Vec<Value>,
    pub characters: Vec<Value>,
    pub images: Vec<Value>,
    pub settings: ProjectSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u32,
}

/// The editor content being saved, without library bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    #[serde(default)]
    pub pages: Vec<Value>,
    #[serde(default)]
    pub characters: Vec<Value>,
    #[serde(default)]
    pub images: Vec<Value>,
    pub settings: ProjectSettings,
}

/// Shape accepted by `import`. Any id, timestamps or version in the file are replaced.
#[derive(Debug, Deserialize)]
struct ImportedProject {
    name: String,
    #[serde(flatten)]
    draft: ProjectDraft,
}

/// A project rendered for download.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectExport {
    pub filename: String,
    pub json: String,
}

/// `My Book!` becomes `My_Book_.json`.
pub fn export_filename(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{stem}.json")
}

pub struct ProjectLibrary<S: KeyValueStore> {
    store: S,
    projects: Vec<ProjectData>,
    next_seq: u64,
}

impl<S: KeyValueStore> ProjectLibrary<S> {
    /// Open the library. Unreadable stored data is logged and treated as empty.
    pub fn load(store: S) -> Self {
        let projects = match load_json::<Vec<ProjectData>, _>(&store, PROJECTS_STORAGE_KEY) {
            Ok(projects) => projects.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "failed to load projects");
                Vec::new()
            }
        };
        let next_seq = projects.len() as u64;
        ProjectLibrary {
            store,
            projects,
            next_seq,
        }
    }

    pub fn list(&self) -> &[ProjectData] {
        &self.projects
    }

    pub fn get(&self, id: &str) -> Option<&ProjectData> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Save the draft under `name`. An existing project with the same name is
    /// updated in place unless `save_as` is set.
    pub fn save(
        &mut self,
        name: &str,
        draft: ProjectDraft,
        save_as: bool,
        now: DateTime<Utc>,
    ) -> Result<ProjectData, StoryError> {
        if name.trim().is_empty() {
            return Err(StoryError::EmptyProjectName);
        }

        let existing = if save_as {
            None
        } else {
            self.projects.iter().position(|p| p.name == name)
        };

        let saved = match existing {
            Some(index) => {
                let project = &mut self.projects[index];
                project.pages = draft.pages;
                project.characters = draft.characters;
                project.images = draft.images;
                project.settings = draft.settings;
                project.updated_at = now;
                project.version += 1;
                debug!(id = %project.id, version = project.version, "project updated");
                project.clone()
            }
            None => {
                let project = self.create(name.to_string(), draft, now);
                debug!(id = %project.id, "project created");
                project
            }
        };
        self.persist()?;
        Ok(saved)
    }

    pub fn duplicate(&mut self, id: &str, now: DateTime<Utc>) -> Result<ProjectData, StoryError> {
        let source = self
            .get(id)
            .cloned()
            .ok_or_else(|| StoryError::ProjectNotFound(id.to_string()))?;
        let draft = ProjectDraft {
            pages: source.pages,
            characters: source.characters,
            images: source.images,
            settings: source.settings,
        };
        let copy = self.create(format!("{} (Copy)", source.name), draft, now);
        self.persist()?;
        Ok(copy)
    }

    pub fn delete(&mut self, id: &str) -> Result<(), StoryError> {
        let before = self.projects.len();
        self.projects.retain(|p| p.id != id);
        if self.projects.len() == before {
            return Err(StoryError::ProjectNotFound(id.to_string()));
        }
        self.persist()
    }

    pub fn export(&self, id: &str) -> Result<ProjectExport, StoryError> {
        let project = self
            .get(id)
            .ok_or_else(|| StoryError::ProjectNotFound(id.to_string()))?;
        Ok(ProjectExport {
            filename: export_filename(&project.name),
            json: serde_json::to_string_pretty(project)?,
        })
    }

    /// Add a project from an exported file as a brand new entry.
    pub fn import(&mut self, json: &str, now: DateTime<Utc>) -> Result<ProjectData, StoryError> {
        let imported: ImportedProject = serde_json::from_str(json)
            .map_err(|e| StoryError::InvalidConfig(format!("invalid project file: {e}")))?;
        let project = self.create(imported.name, imported.draft, now);
        self.persist()?;
        Ok(project)
    }

    fn create(&mut self, name: String, draft: ProjectDraft, now: DateTime<Utc>) -> ProjectData {
        let project = ProjectData {
            id: self.generate_id(now),
            name,
            pages: draft.pages,
            characters: draft.characters,
            images: draft.images,
            settings: draft.settings,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        self.projects.push(project.clone());
        project
    }

    fn generate_id(&mut self, now: DateTime<Utc>) -> String {
        loop {
            let id = format!("project_{}_{}", now.timestamp_millis(), self.next_seq);
            self.next_seq += 1;
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    fn persist(&mut self) -> Result<(), StoryError> {
        save_json(&mut self.store, PROJECTS_STORAGE_KEY, &self.projects)
    }
}
