use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use crate::error::{MirrorError, Result};
use crate::file_manager::FileManager;

const PROJECTS_DIR: &str = "projects";
const REGISTRY_FILE: &str = "projects.json";
const LINKS_FILE: &str = "links.json";

/// A named mirroring job: an ordered URL list plus rewrite options.
#[derive(Debug, Clone)]
pub struct Project {
    name: String,
    urls: Vec<String>,
    replace_links: bool,
    replace_forms: bool,
    created_at: DateTime<Utc>,
    files: FileManager,
}

impl Project {
    /// Creates `<root>/projects/<name>` and its kind directories.
    pub fn new(root: &Path, name: &str) -> Result<Self> {
        validate_name(name)?;
        let base_dir = root.join(PROJECTS_DIR).join(name);
        let files = FileManager::new(&base_dir)?;

        Ok(Self {
            name: name.to_string(),
            urls: Vec::new(),
            replace_links: false,
            replace_forms: false,
            created_at: Utc::now(),
            files,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn set_urls(&mut self, urls: Vec<String>) {
        self.urls = urls;
    }

    pub fn add_url(&mut self, url: impl Into<String>) {
        self.urls.push(url.into());
    }

    pub fn replace_links(&self) -> bool {
        self.replace_links
    }

    pub fn set_replace_links(&mut self, value: bool) {
        self.replace_links = value;
    }

    pub fn replace_forms(&self) -> bool {
        self.replace_forms
    }

    pub fn set_replace_forms(&mut self, value: bool) {
        self.replace_forms = value;
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn base_dir(&self) -> &Path {
        self.files.base_dir()
    }

    pub fn files(&self) -> &FileManager {
        &self.files
    }

    /// Writes the auxiliary `links.json` inside the project directory.
    pub fn save_links(&self) -> Result<()> {
        let path = self.base_dir().join(LINKS_FILE);
        let json = serde_json::to_string_pretty(&LinksFile {
            urls: self.urls.clone(),
        })?;
        fs::write(&path, json).map_err(|e| MirrorError::io(&path, e))
    }
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\']);
    if invalid {
        return Err(MirrorError::InvalidProjectName(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
struct LinksFile {
    urls: Vec<String>,
}

/// Serialized form of a project inside the registry file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub replace_links: bool,
    // Older registries predate form rewriting.
    #[serde(default)]
    pub replace_forms: bool,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub base_dir: PathBuf,
}

pub type Registry = BTreeMap<String, ProjectRecord>;

/// Persists projects to `<root>/projects/projects.json`.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join(PROJECTS_DIR).join(REGISTRY_FILE)
    }

    pub fn create(&self, name: &str) -> Result<Project> {
        Project::new(&self.root, name)
    }

    /// Replaces the project's whole record and stamps it with the current time.
    pub fn save(&self, project: &mut Project) -> Result<()> {
        project.created_at = Utc::now();

        let mut registry = self.list();
        registry.insert(
            project.name.clone(),
            ProjectRecord {
                urls: project.urls.clone(),
                replace_links: project.replace_links,
                replace_forms: project.replace_forms,
                timestamp: project.created_at.to_rfc3339(),
                base_dir: project.base_dir().to_path_buf(),
            },
        );

        let path = self.registry_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| MirrorError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(&registry)?;
        fs::write(&path, json).map_err(|e| MirrorError::io(&path, e))?;

        log::debug!("saved project {} to {:?}", project.name, path);
        Ok(())
    }

    /// Returns `Ok(None)` for unknown names and for records stored under a
    /// name that isn't a valid project name. Errors only come from
    /// recreating the project directories.
    pub fn load(&self, name: &str) -> Result<Option<Project>> {
        let Some(record) = self.list().remove(name) else {
            return Ok(None);
        };
        if let Err(e) = validate_name(name) {
            log::warn!("ignoring registry record {:?}: {}", name, e);
            return Ok(None);
        }

        let mut project = Project::new(&self.root, name)?;
        project.urls = record.urls;
        project.replace_links = record.replace_links;
        project.replace_forms = record.replace_forms;
        if let Some(created_at) = parse_timestamp(&record.timestamp) {
            project.created_at = created_at;
        }
        Ok(Some(project))
    }

    /// A missing, unreadable or malformed registry reads as empty.
    pub fn list(&self) -> Registry {
        let path = self.registry_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => return Registry::new(),
        };

        match serde_json::from_str(&content) {
            Ok(registry) => registry,
            Err(e) => {
                log::warn!("ignoring malformed registry {:?}: {}", path, e);
                Registry::new()
            }
        }
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn active_projects() -> &'static Mutex<HashSet<String>> {
    static ACTIVE: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    ACTIVE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Process-wide claim on a project name, released on drop.
#[derive(Debug)]
pub struct ProjectLock {
    name: String,
}

impl ProjectLock {
    pub fn acquire(name: &str) -> Result<Self> {
        let mut active = active_projects()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !active.insert(name.to_string()) {
            return Err(MirrorError::ProjectBusy(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        let mut active = active_projects()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        active.remove(&self.name);
    }
}
