//! External collaborators: template storage, image storage, share links
//!
//! Each is a trait so the server can run against other backends; the local
//! implementations keep everything under the data directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Unsupported image type: {0}")]
    UnsupportedImage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Stored alongside each template's HTML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMeta {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Size of the stored document in bytes
    pub size: usize,
}

pub trait TemplateStore: Send + Sync {
    /// Persist `html`; returns the new template's metadata
    fn save(&self, html: &str, name: &str) -> StoreResult<TemplateMeta>;

    fn load(&self, id: &str) -> StoreResult<String>;

    /// Most recently updated first
    fn list(&self) -> StoreResult<Vec<TemplateMeta>>;
}

pub trait ImageStore: Send + Sync {
    /// Store the bytes; returns the public URL
    fn upload(&self, file_name: &str, bytes: &[u8]) -> StoreResult<String>;
}

pub trait ShareLinks: Send + Sync {
    /// Snapshot `html` under a fresh token
    fn create(&self, html: &str) -> String;

    fn resolve(&self, token: &str) -> Option<String>;
}

/// One `<id>.json` + `<id>.html` pair per template
#[derive(Debug, Clone)]
pub struct FileTemplateStore {
    dir: PathBuf,
}

impl FileTemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ids are uuids; anything else could escape the directory
    fn paths(&self, id: &str) -> StoreResult<(PathBuf, PathBuf)> {
        let id = Uuid::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))?;
        let stem = id.hyphenated().to_string();
        Ok((
            self.dir.join(format!("{}.json", stem)),
            self.dir.join(format!("{}.html", stem)),
        ))
    }
}

impl TemplateStore for FileTemplateStore {
    fn save(&self, html: &str, name: &str) -> StoreResult<TemplateMeta> {
        let now = Utc::now();
        let meta = TemplateMeta {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            created_at: now,
            updated_at: now,
            size: html.len(),
        };
        let (meta_path, html_path) = self.paths(&meta.id)?;
        fs::write(&html_path, html)?;
        fs::write(&meta_path, serde_json::to_string_pretty(&meta)?)?;
        info!(id = %meta.id, name = %meta.name, size = meta.size, "Template saved");
        Ok(meta)
    }

    fn load(&self, id: &str) -> StoreResult<String> {
        let (_, html_path) = self.paths(id)?;
        match fs::read_to_string(&html_path) {
            Ok(html) => Ok(html),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn list(&self) -> StoreResult<Vec<TemplateMeta>> {
        let mut templates = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let content = fs::read_to_string(&path)?;
                templates.push(serde_json::from_str::<TemplateMeta>(&content)?);
            }
        }
        templates.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(templates)
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Files under a directory served at `url_prefix`
#[derive(Debug, Clone)]
pub struct DirImageStore {
    dir: PathBuf,
    url_prefix: String,
}

impl DirImageStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ImageStore for DirImageStore {
    fn upload(&self, file_name: &str, bytes: &[u8]) -> StoreResult<String> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
            .ok_or_else(|| StoreError::UnsupportedImage(file_name.to_string()))?;

        let stored = format!("{}.{}", Uuid::new_v4(), extension);
        fs::write(self.dir.join(&stored), bytes)?;
        debug!(file = %stored, size = bytes.len(), "Image stored");
        Ok(format!("{}/{}", self.url_prefix, stored))
    }
}

/// Share links held for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryShareLinks {
    links: Mutex<HashMap<String, String>>,
}

impl MemoryShareLinks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShareLinks for MemoryShareLinks {
    fn create(&self, html: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut links = self.links.lock().unwrap_or_else(|e| e.into_inner());
        links.insert(token.clone(), html.to_string());
        token
    }

    fn resolve(&self, token: &str) -> Option<String> {
        let links = self.links.lock().unwrap_or_else(|e| e.into_inner());
        links.get(token).cloned()
    }
}
