//! Per-model cache of previously submitted form values.
//!
//! Layout: `<root>/<sha256(model)>/<timestamp>.json`. Writes from concurrent
//! submissions are not coordinated.

use crate::error::{LaunchError, LaunchResult};
use chrono::Local;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// First free record name for `base` in `dir`.
///
/// Collisions get a zero-padded counter so names keep sorting by age.
fn unique_name(dir: &Path, base: &str) -> String {
    let mut name = base.to_string();
    let mut n = 1;
    while dir.join(format!("{name}.json")).exists() {
        name = format!("{base}-{n:04}");
        n += 1;
    }
    name
}

#[derive(Debug, Clone)]
pub struct ConfigCache {
    root: PathBuf,
}

impl ConfigCache {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// `<user cache dir>/tune/train_records`.
    #[must_use]
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("tune")
            .join("train_records")
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn model_dir(&self, model: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        self.root.join(hex::encode(hasher.finalize()))
    }

    /// Store a record and return its name.
    pub fn save(&self, model: &str, record: &Map<String, Value>) -> LaunchResult<String> {
        let dir = self.model_dir(model);
        std::fs::create_dir_all(&dir)?;
        let name = unique_name(&dir, &Local::now().format("%Y%m%d-%H%M%S%.3f").to_string());
        std::fs::write(dir.join(format!("{name}.json")), serde_json::to_string_pretty(record)?)?;
        Ok(name)
    }

    /// Record names for a model, newest first.
    pub fn list(&self, model: &str) -> LaunchResult<Vec<String>> {
        let dir = self.model_dir(model);
        let entries = match std::fs::read_dir(&dir) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    pub fn load(&self, model: &str, name: &str) -> LaunchResult<Map<String, Value>> {
        let path = self.model_dir(model).join(format!("{name}.json"));
        let bytes = std::fs::read(&path)
            .map_err(|e| LaunchError::Cache(format!("failed to read {}: {e}", path.display())))?;
        match serde_json::from_slice(&bytes)? {
            Value::Object(map) => Ok(map),
            _ => Err(LaunchError::Cache(format!("record is not an object: {}", path.display()))),
        }
    }

    /// Most recent record for a model, if any.
    pub fn latest(&self, model: &str) -> LaunchResult<Option<Map<String, Value>>> {
        match self.list(model)?.first() {
            Some(name) => self.load(model, name).map(Some),
            None => Ok(None),
        }
    }
}
