//! Header image pool on disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::io::config::ImagesConfig;

/// Directory of candidate header images.
#[derive(Debug, Clone)]
pub struct AssetStore {
    dir: PathBuf,
    extensions: Vec<String>,
    placeholder: String,
}

impl AssetStore {
    pub fn new(dir: impl Into<PathBuf>, images: &ImagesConfig) -> Self {
        Self {
            dir: dir.into(),
            extensions: images
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            placeholder: images.placeholder.clone(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Image filenames with an allowed extension, sorted. A missing
    /// directory yields an empty pool.
    pub fn pool(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in
            fs::read_dir(&self.dir).with_context(|| format!("read {}", self.dir.display()))?
        {
            let path = entry
                .with_context(|| format!("read entry in {}", self.dir.display()))?
                .path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name == self.placeholder || !self.allowed(&path) {
                continue;
            }
            names.push(name.to_string());
        }
        names.sort();
        Ok(names)
    }

    fn allowed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext))
    }
}
