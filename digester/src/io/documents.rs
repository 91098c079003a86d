//! Digest document store: one Markdown file per reporting week.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde_yaml::Value;
use tracing::{debug, info};

use crate::core::assets::image_file_name;
use crate::core::schema::parse_header;

const DOCUMENT_EXTENSION: &str = "md";

/// Directory of published digests.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.path_for(filename).exists()
    }

    /// Write a new digest. Refuses to overwrite an existing file.
    pub fn save(&self, filename: &str, document: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create digests dir {}", self.dir.display()))?;
        let path = self.path_for(filename);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    anyhow!("refuse to overwrite existing digest {}", path.display())
                }
                _ => anyhow!(err).context(format!("create digest {}", path.display())),
            })?;
        file.write_all(document.as_bytes())
            .with_context(|| format!("write digest {}", path.display()))?;
        info!(path = %path.display(), "saved digest");
        Ok(path)
    }

    /// Digest files sorted by filename, newest first.
    pub fn list_newest_first(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in
            fs::read_dir(&self.dir).with_context(|| format!("read {}", self.dir.display()))?
        {
            let path = entry
                .with_context(|| format!("read entry in {}", self.dir.display()))?
                .path();
            if path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(DOCUMENT_EXTENSION)
            {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        Ok(paths)
    }

    /// Image filenames used by prior digests, newest digest first.
    ///
    /// Digests that cannot be read or whose header does not parse are skipped.
    pub fn image_history(&self) -> Result<Vec<String>> {
        let mut used = Vec::new();
        for path in self.list_newest_first()? {
            let Ok(contents) = fs::read_to_string(&path) else {
                debug!(path = %path.display(), "skipping unreadable digest");
                continue;
            };
            let Ok(header) = parse_header(&contents) else {
                debug!(path = %path.display(), "skipping digest without parseable header");
                continue;
            };
            if let Some(Value::String(image)) = header.get("image")
                && !image.is_empty()
            {
                used.push(image_file_name(image).to_string());
            }
        }
        Ok(used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::create_dir_all(dir).expect("mkdir");
        fs::write(dir.join(name), contents).expect("write");
    }

    #[test]
    fn save_is_write_once() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = DocumentStore::new(temp.path().join("digests"));

        let path = store.save("2026-week-41.md", "first").expect("save");
        assert_eq!(fs::read_to_string(&path).expect("read"), "first");
        assert!(store.exists("2026-week-41.md"));

        let err = store.save("2026-week-41.md", "second").unwrap_err();
        assert!(err.to_string().contains("refuse to overwrite"));
        assert_eq!(fs::read_to_string(&path).expect("read"), "first");
    }

    #[test]
    fn lists_markdown_newest_first() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path();
        write(dir, "2026-week-02.md", "");
        write(dir, "2025-week-52.md", "");
        write(dir, "2026-week-10.md", "");
        write(dir, "notes.txt", "");

        let names: Vec<String> = DocumentStore::new(dir)
            .list_newest_first()
            .expect("list")
            .iter()
            .map(|p| p.file_name().expect("name").to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["2026-week-10.md", "2026-week-02.md", "2025-week-52.md"]
        );
    }

    #[test]
    fn missing_dir_has_no_history() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = DocumentStore::new(temp.path().join("absent"));
        assert!(store.image_history().expect("history").is_empty());
    }

    #[test]
    fn image_history_reads_base_names_and_skips_broken_digests() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path();
        write(dir, "2026-week-01.md", "---\nimage: /images/digests/a.svg\n---\nbody");
        write(dir, "2026-week-02.md", "no header at all");
        write(dir, "2026-week-03.md", "---\ntitle: [broken\n---\nbody");
        write(dir, "2026-week-04.md", "---\ntitle: no image\n---\nbody");
        write(dir, "2026-week-05.md", "---\nimage: /images/digests/b.png\n---\nbody");

        let history = DocumentStore::new(dir).image_history().expect("history");
        assert_eq!(history, vec!["b.png".to_string(), "a.svg".to_string()]);
    }
}
