//! JSON file backend for the [`Store`] trait.
//!
//! Each collection is one pretty-printed JSON array on disk. A missing file
//! reads as an empty collection. A file that exists but does not parse is
//! an error and is never overwritten, so a hand-edited typo cannot silently
//! wipe the data. Each write goes to its own uniquely named temporary file in
//! the same directory, which is then persisted over the target.

use anyhow::{Context, Result};
use async_trait::async_trait;
use larder_core::store::{Record, Store};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub struct JsonFileStore<R> {
    path: PathBuf,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> JsonFileStore<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl<R: Record> Store<R> for JsonFileStore<R> {
    async fn load(&self) -> Result<Vec<R>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).with_context(|| {
            format!(
                "Failed to parse {} (fix or remove the file; it will not be overwritten)",
                self.path.display()
            )
        })
    }

    async fn save(&self, records: &[R]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let body = serde_json::to_string_pretty(records)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_replacing(&dir, &path, body.as_bytes()))
            .await
            .context("File write task panicked")??;
        tracing::debug!(path = %self.path.display(), records = records.len(), "store saved");
        Ok(())
    }
}

fn write_replacing(dir: &Path, path: &Path, body: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
    tmp.write_all(body).with_context(|| format!("Failed to write {}", tmp.path().display()))?;
    tmp.persist(path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
