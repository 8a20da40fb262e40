//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Holds the collection in a `Vec` behind `std::sync::RwLock`. Every save
//! replaces the vector wholesale, exactly like a file backend rewrites its
//! file.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{Record, Store};

/// In-memory store for tests and ephemeral use.
pub struct MemoryStore<R> {
    records: RwLock<Vec<R>>,
}

impl<R: Record> MemoryStore<R> {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// Start from an existing collection (test fixtures).
    pub fn with_records(records: Vec<R>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

impl<R: Record> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> Store<R> for MemoryStore<R> {
    async fn load(&self) -> Result<Vec<R>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(records.clone())
    }

    async fn save(&self, records: &[R]) -> Result<()> {
        let mut stored = self
            .records
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        *stored = records.to_vec();
        Ok(())
    }
}
