//! Storage abstraction for Larder.
//!
//! The [`Store`] trait is the single seam between application logic and
//! persistence. A backend only implements [`load`](Store::load) and
//! [`save`](Store::save) over the *whole* collection; every CRUD operation
//! is a provided method that reads the full collection, mutates it in
//! memory, and writes the full collection back.
//!
//! Read-modify-write cycles are not isolated: two concurrent writers to the
//! same backend race and the later save wins.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use memory::MemoryStore;

/// A record type that can live in a [`Store`].
///
/// `Draft` holds the caller-suppliable fields for creation; `Patch` holds
/// optional fields for partial updates.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Draft: Send + 'static;
    type Patch: Send + 'static;

    fn id(&self) -> &str;

    /// Build a record from a draft with a store-assigned id and timestamp.
    fn create(draft: Self::Draft, id: String, now: DateTime<Utc>) -> Self;

    /// Merge a patch into this record. Fields absent from the patch stay
    /// unchanged.
    fn apply(&mut self, patch: Self::Patch);
}

/// Generate a process-wide unique record identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Abstract storage backend for one record collection.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_all`](Store::list_all) | All records in persisted order |
/// | [`get`](Store::get) | One record by id |
/// | [`add`](Store::add) | Create one record |
/// | [`add_batch`](Store::add_batch) | Create many records in one write |
/// | [`update`](Store::update) | Merge a patch into one record |
/// | [`delete`](Store::delete) | Remove one record |
/// | [`clear`](Store::clear) | Remove every record |
#[async_trait]
pub trait Store<R: Record>: Send + Sync {
    /// Read the full persisted collection.
    async fn load(&self) -> Result<Vec<R>>;

    /// Replace the full persisted collection.
    async fn save(&self, records: &[R]) -> Result<()>;

    async fn list_all(&self) -> Result<Vec<R>> {
        self.load().await
    }

    async fn get(&self, id: &str) -> Result<Option<R>> {
        Ok(self.load().await?.into_iter().find(|r| r.id() == id))
    }

    async fn add(&self, draft: R::Draft) -> Result<R> {
        let mut created = self.add_batch(vec![draft]).await?;
        created
            .pop()
            .ok_or_else(|| anyhow::anyhow!("store returned no record for a single add"))
    }

    async fn add_batch(&self, drafts: Vec<R::Draft>) -> Result<Vec<R>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        let mut records = self.load().await?;
        let now = Utc::now();
        let created: Vec<R> = drafts
            .into_iter()
            .map(|draft| {
                let mut id = new_id();
                while records.iter().any(|r| r.id() == id) {
                    id = new_id();
                }
                R::create(draft, id, now)
            })
            .collect();
        records.extend(created.iter().cloned());
        self.save(&records).await?;
        Ok(created)
    }

    async fn update(&self, id: &str, patch: R::Patch) -> Result<Option<R>> {
        let mut records = self.load().await?;
        let updated = match records.iter_mut().find(|r| r.id() == id) {
            Some(record) => {
                record.apply(patch);
                record.clone()
            }
            None => return Ok(None),
        };
        self.save(&records).await?;
        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut records = self.load().await?;
        let Some(pos) = records.iter().position(|r| r.id() == id) else {
            return Ok(false);
        };
        records.remove(pos);
        self.save(&records).await?;
        Ok(true)
    }

    async fn clear(&self) -> Result<usize> {
        let removed = self.load().await?.len();
        self.save(&[]).await?;
        Ok(removed)
    }
}
