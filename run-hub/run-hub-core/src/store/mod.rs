//! Document store abstraction.
//!
//! The hub only talks to its backing database through [`DocumentStore`].
//! Two implementations ship with the crate: [`MemoryStore`] for tests and
//! embedding, and [`FileStore`] which persists the whole tree as a single
//! JSON file.

mod file;
mod memory;
mod tree;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use tree::DocumentTree;

use crate::model::Attributes;
use crate::path::{CollectionPath, DocPath};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Largest number of writes a single batch may carry.
pub const MAX_BATCH_WRITES: usize = 500;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no document at {0}")]
    NotFound(DocPath),
    #[error("batch of {len} writes exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },
    #[error("write to {path} rejected: {reason}")]
    Rejected { path: DocPath, reason: String },
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored data is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Equality filter on a single top-level field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, attrs: &Attributes) -> bool {
        attrs.get(&self.field) == Some(&self.value)
    }
}

/// Set operations collected for one atomic commit.
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    writes: Vec<(DocPath, Attributes)>,
}

impl WriteBatch {
    /// Queue a full overwrite of the document at `path`.
    pub fn set(&mut self, path: DocPath, attrs: Attributes) -> &mut Self {
        self.writes.push((path, attrs));
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub(crate) fn into_writes(self) -> Vec<(DocPath, Attributes)> {
        self.writes
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document. A missing document is `Ok(None)`.
    async fn get_document(&self, path: &DocPath) -> Result<Option<Attributes>, StoreError>;

    /// Replace the document at `path`, creating it if needed.
    async fn set_document(&self, path: &DocPath, attrs: Attributes) -> Result<(), StoreError>;

    /// Merge `attrs` into the existing document's top-level fields.
    async fn update_document(&self, path: &DocPath, attrs: Attributes) -> Result<(), StoreError>;

    /// Documents directly inside `path`, in no particular order.
    async fn list_collection(&self, path: &CollectionPath)
        -> Result<Vec<Attributes>, StoreError>;

    async fn query_collection(
        &self,
        path: &CollectionPath,
        filter: &FieldFilter,
    ) -> Result<Vec<Attributes>, StoreError> {
        let docs = self.list_collection(path).await?;
        Ok(docs.into_iter().filter(|d| filter.matches(d)).collect())
    }

    fn begin_batch(&self) -> WriteBatch {
        WriteBatch::default()
    }

    /// Apply every write in `batch` or none of them.
    async fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError>;
}
