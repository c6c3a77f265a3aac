use super::{DocumentStore, DocumentTree, StoreError, WriteBatch};
use crate::model::Attributes;
use crate::path::{CollectionPath, DocPath};
use async_trait::async_trait;
use parking_lot::RwLock;

/// Process-local store. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tree: RwLock<DocumentTree>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> DocumentTree {
        self.tree.read().clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, path: &DocPath) -> Result<Option<Attributes>, StoreError> {
        Ok(self.tree.read().get(path).cloned())
    }

    async fn set_document(&self, path: &DocPath, attrs: Attributes) -> Result<(), StoreError> {
        self.tree.write().set(path, attrs);
        Ok(())
    }

    async fn update_document(&self, path: &DocPath, attrs: Attributes) -> Result<(), StoreError> {
        self.tree.write().update(path, attrs)
    }

    async fn list_collection(
        &self,
        path: &CollectionPath,
    ) -> Result<Vec<Attributes>, StoreError> {
        Ok(self.tree.read().list(path))
    }

    async fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.tree.write().apply_batch(batch)
    }
}
