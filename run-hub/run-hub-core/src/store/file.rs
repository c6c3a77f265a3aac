use super::{DocumentStore, DocumentTree, StoreError, WriteBatch};
use crate::model::Attributes;
use crate::path::{CollectionPath, DocPath};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tokio::task;

const DOCUMENTS_FILE: &str = "documents.json";

/// Filesystem-backed store. The whole tree lives in `documents.json` inside
/// the data directory and is rewritten through a temp file + rename on every
/// mutation, so a crash never leaves a half-applied batch behind.
pub struct FileStore {
    dir: PathBuf,
    tree: RwLock<DocumentTree>,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let file = dir.join(DOCUMENTS_FILE);
        let tree = if file.exists() {
            let data = std::fs::read_to_string(&file)?;
            serde_json::from_str(&data)?
        } else {
            DocumentTree::new()
        };
        tracing::debug!(dir = %dir.display(), documents = tree.len(), "opened file store");
        Ok(Self {
            dir,
            tree: RwLock::new(tree),
        })
    }

    /// Run `change` against a copy of the tree and swap it in only once the
    /// copy is on disk.
    async fn mutate<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut DocumentTree) -> Result<(), StoreError> + Send,
    {
        let mut guard = self.tree.write().await;
        let mut next = guard.clone();
        change(&mut next)?;
        let dir = self.dir.clone();
        let next = task::spawn_blocking(move || persist(&dir, &next).map(|()| next))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;
        *guard = next;
        Ok(())
    }
}

fn persist(dir: &Path, tree: &DocumentTree) -> Result<(), StoreError> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, tree)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(dir.join(DOCUMENTS_FILE)).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn get_document(&self, path: &DocPath) -> Result<Option<Attributes>, StoreError> {
        Ok(self.tree.read().await.get(path).cloned())
    }

    async fn set_document(&self, path: &DocPath, attrs: Attributes) -> Result<(), StoreError> {
        self.mutate(|tree| {
            tree.set(path, attrs);
            Ok(())
        })
        .await
    }

    async fn update_document(&self, path: &DocPath, attrs: Attributes) -> Result<(), StoreError> {
        self.mutate(|tree| tree.update(path, attrs)).await
    }

    async fn list_collection(
        &self,
        path: &CollectionPath,
    ) -> Result<Vec<Attributes>, StoreError> {
        Ok(self.tree.read().await.list(path))
    }

    async fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.mutate(|tree| tree.apply_batch(batch)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn documents_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = DocPath::owner("ada").unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            let attrs = json!({"urlslug": "ada", "uid": "u-1"});
            store
                .set_document(&path, attrs.as_object().cloned().unwrap())
                .await
                .unwrap();
        }
        let store = FileStore::open(dir.path()).unwrap();
        let doc = store.get_document(&path).await.unwrap().unwrap();
        assert_eq!(doc["uid"], "u-1");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_all_land_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).unwrap());

        let mut handles = vec![];
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let path = DocPath::run("ada", "engine", &format!("r{i}")).unwrap();
                let attrs = json!({"runId": format!("r{i}")});
                store
                    .set_document(&path, attrs.as_object().cloned().unwrap())
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let reopened = FileStore::open(dir.path()).unwrap();
        let runs = reopened
            .list_collection(&CollectionPath::runs("ada", "engine").unwrap())
            .await
            .unwrap();
        assert_eq!(runs.len(), 8);
    }

    #[tokio::test]
    async fn failed_update_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let missing = DocPath::owner("ghost").unwrap();
        let err = store
            .update_document(&missing, Attributes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(!dir.path().join(DOCUMENTS_FILE).exists());
    }
}
