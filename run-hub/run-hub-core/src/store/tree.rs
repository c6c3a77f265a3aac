use super::{StoreError, WriteBatch, MAX_BATCH_WRITES};
use crate::model::Attributes;
use crate::path::{CollectionPath, DocPath};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered key/document index shared by the bundled stores.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DocumentTree {
    docs: BTreeMap<String, Attributes>,
}

impl DocumentTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, path: &DocPath) -> Option<&Attributes> {
        self.docs.get(path.as_str())
    }

    pub fn set(&mut self, path: &DocPath, attrs: Attributes) {
        self.docs.insert(path.as_str().to_string(), attrs);
    }

    pub fn update(&mut self, path: &DocPath, attrs: Attributes) -> Result<(), StoreError> {
        let doc = self
            .docs
            .get_mut(path.as_str())
            .ok_or_else(|| StoreError::NotFound(path.clone()))?;
        for (key, value) in attrs {
            doc.insert(key, value);
        }
        Ok(())
    }

    /// Documents whose key is exactly one segment below `path`.
    pub fn list(&self, path: &CollectionPath) -> Vec<Attributes> {
        let prefix = path.child_prefix();
        self.docs
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| !key[prefix.len()..].contains('/'))
            .map(|(_, doc)| doc.clone())
            .collect()
    }

    /// Check a batch against store limits without applying it.
    pub fn check_batch(batch: &WriteBatch) -> Result<(), StoreError> {
        if batch.len() > MAX_BATCH_WRITES {
            return Err(StoreError::BatchTooLarge {
                len: batch.len(),
                max: MAX_BATCH_WRITES,
            });
        }
        Ok(())
    }

    pub fn apply_batch(&mut self, batch: WriteBatch) -> Result<(), StoreError> {
        Self::check_batch(&batch)?;
        for (path, attrs) in batch.into_writes() {
            self.set(&path, attrs);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn list_returns_direct_children_only() {
        let mut tree = DocumentTree::new();
        tree.set(&DocPath::project("ada", "p1").unwrap(), attrs(json!({"urlslug": "p1"})));
        tree.set(&DocPath::project("ada", "p2").unwrap(), attrs(json!({"urlslug": "p2"})));
        tree.set(&DocPath::run("ada", "p1", "r1").unwrap(), attrs(json!({"runId": "r1"})));
        tree.set(&DocPath::project("adam", "p3").unwrap(), attrs(json!({"urlslug": "p3"})));

        let projects = tree.list(&CollectionPath::projects("ada").unwrap());
        let slugs: Vec<_> = projects.iter().map(|p| p["urlslug"].clone()).collect();
        assert_eq!(slugs, vec![json!("p1"), json!("p2")]);
    }

    #[test]
    fn update_merges_and_requires_existing_document() {
        let mut tree = DocumentTree::new();
        let path = DocPath::owner("ada").unwrap();
        assert!(matches!(
            tree.update(&path, attrs(json!({"isgroup": true}))),
            Err(StoreError::NotFound(_))
        ));

        tree.set(&path, attrs(json!({"urlslug": "ada", "uid": "u-1"})));
        tree.update(&path, attrs(json!({"uid": "u-2"}))).unwrap();
        let doc = tree.get(&path).unwrap();
        assert_eq!(doc["urlslug"], "ada");
        assert_eq!(doc["uid"], "u-2");
    }

    #[test]
    fn oversized_batch_is_rejected_whole() {
        let mut tree = DocumentTree::new();
        let mut batch = WriteBatch::default();
        for i in 0..=MAX_BATCH_WRITES {
            let path = DocPath::file("ada", "p", "r", &format!("f{i}")).unwrap();
            batch.set(path, Attributes::new());
        }
        assert!(matches!(
            tree.apply_batch(batch),
            Err(StoreError::BatchTooLarge { .. })
        ));
        assert!(tree.is_empty());
    }
}
