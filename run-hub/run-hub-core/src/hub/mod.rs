//! Typed facade over the document store.
//!
//! [`RunHub`] addresses owners, projects, runs and files by their identity
//! fields. Reads return `None` or an empty list for missing documents;
//! creates overwrite the whole document. Authorization is advisory and must
//! be checked by the caller through [`RunHub::can_user_modify`].

use crate::access;
use crate::error::{Error, Result};
use crate::identity::IdentityResolver;
use crate::model::{Attributes, FileRecord, NewProject, NewRun, Owner, Project, Run};
use crate::path::{CollectionPath, DocPath};
use crate::session::SessionProvider;
use crate::store::DocumentStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;


pub struct RunHub {
    store: Arc<dyn DocumentStore>,
    identity: IdentityResolver,
}

fn encode<T: Serialize>(record: &T) -> Result<Attributes> {
    match serde_json::to_value(record).map_err(Error::Encode)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Encode(serde::ser::Error::custom(format!(
            "expected an object, got {other}"
        )))),
    }
}

fn decode<T: DeserializeOwned>(location: &str, attrs: Attributes) -> Result<T> {
    serde_json::from_value(Value::Object(attrs)).map_err(|source| Error::Decode {
        path: location.to_string(),
        source,
    })
}

impl RunHub {
    pub fn new(store: Arc<dyn DocumentStore>, sessions: Arc<dyn SessionProvider>) -> Self {
        let identity = IdentityResolver::new(sessions, store.clone());
        Self { store, identity }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    pub async fn current_user(&self) -> Result<Option<String>> {
        self.identity.current_user().await
    }

    pub async fn logout(&self) -> bool {
        self.identity.logout().await
    }

    /// Whether the signed-in user may modify resources of `owner_id`:
    /// either they are that owner, or `owner_id` is a team listing them.
    pub async fn can_user_modify(&self, owner_id: &str) -> Result<bool> {
        debug!(owner = owner_id, "can_user_modify");
        let current = self.identity.current_user().await?;
        let Some(current) = current else {
            return Ok(false);
        };
        if current == owner_id {
            return Ok(true);
        }
        let owner = self.get_owner(owner_id).await?;
        Ok(access::may_modify(Some(current.as_str()), owner_id, owner.as_ref()))
    }

    async fn get_typed<T: DeserializeOwned>(&self, path: &DocPath) -> Result<Option<T>> {
        match self.store.get_document(path).await? {
            Some(attrs) => decode(path.as_str(), attrs).map(Some),
            None => Ok(None),
        }
    }

    async fn list_typed<T: DeserializeOwned>(&self, path: &CollectionPath) -> Result<Vec<T>> {
        self.store
            .list_collection(path)
            .await?
            .into_iter()
            .map(|attrs| decode(path.as_str(), attrs))
            .collect()
    }

    pub async fn get_owner(&self, owner: &str) -> Result<Option<Owner>> {
        debug!(owner, "get_owner");
        let found: Option<Owner> = self.get_typed(&DocPath::owner(owner)?).await?;
        Ok(found.map(|mut record| {
            if record.urlslug.is_empty() {
                record.urlslug = owner.to_string();
            }
            record
        }))
    }

    /// Provision or replace an owner record.
    pub async fn create_owner(&self, owner: Owner) -> Result<()> {
        debug!(urlslug = %owner.urlslug, "create_owner");
        let path = owner.path()?;
        self.store.set_document(&path, encode(&owner)?).await?;
        Ok(())
    }

    pub async fn get_projects_for_user(&self, owner: &str) -> Result<Vec<Project>> {
        debug!(owner, "get_projects_for_user");
        self.list_typed(&CollectionPath::projects(owner)?).await
    }

    pub async fn get_project(&self, owner: &str, project: &str) -> Result<Option<Project>> {
        debug!(owner, project, "get_project");
        self.get_typed(&DocPath::project(owner, project)?).await
    }

    /// Write the project at `users/{owner}/projects/{urlslug}`, replacing any
    /// previous content.
    pub async fn create_project(&self, props: NewProject) -> Result<Project> {
        let project = Project::from(props);
        debug!(owner = %project.owner, urlslug = %project.urlslug, "create_project");
        let path = project.path()?;
        self.store.set_document(&path, encode(&project)?).await?;
        Ok(project)
    }

    pub async fn get_run(&self, owner: &str, project: &str, run_id: &str) -> Result<Option<Run>> {
        debug!(owner, project, run_id, "get_run");
        self.get_typed(&DocPath::run(owner, project, run_id)?).await
    }

    pub async fn get_runs(&self, owner: &str, project: &str) -> Result<Vec<Run>> {
        debug!(owner, project, "get_runs");
        self.list_typed(&CollectionPath::runs(owner, project)?).await
    }

    pub async fn create_run(&self, props: NewRun) -> Result<Run> {
        let run = Run::from(props);
        debug!(owner = %run.owner, project = %run.project, run_id = %run.run_id, "create_run");
        let path = run.path()?;
        self.store.set_document(&path, encode(&run)?).await?;
        Ok(run)
    }

    pub async fn get_files(
        &self,
        owner: &str,
        project: &str,
        run_id: &str,
    ) -> Result<Vec<FileRecord>> {
        debug!(owner, project, run_id, "get_files");
        self.list_typed(&CollectionPath::files(owner, project, run_id)?)
            .await
    }

    /// Write all `files` in one atomic batch. Every path is validated before
    /// the store is touched, so an invalid record means nothing is written.
    pub async fn add_files(&self, files: &[FileRecord]) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }
        let mut batch = self.store.begin_batch();
        for file in files {
            let path = file.path()?;
            debug!(location = %path, "add_files");
            batch.set(path, encode(file)?);
        }
        self.store.commit_batch(batch).await?;
        Ok(())
    }

    /// Merge `attributes` into the document at a caller-supplied path.
    ///
    /// This bypasses the typed builders: `location` only has to name a
    /// document, not a well-formed owner/project/run/file.
    pub async fn update_doc(&self, location: &str, attributes: Attributes) -> Result<()> {
        debug!(location, "update_doc");
        let path = DocPath::parse(location)?;
        self.store.update_document(&path, attributes).await?;
        Ok(())
    }
}
