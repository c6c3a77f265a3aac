//! Typed records for the documents managed by the hub.

use crate::path::{DocPath, PathError};
use serde::{Deserialize, Deserializer, Serialize};

/// Raw attribute map as stored in a document.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A user or team. Teams (`isgroup`) authorize their `members`.
///
/// Owner documents are often hand-provisioned, so everything but the path
/// is optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Owner {
    /// Session identity issued by the auth service. Teams have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub urlslug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub isgroup: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub members: Vec<String>,
}

impl Owner {
    pub fn path(&self) -> Result<DocPath, PathError> {
        DocPath::owner(&self.urlslug)
    }

    pub fn has_member(&self, urlslug: &str) -> bool {
        self.members.iter().any(|m| m == urlslug)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub owner: String,
    pub title: String,
    pub urlslug: String,
    pub description: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mvizkey: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported: Option<bool>,
}

impl Project {
    pub fn path(&self) -> Result<DocPath, PathError> {
        DocPath::project(&self.owner, &self.urlslug)
    }
}

/// Input to `create_project`; `public` falls back to `false`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewProject {
    pub owner: String,
    pub title: String,
    pub urlslug: String,
    pub description: String,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub mvizkey: Option<String>,
    #[serde(default)]
    pub imported: Option<bool>,
}

impl From<NewProject> for Project {
    fn from(p: NewProject) -> Self {
        Self {
            owner: p.owner,
            title: p.title,
            urlslug: p.urlslug,
            description: p.description,
            public: p.public.unwrap_or(false),
            mvizkey: p.mvizkey,
            imported: p.imported,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Run {
    pub owner: String,
    pub project: String,
    #[serde(rename = "runId")]
    pub run_id: String,
    pub description: String,
    #[serde(default)]
    pub public: bool,
}

impl Run {
    pub fn path(&self) -> Result<DocPath, PathError> {
        DocPath::run(&self.owner, &self.project, &self.run_id)
    }
}

/// Input to `create_run`; `public` falls back to `false`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewRun {
    pub owner: String,
    pub project: String,
    #[serde(rename = "runId")]
    pub run_id: String,
    pub description: String,
    #[serde(default)]
    pub public: Option<bool>,
}

impl From<NewRun> for Run {
    fn from(r: NewRun) -> Self {
        Self {
            owner: r.owner,
            project: r.project,
            run_id: r.run_id,
            description: r.description,
            public: r.public.unwrap_or(false),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub owner: String,
    pub project: String,
    #[serde(rename = "runId")]
    pub run_id: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizeinbytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mvizkey: Option<String>,
}

impl FileRecord {
    pub fn path(&self) -> Result<DocPath, PathError> {
        DocPath::file(&self.owner, &self.project, &self.run_id, &self.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_uses_stored_field_names() {
        let run: Run = serde_json::from_value(json!({
            "owner": "ada",
            "project": "engine",
            "runId": "r1",
            "description": "first",
        }))
        .unwrap();
        assert_eq!(run.run_id, "r1");
        assert!(!run.public);
        let back = serde_json::to_value(&run).unwrap();
        assert_eq!(back["runId"], "r1");
        assert!(back.get("run_id").is_none());
    }

    #[test]
    fn new_project_defaults_public_to_false() {
        let project = Project::from(NewProject {
            owner: "ada".into(),
            urlslug: "engine".into(),
            ..Default::default()
        });
        assert!(!project.public);

        let shared = Project::from(NewProject {
            public: Some(true),
            ..Default::default()
        });
        assert!(shared.public);
    }

    #[test]
    fn owner_tolerates_missing_optional_fields() {
        let owner: Owner = serde_json::from_value(json!({ "urlslug": "ada" })).unwrap();
        assert_eq!(owner.uid, None);
        assert!(!owner.isgroup);
        assert!(owner.members.is_empty());
    }

    #[test]
    fn owner_treats_null_fields_as_absent() {
        let owner: Owner = serde_json::from_value(json!({
            "urlslug": null,
            "isgroup": null,
            "members": null,
        }))
        .unwrap();
        assert_eq!(owner, Owner::default());
    }

    #[test]
    fn file_record_omits_absent_optionals() {
        let file = FileRecord {
            owner: "ada".into(),
            project: "engine".into(),
            run_id: "r1".into(),
            filename: "out.csv".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&file).unwrap();
        assert!(value.get("sizeinbytes").is_none());
        assert_eq!(
            file.path().unwrap().as_str(),
            "users/ada/projects/engine/runs/r1/files/out.csv"
        );
    }
}
