//! Hierarchical document addressing.
//!
//! Every document lives at a slash-joined key following
//! `users/{owner}/projects/{project}/runs/{run}/files/{file}`. Keys are built
//! from identity fields through the typed constructors below, which reject
//! segments that would change the shape of the path.

use std::fmt;
use thiserror::Error;

const USERS: &str = "users";
const PROJECTS: &str = "projects";
const RUNS: &str = "runs";
const FILES: &str = "files";
const SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} `{value}` contains a path separator")]
    Separator { field: &'static str, value: String },
    #[error("{field} `{value}` has surrounding whitespace")]
    Whitespace { field: &'static str, value: String },
    #[error("`{0}` is not a document path")]
    NotADocument(String),
    #[error("`{0}` is not a collection path")]
    NotACollection(String),
}

fn segment<'a>(field: &'static str, value: &'a str) -> Result<&'a str, PathError> {
    if value.is_empty() {
        return Err(PathError::Empty { field });
    }
    if value.contains(SEPARATOR) {
        return Err(PathError::Separator {
            field,
            value: value.to_string(),
        });
    }
    if value.trim() != value {
        return Err(PathError::Whitespace {
            field,
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Split a raw key, rejecting empty segments. Returns the segment count.
fn raw_segments(raw: &str) -> Option<usize> {
    let mut count = 0;
    for part in raw.split(SEPARATOR) {
        if part.is_empty() {
            return None;
        }
        count += 1;
    }
    Some(count)
}

/// Path of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(String);

impl DocPath {
    pub fn owner(owner: &str) -> Result<Self, PathError> {
        Ok(CollectionPath::users().doc_unchecked(segment("owner", owner)?))
    }

    pub fn project(owner: &str, project: &str) -> Result<Self, PathError> {
        let coll = CollectionPath::projects(owner)?;
        Ok(coll.doc_unchecked(segment("project", project)?))
    }

    pub fn run(owner: &str, project: &str, run_id: &str) -> Result<Self, PathError> {
        let coll = CollectionPath::runs(owner, project)?;
        Ok(coll.doc_unchecked(segment("runId", run_id)?))
    }

    pub fn file(
        owner: &str,
        project: &str,
        run_id: &str,
        filename: &str,
    ) -> Result<Self, PathError> {
        let coll = CollectionPath::files(owner, project, run_id)?;
        Ok(coll.doc_unchecked(segment("filename", filename)?))
    }

    /// Accept an arbitrary key as long as it addresses a document. The
    /// hierarchy shape is not checked.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        match raw_segments(raw) {
            Some(n) if n % 2 == 0 => Ok(Self(raw.to_string())),
            _ => Err(PathError::NotADocument(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a collection of sibling documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn users() -> Self {
        Self(USERS.to_string())
    }

    pub fn projects(owner: &str) -> Result<Self, PathError> {
        Ok(Self(format!(
            "{USERS}/{}/{PROJECTS}",
            segment("owner", owner)?
        )))
    }

    pub fn runs(owner: &str, project: &str) -> Result<Self, PathError> {
        let project_path = DocPath::project(owner, project)?;
        Ok(Self(format!("{project_path}/{RUNS}")))
    }

    pub fn files(owner: &str, project: &str, run_id: &str) -> Result<Self, PathError> {
        let run_path = DocPath::run(owner, project, run_id)?;
        Ok(Self(format!("{run_path}/{FILES}")))
    }

    pub fn parse(raw: &str) -> Result<Self, PathError> {
        match raw_segments(raw) {
            Some(n) if n % 2 == 1 => Ok(Self(raw.to_string())),
            _ => Err(PathError::NotACollection(raw.to_string())),
        }
    }

    /// Address a document in this collection.
    pub fn doc(&self, id: &str) -> Result<DocPath, PathError> {
        Ok(self.doc_unchecked(segment("id", id)?))
    }

    fn doc_unchecked(&self, id: &str) -> DocPath {
        DocPath(format!("{}{SEPARATOR}{id}", self.0))
    }

    /// Prefix shared by every key directly or transitively below this
    /// collection.
    pub(crate) fn child_prefix(&self) -> String {
        format!("{}{SEPARATOR}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_hierarchical_paths() {
        assert_eq!(DocPath::owner("ada").unwrap().as_str(), "users/ada");
        assert_eq!(
            DocPath::project("ada", "engine").unwrap().as_str(),
            "users/ada/projects/engine"
        );
        assert_eq!(
            DocPath::run("ada", "engine", "r1").unwrap().as_str(),
            "users/ada/projects/engine/runs/r1"
        );
        assert_eq!(
            DocPath::file("ada", "engine", "r1", "out.csv").unwrap().as_str(),
            "users/ada/projects/engine/runs/r1/files/out.csv"
        );
        assert_eq!(
            CollectionPath::files("ada", "engine", "r1").unwrap().as_str(),
            "users/ada/projects/engine/runs/r1/files"
        );
    }

    #[test]
    fn rejects_separator_in_identity_field() {
        let err = DocPath::project("ada", "a/b").unwrap_err();
        assert_eq!(
            err,
            PathError::Separator {
                field: "project",
                value: "a/b".to_string()
            }
        );
        assert!(matches!(
            DocPath::file("ada", "p", "r", "dir/file.txt"),
            Err(PathError::Separator { field: "filename", .. })
        ));
    }

    #[test]
    fn rejects_empty_and_padded_segments() {
        assert_eq!(
            DocPath::owner("").unwrap_err(),
            PathError::Empty { field: "owner" }
        );
        assert!(matches!(
            DocPath::run("ada", "p", " r1"),
            Err(PathError::Whitespace { field: "runId", .. })
        ));
    }

    #[test]
    fn parse_checks_parity_only() {
        assert!(DocPath::parse("users/ada/anything/goes").is_ok());
        assert!(DocPath::parse("users/ada/projects").is_err());
        assert!(DocPath::parse("users//x").is_err());
        assert!(CollectionPath::parse("users/ada/projects").is_ok());
        assert!(CollectionPath::parse("users/ada").is_err());
    }
}
