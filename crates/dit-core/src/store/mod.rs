//! Record store collaborator.
//!
//! The import reconciler and the comment views only need four things from
//! storage: enumerate issues, enumerate one issue's comments, write a record
//! at a location, and allocate a location for a new record. [`RecordStore`]
//! captures exactly that, plus external-id lookups whose default
//! implementation is a linear scan. Stores that keep an index override them.
//!
//! Read operations never fail: an unreadable record is skipped with a
//! warning, and a missing store reads as empty.

pub mod dir;
pub mod memory;

pub use dir::DirStore;
pub use memory::MemoryStore;

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::model::{Comment, Issue, Record};

/// Where a record lives in a store. Opaque to callers beyond equality and
/// display; for [`DirStore`] it is a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Location(PathBuf);

impl Location {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    #[must_use]
    pub fn join(&self, child: impl AsRef<Path>) -> Self {
        Self(self.0.join(child))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A record together with the location it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stored<T> {
    pub location: Location,
    pub record: T,
}

/// Which records an external-id lookup considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Every issue in the store.
    Issues,
    /// The comments of one issue.
    Comments(&'a Location),
}

pub trait RecordStore {
    /// All issues, in a stable order.
    fn issues(&self) -> Vec<Stored<Issue>>;

    /// All comments of the issue at `issue`, in a stable order. Empty when
    /// the issue does not exist.
    fn comments(&self, issue: &Location) -> Vec<Stored<Comment>>;

    /// Create or overwrite the issue at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing storage cannot be written.
    fn write_issue(&mut self, at: &Location, issue: &Issue) -> Result<(), StoreError>;

    /// Create or overwrite the comment at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing storage cannot be written.
    fn write_comment(&mut self, at: &Location, comment: &Comment) -> Result<(), StoreError>;

    /// Pick the location a new issue would be written to. Writes nothing.
    fn allocate_issue(&self, issue: &Issue) -> Location;

    /// Pick the location a new comment on `issue` would be written to.
    /// Writes nothing.
    fn allocate_comment(&self, issue: &Location, comment: &Comment) -> Location;

    /// The issue whose stored `external_id` equals `external_id` exactly.
    fn issue_by_external_id(&self, external_id: &str) -> Option<Stored<Issue>> {
        find_by_external_id(self.issues(), external_id)
    }

    /// The comment of `issue` whose stored `external_id` equals
    /// `external_id` exactly.
    fn comment_by_external_id(
        &self,
        issue: &Location,
        external_id: &str,
    ) -> Option<Stored<Comment>> {
        find_by_external_id(self.comments(issue), external_id)
    }

    /// Every internal id in use, issues and comments alike.
    fn known_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        for issue in self.issues() {
            ids.extend(
                self.comments(&issue.location)
                    .into_iter()
                    .map(|c| c.record.id),
            );
            ids.insert(issue.record.id);
        }
        ids
    }
}

/// Linear scan used by the default lookups. Records without an external id
/// (or with an empty one) never match.
pub fn find_by_external_id<T: Record>(
    records: impl IntoIterator<Item = Stored<T>>,
    external_id: &str,
) -> Option<Stored<T>> {
    if external_id.is_empty() {
        return None;
    }
    records
        .into_iter()
        .find(|stored| stored.record.external_id() == Some(external_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored(loc: &str, ext: Option<&str>) -> Stored<Issue> {
        let mut issue = Issue::new(loc, "same title", Utc::now());
        issue.external_id = ext.map(str::to_string);
        Stored {
            location: Location::new(loc),
            record: issue,
        }
    }

    #[test]
    fn scan_matches_exact_external_id_only() {
        let records = vec![
            stored("a", None),
            stored("b", Some("o/r#1")),
            stored("c", Some("o/r#10")),
        ];
        let hit = find_by_external_id(records.clone(), "o/r#1").expect("match");
        assert_eq!(hit.location, Location::new("b"));
        assert!(find_by_external_id(records, "o/r#").is_none());
    }

    #[test]
    fn empty_external_id_never_matches() {
        let records = vec![stored("a", Some(""))];
        assert!(find_by_external_id(records, "").is_none());
    }

    #[test]
    fn location_join_and_display() {
        let loc = Location::new("issues").join("crash-abc1234");
        assert_eq!(loc.to_string(), format!("issues{}crash-abc1234", std::path::MAIN_SEPARATOR));
    }
}
