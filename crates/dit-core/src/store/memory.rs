use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;

use crate::error::StoreError;
use crate::model::{Comment, Issue, Record};

use super::{Location, RecordStore, Stored};

const ISSUES_PREFIX: &str = "issues";
const COMMENTS_SEGMENT: &str = "comments";

/// Map-backed store with an external-id index.
///
/// Used for import previews and tests. Lookups by external id are O(1).
#[derive(Debug, Default)]
pub struct MemoryStore {
    issues: BTreeMap<Location, Issue>,
    comments: BTreeMap<Location, BTreeMap<Location, Comment>>,
    issue_index: HashMap<String, Location>,
    comment_index: HashMap<(Location, String), Location>,
    read_only: bool,
    writes: usize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `PermissionDenied`.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Number of successful writes so far.
    #[must_use]
    pub const fn write_count(&self) -> usize {
        self.writes
    }

    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    #[must_use]
    pub fn comment_count(&self, issue: &Location) -> usize {
        self.comments.get(issue).map_or(0, BTreeMap::len)
    }

    fn check_writable(&self, at: &Location) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::io(
                at.as_path(),
                io::Error::new(io::ErrorKind::PermissionDenied, "store is read-only"),
            ));
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn issues(&self) -> Vec<Stored<Issue>> {
        self.issues
            .iter()
            .map(|(location, issue)| Stored {
                location: location.clone(),
                record: issue.clone(),
            })
            .collect()
    }

    fn comments(&self, issue: &Location) -> Vec<Stored<Comment>> {
        self.comments
            .get(issue)
            .map(|comments| {
                comments
                    .iter()
                    .map(|(location, comment)| Stored {
                        location: location.clone(),
                        record: comment.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn write_issue(&mut self, at: &Location, issue: &Issue) -> Result<(), StoreError> {
        self.check_writable(at)?;

        if let Some(previous) = self.issues.get(at) {
            if let Some(old) = previous.external_id.as_deref() {
                if self.issue_index.get(old) == Some(at) {
                    self.issue_index.remove(old);
                }
            }
        }
        if let Some(ext) = issue.external_id.as_deref().filter(|e| !e.is_empty()) {
            self.issue_index.insert(ext.to_string(), at.clone());
        }

        let mut stored = issue.clone();
        stored.normalize();
        self.issues.insert(at.clone(), stored);
        self.comments.entry(at.clone()).or_default();
        self.writes += 1;
        Ok(())
    }

    fn write_comment(&mut self, at: &Location, comment: &Comment) -> Result<(), StoreError> {
        self.check_writable(at)?;

        let issue = self
            .issues
            .keys()
            .find(|issue| at.as_path().starts_with(issue.as_path()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                path: at.as_path().to_path_buf(),
            })?;

        let comments = self.comments.entry(issue.clone()).or_default();
        if let Some(old) = comments.get(at).and_then(|c| c.external_id.clone()) {
            let key = (issue.clone(), old);
            if self.comment_index.get(&key) == Some(at) {
                self.comment_index.remove(&key);
            }
        }
        if let Some(ext) = comment.external_id.as_deref().filter(|e| !e.is_empty()) {
            self.comment_index
                .insert((issue.clone(), ext.to_string()), at.clone());
        }

        let mut stored = comment.clone();
        stored.normalize();
        comments.insert(at.clone(), stored);
        self.writes += 1;
        Ok(())
    }

    fn allocate_issue(&self, issue: &Issue) -> Location {
        Location::new(ISSUES_PREFIX).join(&issue.id)
    }

    fn allocate_comment(&self, issue: &Location, comment: &Comment) -> Location {
        issue.join(COMMENTS_SEGMENT).join(&comment.id)
    }

    fn issue_by_external_id(&self, external_id: &str) -> Option<Stored<Issue>> {
        let location = self.issue_index.get(external_id)?;
        self.issues.get(location).map(|issue| Stored {
            location: location.clone(),
            record: issue.clone(),
        })
    }

    fn comment_by_external_id(
        &self,
        issue: &Location,
        external_id: &str,
    ) -> Option<Stored<Comment>> {
        let key = (issue.clone(), external_id.to_string());
        let location = self.comment_index.get(&key)?;
        self.comments
            .get(issue)
            .and_then(|comments| comments.get(location))
            .map(|comment| Stored {
                location: location.clone(),
                record: comment.clone(),
            })
    }

    fn known_ids(&self) -> HashSet<String> {
        self.issues
            .values()
            .map(|issue| issue.id.clone())
            .chain(
                self.comments
                    .values()
                    .flat_map(|comments| comments.values().map(|c| c.id.clone())),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::Utc;

    #[test]
    fn index_follows_external_id_changes() {
        let mut store = MemoryStore::new();
        let issue = Issue::new("abc1234", "t", Utc::now()).with_external_id("o/r#1");
        let at = store.allocate_issue(&issue);
        store.write_issue(&at, &issue).expect("write");
        assert_eq!(
            store.issue_by_external_id("o/r#1").map(|s| s.location),
            Some(at.clone())
        );

        let renamed = issue.with_external_id("o/r#2");
        store.write_issue(&at, &renamed).expect("rewrite");
        assert!(store.issue_by_external_id("o/r#1").is_none());
        assert!(store.issue_by_external_id("o/r#2").is_some());
    }

    #[test]
    fn comment_on_unknown_issue_is_rejected() {
        let mut store = MemoryStore::new();
        let ghost = Location::new("issues/nope");
        let comment = Comment::new("c1", "a", Utc::now(), "hi");
        let at = store.allocate_comment(&ghost, &comment);
        let err = store.write_comment(&at, &comment).expect_err("no parent issue");
        assert_eq!(err.code(), ErrorCode::RecordNotFound);
    }

    #[test]
    fn read_only_store_fails_writes() {
        let mut store = MemoryStore::new();
        store.set_read_only(true);
        let issue = Issue::new("abc1234", "t", Utc::now());
        let at = store.allocate_issue(&issue);
        let err = store.write_issue(&at, &issue).expect_err("read-only");
        assert_eq!(err.code(), ErrorCode::RecordWriteFailed);
        assert_eq!(store.issue_count(), 0);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn known_ids_cover_issues_and_comments() {
        let mut store = MemoryStore::new();
        let issue = Issue::new("abc1234", "t", Utc::now());
        let at = store.allocate_issue(&issue);
        store.write_issue(&at, &issue).expect("write issue");
        let comment = Comment::new("c0ffee1", "a", Utc::now(), "hi");
        let cat = store.allocate_comment(&at, &comment);
        store.write_comment(&cat, &comment).expect("write comment");

        let ids = store.known_ids();
        assert!(ids.contains("abc1234"));
        assert!(ids.contains("c0ffee1"));
        assert_eq!(store.comment_count(&at), 1);
    }
}
