//! Import reconciliation: external records in, exactly one stored record per
//! distinct external id out.
//!
//! # Identity
//!
//! A record's identity during import is solely its `external_id`. Two
//! incoming records with the same external id resolve to the same stored
//! record; records with different (or no) external ids are never merged,
//! whatever their titles or bodies say.
//!
//! # Invariants
//!
//! - [`Reconciler::resolve`] only reads and never fails.
//! - An upsert that finds an existing record keeps its internal id and
//!   location and overwrites every other field.
//! - A dry run returns the location an upsert would use and writes nothing.
//! - Internal ids are allocated independently of external ids.
//!
//! Resolve-then-write is not atomic. Callers serialize import runs per
//! store, typically by holding a [`crate::lock::ImportLock`].

pub mod github;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ErrorCode, StoreError};
use crate::id::IdAllocator;
use crate::model::{Comment, Issue, Record};
use crate::store::{Location, RecordStore, Scope, Stored};

/// Why a single record could not be imported.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("{kind} '{id}' has no external id")]
    MissingExternalId { kind: &'static str, id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ImportError {
    /// Machine-readable code associated with this import error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingExternalId { .. } => ErrorCode::MissingExternalId,
            Self::Store(err) => err.code(),
        }
    }
}

/// What an upsert did (or, for a dry run, would do).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertAction {
    Created,
    Updated,
    /// The stored record already matched; nothing was written.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub location: Location,
    /// Internal id of the stored record.
    pub id: String,
    pub action: UpsertAction,
    pub dry_run: bool,
}

/// Tally of one import batch.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ImportReport {
    pub fn record(&mut self, result: &Result<UpsertOutcome, ImportError>) {
        match result {
            Ok(outcome) => match outcome.action {
                UpsertAction::Created => self.created += 1,
                UpsertAction::Updated => self.updated += 1,
                UpsertAction::Unchanged => self.unchanged += 1,
            },
            Err(_) => self.failed += 1,
        }
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.created + self.updated + self.unchanged + self.failed + self.skipped
    }
}

/// Create-or-update driver over a [`RecordStore`].
pub struct Reconciler<'s, S: RecordStore> {
    store: &'s mut S,
    ids: IdAllocator,
}

impl<'s, S: RecordStore> Reconciler<'s, S> {
    /// Wrap a store. Every internal id currently in the store is reserved.
    pub fn new(store: &'s mut S) -> Self {
        let ids = IdAllocator::new(store.known_ids());
        Self { store, ids }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &*self.store
    }

    /// Find the stored record in `scope` whose `external_id` equals
    /// `external_id` exactly.
    #[must_use]
    pub fn resolve(&self, external_id: &str, scope: Scope<'_>) -> Option<Location> {
        if external_id.is_empty() {
            return None;
        }
        match scope {
            Scope::Issues => self
                .store
                .issue_by_external_id(external_id)
                .map(|stored| stored.location),
            Scope::Comments(issue) => self
                .store
                .comment_by_external_id(issue, external_id)
                .map(|stored| stored.location),
        }
    }

    /// Create or update an issue keyed by its external id.
    ///
    /// # Errors
    ///
    /// [`ImportError::MissingExternalId`] when the issue carries no external
    /// id; [`ImportError::Store`] when the write fails.
    pub fn upsert_issue(
        &mut self,
        issue: Issue,
        dry_run: bool,
    ) -> Result<UpsertOutcome, ImportError> {
        let external_id = required_external_id(&issue)?;
        let existing = self.store.issue_by_external_id(&external_id);
        self.upsert(
            issue,
            existing,
            dry_run,
            |store, issue| store.allocate_issue(issue),
            |store, at, issue| store.write_issue(at, issue),
        )
    }

    /// Create or update a comment of the issue at `issue`, keyed by the
    /// comment's external id within that issue.
    ///
    /// # Errors
    ///
    /// [`ImportError::MissingExternalId`] when the comment carries no
    /// external id; [`ImportError::Store`] when the write fails.
    pub fn upsert_comment(
        &mut self,
        issue: &Location,
        comment: Comment,
        dry_run: bool,
    ) -> Result<UpsertOutcome, ImportError> {
        let external_id = required_external_id(&comment)?;
        let existing = self.store.comment_by_external_id(issue, &external_id);
        self.upsert(
            comment,
            existing,
            dry_run,
            |store, comment| store.allocate_comment(issue, comment),
            |store, at, comment| store.write_comment(at, comment),
        )
    }

    fn upsert<T, A, W>(
        &mut self,
        mut record: T,
        existing: Option<Stored<T>>,
        dry_run: bool,
        allocate: A,
        write: W,
    ) -> Result<UpsertOutcome, ImportError>
    where
        T: Record,
        A: FnOnce(&S, &T) -> Location,
        W: FnOnce(&mut S, &Location, &T) -> Result<(), StoreError>,
    {
        record.normalize();
        let (location, action) = match existing {
            Some(stored) => {
                record.set_id(stored.record.id().to_string());
                let action = if record == stored.record {
                    UpsertAction::Unchanged
                } else {
                    UpsertAction::Updated
                };
                (stored.location, action)
            }
            None => {
                record.set_id(self.ids.allocate());
                let location = allocate(&*self.store, &record);
                (location, UpsertAction::Created)
            }
        };

        if !dry_run && action != UpsertAction::Unchanged {
            if let Err(err) = write(&mut *self.store, &location, &record) {
                warn!(kind = T::KIND, location = %location, error = %err, "import write failed");
                return Err(err.into());
            }
        }

        debug!(
            kind = T::KIND,
            id = record.id(),
            external_id = record.external_id().unwrap_or_default(),
            location = %location,
            ?action,
            dry_run,
            "reconciled"
        );

        Ok(UpsertOutcome {
            location,
            id: record.id().to_string(),
            action,
            dry_run,
        })
    }
}

fn required_external_id<T: Record>(record: &T) -> Result<String, ImportError> {
    match record.external_id() {
        Some(external_id) if !external_id.is_empty() => Ok(external_id.to_string()),
        _ => Err(ImportError::MissingExternalId {
            kind: T::KIND,
            id: record.id().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{DateTime, Utc};

    fn opened() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
            .expect("valid date")
            .with_timezone(&Utc)
    }

    fn incoming(ext: &str, title: &str) -> Issue {
        Issue::new("", title, opened()).with_external_id(ext)
    }

    #[test]
    fn second_import_updates_first_record() {
        let mut store = MemoryStore::new();
        let mut rec = Reconciler::new(&mut store);

        let first = rec.upsert_issue(incoming("o/r#1", "Crash"), false).expect("create");
        let second = rec
            .upsert_issue(incoming("o/r#1", "Crash on start"), false)
            .expect("update");

        assert_eq!(first.action, UpsertAction::Created);
        assert_eq!(second.action, UpsertAction::Updated);
        assert_eq!(first.location, second.location);
        assert_eq!(first.id, second.id);
        assert_eq!(store.issue_count(), 1);
        let stored = store.issue_by_external_id("o/r#1").expect("stored");
        assert_eq!(stored.record.title, "Crash on start");
    }

    #[test]
    fn identical_reimport_writes_nothing() {
        let mut store = MemoryStore::new();
        let issue = incoming("o/r#1", "Crash");
        {
            let mut rec = Reconciler::new(&mut store);
            rec.upsert_issue(issue.clone(), false).expect("create");
            let again = rec.upsert_issue(issue, false).expect("reimport");
            assert_eq!(again.action, UpsertAction::Unchanged);
        }
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn untrimmed_bodies_reimport_as_unchanged() {
        let mut store = MemoryStore::new();
        let mut rec = Reconciler::new(&mut store);
        let issue = incoming("o/r#1", "Crash").with_body("  Steps\n\n");
        let comment = Comment::new("", "sam", opened(), "me too").with_external_id("c:1");

        let created = rec.upsert_issue(issue.clone(), false).expect("create");
        rec.upsert_comment(&created.location, comment.clone(), false)
            .expect("comment");
        let again = rec.upsert_issue(issue, false).expect("reimport");
        let comment_again = rec
            .upsert_comment(&created.location, comment, false)
            .expect("comment reimport");

        assert_eq!(again.action, UpsertAction::Unchanged);
        assert_eq!(comment_again.action, UpsertAction::Unchanged);
        assert_eq!(store.write_count(), 2);
        let stored = store.issue_by_external_id("o/r#1").expect("stored");
        assert_eq!(stored.record.body, "Steps\n");
    }

    #[test]
    fn identical_titles_with_distinct_external_ids_stay_separate() {
        let mut store = MemoryStore::new();
        let mut rec = Reconciler::new(&mut store);
        let a = rec.upsert_issue(incoming("o/r#1", "Same"), false).expect("a");
        let b = rec.upsert_issue(incoming("o/r#2", "Same"), false).expect("b");
        assert_ne!(a.location, b.location);
        assert_ne!(a.id, b.id);
        assert_eq!(store.issue_count(), 2);
    }

    #[test]
    fn missing_external_id_is_rejected() {
        let mut store = MemoryStore::new();
        let mut rec = Reconciler::new(&mut store);
        let err = rec
            .upsert_issue(Issue::new("x", "no ext", Utc::now()), false)
            .expect_err("must require external id");
        assert_eq!(err.code(), ErrorCode::MissingExternalId);

        let err = rec
            .upsert_issue(incoming("", "empty ext"), false)
            .expect_err("empty external id is absent");
        assert!(matches!(err, ImportError::MissingExternalId { kind: "issue", .. }));
    }

    #[test]
    fn dry_run_reports_location_without_writing() {
        let mut store = MemoryStore::new();
        let mut rec = Reconciler::new(&mut store);
        let preview = rec.upsert_issue(incoming("o/r#1", "Crash"), true).expect("preview");
        assert!(preview.dry_run);
        assert_eq!(preview.action, UpsertAction::Created);
        assert!(rec.resolve("o/r#1", Scope::Issues).is_none());
        assert_eq!(store.issue_count(), 0);
    }

    #[test]
    fn resolve_ignores_records_without_external_id() {
        let mut store = MemoryStore::new();
        let local = Issue::new("abc1234", "local", Utc::now());
        let at = store.allocate_issue(&local);
        store.write_issue(&at, &local).expect("write");

        let rec = Reconciler::new(&mut store);
        assert!(rec.resolve("", Scope::Issues).is_none());
        assert!(rec.resolve("abc1234", Scope::Issues).is_none());
    }

    #[test]
    fn comment_identity_is_scoped_to_its_issue() {
        let mut store = MemoryStore::new();
        let mut rec = Reconciler::new(&mut store);
        let one = rec.upsert_issue(incoming("o/r#1", "one"), false).expect("one");
        let two = rec.upsert_issue(incoming("o/r#2", "two"), false).expect("two");

        let comment = Comment::new("", "sam", Utc::now(), "hi").with_external_id("github:comment:5");
        let c1 = rec
            .upsert_comment(&one.location, comment.clone(), false)
            .expect("c1");
        let c2 = rec.upsert_comment(&two.location, comment, false).expect("c2");

        assert_eq!(c1.action, UpsertAction::Created);
        assert_eq!(c2.action, UpsertAction::Created);
        assert_ne!(c1.location, c2.location);
        assert_eq!(
            rec.resolve("github:comment:5", Scope::Comments(&one.location)),
            Some(c1.location)
        );
    }

    #[test]
    fn failed_write_leaves_earlier_records_committed() {
        let mut store = MemoryStore::new();
        {
            let mut rec = Reconciler::new(&mut store);
            rec.upsert_issue(incoming("o/r#1", "kept"), false).expect("create");
        }
        store.set_read_only(true);
        let mut rec = Reconciler::new(&mut store);
        let err = rec
            .upsert_issue(incoming("o/r#2", "lost"), false)
            .expect_err("write must fail");
        assert_eq!(err.code(), ErrorCode::RecordWriteFailed);
        assert!(rec.resolve("o/r#1", Scope::Issues).is_some());
        assert!(rec.resolve("o/r#2", Scope::Issues).is_none());
    }

    #[test]
    fn report_tallies_outcomes() {
        let mut store = MemoryStore::new();
        let mut rec = Reconciler::new(&mut store);
        let mut report = ImportReport::default();

        report.record(&rec.upsert_issue(incoming("o/r#1", "a"), false));
        report.record(&rec.upsert_issue(incoming("o/r#1", "a"), false));
        report.record(&rec.upsert_issue(incoming("o/r#1", "b"), false));
        report.record(&rec.upsert_issue(Issue::new("", "x", Utc::now()), false));

        assert_eq!(
            report,
            ImportReport {
                created: 1,
                updated: 1,
                unchanged: 1,
                failed: 1,
                skipped: 0,
            }
        );
        assert_eq!(report.total(), 4);
    }
}
