//! Mapping GitHub issue and comment payloads onto dit records, and driving a
//! fetched batch through the [`Reconciler`].
//!
//! Fetching is the caller's job; this module starts from deserialized REST
//! payloads. External ids are `owner/repo#<number>` for issues and
//! `github:comment:<id>` for comments.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::ImportConfig;
use crate::model::{Comment, ImportStamp, Issue, Status, normalize_body};
use crate::store::RecordStore;

use super::{ImportReport, Reconciler};

const GITHUB_HOST: &str = "github.com";
const SSH_PREFIX: &str = "git@github.com:";
const UNKNOWN_AUTHOR: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl RepoSlug {
    /// Parse `owner/repo`, `https://github.com/owner/repo(.git)`,
    /// `github.com/owner/repo` or `git@github.com:owner/repo.git`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();

        let path = if let Some(rest) = trimmed.strip_prefix(SSH_PREFIX) {
            rest
        } else if trimmed.contains("://") || trimmed.starts_with(GITHUB_HOST) {
            let without_scheme = trimmed
                .split_once("://")
                .map_or(trimmed, |(_, rest)| rest);
            let Some((host, rest)) = without_scheme.split_once('/') else {
                bail!("invalid GitHub URL '{trimmed}': expected https://github.com/<owner>/<repo>");
            };
            if host.rsplit('@').next() != Some(GITHUB_HOST) {
                bail!("invalid GitHub URL '{trimmed}': host must be {GITHUB_HOST}");
            }
            rest
        } else {
            trimmed
        };

        let mut parts = path
            .trim_end_matches('/')
            .trim_end_matches(".git")
            .split('/')
            .filter(|part| !part.is_empty());

        let (Some(owner), Some(repo)) = (parts.next(), parts.next()) else {
            bail!("invalid repo '{trimmed}': expected <owner>/<repo>");
        };

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    #[must_use]
    pub fn issue_external_id(&self, number: u64) -> String {
        format!("{}#{number}", self.full_name())
    }
}

#[must_use]
pub fn comment_external_id(comment_id: u64) -> String {
    format!("github:comment:{comment_id}")
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GitHubLabel {
    Name(String),
    Object { name: String },
}

impl GitHubLabel {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Object { name } => name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    #[serde(default)]
    pub assignee: Option<GitHubUser>,
    #[serde(default)]
    pub comments: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubComment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<GitHubUser>,
}

/// Provenance written into every issue of one import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportContext {
    pub source: String,
    pub tool_version: String,
    pub at: DateTime<Utc>,
}

impl ImportContext {
    #[must_use]
    pub fn from_config(config: &ImportConfig, at: DateTime<Utc>) -> Self {
        Self {
            source: config.source.clone(),
            tool_version: config.tool_version.clone(),
            at,
        }
    }
}

impl GitHubIssue {
    #[must_use]
    pub const fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Map to an [`Issue`] with an empty internal id; the reconciler assigns
    /// or recovers the real one.
    #[must_use]
    pub fn to_issue(&self, repo: &RepoSlug, ctx: &ImportContext) -> Issue {
        let external_id = repo.issue_external_id(self.number);
        Issue {
            id: String::new(),
            external_id: Some(external_id.clone()),
            title: self.title.clone(),
            status: if self.state.eq_ignore_ascii_case("closed") {
                Status::Closed
            } else {
                Status::Open
            },
            created: self.created_at,
            author: Some(login_or_unknown(self.user.as_ref())),
            assignee: self.assignee.as_ref().map(|user| user.login.clone()),
            labels: self.labels.iter().map(|l| l.name().to_string()).collect(),
            url: self.html_url.clone(),
            import: Some(ImportStamp {
                src: ctx.source.clone(),
                at: ctx.at,
                tool_version: ctx.tool_version.clone(),
                external_id,
            }),
            body: normalize_body(self.body.as_deref().unwrap_or_default()),
        }
    }
}

impl GitHubComment {
    #[must_use]
    pub fn to_comment(&self) -> Comment {
        Comment {
            id: String::new(),
            author: login_or_unknown(self.user.as_ref()),
            date: self.created_at,
            body: normalize_body(self.body.as_deref().unwrap_or_default()),
            reply_to: None,
            external_id: Some(comment_external_id(self.id)),
        }
    }
}

fn login_or_unknown(user: Option<&GitHubUser>) -> String {
    user.map_or_else(|| UNKNOWN_AUTHOR.to_string(), |u| u.login.clone())
}

/// An issue with the comments fetched for it.
#[derive(Debug, Clone)]
pub struct FetchedIssue {
    pub issue: GitHubIssue,
    pub comments: Vec<GitHubComment>,
}

/// One entry of an ordered import plan.
#[derive(Debug, Clone)]
pub struct PlannedIssue {
    pub external_id: String,
    pub fetched: FetchedIssue,
    pub is_new: bool,
    /// When this issue was last imported, if ever.
    pub last_import: Option<DateTime<Utc>>,
    /// Whether the remote has more comments than the local copy.
    pub needs_comments: bool,
}

/// Order a fetched batch for import: pull requests dropped, never-imported
/// issues first, then the stalest imports first. Ties keep fetch order.
pub fn plan_issue_batch<S: RecordStore>(
    store: &S,
    repo: &RepoSlug,
    batch: Vec<FetchedIssue>,
) -> Vec<PlannedIssue> {
    let mut plan: Vec<PlannedIssue> = batch
        .into_iter()
        .filter(|fetched| !fetched.issue.is_pull_request())
        .map(|fetched| {
            let external_id = repo.issue_external_id(fetched.issue.number);
            let existing = store.issue_by_external_id(&external_id);
            let local_comments = existing
                .as_ref()
                .map_or(0, |stored| store.comments(&stored.location).len());
            let last_import = existing
                .as_ref()
                .and_then(|stored| stored.record.import.as_ref())
                .map(|stamp| stamp.at);
            PlannedIssue {
                needs_comments: (local_comments as u64) < fetched.issue.comments,
                is_new: existing.is_none(),
                last_import,
                external_id,
                fetched,
            }
        })
        .collect();

    plan.sort_by_key(|item| (!item.is_new, item.last_import));
    plan
}

/// Run a fetched batch through the reconciler, in [`plan_issue_batch`] order.
///
/// Each issue is upserted, then its comments when the remote has more than
/// the local copy; otherwise the comments count as skipped. A record that
/// fails is counted and logged and the batch moves on; records already
/// written stay written. Comments of an issue that failed are skipped too.
#[instrument(skip_all, fields(repo = %repo.full_name(), dry_run = dry_run))]
pub fn import_github_batch<S: RecordStore>(
    reconciler: &mut Reconciler<'_, S>,
    repo: &RepoSlug,
    ctx: &ImportContext,
    batch: Vec<FetchedIssue>,
    dry_run: bool,
) -> ImportReport {
    let mut report = ImportReport::default();
    let plan = plan_issue_batch(reconciler.store(), repo, batch);

    for PlannedIssue {
        fetched,
        needs_comments,
        ..
    } in plan
    {
        let result = reconciler.upsert_issue(fetched.issue.to_issue(repo, ctx), dry_run);
        report.record(&result);
        let issue_location = match result {
            Ok(outcome) => outcome.location,
            Err(err) => {
                warn!(
                    number = fetched.issue.number,
                    code = %err.code(),
                    "skipping issue: {err}"
                );
                report.skipped += fetched.comments.len();
                continue;
            }
        };

        if !needs_comments {
            debug!(number = fetched.issue.number, "local comments up to date");
            report.skipped += fetched.comments.len();
            continue;
        }

        for comment in &fetched.comments {
            let result = reconciler.upsert_comment(&issue_location, comment.to_comment(), dry_run);
            if let Err(err) = &result {
                warn!(comment = comment.id, code = %err.code(), "comment import failed: {err}");
            }
            report.record(&result);
        }
    }

    info!(
        created = report.created,
        updated = report.updated,
        unchanged = report.unchanged,
        failed = report.failed,
        skipped = report.skipped,
        "import batch finished"
    );
    report
}
