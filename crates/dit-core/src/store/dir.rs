//! YAML-on-disk record store under a `.dit` directory.
//!
//! # Directory Layout
//!
//! ```text
//! .dit/
//!   issues/
//!     crash-on-start-abc1234/
//!       issue.yaml
//!       comment-repro-steps-k3v9x0q.yaml
//!     2025/                       # spill level once issues/ is full
//!       03/
//!         slow-sync-p0q1r2s/
//!           issue.yaml
//!   rankings/
//!     2025/03/14/sam-z8y7x6w.yaml
//! ```
//!
//! New issue directories go to the first level with fewer than
//! `shard_threshold` entries: `issues/`, `issues/YYYY/`, `issues/YYYY/MM/`,
//! then `issues/YYYY/MM/DD/`, dated by the issue's `created` (UTC).
//!
//! Writes replace files atomically (temp file + rename).

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{DEFAULT_SHARD_THRESHOLD, StoreConfig};
use crate::error::StoreError;
use crate::id::IdAllocator;
use crate::model::{Comment, Issue, RankingSnapshot, Record};
use crate::slug::{COMMENT_SLUG_LEN, ISSUE_SLUG_LEN, slugify};

use super::{Location, RecordStore, Stored};

const ISSUES_DIR: &str = "issues";
const RANKINGS_DIR: &str = "rankings";
const ISSUE_FILE: &str = "issue.yaml";
const COMMENT_PREFIX: &str = "comment-";
const YAML_EXT: &str = ".yaml";

/// Record store rooted at a `.dit` directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    dit_dir: PathBuf,
    shard_threshold: usize,
}

impl DirStore {
    /// Create a store for the given `.dit` directory. Nothing is created on
    /// disk until the first write.
    #[must_use]
    pub fn new(dit_dir: impl Into<PathBuf>) -> Self {
        Self {
            dit_dir: dit_dir.into(),
            shard_threshold: DEFAULT_SHARD_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_config(dit_dir: impl Into<PathBuf>, config: &StoreConfig) -> Self {
        Self {
            dit_dir: dit_dir.into(),
            shard_threshold: config.shard_threshold.max(1),
        }
    }

    #[must_use]
    pub fn issues_dir(&self) -> PathBuf {
        self.dit_dir.join(ISSUES_DIR)
    }

    #[must_use]
    pub fn rankings_dir(&self) -> PathBuf {
        self.dit_dir.join(RANKINGS_DIR)
    }

    /// Every directory holding an `issue.yaml`, sorted by path.
    fn issue_dirs(&self) -> Vec<PathBuf> {
        let root = self.issues_dir();
        if !root.is_dir() {
            return Vec::new();
        }

        let mut dirs: Vec<PathBuf> = WalkDir::new(&root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Error accessing entry under {}: {}", root.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_dir() && entry.path().join(ISSUE_FILE).is_file())
            .map(walkdir::DirEntry::into_path)
            .collect();
        dirs.sort();
        dirs
    }

    /// Locate an issue directory by internal id (directory name ends in
    /// `-<id>`).
    #[must_use]
    pub fn issue_by_id(&self, id: &str) -> Option<Stored<Issue>> {
        let suffix = format!("-{id}");
        self.issue_dirs()
            .into_iter()
            .filter(|dir| {
                dir.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(&suffix))
            })
            .find_map(|dir| {
                let record: Issue = read_yaml(&dir.join(ISSUE_FILE))?;
                (record.id == id).then(|| Stored {
                    location: Location::new(dir),
                    record,
                })
            })
    }

    /// Number of comment files in an issue directory.
    #[must_use]
    pub fn comment_count(&self, issue: &Location) -> usize {
        comment_files(issue.as_path()).len()
    }

    /// Pick the directory level a new issue created at `created` goes in.
    fn target_dir(&self, created: DateTime<Utc>) -> PathBuf {
        let root = self.issues_dir();
        let levels = [
            format!("{:04}", created.year()),
            format!("{:02}", created.month()),
            format!("{:02}", created.day()),
        ];

        let mut current = root;
        for level in levels {
            if !current.is_dir() || self.entry_count(&current) < self.shard_threshold {
                return current;
            }
            current = current.join(level);
        }
        current
    }

    fn entry_count(&self, dir: &Path) -> usize {
        match fs::read_dir(dir) {
            Ok(entries) => entries.count(),
            Err(e) => {
                warn!("Failed to list {}: {}", dir.display(), e);
                0
            }
        }
    }

    /// All ranking snapshots in path order: by day, then by file name.
    #[must_use]
    pub fn load_rankings(&self) -> Vec<RankingSnapshot> {
        let root = self.rankings_dir();
        if !root.is_dir() {
            return Vec::new();
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| name.ends_with(YAML_EXT))
            })
            .map(walkdir::DirEntry::into_path)
            .collect();
        files.sort();

        files.iter().filter_map(|path| read_yaml(path)).collect()
    }

    /// Write a ranking snapshot under `rankings/YYYY/MM/DD/<user>-<id>.yaml`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the file cannot be encoded or written.
    pub fn record_ranking(
        &self,
        snapshot: &RankingSnapshot,
        ids: &mut IdAllocator,
    ) -> Result<Location, StoreError> {
        let day = snapshot.created.unwrap_or_else(Utc::now);
        let user = sanitize_username(snapshot.username.as_deref().unwrap_or("unknown"));
        let path = self
            .rankings_dir()
            .join(format!("{:04}", day.year()))
            .join(format!("{:02}", day.month()))
            .join(format!("{:02}", day.day()))
            .join(format!("{user}-{}{YAML_EXT}", ids.allocate()));

        write_yaml(&path, snapshot)?;
        debug!(path = %path.display(), issues = snapshot.issues.len(), "recorded ranking");
        Ok(Location::new(path))
    }
}

impl RecordStore for DirStore {
    fn issues(&self) -> Vec<Stored<Issue>> {
        self.issue_dirs()
            .into_iter()
            .filter_map(|dir| {
                let record = read_yaml(&dir.join(ISSUE_FILE))?;
                Some(Stored {
                    location: Location::new(dir),
                    record,
                })
            })
            .collect()
    }

    fn comments(&self, issue: &Location) -> Vec<Stored<Comment>> {
        comment_files(issue.as_path())
            .into_iter()
            .filter_map(|path| {
                let record = read_yaml(&path)?;
                Some(Stored {
                    location: Location::new(path),
                    record,
                })
            })
            .collect()
    }

    fn write_issue(&mut self, at: &Location, issue: &Issue) -> Result<(), StoreError> {
        let mut normalized = issue.clone();
        normalized.normalize();
        write_yaml(&at.as_path().join(ISSUE_FILE), &normalized)
    }

    fn write_comment(&mut self, at: &Location, comment: &Comment) -> Result<(), StoreError> {
        let mut normalized = comment.clone();
        normalized.normalize();
        write_yaml(at.as_path(), &normalized)
    }

    fn allocate_issue(&self, issue: &Issue) -> Location {
        let name = format!("{}-{}", slugify(issue.slug_source(), ISSUE_SLUG_LEN), issue.id);
        Location::new(self.target_dir(issue.created).join(name))
    }

    fn allocate_comment(&self, issue: &Location, comment: &Comment) -> Location {
        let first_line: String = comment.slug_source().chars().take(COMMENT_SLUG_LEN).collect();
        let name = format!(
            "{COMMENT_PREFIX}{}-{}{YAML_EXT}",
            slugify(&first_line, COMMENT_SLUG_LEN),
            comment.id
        );
        issue.join(name)
    }
}

fn comment_files(issue_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(issue_dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_name().to_str().is_some_and(|name| {
                name.starts_with(COMMENT_PREFIX) && name.ends_with(YAML_EXT)
            })
        })
        .map(|entry| entry.path())
        .collect();
    files.sort();
    files
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };
    match parse_yaml(path, &content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(code = %e.code(), "Skipping unparseable record: {e}");
            None
        }
    }
}

fn parse_yaml<T: DeserializeOwned>(path: &Path, content: &str) -> Result<T, StoreError> {
    serde_yaml::from_str(content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let encoded = serde_yaml::to_string(value).map_err(|source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, encoded.as_bytes())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("record");
    let tmp = parent.join(format!(".{file_name}.tmp"));

    let mut file = fs::File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
    file.write_all(bytes).map_err(|e| StoreError::io(&tmp, e))?;
    file.sync_all().map_err(|e| StoreError::io(&tmp, e))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
}

fn sanitize_username(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
