//! Priority rating engine.
//!
//! Replays every [`RankingSnapshot`] as a multi-way ranked comparison and
//! keeps one [`Rating`] per issue id. Ratings are always recomputed from the
//! full snapshot history; nothing here is persisted.
//!
//! # Snapshot order
//!
//! Timestamped snapshots replay first, oldest first. Snapshots without a
//! `created` follow, in the order they were given. Equal timestamps keep
//! their given order.
//!
//! # Degenerate snapshots
//!
//! - An empty issue list is skipped.
//! - A repeated id counts once, at its first (best) position.
//! - A single issue counts as an appearance but moves nothing.

pub mod plackett_luce;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use dit_core::config::RatingConfig;
use dit_core::model::RankingSnapshot;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

pub use plackett_luce::{Rating, rate};

/// Derived rating of one issue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub mu: f64,
    pub sigma: f64,
    pub ordinal: f64,
    /// Number of snapshots the issue appeared in.
    pub appearance_count: u32,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    rating: Rating,
    appearances: u32,
}

/// Incremental replay state. [`compute_ratings`] is the one-shot form.
#[derive(Debug, Clone)]
pub struct RatingEngine {
    config: RatingConfig,
    entries: BTreeMap<String, Entry>,
}

impl RatingEngine {
    #[must_use]
    pub const fn new(config: RatingConfig) -> Self {
        Self {
            config,
            entries: BTreeMap::new(),
        }
    }

    /// Apply one snapshot on top of the current state.
    pub fn observe(&mut self, snapshot: &RankingSnapshot) {
        let mut seen = HashSet::new();
        let ids: Vec<&str> = snapshot
            .issues
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect();

        if ids.is_empty() {
            return;
        }

        let prior = Rating::initial(&self.config);
        let current: Vec<Rating> = ids
            .iter()
            .map(|id| {
                let entry = self.entries.entry((*id).to_string()).or_insert(Entry {
                    rating: prior,
                    appearances: 0,
                });
                entry.appearances += 1;
                entry.rating
            })
            .collect();

        let updated = rate(&current, &self.config);
        for (id, rating) in ids.iter().zip(updated) {
            if let Some(entry) = self.entries.get_mut(*id) {
                entry.rating = rating;
            }
        }
    }

    #[must_use]
    pub fn summary(&self, id: &str) -> Option<RatingSummary> {
        self.entries.get(id).map(|entry| self.summarize(entry))
    }

    #[must_use]
    pub fn summaries(&self) -> BTreeMap<String, RatingSummary> {
        self.entries
            .iter()
            .map(|(id, entry)| (id.clone(), self.summarize(entry)))
            .collect()
    }

    fn summarize(&self, entry: &Entry) -> RatingSummary {
        RatingSummary {
            mu: entry.rating.mu,
            sigma: entry.rating.sigma,
            ordinal: entry.rating.ordinal(&self.config),
            appearance_count: entry.appearances,
        }
    }
}

/// Replay order: timestamped snapshots by `created`, then untimestamped ones
/// in input order.
#[must_use]
pub fn order_snapshots(snapshots: &[RankingSnapshot]) -> Vec<&RankingSnapshot> {
    let mut ordered: Vec<&RankingSnapshot> = snapshots.iter().collect();
    ordered.sort_by_key(|snapshot| (snapshot.created.is_none(), snapshot.created));
    ordered
}

/// Compute every issue's rating from the full snapshot history.
#[must_use]
#[instrument(skip_all, fields(snapshots = snapshots.len()))]
pub fn compute_ratings(
    snapshots: &[RankingSnapshot],
    config: &RatingConfig,
) -> BTreeMap<String, RatingSummary> {
    let mut engine = RatingEngine::new(*config);
    for snapshot in order_snapshots(snapshots) {
        engine.observe(snapshot);
    }
    let summaries = engine.summaries();
    debug!(issues = summaries.len(), "ratings computed");
    summaries
}

/// Issue ids by `ordinal`, highest first; ties broken by id.
#[must_use]
pub fn rank_issues(ratings: &BTreeMap<String, RatingSummary>) -> Vec<String> {
    let mut ranked: Vec<(&String, f64)> = ratings
        .iter()
        .map(|(id, summary)| (id, summary.ordinal))
        .collect();
    ranked.sort_by(|(a_id, a), (b_id, b)| match b.total_cmp(a) {
        Ordering::Equal => a_id.cmp(b_id),
        other => other,
    });
    ranked.into_iter().map(|(id, _)| id.clone()).collect()
}
