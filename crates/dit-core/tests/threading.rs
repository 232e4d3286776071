//! Property tests for comment threading: every comment is emitted once, a
//! reply follows its parent, and sibling groups run oldest first.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, TimeZone, Utc};
use dit_core::model::{Comment, ThreadedComment};
use dit_core::thread_comments;
use proptest::prelude::*;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid base date")
}

/// Comments `c0..cN` with small minute offsets (so ties happen) and
/// `reply_to` pointing anywhere, including unknown ids and themselves.
fn arb_comments() -> impl Strategy<Value = Vec<Comment>> {
    prop::collection::vec((0i64..6, prop::option::of(0usize..14)), 0..12).prop_map(|specs| {
        specs
            .iter()
            .enumerate()
            .map(|(i, (minutes, parent))| {
                let comment = Comment::new(
                    format!("c{i}"),
                    "sam",
                    base() + Duration::minutes(*minutes),
                    format!("body {i}"),
                );
                match parent {
                    Some(p) => comment.replying_to(format!("c{p}")),
                    None => comment,
                }
            })
            .collect()
    })
}

fn parent_of(threaded: &[ThreadedComment], idx: usize) -> Option<usize> {
    let depth = threaded[idx].depth;
    if depth == 0 {
        return None;
    }
    (0..idx).rev().find(|&j| threaded[j].depth == depth - 1)
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn every_comment_is_emitted_once(comments in arb_comments()) {
        let threaded = thread_comments(comments.clone());
        prop_assert_eq!(threaded.len(), comments.len());
        let ids: HashSet<&str> = threaded.iter().map(|t| t.id.as_str()).collect();
        prop_assert_eq!(ids.len(), comments.len());
    }

    #[test]
    fn depth_never_jumps_by_more_than_one(comments in arb_comments()) {
        let threaded = thread_comments(comments);
        if let Some(first) = threaded.first() {
            prop_assert_eq!(first.depth, 0);
        }
        for pair in threaded.windows(2) {
            prop_assert!(pair[1].depth <= pair[0].depth + 1);
        }
    }

    #[test]
    fn nested_comments_sit_under_the_comment_they_reply_to(comments in arb_comments()) {
        let threaded = thread_comments(comments);
        for idx in 0..threaded.len() {
            if let Some(parent) = parent_of(&threaded, idx) {
                prop_assert_eq!(threaded[idx].reply_to.as_deref(), Some(threaded[parent].id.as_str()));
            }
        }
    }

    #[test]
    fn siblings_are_ordered_by_date(comments in arb_comments()) {
        let threaded = thread_comments(comments);
        let mut groups: HashMap<Option<usize>, Vec<DateTime<Utc>>> = HashMap::new();
        for idx in 0..threaded.len() {
            groups.entry(parent_of(&threaded, idx)).or_default().push(threaded[idx].date);
        }
        for dates in groups.values() {
            prop_assert!(dates.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn threading_is_deterministic(comments in arb_comments()) {
        prop_assert_eq!(thread_comments(comments.clone()), thread_comments(comments));
    }
}

#[test]
fn reply_dated_before_its_parent_still_nests() {
    let parent = Comment::new("p", "sam", base() + Duration::hours(1), "question");
    let early = Comment::new("r", "kim", base(), "answer").replying_to("p");

    let threaded = thread_comments([parent, early]);
    let shape: Vec<(&str, usize)> = threaded.iter().map(|t| (t.id.as_str(), t.depth)).collect();
    assert_eq!(shape, vec![("p", 0), ("r", 1)]);
}
