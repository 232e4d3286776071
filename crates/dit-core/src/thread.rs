//! Reply-forest reconstruction for issue comments.
//!
//! Comments are stored flat; each may name the comment it replies to. This
//! module rebuilds the forest and flattens it to a depth-annotated pre-order
//! sequence, which is what every comment view renders.
//!
//! # Ordering
//!
//! - Roots and each sibling group are ordered by `date` ascending.
//! - Equal dates keep their relative order from the input (stable sort).
//! - A child is emitted directly after its parent's earlier descendants and
//!   before the parent's next sibling.
//!
//! # Malformed references
//!
//! A comment is placed at the root when its `reply_to` is missing, names an
//! id not in the input, names itself, or would close a cycle with comments
//! already attached. Every input comment appears in the output exactly once.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{Comment, ThreadedComment};

/// Thread a flat list of comments into a pre-order, depth-annotated list.
#[must_use]
pub fn thread_comments<I>(comments: I) -> Vec<ThreadedComment>
where
    I: IntoIterator<Item = Comment>,
{
    let mut sorted: Vec<Comment> = comments.into_iter().collect();
    sorted.sort_by_key(|comment| comment.date);

    let forest = Forest::build(&sorted);
    let mut slots: Vec<Option<Comment>> = sorted.into_iter().map(Some).collect();

    let mut out = Vec::with_capacity(slots.len());
    let mut stack: Vec<(usize, usize)> = forest.roots.iter().rev().map(|&i| (i, 0)).collect();

    while let Some((node, depth)) = stack.pop() {
        if let Some(comment) = slots[node].take() {
            out.push(ThreadedComment { comment, depth });
        }
        stack.extend(forest.children[node].iter().rev().map(|&c| (c, depth + 1)));
    }

    out
}

/// Arena of comment indices; children referenced by index, never by pointer.
struct Forest {
    roots: Vec<usize>,
    children: Vec<Vec<usize>>,
}

impl Forest {
    fn build(sorted: &[Comment]) -> Self {
        let mut by_id: HashMap<&str, usize> = HashMap::with_capacity(sorted.len());
        for (idx, comment) in sorted.iter().enumerate() {
            by_id.entry(comment.id.as_str()).or_insert(idx);
        }

        let mut parent: Vec<Option<usize>> = vec![None; sorted.len()];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); sorted.len()];
        let mut roots = Vec::new();
        let mut detached = 0_usize;

        for (idx, comment) in sorted.iter().enumerate() {
            let target = comment
                .reply_to
                .as_deref()
                .and_then(|reply_to| by_id.get(reply_to).copied())
                .filter(|&candidate| !is_ancestor_or_self(&parent, idx, candidate));

            if let Some(p) = target {
                parent[idx] = Some(p);
                children[p].push(idx);
            } else {
                if comment.reply_to.is_some() {
                    detached += 1;
                }
                roots.push(idx);
            }
        }

        if detached > 0 {
            debug!(detached, "comments with unresolvable reply_to placed at root");
        }

        Self { roots, children }
    }
}

/// Whether `node` is `candidate` or one of its ancestors.
fn is_ancestor_or_self(parent: &[Option<usize>], node: usize, candidate: usize) -> bool {
    let mut cursor = Some(candidate);
    while let Some(current) = cursor {
        if current == node {
            return true;
        }
        cursor = parent[current];
    }
    false
}
