//! Typed records persisted by the store: issues, comments and ranking
//! snapshots.

pub mod comment;
pub mod issue;
pub mod ranking;

pub use comment::{Comment, ThreadedComment};
pub use issue::{ImportStamp, Issue, Status};
pub use ranking::RankingSnapshot;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A record addressable by an internal id and, when imported, by the id it
/// carries in a foreign tracker.
pub trait Record: Clone + PartialEq + Serialize + DeserializeOwned {
    /// Lowercase noun used in log lines and error messages.
    const KIND: &'static str;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn external_id(&self) -> Option<&str>;

    /// Text the store derives a human-readable file or directory slug from.
    fn slug_source(&self) -> &str;

    /// Bring the record into the form every store persists, so a stored
    /// record and an incoming copy of it compare equal.
    fn normalize(&mut self);
}

/// Normalize free text to its stored form: trimmed, one trailing newline.
#[must_use]
pub fn normalize_body(body: &str) -> String {
    let mut out = body.trim().to_string();
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::normalize_body;

    #[test]
    fn normalize_body_trims_and_terminates() {
        assert_eq!(normalize_body("  hello\n\n"), "hello\n");
        assert_eq!(normalize_body(""), "\n");
        assert_eq!(normalize_body("a\nb"), "a\nb\n");
    }
}
