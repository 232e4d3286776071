use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Record, normalize_body};

/// A single comment on an issue.
///
/// `reply_to` names the comment this one answers. A reference to a comment
/// that is not in the working set is not an error; the threader places such
/// a comment at the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub author: String,
    /// Older comment files store this under `created`.
    #[serde(alias = "created")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl Comment {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        author: impl Into<String>,
        date: DateTime<Utc>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            date,
            body: body.into(),
            reply_to: None,
            external_id: None,
        }
    }

    #[must_use]
    pub fn replying_to(mut self, parent: impl Into<String>) -> Self {
        self.reply_to = Some(parent.into());
        self
    }

    #[must_use]
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// First line of the body, used for file naming and previews.
    #[must_use]
    pub fn first_line(&self) -> &str {
        self.body.lines().next().unwrap_or_default()
    }
}

impl Record for Comment {
    const KIND: &'static str = "comment";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    fn slug_source(&self) -> &str {
        self.first_line()
    }

    fn normalize(&mut self) {
        self.body = normalize_body(&self.body);
    }
}

/// Read-only view of a comment positioned in a flattened reply forest.
///
/// Produced by [`crate::thread::thread_comments`]; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadedComment {
    #[serde(flatten)]
    pub comment: Comment,
    /// Nesting level; roots are 0.
    pub depth: usize,
}

impl std::ops::Deref for ThreadedComment {
    type Target = Comment;

    fn deref(&self) -> &Self::Target {
        &self.comment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_created_key_is_read_as_date() {
        let yaml = "id: abc1234\nauthor: Legacy User\ncreated: 2024-03-01T10:00:00Z\nbody: hi\n";
        let comment: Comment = serde_yaml::from_str(yaml).expect("parse legacy comment");
        assert_eq!(comment.date.to_rfc3339(), "2024-03-01T10:00:00+00:00");
        assert_eq!(comment.reply_to, None);
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let date = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .expect("valid date")
            .with_timezone(&Utc);
        let yaml = serde_yaml::to_string(&Comment::new("c1", "a", date, "b")).expect("encode");
        assert!(!yaml.contains("reply_to"));
        assert!(!yaml.contains("external_id"));
    }

    #[test]
    fn first_line_of_empty_body_is_empty() {
        let comment = Comment::new("c1", "a", Utc::now(), "");
        assert_eq!(comment.first_line(), "");
    }
}
