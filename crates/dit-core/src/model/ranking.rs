use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize};

const CURRENT_VERSION: u32 = 1;

/// One human-made ordering of issues, highest priority first.
///
/// Snapshots are written by a ranking UI and read back in full before a
/// rating pass. Reading never fails on odd content: an unparseable
/// `created` reads as absent and a non-list `issues` reads as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingSnapshot {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient_issue_list")]
    pub issues: Vec<String>,
}

impl RankingSnapshot {
    #[must_use]
    pub fn new<I, S>(created: Option<DateTime<Utc>>, issues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version: CURRENT_VERSION,
            created,
            username: None,
            issues: issues.into_iter().map(Into::into).collect(),
        }
    }
}

const fn current_version() -> u32 {
    CURRENT_VERSION
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Text(String),
    Int(i64),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawList {
    List(Vec<RawScalar>),
    Other(IgnoredAny),
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawScalar>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawScalar::Text(text)) => parse_timestamp(&text),
        _ => None,
    })
}

fn lenient_issue_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawList>::deserialize(deserializer)?;
    let Some(RawList::List(items)) = raw else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            RawScalar::Text(id) => Some(id),
            RawScalar::Int(id) => Some(id.to_string()),
            RawScalar::Other(_) => None,
        })
        .collect())
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
