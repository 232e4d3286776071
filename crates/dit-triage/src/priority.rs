//! Display-facing view of a rating: confidence, urgency bucket, and the
//! `{text, tooltip}` pair shown next to an issue.

use std::fmt;

use dit_core::config::RatingConfig;
use serde::Serialize;

use crate::rating::RatingSummary;

/// Shown instead of the bucket when judgments about an issue disagree.
pub const CONTESTED_MARKER: &str = "⚖️";
/// Shown when there is not yet enough evidence to trust the bucket.
pub const UNCERTAIN_MARKER: &str = "?";

const UNRANKED_TOLERANCE: f64 = 0.001;
const APPEARANCE_PENALTY: f64 = 0.1;
const APPEARANCE_SCALE: f64 = 5.0;
const CONFIDENCE_FLOOR: f64 = 0.03;

/// How much to trust an issue's ordinal, rounded to two decimals.
///
/// Positive means consistent judgments, negative means conflicting ones.
/// Zero appearances always give `0.0`.
#[must_use]
pub fn calculate_confidence(summary: &RatingSummary, config: &RatingConfig) -> f64 {
    if summary.appearance_count == 0 {
        return 0.0;
    }
    let n = f64::from(summary.appearance_count);
    let shrinkage = config.sigma - summary.sigma;
    let raw = n
        .mul_add(-APPEARANCE_PENALTY, shrinkage)
        .mul_add(n / APPEARANCE_SCALE, CONFIDENCE_FLOOR);
    (raw * 100.0).round() / 100.0
}

/// Still sitting at the prior, i.e. never meaningfully compared.
#[must_use]
pub fn is_unranked(summary: &RatingSummary, config: &RatingConfig) -> bool {
    (summary.mu - config.mu).abs() < UNRANKED_TOLERANCE
        && (summary.sigma - config.sigma).abs() < UNRANKED_TOLERANCE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PriorityBucket {
    Urgent,
    High,
    Normal,
    Low,
    VeryLow,
}

impl PriorityBucket {
    #[must_use]
    pub fn from_ordinal(ordinal: f64) -> Self {
        if ordinal >= 10.0 {
            Self::Urgent
        } else if ordinal >= 5.0 {
            Self::High
        } else if ordinal >= 0.0 {
            Self::Normal
        } else if ordinal >= -5.0 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Urgent => "Urgent",
            Self::High => "High",
            Self::Normal => "Normal",
            Self::Low => "Low",
            Self::VeryLow => "Very Low",
        }
    }

    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Urgent => "🔥",
            Self::High => "⚡",
            Self::Normal => "🟦",
            Self::Low => "🧊",
            Self::VeryLow => "💤",
        }
    }
}

impl fmt::Display for PriorityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConfidenceDescriptor {
    NotConfidentYet,
    SlightlyConfident,
    Confident,
    HighlyConfident,
    SlightlyContested,
    Contested,
    HighlyContested,
}

impl ConfidenceDescriptor {
    #[must_use]
    pub fn from_confidence(confidence: f64) -> Self {
        let magnitude = confidence.abs();
        if magnitude < f64::EPSILON {
            Self::NotConfidentYet
        } else if confidence > 0.0 {
            if magnitude >= 1.5 {
                Self::HighlyConfident
            } else if magnitude >= 0.5 {
                Self::Confident
            } else {
                Self::SlightlyConfident
            }
        } else if magnitude >= 1.5 {
            Self::HighlyContested
        } else if magnitude >= 0.5 {
            Self::Contested
        } else {
            Self::SlightlyContested
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotConfidentYet => "not confident yet",
            Self::SlightlyConfident => "slightly confident",
            Self::Confident => "confident",
            Self::HighlyConfident => "highly confident",
            Self::SlightlyContested => "slightly contested",
            Self::Contested => "contested",
            Self::HighlyContested => "highly contested",
        }
    }
}

impl fmt::Display for ConfidenceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityDisplay {
    pub text: String,
    pub tooltip: String,
}

/// What to show next to an issue, or `None` for an unrated or unranked one.
#[must_use]
pub fn priority_display(
    summary: Option<&RatingSummary>,
    config: &RatingConfig,
) -> Option<PriorityDisplay> {
    let summary = summary?;
    if is_unranked(summary, config) {
        return None;
    }

    let confidence = calculate_confidence(summary, config);
    let bucket = PriorityBucket::from_ordinal(summary.ordinal);
    let descriptor = ConfidenceDescriptor::from_confidence(confidence);

    let text = if confidence <= -0.5 {
        CONTESTED_MARKER
    } else if confidence > 0.0 {
        bucket.glyph()
    } else {
        UNCERTAIN_MARKER
    };

    Some(PriorityDisplay {
        text: text.to_string(),
        tooltip: format!("Priority: {bucket} ({descriptor})"),
    })
}
