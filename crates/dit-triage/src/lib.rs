#![forbid(unsafe_code)]
//! dit-triage library: priority ratings from ranking snapshots and their
//! display form.
//!
//! # Conventions
//!
//! - **Errors**: the engine never fails; malformed snapshots degrade to
//!   no-ops.
//! - **Logging**: `tracing` macros; [`rating::compute_ratings`] is
//!   instrumented.

pub mod priority;
pub mod rating;

pub use priority::{
    ConfidenceDescriptor, PriorityBucket, PriorityDisplay, calculate_confidence, priority_display,
};
pub use rating::{RatingEngine, RatingSummary, compute_ratings, rank_issues};
