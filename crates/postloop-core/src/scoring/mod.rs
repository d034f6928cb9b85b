//! Scoring: blending engagement/preference signal for curation ranking
//! ([`preference`]) and rubric-based quality grading of generated text
//! ([`post_scorer`]).

pub mod post_scorer;
pub mod preference;

pub use post_scorer::{score_post, PostType, ScoreResult};
pub use preference::{score_preference, PreferenceScore};
