//! Pure ranking formulas. No I/O.

pub mod confidence;
pub mod formulas;
pub mod qa;

pub use confidence::{confidence, wilson_lower_bound, CONFIDENCE_Z};
pub use formulas::{
    controversy, epoch_seconds, hot, hot_at_seconds, round_to, score, HOT_DECAY_SECONDS,
    HOT_EPOCH_SECONDS, HOT_PRECISION,
};
pub use qa::{qa, qa_from_scores, QaPost, QA_LENGTH_DIVISOR};
