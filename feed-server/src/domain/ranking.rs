//! Engagement score with exponential time decay.
//!
//! The feed queries compute the same expression inside Postgres; this module
//! holds the constants they share and a pure version used for in-memory ranking.

use chrono::{DateTime, Utc};

pub const REACTION_WEIGHT: i64 = 2;
pub const COMMENT_WEIGHT: i64 = 3;
pub const SHARE_WEIGHT: i64 = 5;

/// e-folding time of the decay, in seconds (score drops to 1/e after one day).
pub const DECAY_SECONDS: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Engagement {
    pub reactions: i64,
    pub comments: i64,
    pub shares: i64,
}

impl Engagement {
    pub fn weighted(&self) -> i64 {
        REACTION_WEIGHT * self.reactions + COMMENT_WEIGHT * self.comments + SHARE_WEIGHT * self.shares
    }
}

/// `(2r + 3c + 5s) * exp(-age / 1 day)`, evaluated at `now`.
pub fn decay_score(engagement: Engagement, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_seconds = (now - created_at).num_milliseconds() as f64 / 1000.0;
    engagement.weighted() as f64 * (-age_seconds / DECAY_SECONDS).exp()
}

/// SQL expression for the score over the `r`, `cm` and `s` join aliases and
/// the `c.created_at` column.
pub fn score_sql() -> String {
    format!(
        "(({REACTION_WEIGHT} * COUNT(DISTINCT r.id) + {COMMENT_WEIGHT} * COUNT(DISTINCT cm.id) \
         + {SHARE_WEIGHT} * COUNT(DISTINCT s.id))::float8 \
         * EXP(-(EXTRACT(EPOCH FROM (NOW() - c.created_at))::float8 / {DECAY_SECONDS:.1})))"
    )
}
