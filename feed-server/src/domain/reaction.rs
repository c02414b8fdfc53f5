use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionType {
    Like,
    Love,
    Haha,
    Wow,
    Sad,
    Angry,
}

impl ReactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionType::Like => "like",
            ReactionType::Love => "love",
            ReactionType::Haha => "haha",
            ReactionType::Wow => "wow",
            ReactionType::Sad => "sad",
            ReactionType::Angry => "angry",
        }
    }
}

impl fmt::Display for ReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "like" => Ok(ReactionType::Like),
            "love" => Ok(ReactionType::Love),
            "haha" => Ok(ReactionType::Haha),
            "wow" => Ok(ReactionType::Wow),
            "sad" => Ok(ReactionType::Sad),
            "angry" => Ok(ReactionType::Angry),
            other => Err(format!("unknown reaction type: {other}")),
        }
    }
}

/// A viewer's reaction to a post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reaction {
    pub content_id: Uuid,
    pub reaction_type: ReactionType,
    pub created_at: DateTime<Utc>,
}

/// Picks the `limit` most frequent reaction kinds; ties go to the kind name.
pub fn top_reactions(counts: &[(ReactionType, i64)], limit: usize) -> Vec<ReactionType> {
    let mut sorted: Vec<(ReactionType, i64)> = counts.iter().copied().filter(|(_, n)| *n > 0).collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
    sorted.into_iter().take(limit).map(|(kind, _)| kind).collect()
}
