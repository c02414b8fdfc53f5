use std::collections::HashSet;

use uuid::Uuid;

/// Who is asking for a feed, with the parts of the social graph the feed
/// queries depend on.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub id: Uuid,
    pub username: String,
    pub following: HashSet<Uuid>,
    pub blocked: HashSet<Uuid>,
    pub blocked_by: HashSet<Uuid>,
}

impl Viewer {
    pub fn new(id: Uuid, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            ..Default::default()
        }
    }

    /// Authors hidden from this viewer in either block direction.
    pub fn excluded_authors(&self) -> Vec<Uuid> {
        self.blocked.union(&self.blocked_by).copied().collect()
    }
}
