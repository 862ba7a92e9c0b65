//! Generic attachments and their tagged owner key.
//!
//! # Responsibility
//! - Replace runtime content-type introspection with a closed tagged
//!   variant key dispatching per kind.

/// Entity an attachment hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachedTo {
    UserStory(i64),
    Task(i64),
    Issue(i64),
    Epic(i64),
    WikiPage(i64),
    Milestone(i64),
}

impl AttachedTo {
    /// Token stored in `attachments.content_kind`.
    pub fn kind_token(self) -> &'static str {
        match self {
            Self::UserStory(_) => "userstory",
            Self::Task(_) => "task",
            Self::Issue(_) => "issue",
            Self::Epic(_) => "epic",
            Self::WikiPage(_) => "wiki_page",
            Self::Milestone(_) => "milestone",
        }
    }

    /// Row id of the owning entity.
    pub fn object_id(self) -> i64 {
        match self {
            Self::UserStory(id)
            | Self::Task(id)
            | Self::Issue(id)
            | Self::Epic(id)
            | Self::WikiPage(id)
            | Self::Milestone(id) => id,
        }
    }

    /// Rebuilds the key from persisted parts.
    pub fn from_parts(token: &str, object_id: i64) -> Option<Self> {
        match token {
            "userstory" => Some(Self::UserStory(object_id)),
            "task" => Some(Self::Task(object_id)),
            "issue" => Some(Self::Issue(object_id)),
            "epic" => Some(Self::Epic(object_id)),
            "wiki_page" => Some(Self::WikiPage(object_id)),
            "milestone" => Some(Self::Milestone(object_id)),
            _ => None,
        }
    }
}

/// Attachment record pointing at any owning entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: i64,
    pub project_id: i64,
    pub owner_id: Option<i64>,
    pub attached_to: AttachedTo,
    pub attached_file: String,
    pub order: i64,
    pub is_deprecated: bool,
    pub description: String,
    pub created_at: i64,
    pub modified_at: i64,
}

#[cfg(test)]
mod tests {
    use super::AttachedTo;

    #[test]
    fn owner_key_round_trips_through_parts() {
        let keys = [
            AttachedTo::UserStory(1),
            AttachedTo::Task(2),
            AttachedTo::Issue(3),
            AttachedTo::Epic(4),
            AttachedTo::WikiPage(5),
            AttachedTo::Milestone(6),
        ];
        for key in keys {
            assert_eq!(
                AttachedTo::from_parts(key.kind_token(), key.object_id()),
                Some(key)
            );
        }
        assert_eq!(AttachedTo::from_parts("swimlane", 1), None);
    }
}
