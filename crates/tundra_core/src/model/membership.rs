//! Project membership edges and pending invitations.
//!
//! # Responsibility
//! - Define the membership record covering both confirmed members and
//!   email invitations.
//!
//! # Invariants
//! - At most one membership per `(user, project)` once confirmed.
//! - Pending invitations have `user_id = None`, an `email` and a unique
//!   `token`; acceptance sets the user and clears both.

use uuid::Uuid;

/// Membership of a user (or pending invitee) in a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub id: i64,
    /// `None` while the invitation is pending.
    pub user_id: Option<i64>,
    pub project_id: i64,
    /// Role taxonomy row the member acts under.
    pub role_id: i64,
    pub is_admin: bool,
    /// Invitation address; kept for confirmed members as contact metadata.
    pub email: Option<String>,
    /// Invitation token, present only while pending.
    pub token: Option<Uuid>,
    pub invited_by_id: Option<i64>,
    pub created_at: i64,
}

impl Membership {
    /// Whether this row is a pending invitation.
    pub fn is_pending(&self) -> bool {
        self.user_id.is_none()
    }
}
