//! Minimal user record carried by the core.
//!
//! The core is not an account system; it only needs stable owner
//! references and the four per-owner quota limits.

/// User record with owner quota limits. A `None` limit means "no cap".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub max_public_projects: Option<i64>,
    pub max_private_projects: Option<i64>,
    pub max_memberships_public_projects: Option<i64>,
    pub max_memberships_private_projects: Option<i64>,
}
