//! Ownership quota governor.
//!
//! # Responsibility
//! - Decide whether a project create / privacy flip / transfer /
//!   duplicate fits the acting owner's limits.
//!
//! # Invariants
//! - Project-count checks fail when `current >= max`; membership-count
//!   checks fail when `current > max`.
//! - A `None` limit never rejects.
//! - An absent owner always yields `Ownerless`.

use crate::model::user::User;
use std::fmt::{Display, Formatter};

/// Rejection reasons reported by the governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaReason {
    PublicProjectsExceeded,
    PrivateProjectsExceeded,
    PublicMembershipsExceeded,
    PrivateMembershipsExceeded,
    Ownerless,
}

impl Display for QuotaReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::PublicProjectsExceeded => "max public projects reached",
            Self::PrivateProjectsExceeded => "max private projects reached",
            Self::PublicMembershipsExceeded => "max memberships for public projects reached",
            Self::PrivateMembershipsExceeded => "max memberships for private projects reached",
            Self::Ownerless => "project has no owner",
        };
        f.write_str(label)
    }
}

/// Governor output: decision, reason and the membership count it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub reason: Option<QuotaReason>,
    pub current_memberships: i64,
}

impl QuotaDecision {
    fn allow(current_memberships: i64) -> Self {
        Self {
            allowed: true,
            reason: None,
            current_memberships,
        }
    }

    fn reject(reason: QuotaReason, current_memberships: i64) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            current_memberships,
        }
    }
}

fn project_limits(owner: &User, is_private: bool) -> (Option<i64>, QuotaReason) {
    if is_private {
        (
            owner.max_private_projects,
            QuotaReason::PrivateProjectsExceeded,
        )
    } else {
        (
            owner.max_public_projects,
            QuotaReason::PublicProjectsExceeded,
        )
    }
}

fn membership_limits(owner: &User, is_private: bool) -> (Option<i64>, QuotaReason) {
    if is_private {
        (
            owner.max_memberships_private_projects,
            QuotaReason::PrivateMembershipsExceeded,
        )
    } else {
        (
            owner.max_memberships_public_projects,
            QuotaReason::PublicMembershipsExceeded,
        )
    }
}

fn projects_exceeded(current: i64, max: Option<i64>) -> bool {
    matches!(max, Some(max) if current >= max)
}

fn memberships_exceeded(current: i64, max: Option<i64>) -> bool {
    matches!(max, Some(max) if current > max)
}

/// Create: the owner's projects of the target privacy plus the project's
/// would-be member count (floored at one, the owner).
pub fn check_create(
    owner: Option<&User>,
    owned_projects: i64,
    member_count: i64,
    is_private: bool,
) -> QuotaDecision {
    let member_count = member_count.max(1);
    let Some(owner) = owner else {
        return QuotaDecision::reject(QuotaReason::Ownerless, member_count);
    };

    let (max_projects, project_reason) = project_limits(owner, is_private);
    if projects_exceeded(owned_projects, max_projects) {
        return QuotaDecision::reject(project_reason, member_count);
    }

    let (max_memberships, membership_reason) = membership_limits(owner, is_private);
    if memberships_exceeded(member_count, max_memberships) {
        return QuotaDecision::reject(membership_reason, member_count);
    }

    QuotaDecision::allow(member_count)
}

/// Privacy flip: limits of the target privacy against the owner's
/// opposite-privacy holdings and the project's current members.
pub fn check_privacy_change(
    owner: Option<&User>,
    owned_projects_of_target: i64,
    member_count: i64,
    target_is_private: bool,
) -> QuotaDecision {
    let Some(owner) = owner else {
        return QuotaDecision::reject(QuotaReason::Ownerless, member_count);
    };

    let (max_memberships, membership_reason) = membership_limits(owner, target_is_private);
    if memberships_exceeded(member_count, max_memberships) {
        return QuotaDecision::reject(membership_reason, member_count);
    }

    let (max_projects, project_reason) = project_limits(owner, target_is_private);
    if projects_exceeded(owned_projects_of_target, max_projects) {
        return QuotaDecision::reject(project_reason, member_count);
    }

    QuotaDecision::allow(member_count)
}

/// Transfer: the receiving owner's holdings of the project's privacy and
/// the project's current distinct members.
pub fn check_transfer(
    new_owner: Option<&User>,
    new_owner_projects: i64,
    member_count: i64,
    is_private: bool,
) -> QuotaDecision {
    let Some(owner) = new_owner else {
        return QuotaDecision::reject(QuotaReason::Ownerless, member_count);
    };

    let (max_projects, project_reason) = project_limits(owner, is_private);
    if projects_exceeded(new_owner_projects, max_projects) {
        return QuotaDecision::reject(project_reason, member_count);
    }

    let (max_memberships, membership_reason) = membership_limits(owner, is_private);
    if memberships_exceeded(member_count, max_memberships) {
        return QuotaDecision::reject(membership_reason, member_count);
    }

    QuotaDecision::allow(member_count)
}

/// Duplicate: the new owner's holdings of the target privacy and the
/// requested members plus the new owner.
pub fn check_duplicate(
    new_owner: Option<&User>,
    new_owner_projects: i64,
    requested_members: i64,
    target_is_private: bool,
) -> QuotaDecision {
    check_create(
        new_owner,
        new_owner_projects,
        requested_members + 1,
        target_is_private,
    )
}
