//! Access policy — roles, sensitivity labels, and the permitted-label table.
//!
//! The table is static: each role maps to an ordered set of sensitivity
//! labels it may retrieve. Permitted sets are monotonically nested —
//! Junior ⊂ Manager ⊂ Admin — so a chunk visible to a role is visible to
//! every role above it.

use crate::error::AppError;

/// Classification tag attached to every stored chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sensitivity {
    Low,
    Medium,
    High,
}

impl Sensitivity {
    /// Wire form used in store metadata and upload requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sensitivity::Low => "low",
            Sensitivity::Medium => "medium",
            Sensitivity::High => "high",
        }
    }

    /// Parse the wire form. Returns `None` for anything outside the closed set.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "low" => Some(Sensitivity::Low),
            "medium" => Some(Sensitivity::Medium),
            "high" => Some(Sensitivity::High),
            _ => None,
        }
    }
}

/// Caller role, asserted per request. Never persisted as an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Junior,
    Manager,
    Admin,
}

impl Role {
    /// Display label, matching the closed selection offered to callers.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Junior => "Junior Auditor",
            Role::Manager => "Manager",
            Role::Admin => "Admin",
        }
    }

    /// Parse a role label. Role strings originate from a closed selection,
    /// so an unknown label is a caller bug surfaced as [`AppError::UnknownRole`].
    pub fn parse(label: &str) -> Result<Self, AppError> {
        match label {
            "Junior Auditor" => Ok(Role::Junior),
            "Manager" => Ok(Role::Manager),
            "Admin" => Ok(Role::Admin),
            other => Err(AppError::UnknownRole(other.to_string())),
        }
    }
}

const JUNIOR_LABELS: &[Sensitivity] = &[Sensitivity::Low];
const MANAGER_LABELS: &[Sensitivity] = &[Sensitivity::Low, Sensitivity::Medium];
const ADMIN_LABELS: &[Sensitivity] = &[Sensitivity::Low, Sensitivity::Medium, Sensitivity::High];

/// The set of sensitivity labels `role` is authorized to retrieve.
///
/// Pure and total over the three roles.
pub fn permitted_labels(role: Role) -> &'static [Sensitivity] {
    match role {
        Role::Junior => JUNIOR_LABELS,
        Role::Manager => MANAGER_LABELS,
        Role::Admin => ADMIN_LABELS,
    }
}
