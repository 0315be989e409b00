//! Affiliation model - the principal/school edge with its per-school role.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::principal::UnknownRole;
use super::role::Role;

/// Affiliation entity. The `(principal_id, school_id)` pair is unique;
/// global principals must hold zero of these rows.
#[derive(Debug, Clone, FromRow)]
pub struct Affiliation {
    pub affiliation_id: i64,
    pub principal_id: i64,
    pub school_id: i64,
    pub school_role: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Affiliation {
    pub fn role(&self) -> Result<Role, UnknownRole> {
        Role::parse(&self.school_role).ok_or_else(|| UnknownRole(self.school_role.clone()))
    }

    /// Parsed, lightweight form used by the session context.
    pub fn edge(&self) -> Result<AffiliationEdge, UnknownRole> {
        Ok(AffiliationEdge {
            school_id: self.school_id,
            role: self.role()?,
        })
    }
}

/// The parsed edge the session context and the gate operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AffiliationEdge {
    pub school_id: i64,
    pub role: Role,
}

/// Affiliation joined with the school name, for the school picker.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AffiliationDetail {
    pub school_id: i64,
    pub school_name: String,
    pub school_role: String,
}
