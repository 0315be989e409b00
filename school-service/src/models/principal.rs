//! Principal model - an authenticated identity.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::role::Role;

/// Principal entity.
///
/// `external_id` holds the normalized matricula (digits only, 1..=7 chars)
/// and is the primary login alias. A principal starts pre-registered
/// (`is_active = false`, only id and external_id populated) and is filled
/// in by activation.
#[derive(Debug, Clone, FromRow)]
pub struct Principal {
    pub principal_id: i64,
    pub external_id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub war_name: Option<String>,
    pub rank: Option<String>,
    pub global_role: String,
    pub is_active: bool,
    pub must_change_password: bool,
    pub created_utc: DateTime<Utc>,
}

impl Principal {
    /// Parse the stored role string. An unknown value is data corruption
    /// and surfaces as an error instead of defaulting.
    pub fn role(&self) -> Result<Role, UnknownRole> {
        Role::parse(&self.global_role).ok_or_else(|| UnknownRole(self.global_role.clone()))
    }

    pub fn is_global(&self) -> bool {
        self.role().map(|r| r.is_global()).unwrap_or(false)
    }

    /// Convert to a response without sensitive fields.
    pub fn sanitized(&self) -> PrincipalResponse {
        PrincipalResponse {
            principal_id: self.principal_id,
            external_id: self.external_id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            war_name: self.war_name.clone(),
            rank: self.rank.clone(),
            global_role: self.global_role.clone(),
            is_active: self.is_active,
            must_change_password: self.must_change_password,
        }
    }
}

/// A role string in storage that is outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl std::fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown role '{}' in storage", self.0)
    }
}

impl std::error::Error for UnknownRole {}

/// Principal response for the API (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalResponse {
    pub principal_id: i64,
    pub external_id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub war_name: Option<String>,
    pub rank: Option<String>,
    pub global_role: String,
    pub is_active: bool,
    pub must_change_password: bool,
}
