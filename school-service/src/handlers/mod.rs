pub mod admin;
pub mod auth;
pub mod context;
pub mod dashboard;
pub mod health;

use service_core::error::AppError;

use crate::models::Role;

/// Parse a role arriving in a form field. A string outside the closed set
/// is a client error here; `ServiceError::UnknownRole` stays reserved for
/// corrupt storage.
pub(crate) fn parse_role_field(raw: &str) -> Result<Role, AppError> {
    Role::parse(raw)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("unknown role '{}'", raw)))
}
