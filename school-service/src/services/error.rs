use service_core::error::AppError;
use thiserror::Error;

/// Domain error kinds. One variant per failure the services can signal;
/// handlers never match on strings.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Principal is inactive; activation required")]
    InactivePrincipal,

    #[error("Password does not meet the minimum requirements")]
    WeakPassword,

    #[error("Duplicate {0}")]
    Duplicate(&'static str),

    #[error("Principal not found")]
    UnknownPrincipal,

    #[error("School not found")]
    UnknownSchool,

    #[error("Class not found")]
    UnknownClass,

    #[error("No active school context")]
    NoActiveContext,

    #[error("Principal is not affiliated with the requested school")]
    UnauthorizedSchoolSelection,

    #[error("Record belongs to another school")]
    CrossSchoolAccess,

    #[error("Operation not permitted for this role")]
    Forbidden,

    #[error("Global roles cannot hold school affiliations")]
    GlobalRoleHasNoAffiliations,

    #[error("Pre-registration has no school affiliation")]
    MissingAffiliation,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unknown role '{0}' in storage")]
    UnknownRole(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<crate::models::UnknownRole> for ServiceError {
    fn from(err: crate::models::UnknownRole) -> Self {
        ServiceError::UnknownRole(err.0)
    }
}

/// `unique_violation` is the authoritative duplicate signal; pre-checks in
/// services are best-effort only.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}

impl ServiceError {
    /// Collapse a unique-constraint violation into `Duplicate`.
    pub fn from_insert(err: sqlx::Error, what: &'static str) -> Self {
        if is_unique_violation(&err) {
            ServiceError::Duplicate(what)
        } else {
            ServiceError::Storage(err)
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidCredentials => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::InactivePrincipal => AppError::Forbidden(anyhow::anyhow!(
                "Account is inactive; complete activation before logging in"
            )),
            ServiceError::WeakPassword => AppError::BadRequest(anyhow::anyhow!(
                "Password must be at least 8 characters and match its confirmation"
            )),
            ServiceError::Duplicate(what) => {
                AppError::Conflict(anyhow::anyhow!("Duplicate {}", what))
            }
            ServiceError::UnknownPrincipal => {
                AppError::NotFound(anyhow::anyhow!("Principal not found"))
            }
            ServiceError::UnknownSchool => AppError::NotFound(anyhow::anyhow!("School not found")),
            ServiceError::UnknownClass => AppError::NotFound(anyhow::anyhow!("Class not found")),
            ServiceError::NoActiveContext => AppError::NoActiveContext {
                redirect_to: "/select-school",
            },
            ServiceError::UnauthorizedSchoolSelection => AppError::Forbidden(anyhow::anyhow!(
                "Principal is not affiliated with the requested school"
            )),
            ServiceError::CrossSchoolAccess => {
                AppError::Forbidden(anyhow::anyhow!("Record belongs to another school"))
            }
            ServiceError::Forbidden => {
                AppError::Forbidden(anyhow::anyhow!("Operation not permitted"))
            }
            ServiceError::GlobalRoleHasNoAffiliations => AppError::Conflict(anyhow::anyhow!(
                "Global roles cannot hold school affiliations"
            )),
            ServiceError::MissingAffiliation => AppError::Conflict(anyhow::anyhow!(
                "Pre-registration has no school affiliation; ask an administrator to redo it"
            )),
            ServiceError::ExpiredToken => {
                AppError::BadRequest(anyhow::anyhow!("Reset link expired"))
            }
            ServiceError::InvalidToken => {
                AppError::BadRequest(anyhow::anyhow!("Reset link is invalid"))
            }
            ServiceError::UnknownRole(role) => {
                AppError::InternalError(anyhow::anyhow!("Unknown role '{}' in storage", role))
            }
            ServiceError::Storage(e) => AppError::DatabaseError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
