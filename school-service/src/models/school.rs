//! School model - the tenant boundary of the system.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// School entity. Created by a global admin, never silently deleted.
///
/// `school_kind` is the regulation the school follows ('cfs', 'cbfpm',
/// 'cspm'); it drives domain rules elsewhere and plays no part in
/// authorization.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct School {
    pub school_id: i64,
    pub school_name: String,
    pub school_kind: String,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// School response for API listings.
#[derive(Debug, Clone, Serialize)]
pub struct SchoolResponse {
    pub school_id: i64,
    pub school_name: String,
    pub school_kind: String,
}

impl From<School> for SchoolResponse {
    fn from(s: School) -> Self {
        Self {
            school_id: s.school_id,
            school_name: s.school_name,
            school_kind: s.school_kind,
        }
    }
}
