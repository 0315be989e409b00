//! Profile sub-records created at activation.

use serde::Serialize;
use sqlx::FromRow;

/// Student profile: class assignment plus the unit ("OPM") free-text field.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StudentProfile {
    pub principal_id: i64,
    pub class_id: Option<i64>,
    pub unit: String,
}

/// Instructor profile, bound to the first affiliation school at activation.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InstructorProfile {
    pub principal_id: i64,
    pub school_id: i64,
}

/// Class ("turma") inside a school.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Class {
    pub class_id: i64,
    pub school_id: i64,
    pub class_name: String,
}
