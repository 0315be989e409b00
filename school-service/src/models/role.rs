//! Closed role set and the capability matrix.
//!
//! Roles are stored as plain strings in the database but are parsed into
//! this enum at the model boundary; an unknown string is a hard error,
//! never a silent default.

use serde::{Deserialize, Serialize};

/// The closed set of roles.
///
/// `Programmer` and `SuperAdmin` are global: they bypass school scoping and
/// must never hold affiliation rows. Every other role only has meaning on
/// an affiliation edge (plus as a coarse default on the principal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Programmer,
    SuperAdmin,
    SchoolAdmin,
    Instructor,
    Student,
    Unassigned,
}

/// Named permissions checked at the authorization gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewDashboard,
    ReadSchoolRecords,
    WriteSchoolRecords,
    ReadOwnRecords,
    WriteOwnRecords,
    ManageAffiliations,
    PreRegister,
    ManageSchools,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Programmer => "programmer",
            Role::SuperAdmin => "super_admin",
            Role::SchoolAdmin => "school_admin",
            Role::Instructor => "instructor",
            Role::Student => "student",
            Role::Unassigned => "unassigned",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "programmer" => Some(Role::Programmer),
            "super_admin" => Some(Role::SuperAdmin),
            "school_admin" => Some(Role::SchoolAdmin),
            "instructor" => Some(Role::Instructor),
            "student" => Some(Role::Student),
            "unassigned" => Some(Role::Unassigned),
            _ => None,
        }
    }

    /// Global roles are school-independent and never carry affiliations.
    pub fn is_global(&self) -> bool {
        matches!(self, Role::Programmer | Role::SuperAdmin)
    }

    /// Whether the role may appear on an affiliation edge.
    pub fn is_school_scoped(&self) -> bool {
        !self.is_global()
    }

    /// The capability matrix. Globals get every capability; the gate
    /// short-circuits for them anyway, but keeping the matrix total avoids
    /// a special case in callers that only want to display permissions.
    pub fn capabilities(&self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Role::Programmer | Role::SuperAdmin => &[
                ViewDashboard,
                ReadSchoolRecords,
                WriteSchoolRecords,
                ReadOwnRecords,
                WriteOwnRecords,
                ManageAffiliations,
                PreRegister,
                ManageSchools,
            ],
            Role::SchoolAdmin => &[
                ViewDashboard,
                ReadSchoolRecords,
                WriteSchoolRecords,
                ReadOwnRecords,
                WriteOwnRecords,
                ManageAffiliations,
                PreRegister,
            ],
            // Instructors read school records but never mutate rosters.
            Role::Instructor => &[
                ViewDashboard,
                ReadSchoolRecords,
                ReadOwnRecords,
                WriteOwnRecords,
            ],
            Role::Student => &[ViewDashboard, ReadOwnRecords, WriteOwnRecords],
            Role::Unassigned => &[],
        }
    }

    pub fn has_capability(&self, cap: Capability) -> bool {
        self.capabilities().contains(&cap)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_role() {
        for role in [
            Role::Programmer,
            Role::SuperAdmin,
            Role::SchoolAdmin,
            Role::Instructor,
            Role::Student,
            Role::Unassigned,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn unknown_role_string_does_not_parse() {
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::parse(""), None);
        assert_eq!(Role::parse("Programmer"), None);
    }

    #[test]
    fn only_programmer_and_super_admin_are_global() {
        assert!(Role::Programmer.is_global());
        assert!(Role::SuperAdmin.is_global());
        assert!(!Role::SchoolAdmin.is_global());
        assert!(!Role::Instructor.is_global());
        assert!(!Role::Student.is_global());
        assert!(!Role::Unassigned.is_global());
    }

    #[test]
    fn instructors_cannot_mutate_rosters() {
        assert!(!Role::Instructor.has_capability(Capability::WriteSchoolRecords));
        assert!(!Role::Instructor.has_capability(Capability::ManageAffiliations));
        assert!(!Role::Instructor.has_capability(Capability::PreRegister));
        assert!(Role::Instructor.has_capability(Capability::ReadSchoolRecords));
    }

    #[test]
    fn students_only_touch_their_own_records() {
        assert!(Role::Student.has_capability(Capability::ReadOwnRecords));
        assert!(Role::Student.has_capability(Capability::WriteOwnRecords));
        assert!(!Role::Student.has_capability(Capability::ReadSchoolRecords));
        assert!(!Role::Student.has_capability(Capability::WriteSchoolRecords));
    }

    #[test]
    fn unassigned_has_no_capabilities() {
        assert!(Role::Unassigned.capabilities().is_empty());
    }
}
