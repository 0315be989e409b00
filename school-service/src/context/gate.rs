//! The authorization gate: one decision function, deny by default.

use crate::models::Capability;
use crate::services::error::ServiceError;

use super::session::SessionContext;

/// Records that carry an owning school can be checked at the gate.
pub trait SchoolOwned {
    fn owning_school_id(&self) -> i64;
}

/// Admit or reject a request.
///
/// Globals are admitted outright (view-as influences scoping, not
/// admission). Everyone else needs an active edge whose role carries the
/// capability, and a supplied target record must belong to the active
/// school.
pub fn authorize(
    ctx: &SessionContext,
    capability: Capability,
    target_school_id: Option<i64>,
) -> Result<(), ServiceError> {
    if ctx.global_role.is_global() {
        return Ok(());
    }

    let active = ctx.active_school_id.ok_or(ServiceError::NoActiveContext)?;
    let edge = ctx.edge_for(active).ok_or(ServiceError::NoActiveContext)?;

    if !edge.role.has_capability(capability) {
        return Err(ServiceError::Forbidden);
    }

    if let Some(target) = target_school_id {
        if target != active {
            tracing::warn!(
                principal_id = ctx.principal_id,
                active_school_id = active,
                target_school_id = target,
                "cross-school access attempt"
            );
            return Err(ServiceError::CrossSchoolAccess);
        }
    }

    Ok(())
}

/// Convenience form taking the record itself.
pub fn authorize_on<R: SchoolOwned>(
    ctx: &SessionContext,
    capability: Capability,
    record: &R,
) -> Result<(), ServiceError> {
    authorize(ctx, capability, Some(record.owning_school_id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::session::SessionContext;
    use crate::models::{AffiliationEdge, Role};

    fn bound_ctx(role: Role, school_id: i64) -> SessionContext {
        SessionContext::on_login(
            1,
            role,
            vec![AffiliationEdge { school_id, role }],
            false,
        )
    }

    #[test]
    fn global_is_admitted_without_context() {
        let ctx = SessionContext::on_login(1, Role::SuperAdmin, vec![], false);
        assert!(authorize(&ctx, Capability::ManageSchools, None).is_ok());
        assert!(authorize(&ctx, Capability::WriteSchoolRecords, Some(42)).is_ok());
    }

    #[test]
    fn missing_context_is_rejected_before_capability_lookup() {
        let ctx = SessionContext::on_login(1, Role::Instructor, vec![], false);
        assert!(matches!(
            authorize(&ctx, Capability::ViewDashboard, None),
            Err(ServiceError::NoActiveContext)
        ));
    }

    #[test]
    fn capability_absent_from_matrix_is_forbidden() {
        let ctx = bound_ctx(Role::Instructor, 3);
        assert!(matches!(
            authorize(&ctx, Capability::WriteSchoolRecords, None),
            Err(ServiceError::Forbidden)
        ));
    }

    #[test]
    fn cross_school_target_is_rejected() {
        let ctx = bound_ctx(Role::Instructor, 3);
        assert!(authorize(&ctx, Capability::ReadSchoolRecords, Some(3)).is_ok());
        assert!(matches!(
            authorize(&ctx, Capability::ReadSchoolRecords, Some(5)),
            Err(ServiceError::CrossSchoolAccess)
        ));
    }

    #[test]
    fn record_form_checks_the_owning_school() {
        struct Journal {
            school_id: i64,
        }
        impl SchoolOwned for Journal {
            fn owning_school_id(&self) -> i64 {
                self.school_id
            }
        }

        let ctx = bound_ctx(Role::SchoolAdmin, 3);
        assert!(authorize_on(&ctx, Capability::WriteSchoolRecords, &Journal { school_id: 3 }).is_ok());
        assert!(matches!(
            authorize_on(&ctx, Capability::WriteSchoolRecords, &Journal { school_id: 5 }),
            Err(ServiceError::CrossSchoolAccess)
        ));
    }
}
