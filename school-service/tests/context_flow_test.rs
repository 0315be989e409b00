//! End-to-end flows over the context layer: login resolution, school
//! selection, view-as, and the gate. Pure state-machine tests; the
//! storage-backed flows live in storage_test.rs.

use school_service::context::{authorize, state_of, SessionContext, SessionState, VisibleSchools};
use school_service::models::{AffiliationEdge, Capability, Role};
use school_service::services::ServiceError;

fn edge(school_id: i64, role: Role) -> AffiliationEdge {
    AffiliationEdge { school_id, role }
}

#[test]
fn student_with_one_school_lands_bound() {
    let ctx = SessionContext::on_login(10, Role::Student, vec![edge(1, Role::Student)], false);

    assert_eq!(ctx.state(), SessionState::ActiveSchoolBound);
    assert_eq!(ctx.current_school_id(), Some(1));
    assert_eq!(ctx.visible_school_ids(), vec![1]);
    assert!(authorize(&ctx, Capability::ReadOwnRecords, Some(1)).is_ok());
}

#[test]
fn instructor_with_two_schools_must_pick_then_sees_only_the_pick() {
    let mut ctx = SessionContext::on_login(
        11,
        Role::Instructor,
        vec![edge(1, Role::Instructor), edge(2, Role::Instructor)],
        false,
    );

    assert_eq!(ctx.state(), SessionState::MustChooseSchool);
    assert_eq!(ctx.current_school_id(), None);
    assert!(ctx.visible_school_ids().is_empty());

    // Reads are refused until a pick is made.
    assert!(matches!(
        authorize(&ctx, Capability::ReadSchoolRecords, None),
        Err(ServiceError::NoActiveContext)
    ));

    ctx.set_active_school(2).unwrap();
    assert_eq!(ctx.state(), SessionState::ActiveSchoolBound);
    assert_eq!(ctx.visible_school_ids(), vec![2]);

    // The pick can be switched later, but only among held edges.
    ctx.set_active_school(1).unwrap();
    assert_eq!(ctx.current_school_id(), Some(1));
    assert!(matches!(
        ctx.set_active_school(3),
        Err(ServiceError::UnauthorizedSchoolSelection)
    ));
}

#[test]
fn global_admin_sees_nothing_until_view_as() {
    let mut ctx = SessionContext::on_login(12, Role::SuperAdmin, vec![], false);

    assert_eq!(ctx.state(), SessionState::GlobalOverride);
    assert_eq!(ctx.current_school_id(), None);

    // Empty visible set: no cross-school roster by accident.
    let scope = VisibleSchools::of(&ctx);
    assert!(scope.is_empty());

    // Admission is unconditional for globals even without a view-as.
    assert!(authorize(&ctx, Capability::ManageSchools, None).is_ok());

    ctx.set_view_as(3, "Escola de Sargentos".to_string()).unwrap();
    assert_eq!(ctx.state(), SessionState::GlobalOverride);
    assert_eq!(ctx.current_school_id(), Some(3));
    assert_eq!(VisibleSchools::of(&ctx).ids(), &[3]);

    ctx.clear_view_as();
    assert!(VisibleSchools::of(&ctx).is_empty());
}

#[test]
fn school_admin_cannot_touch_another_school() {
    let ctx = SessionContext::on_login(
        13,
        Role::SchoolAdmin,
        vec![edge(1, Role::SchoolAdmin)],
        false,
    );

    assert!(authorize(&ctx, Capability::ManageAffiliations, Some(1)).is_ok());
    assert!(matches!(
        authorize(&ctx, Capability::ManageAffiliations, Some(2)),
        Err(ServiceError::CrossSchoolAccess)
    ));
    // Schools themselves are a global concern.
    assert!(matches!(
        authorize(&ctx, Capability::ManageSchools, Some(1)),
        Err(ServiceError::Forbidden)
    ));
}

#[test]
fn student_cannot_read_the_school_roster() {
    let ctx = SessionContext::on_login(14, Role::Student, vec![edge(1, Role::Student)], false);

    assert!(matches!(
        authorize(&ctx, Capability::ReadSchoolRecords, Some(1)),
        Err(ServiceError::Forbidden)
    ));
    assert!(authorize(&ctx, Capability::ReadOwnRecords, Some(1)).is_ok());
}

#[test]
fn dual_role_principal_acts_with_the_role_of_the_active_edge() {
    let mut ctx = SessionContext::on_login(
        15,
        Role::Instructor,
        vec![edge(1, Role::Instructor), edge(2, Role::SchoolAdmin)],
        false,
    );

    ctx.set_active_school(1).unwrap();
    assert_eq!(ctx.effective_role().unwrap(), Role::Instructor);
    assert!(matches!(
        authorize(&ctx, Capability::ManageAffiliations, Some(1)),
        Err(ServiceError::Forbidden)
    ));

    ctx.set_active_school(2).unwrap();
    assert_eq!(ctx.effective_role().unwrap(), Role::SchoolAdmin);
    assert!(authorize(&ctx, Capability::ManageAffiliations, Some(2)).is_ok());
}

#[test]
fn non_global_cannot_view_as_and_global_cannot_bind() {
    let mut admin = SessionContext::on_login(
        16,
        Role::SchoolAdmin,
        vec![edge(1, Role::SchoolAdmin)],
        false,
    );
    assert!(matches!(
        admin.set_view_as(2, "Outra".to_string()),
        Err(ServiceError::Forbidden)
    ));

    let mut global = SessionContext::on_login(17, Role::Programmer, vec![], false);
    assert!(matches!(
        global.set_active_school(1),
        Err(ServiceError::Forbidden)
    ));
}

#[test]
fn orphan_principal_has_no_context_and_no_reads() {
    let ctx = SessionContext::on_login(18, Role::Unassigned, vec![], false);

    assert_eq!(ctx.state(), SessionState::AuthenticatedNoContext);
    assert!(ctx.visible_school_ids().is_empty());
    assert!(matches!(
        authorize(&ctx, Capability::ViewDashboard, None),
        Err(ServiceError::NoActiveContext)
    ));
}

#[test]
fn anonymous_state_is_the_absence_of_a_context() {
    assert_eq!(state_of(None), SessionState::Anonymous);

    let ctx = SessionContext::on_login(19, Role::Student, vec![edge(1, Role::Student)], false);
    assert_eq!(state_of(Some(&ctx)), SessionState::ActiveSchoolBound);
}
