//! Per-request school context and its state machine.
//!
//! The context is a plain value computed from the principal's global role,
//! their affiliation edges, and the two session-held ids (active school and
//! view-as). Every transition is a pure function so the whole machine is
//! testable without a web framework or a database.

use serde::Serialize;

use crate::models::{AffiliationEdge, Role};
use crate::services::error::ServiceError;

/// States of the per-request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No authenticated principal. Represented by the absence of a
    /// `SessionContext`; kept in the enum so callers can reason about the
    /// full machine.
    Anonymous,
    /// Authenticated, zero affiliations, not global. Reads are forbidden.
    AuthenticatedNoContext,
    /// More than one affiliation and no school picked yet.
    MustChooseSchool,
    /// A concrete school is active.
    ActiveSchoolBound,
    /// Global role; the optional view-as impersonates a school.
    GlobalOverride,
}

/// View-as target for global roles. The name rides along so the UI can
/// label impersonation without a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewAs {
    pub school_id: i64,
    pub school_name: String,
}

/// The resolved per-request context.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub principal_id: i64,
    pub global_role: Role,
    pub affiliations: Vec<AffiliationEdge>,
    pub active_school_id: Option<i64>,
    pub view_as: Option<ViewAs>,
    pub must_change_password: bool,
}

impl SessionContext {
    /// Login transition: derive the initial context from the affiliation
    /// count. Single affiliation binds the school immediately; several
    /// require a pick; zero leaves the principal without a context.
    pub fn on_login(
        principal_id: i64,
        global_role: Role,
        affiliations: Vec<AffiliationEdge>,
        must_change_password: bool,
    ) -> Self {
        let active_school_id = if global_role.is_global() {
            None
        } else if affiliations.len() == 1 {
            Some(affiliations[0].school_id)
        } else {
            None
        };

        Self {
            principal_id,
            global_role,
            affiliations,
            active_school_id,
            view_as: None,
            must_change_password,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.global_role.is_global() {
            return SessionState::GlobalOverride;
        }
        if self.active_school_id.is_some() {
            return SessionState::ActiveSchoolBound;
        }
        if self.affiliations.len() > 1 {
            return SessionState::MustChooseSchool;
        }
        SessionState::AuthenticatedNoContext
    }

    pub fn edge_for(&self, school_id: i64) -> Option<&AffiliationEdge> {
        self.affiliations.iter().find(|e| e.school_id == school_id)
    }

    /// Pick the active school. Only schools the principal holds an edge to
    /// are accepted; no special privileges for switching. Global roles use
    /// `set_view_as` instead.
    pub fn set_active_school(&mut self, school_id: i64) -> Result<(), ServiceError> {
        if self.global_role.is_global() {
            return Err(ServiceError::Forbidden);
        }
        if self.edge_for(school_id).is_none() {
            return Err(ServiceError::UnauthorizedSchoolSelection);
        }
        self.active_school_id = Some(school_id);
        Ok(())
    }

    /// Impersonate a school context. Global roles only; the caller must
    /// have resolved the school (any existing school is acceptable).
    pub fn set_view_as(&mut self, school_id: i64, school_name: String) -> Result<(), ServiceError> {
        if !self.global_role.is_global() {
            return Err(ServiceError::Forbidden);
        }
        self.view_as = Some(ViewAs {
            school_id,
            school_name,
        });
        Ok(())
    }

    /// Back to "see all" mode; the state stays `GlobalOverride`.
    pub fn clear_view_as(&mut self) {
        self.view_as = None;
    }

    /// Strict-mode active school. `None` in `MustChooseSchool`,
    /// `AuthenticatedNoContext`, and `GlobalOverride` without a view-as;
    /// handlers needing a concrete school redirect to the picker on `None`.
    pub fn current_school_id(&self) -> Option<i64> {
        if self.global_role.is_global() {
            return self.view_as.as_ref().map(|v| v.school_id);
        }
        self.active_school_id
    }

    /// School set visible to listings.
    ///
    /// Global roles without a view-as get the EMPTY set, not all schools:
    /// cross-school rosters must never leak into per-school listings. The
    /// all-schools admin surface queries unscoped on purpose.
    pub fn visible_school_ids(&self) -> Vec<i64> {
        if self.global_role.is_global() {
            return self.view_as.as_ref().map(|v| vec![v.school_id]).unwrap_or_default();
        }
        match self.active_school_id {
            Some(active) if self.edge_for(active).is_some() => vec![active],
            _ => Vec::new(),
        }
    }

    /// Role effective for the current request. Global roles carry their
    /// global role; everyone else takes the role on the active edge.
    pub fn effective_role(&self) -> Result<Role, ServiceError> {
        if self.global_role.is_global() {
            return Ok(self.global_role);
        }
        let active = self.active_school_id.ok_or(ServiceError::NoActiveContext)?;
        self.edge_for(active)
            .map(|e| e.role)
            .ok_or(ServiceError::NoActiveContext)
    }
}

/// State of an optional context, folding in `Anonymous`.
pub fn state_of(ctx: Option<&SessionContext>) -> SessionState {
    ctx.map(SessionContext::state).unwrap_or(SessionState::Anonymous)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(school_id: i64, role: Role) -> AffiliationEdge {
        AffiliationEdge { school_id, role }
    }

    #[test]
    fn single_affiliation_binds_immediately() {
        let ctx = SessionContext::on_login(1, Role::Student, vec![edge(7, Role::Student)], false);
        assert_eq!(ctx.state(), SessionState::ActiveSchoolBound);
        assert_eq!(ctx.current_school_id(), Some(7));
        assert_eq!(ctx.effective_role().unwrap(), Role::Student);
    }

    #[test]
    fn multiple_affiliations_require_a_pick() {
        let mut ctx = SessionContext::on_login(
            1,
            Role::Instructor,
            vec![edge(3, Role::Instructor), edge(7, Role::Instructor)],
            false,
        );
        assert_eq!(ctx.state(), SessionState::MustChooseSchool);
        assert_eq!(ctx.current_school_id(), None);

        // Not affiliated with 9: rejected, state unchanged.
        let err = ctx.set_active_school(9).unwrap_err();
        assert!(matches!(err, ServiceError::UnauthorizedSchoolSelection));
        assert_eq!(ctx.state(), SessionState::MustChooseSchool);

        ctx.set_active_school(3).unwrap();
        assert_eq!(ctx.state(), SessionState::ActiveSchoolBound);
        assert_eq!(ctx.current_school_id(), Some(3));
    }

    #[test]
    fn switching_follows_the_same_rule_as_picking() {
        let mut ctx = SessionContext::on_login(
            1,
            Role::SchoolAdmin,
            vec![edge(3, Role::SchoolAdmin), edge(7, Role::SchoolAdmin)],
            false,
        );
        ctx.set_active_school(3).unwrap();
        ctx.set_active_school(7).unwrap();
        assert_eq!(ctx.current_school_id(), Some(7));
        assert!(ctx.set_active_school(11).is_err());
        assert_eq!(ctx.current_school_id(), Some(7));
    }

    #[test]
    fn zero_affiliations_leave_no_context() {
        let ctx = SessionContext::on_login(1, Role::Student, vec![], false);
        assert_eq!(ctx.state(), SessionState::AuthenticatedNoContext);
        assert_eq!(ctx.current_school_id(), None);
        assert!(ctx.visible_school_ids().is_empty());
        assert!(matches!(
            ctx.effective_role(),
            Err(ServiceError::NoActiveContext)
        ));
    }

    #[test]
    fn global_login_enters_override_with_no_view_as() {
        let ctx = SessionContext::on_login(1, Role::SuperAdmin, vec![], false);
        assert_eq!(ctx.state(), SessionState::GlobalOverride);
        assert_eq!(ctx.current_school_id(), None);
        // Empty, not "all": listings must not leak cross-school data.
        assert!(ctx.visible_school_ids().is_empty());
        assert_eq!(ctx.effective_role().unwrap(), Role::SuperAdmin);
    }

    #[test]
    fn view_as_scopes_global_listings_to_one_school() {
        let mut ctx = SessionContext::on_login(1, Role::SuperAdmin, vec![], false);
        ctx.set_view_as(7, "Escola de Formação".to_string()).unwrap();
        assert_eq!(ctx.state(), SessionState::GlobalOverride);
        assert_eq!(ctx.current_school_id(), Some(7));
        assert_eq!(ctx.visible_school_ids(), vec![7]);

        ctx.clear_view_as();
        assert_eq!(ctx.state(), SessionState::GlobalOverride);
        assert_eq!(ctx.current_school_id(), None);
        assert!(ctx.visible_school_ids().is_empty());
    }

    #[test]
    fn non_global_cannot_view_as() {
        let mut ctx =
            SessionContext::on_login(1, Role::SchoolAdmin, vec![edge(3, Role::SchoolAdmin)], false);
        assert!(matches!(
            ctx.set_view_as(7, "Outra".to_string()),
            Err(ServiceError::Forbidden)
        ));
    }

    #[test]
    fn global_cannot_take_the_non_global_pick_path() {
        let mut ctx = SessionContext::on_login(1, Role::Programmer, vec![], false);
        assert!(matches!(
            ctx.set_active_school(3),
            Err(ServiceError::Forbidden)
        ));
    }

    #[test]
    fn effective_role_comes_from_the_active_edge() {
        let mut ctx = SessionContext::on_login(
            5,
            Role::Instructor,
            vec![edge(3, Role::SchoolAdmin), edge(7, Role::Instructor)],
            false,
        );
        ctx.set_active_school(3).unwrap();
        assert_eq!(ctx.effective_role().unwrap(), Role::SchoolAdmin);
        ctx.set_active_school(7).unwrap();
        assert_eq!(ctx.effective_role().unwrap(), Role::Instructor);
    }

    #[test]
    fn anonymous_is_the_absent_context() {
        assert_eq!(state_of(None), SessionState::Anonymous);
        let ctx = SessionContext::on_login(1, Role::Student, vec![edge(7, Role::Student)], false);
        assert_eq!(state_of(Some(&ctx)), SessionState::ActiveSchoolBound);
    }
}
