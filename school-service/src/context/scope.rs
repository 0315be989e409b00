//! Query scoping: the single chokepoint that narrows listings to the
//! visible school set. An empty set short-circuits to an empty result
//! without touching storage, so a global admin without a view-as can never
//! pull a cross-school roster by accident.

use sqlx::PgPool;

use crate::models::{Class, PrincipalResponse};
use crate::services::error::ServiceError;

use super::session::SessionContext;

/// The school set a listing may touch. Built from the session context and
/// nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleSchools(Vec<i64>);

impl VisibleSchools {
    pub fn of(ctx: &SessionContext) -> Self {
        Self(ctx.visible_school_ids())
    }

    #[cfg(test)]
    pub fn from_ids(ids: Vec<i64>) -> Self {
        Self(ids)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> &[i64] {
        &self.0
    }

    pub fn contains(&self, school_id: i64) -> bool {
        self.0.contains(&school_id)
    }
}

/// A roster row: a principal together with the school that owns the edge.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct RosterEntry {
    pub principal_id: i64,
    pub external_id: Option<String>,
    pub full_name: Option<String>,
    pub school_id: i64,
    pub school_role: String,
}

/// List the roster of the visible schools, ordered by school then name.
pub async fn list_roster(
    pool: &PgPool,
    scope: &VisibleSchools,
) -> Result<Vec<RosterEntry>, ServiceError> {
    if scope.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, RosterEntry>(
        r#"
        SELECT p.principal_id, p.external_id, p.full_name,
               a.school_id, a.school_role
        FROM affiliations a
        JOIN principals p ON p.principal_id = a.principal_id
        WHERE a.school_id = ANY($1)
        ORDER BY a.school_id, p.full_name NULLS LAST, p.principal_id
        "#,
    )
    .bind(scope.ids())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// List classes of the visible schools, for pickers and the register form.
pub async fn list_classes(
    pool: &PgPool,
    scope: &VisibleSchools,
) -> Result<Vec<Class>, ServiceError> {
    if scope.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, Class>(
        r#"
        SELECT class_id, school_id, class_name
        FROM classes
        WHERE school_id = ANY($1)
        ORDER BY school_id, class_name
        "#,
    )
    .bind(scope.ids())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Self-view: the one record a student may always read.
pub async fn find_self(
    pool: &PgPool,
    principal_id: i64,
) -> Result<Option<PrincipalResponse>, ServiceError> {
    let row = sqlx::query_as::<_, crate::models::Principal>(
        "SELECT * FROM principals WHERE principal_id = $1",
    )
    .bind(principal_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|p| p.sanitized()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::session::SessionContext;
    use crate::models::{AffiliationEdge, Role};

    #[test]
    fn scope_of_global_without_view_as_is_empty() {
        let ctx = SessionContext::on_login(1, Role::SuperAdmin, vec![], false);
        let scope = VisibleSchools::of(&ctx);
        assert!(scope.is_empty());
    }

    #[test]
    fn scope_of_bound_session_is_the_active_school() {
        let ctx = SessionContext::on_login(
            1,
            Role::Student,
            vec![AffiliationEdge {
                school_id: 7,
                role: Role::Student,
            }],
            false,
        );
        let scope = VisibleSchools::of(&ctx);
        assert_eq!(scope.ids(), &[7]);
        assert!(scope.contains(7));
        assert!(!scope.contains(3));
    }

    #[test]
    fn scope_of_view_as_is_the_impersonated_school() {
        let mut ctx = SessionContext::on_login(1, Role::Programmer, vec![], false);
        ctx.set_view_as(7, "Escola".to_string()).unwrap();
        assert_eq!(VisibleSchools::of(&ctx).ids(), &[7]);
    }
}
