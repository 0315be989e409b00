//! Affiliation store: the principal/school edges and their maintenance.

use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{Affiliation, AffiliationDetail, AffiliationEdge, Role};

use super::error::ServiceError;

#[derive(Clone)]
pub struct AffiliationService {
    pool: PgPool,
}

/// Global roles whose principals are deleted when their last affiliation
/// goes away during a bulk delete.
const CASCADE_ROLES: [&str; 3] = ["student", "instructor", "unassigned"];

impl AffiliationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All edges of a principal, ordered by school id.
    pub async fn list_for(&self, principal_id: i64) -> Result<Vec<Affiliation>, ServiceError> {
        let rows = sqlx::query_as::<_, Affiliation>(
            "SELECT * FROM affiliations WHERE principal_id = $1 ORDER BY school_id",
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Parsed edges for the session context.
    pub async fn edges_for(&self, principal_id: i64) -> Result<Vec<AffiliationEdge>, ServiceError> {
        self.list_for(principal_id)
            .await?
            .iter()
            .map(|a| a.edge().map_err(ServiceError::from))
            .collect()
    }

    /// Edges joined with school names, for the picker.
    pub async fn details_for(
        &self,
        principal_id: i64,
    ) -> Result<Vec<AffiliationDetail>, ServiceError> {
        let rows = sqlx::query_as::<_, AffiliationDetail>(
            r#"
            SELECT a.school_id, s.school_name, a.school_role
            FROM affiliations a
            JOIN schools s ON s.school_id = a.school_id
            WHERE a.principal_id = $1
            ORDER BY a.school_id
            "#,
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Idempotent insert: creates the edge if absent, returns whether a row
    /// was written. Never changes the role of an existing edge; that takes
    /// an explicit `set_role`.
    pub async fn ensure(
        &self,
        principal_id: i64,
        school_id: i64,
        role: Role,
    ) -> Result<bool, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let inserted = ensure_in_tx(&mut tx, principal_id, school_id, role).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    /// Explicit role change on an existing edge.
    pub async fn set_role(
        &self,
        principal_id: i64,
        school_id: i64,
        role: Role,
    ) -> Result<(), ServiceError> {
        if role.is_global() {
            return Err(ServiceError::GlobalRoleHasNoAffiliations);
        }

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE affiliations
             SET school_role = $1, updated_utc = now()
             WHERE principal_id = $2 AND school_id = $3",
        )
        .bind(role.as_str())
        .bind(principal_id)
        .bind(school_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::UnknownPrincipal);
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn remove(&self, principal_id: i64, school_id: i64) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;
        let result =
            sqlx::query("DELETE FROM affiliations WHERE principal_id = $1 AND school_id = $2")
                .bind(principal_id)
                .bind(school_id)
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::UnknownPrincipal);
        }
        tx.commit().await?;
        Ok(())
    }

    /// Delete every student edge of a school. Caller must be global; the
    /// principal itself is removed when this was its last affiliation and
    /// its global role allows the cascade.
    pub async fn bulk_delete_students_of(
        &self,
        caller_role: Role,
        school_id: i64,
    ) -> Result<u64, ServiceError> {
        self.bulk_delete_role_of(caller_role, school_id, Role::Student)
            .await
    }

    /// Same as `bulk_delete_students_of` for instructor edges.
    pub async fn bulk_delete_instructors_of(
        &self,
        caller_role: Role,
        school_id: i64,
    ) -> Result<u64, ServiceError> {
        self.bulk_delete_role_of(caller_role, school_id, Role::Instructor)
            .await
    }

    async fn bulk_delete_role_of(
        &self,
        caller_role: Role,
        school_id: i64,
        role: Role,
    ) -> Result<u64, ServiceError> {
        if !caller_role.is_global() {
            return Err(ServiceError::Forbidden);
        }

        let mut tx = self.pool.begin().await?;

        let affected: Vec<i64> = sqlx::query_scalar(
            "DELETE FROM affiliations
             WHERE school_id = $1 AND school_role = $2
             RETURNING principal_id",
        )
        .bind(school_id)
        .bind(role.as_str())
        .fetch_all(&mut *tx)
        .await?;

        // Cascade: drop principals left with zero edges, unless their
        // global role protects them.
        let deleted: u64 = sqlx::query(
            "DELETE FROM principals p
             WHERE p.principal_id = ANY($1)
               AND p.global_role = ANY($2)
               AND NOT EXISTS (
                   SELECT 1 FROM affiliations a WHERE a.principal_id = p.principal_id
               )",
        )
        .bind(&affected)
        .bind(&CASCADE_ROLES[..])
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        tracing::info!(
            school_id,
            role = role.as_str(),
            edges = affected.len(),
            principals_deleted = deleted,
            "bulk delete completed"
        );
        Ok(deleted)
    }

    /// Repair procedure: affiliation rows owned by global principals are
    /// data corruption; remove them. Returns the number of rows dropped.
    pub async fn strip_global_affiliations(&self) -> Result<u64, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let dropped = sqlx::query(
            "DELETE FROM affiliations a
             USING principals p
             WHERE p.principal_id = a.principal_id
               AND p.global_role IN ('programmer', 'super_admin')",
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();
        tx.commit().await?;

        if dropped > 0 {
            tracing::warn!(rows = dropped, "stripped affiliations held by global principals");
        }
        Ok(dropped)
    }
}

/// Transactional form of `ensure`, shared with pre-registration.
///
/// Rejects edges for principals whose global role is school-independent.
/// `ON CONFLICT DO NOTHING` keeps the existing role untouched.
pub(crate) async fn ensure_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    principal_id: i64,
    school_id: i64,
    role: Role,
) -> Result<bool, ServiceError> {
    if role.is_global() {
        return Err(ServiceError::GlobalRoleHasNoAffiliations);
    }

    let global_role: Option<String> =
        sqlx::query_scalar("SELECT global_role FROM principals WHERE principal_id = $1")
            .bind(principal_id)
            .fetch_optional(&mut **tx)
            .await?;

    let global_role = global_role.ok_or(ServiceError::UnknownPrincipal)?;
    if Role::parse(&global_role)
        .ok_or(ServiceError::UnknownRole(global_role.clone()))?
        .is_global()
    {
        return Err(ServiceError::GlobalRoleHasNoAffiliations);
    }

    let inserted = sqlx::query(
        "INSERT INTO affiliations (principal_id, school_id, school_role)
         VALUES ($1, $2, $3)
         ON CONFLICT (principal_id, school_id) DO NOTHING",
    )
    .bind(principal_id)
    .bind(school_id)
    .bind(role.as_str())
    .execute(&mut **tx)
    .await
    .map_err(|e| ServiceError::from_insert(e, "affiliation"))?
    .rows_affected();

    Ok(inserted > 0)
}
