//! School store: creation, updates, and the guarded cascade delete.

use sqlx::PgPool;

use crate::models::School;

use super::error::ServiceError;
use super::identity::IdentityService;

#[derive(Clone)]
pub struct SchoolService {
    pool: PgPool,
    identity: IdentityService,
}

const KNOWN_KINDS: [&str; 3] = ["cfs", "cbfpm", "cspm"];

impl SchoolService {
    pub fn new(pool: PgPool, identity: IdentityService) -> Self {
        Self { pool, identity }
    }

    pub async fn list(&self) -> Result<Vec<School>, ServiceError> {
        let rows =
            sqlx::query_as::<_, School>("SELECT * FROM schools ORDER BY school_name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    pub async fn find_by_id(&self, school_id: i64) -> Result<Option<School>, ServiceError> {
        let row = sqlx::query_as::<_, School>("SELECT * FROM schools WHERE school_id = $1")
            .bind(school_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn create(&self, name: &str, kind: &str) -> Result<School, ServiceError> {
        let name = name.trim();
        if name.is_empty() || !KNOWN_KINDS.contains(&kind) {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "school name and a known kind are required"
            )));
        }

        let mut tx = self.pool.begin().await?;
        let school = sqlx::query_as::<_, School>(
            "INSERT INTO schools (school_name, school_kind) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(kind)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| ServiceError::from_insert(e, "school name"))?;
        tx.commit().await?;

        tracing::info!(school_id = school.school_id, name, "school created");
        Ok(school)
    }

    pub async fn update(
        &self,
        school_id: i64,
        name: &str,
        kind: &str,
    ) -> Result<School, ServiceError> {
        let name = name.trim();
        if name.is_empty() || !KNOWN_KINDS.contains(&kind) {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "school name and a known kind are required"
            )));
        }

        let mut tx = self.pool.begin().await?;
        let school = sqlx::query_as::<_, School>(
            "UPDATE schools
             SET school_name = $1, school_kind = $2, updated_utc = now()
             WHERE school_id = $3
             RETURNING *",
        )
        .bind(name)
        .bind(kind)
        .bind(school_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| ServiceError::from_insert(e, "school name"))?
        .ok_or(ServiceError::UnknownSchool)?;
        tx.commit().await?;
        Ok(school)
    }

    /// Delete a school. Never silent: the caller re-confirms their own
    /// password. Principals exclusive to the school are removed with it,
    /// except globals, which are untouchable here.
    pub async fn delete(
        &self,
        caller_id: i64,
        caller_password: &str,
        school_id: i64,
    ) -> Result<u64, ServiceError> {
        let caller = self
            .identity
            .find_by_id(caller_id)
            .await?
            .ok_or(ServiceError::UnknownPrincipal)?;
        if !self.identity.check_password(&caller, caller_password) {
            return Err(ServiceError::InvalidCredentials);
        }

        let mut tx = self.pool.begin().await?;

        // Principals whose only affiliation is this school.
        let exclusive: Vec<i64> = sqlx::query_scalar(
            "SELECT a.principal_id
             FROM affiliations a
             WHERE a.school_id = $1
               AND NOT EXISTS (
                   SELECT 1 FROM affiliations o
                   WHERE o.principal_id = a.principal_id AND o.school_id <> $1
               )",
        )
        .bind(school_id)
        .fetch_all(&mut *tx)
        .await?;

        let removed = sqlx::query("DELETE FROM schools WHERE school_id = $1")
            .bind(school_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(ServiceError::UnknownSchool);
        }

        let users_deleted: u64 = sqlx::query(
            "DELETE FROM principals
             WHERE principal_id = ANY($1)
               AND global_role NOT IN ('programmer', 'super_admin')",
        )
        .bind(&exclusive)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        tracing::warn!(school_id, users_deleted, "school deleted with exclusive users");
        Ok(users_deleted)
    }
}
