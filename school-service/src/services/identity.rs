//! Identity store: principal lookup and credential management.

use sqlx::PgPool;

use crate::models::Principal;
use crate::utils::{
    hash_password, normalize_email, normalize_external_id, verify_password, Password,
    PasswordHashString,
};

use super::error::ServiceError;

#[derive(Clone)]
pub struct IdentityService {
    pool: PgPool,
}

impl IdentityService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve a free-form login identifier.
    ///
    /// Order matters: a normalizable matricula wins, then an `@` string is
    /// tried as a lowercased email, then the username. At most one match.
    pub async fn find_for_login(
        &self,
        identifier: &str,
    ) -> Result<Option<Principal>, ServiceError> {
        let ident = identifier.trim();
        if ident.is_empty() {
            return Ok(None);
        }

        if let Some(external_id) = normalize_external_id(ident) {
            if let Some(principal) = self.find_by_external_id(&external_id).await? {
                return Ok(Some(principal));
            }
        }

        if ident.contains('@') {
            if let Some(email) = normalize_email(ident) {
                let found = sqlx::query_as::<_, Principal>(
                    "SELECT * FROM principals WHERE email = $1",
                )
                .bind(&email)
                .fetch_optional(&self.pool)
                .await?;
                if found.is_some() {
                    return Ok(found);
                }
            }
        }

        let found =
            sqlx::query_as::<_, Principal>("SELECT * FROM principals WHERE username = $1")
                .bind(ident)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found)
    }

    pub async fn find_by_id(&self, principal_id: i64) -> Result<Option<Principal>, ServiceError> {
        let found =
            sqlx::query_as::<_, Principal>("SELECT * FROM principals WHERE principal_id = $1")
                .bind(principal_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found)
    }

    pub async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Principal>, ServiceError> {
        let found =
            sqlx::query_as::<_, Principal>("SELECT * FROM principals WHERE external_id = $1")
                .bind(external_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, ServiceError> {
        let Some(email) = normalize_email(email) else {
            return Ok(None);
        };
        let found = sqlx::query_as::<_, Principal>("SELECT * FROM principals WHERE email = $1")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    /// Write a fresh salted hash; rejects short passwords with
    /// `WeakPassword`. Also clears `must_change_password`.
    pub async fn set_password(
        &self,
        principal_id: i64,
        password: &Password,
    ) -> Result<(), ServiceError> {
        if !password.is_long_enough() {
            return Err(ServiceError::WeakPassword);
        }
        let hash = hash_password(password)?;

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE principals
             SET password_hash = $1, must_change_password = FALSE
             WHERE principal_id = $2",
        )
        .bind(hash.as_str())
        .bind(principal_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::UnknownPrincipal);
        }
        tx.commit().await?;
        Ok(())
    }

    /// Constant-time-equivalent hash comparison. A principal without a
    /// hash (pre-registered, not yet activated) never matches.
    pub fn check_password(&self, principal: &Principal, plaintext: &str) -> bool {
        let Some(hash) = principal.password_hash.as_deref() else {
            return false;
        };
        verify_password(
            &Password::new(plaintext.to_string()),
            &PasswordHashString::new(hash.to_string()),
        )
    }
}
