//! Login, activation, password reset, and pre-registration flows.

use sqlx::PgPool;

use crate::context::SessionContext;
use crate::models::{Principal, Role};
use crate::utils::{
    hash_password, normalize_email, normalize_external_id, normalize_name, Password,
};

use super::affiliation::{ensure_in_tx, AffiliationService};
use super::error::ServiceError;
use super::identity::IdentityService;
use super::reset_token::ResetTokenService;

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    identity: IdentityService,
    affiliations: AffiliationService,
    reset_tokens: ResetTokenService,
}

/// Profile fields collected by the activation form.
#[derive(Debug, Clone)]
pub struct ActivationInput {
    pub external_id: String,
    pub role: Role,
    pub password: Password,
    pub password_confirm: Password,
    pub full_name: String,
    pub war_name: String,
    pub rank: Option<String>,
    pub email: Option<String>,
    /// Required when activating as a student.
    pub class_id: Option<i64>,
    /// The student's unit ("OPM"); defaults when absent.
    pub unit: Option<String>,
}

/// Counters returned by batch pre-registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PreRegisterOutcome {
    pub new: u64,
    pub existing: u64,
    pub skipped: u64,
}

impl AuthService {
    pub fn new(
        pool: PgPool,
        identity: IdentityService,
        affiliations: AffiliationService,
        reset_tokens: ResetTokenService,
    ) -> Self {
        Self {
            pool,
            identity,
            affiliations,
            reset_tokens,
        }
    }

    /// Authenticate and resolve the initial session context.
    ///
    /// Bad identifier and bad password are indistinguishable to the caller;
    /// inactive principals are told to finish activation first.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<(Principal, SessionContext), ServiceError> {
        let principal = self
            .identity
            .find_for_login(identifier)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !self.identity.check_password(&principal, password) {
            return Err(ServiceError::InvalidCredentials);
        }
        if !principal.is_active {
            return Err(ServiceError::InactivePrincipal);
        }

        let role = principal.role()?;
        let edges = if role.is_global() {
            Vec::new()
        } else {
            self.affiliations.edges_for(principal.principal_id).await?
        };

        let ctx = SessionContext::on_login(
            principal.principal_id,
            role,
            edges,
            principal.must_change_password,
        );

        tracing::info!(
            principal_id = principal.principal_id,
            role = role.as_str(),
            "login succeeded"
        );
        Ok((principal, ctx))
    }

    /// Activate a pre-registered principal.
    ///
    /// The bearer proves ownership by knowing the pre-seeded external id.
    /// A second activation after success fails with `Duplicate`; it never
    /// creates another principal.
    pub async fn activate(&self, input: ActivationInput) -> Result<(), ServiceError> {
        if !input.password.is_long_enough()
            || input.password.as_str() != input.password_confirm.as_str()
        {
            return Err(ServiceError::WeakPassword);
        }
        if !matches!(
            input.role,
            Role::Student | Role::Instructor | Role::SchoolAdmin
        ) {
            return Err(ServiceError::Forbidden);
        }

        let external_id =
            normalize_external_id(&input.external_id).ok_or(ServiceError::UnknownPrincipal)?;

        let mut tx = self.pool.begin().await?;

        let principal = sqlx::query_as::<_, Principal>(
            "SELECT * FROM principals WHERE external_id = $1 FOR UPDATE",
        )
        .bind(&external_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::UnknownPrincipal)?;

        if principal.is_active {
            return Err(ServiceError::Duplicate("activation"));
        }

        // Pre-registration must have attached at least one school.
        let first_school: Option<i64> = sqlx::query_scalar(
            "SELECT school_id FROM affiliations
             WHERE principal_id = $1 ORDER BY school_id LIMIT 1",
        )
        .bind(principal.principal_id)
        .fetch_optional(&mut *tx)
        .await?;
        let first_school = first_school.ok_or(ServiceError::MissingAffiliation)?;

        let hash = hash_password(&input.password)?;
        let email = input.email.as_deref().and_then(normalize_email);

        sqlx::query(
            "UPDATE principals
             SET global_role = $1,
                 full_name = $2,
                 war_name = $3,
                 rank = $4,
                 email = $5,
                 password_hash = $6,
                 is_active = TRUE,
                 must_change_password = FALSE
             WHERE principal_id = $7",
        )
        .bind(input.role.as_str())
        .bind(normalize_name(&input.full_name))
        .bind(normalize_name(&input.war_name))
        .bind(input.rank.as_deref().filter(|s| !s.trim().is_empty()))
        .bind(&email)
        .bind(hash.as_str())
        .bind(principal.principal_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| ServiceError::from_insert(e, "email"))?;

        match input.role {
            Role::Student => {
                let class_id = input.class_id.ok_or(ServiceError::UnknownClass)?;
                let class_exists: Option<i64> =
                    sqlx::query_scalar("SELECT class_id FROM classes WHERE class_id = $1")
                        .bind(class_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                if class_exists.is_none() {
                    return Err(ServiceError::UnknownClass);
                }

                sqlx::query(
                    "INSERT INTO student_profiles (principal_id, class_id, unit)
                     VALUES ($1, $2, $3)
                     ON CONFLICT (principal_id)
                     DO UPDATE SET class_id = EXCLUDED.class_id, unit = EXCLUDED.unit",
                )
                .bind(principal.principal_id)
                .bind(class_id)
                .bind(input.unit.as_deref().unwrap_or("Não informado"))
                .execute(&mut *tx)
                .await?;
            }
            Role::Instructor => {
                sqlx::query(
                    "INSERT INTO instructor_profiles (principal_id, school_id)
                     VALUES ($1, $2)
                     ON CONFLICT (principal_id) DO NOTHING",
                )
                .bind(principal.principal_id)
                .bind(first_school)
                .execute(&mut *tx)
                .await?;
            }
            _ => {}
        }

        tx.commit().await?;
        tracing::info!(
            principal_id = principal.principal_id,
            role = input.role.as_str(),
            "principal activated"
        );
        Ok(())
    }

    /// Issue a reset token for an email. `None` when the address is
    /// unknown; the handler answers identically either way so addresses
    /// cannot be probed.
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<String>, ServiceError> {
        let Some(principal) = self.identity.find_by_email(email).await? else {
            return Ok(None);
        };
        let token = self.reset_tokens.issue(principal.principal_id)?;
        Ok(Some(token))
    }

    /// Verify a reset token without consuming it, for the GET surface.
    pub fn verify_reset_token(&self, token: &str) -> Result<i64, ServiceError> {
        self.reset_tokens.verify(token)
    }

    /// Consume a reset token and write the new password.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        password: Password,
        password_confirm: Password,
    ) -> Result<(), ServiceError> {
        let principal_id = self.reset_tokens.verify(token)?;

        if !password.is_long_enough() || password.as_str() != password_confirm.as_str() {
            return Err(ServiceError::WeakPassword);
        }

        self.identity
            .find_by_id(principal_id)
            .await?
            .ok_or(ServiceError::UnknownPrincipal)?;

        self.identity.set_password(principal_id, &password).await?;
        tracing::info!(principal_id, "password reset completed");
        Ok(())
    }

    /// Batch pre-registration: create inactive principals and attach the
    /// affiliation edge. Idempotent on external id — known matriculas count
    /// as existing (an in-batch repeat hits the row inserted moments
    /// before), and the edge is still ensured for them.
    pub async fn pre_register_batch(
        &self,
        matriculas: &[String],
        role: Role,
        school_id: i64,
    ) -> Result<PreRegisterOutcome, ServiceError> {
        if role.is_global() {
            return Err(ServiceError::GlobalRoleHasNoAffiliations);
        }

        let school_exists: Option<i64> =
            sqlx::query_scalar("SELECT school_id FROM schools WHERE school_id = $1")
                .bind(school_id)
                .fetch_optional(&self.pool)
                .await?;
        if school_exists.is_none() {
            return Err(ServiceError::UnknownSchool);
        }

        let mut outcome = PreRegisterOutcome::default();
        let mut tx = self.pool.begin().await?;

        for raw in matriculas {
            let Some(external_id) = normalize_external_id(raw) else {
                outcome.skipped += 1;
                continue;
            };

            let existing: Option<i64> = sqlx::query_scalar(
                "SELECT principal_id FROM principals WHERE external_id = $1",
            )
            .bind(&external_id)
            .fetch_optional(&mut *tx)
            .await?;

            match existing {
                Some(principal_id) => {
                    outcome.existing += 1;
                    ensure_in_tx(&mut tx, principal_id, school_id, role).await?;
                }
                None => {
                    let principal_id: i64 = sqlx::query_scalar(
                        "INSERT INTO principals (external_id, global_role, is_active)
                         VALUES ($1, $2, FALSE)
                         RETURNING principal_id",
                    )
                    .bind(&external_id)
                    .bind(role.as_str())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| ServiceError::from_insert(e, "external_id"))?;

                    ensure_in_tx(&mut tx, principal_id, school_id, role).await?;
                    outcome.new += 1;
                }
            }
        }

        tx.commit().await?;
        tracing::info!(
            school_id,
            role = role.as_str(),
            new = outcome.new,
            existing = outcome.existing,
            skipped = outcome.skipped,
            "batch pre-registration finished"
        );
        Ok(outcome)
    }
}
