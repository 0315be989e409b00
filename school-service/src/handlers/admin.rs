//! Administrative surfaces: pre-registration, school CRUD, affiliation
//! management, bulk deletes, and the data repair endpoint.

use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;

use crate::context::authorize;
use crate::dtos::{
    AffiliationForm, DeleteSchoolForm, MessageResponse, PreRegisterForm, RemoveAffiliationForm,
    SchoolForm,
};
use crate::middleware::CurrentSession;
use crate::models::{Capability, SchoolResponse};
use crate::services::auth::PreRegisterOutcome;
use crate::services::error::ServiceError;
use crate::utils::ValidatedForm;
use crate::AppState;

/// POST /pre-cadastro. Batch pre-registration of matriculas into one
/// school. School admins implicitly target their active school; an
/// explicit school id is checked at the gate, so a school admin cannot
/// seed someone else's roster.
pub async fn pre_register(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    ValidatedForm(form): ValidatedForm<PreRegisterForm>,
) -> Result<Json<PreRegisterOutcome>, AppError> {
    let school_id = match form.school_id {
        Some(id) => id,
        None => ctx
            .current_school_id()
            .ok_or(ServiceError::NoActiveContext)?,
    };
    authorize(&ctx, Capability::PreRegister, Some(school_id))?;

    let role = super::parse_role_field(&form.role)?;

    let outcome = state
        .auth
        .pre_register_batch(&form.matricula_list(), role, school_id)
        .await?;
    Ok(Json(outcome))
}

/// GET /schools. The all-schools admin listing; unscoped on purpose, and
/// gated so only roles carrying `ManageSchools` reach it.
pub async fn list_schools(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<Vec<SchoolResponse>>, AppError> {
    authorize(&ctx, Capability::ManageSchools, None)?;

    let schools = state
        .schools
        .list()
        .await?
        .into_iter()
        .map(SchoolResponse::from)
        .collect();
    Ok(Json(schools))
}

/// POST /schools.
pub async fn create_school(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    ValidatedForm(form): ValidatedForm<SchoolForm>,
) -> Result<Json<SchoolResponse>, AppError> {
    authorize(&ctx, Capability::ManageSchools, None)?;

    let school = state
        .schools
        .create(&form.school_name, &form.school_kind)
        .await?;
    Ok(Json(school.into()))
}

/// PUT /schools/:school_id.
pub async fn update_school(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(school_id): Path<i64>,
    ValidatedForm(form): ValidatedForm<SchoolForm>,
) -> Result<Json<SchoolResponse>, AppError> {
    authorize(&ctx, Capability::ManageSchools, None)?;

    let school = state
        .schools
        .update(school_id, &form.school_name, &form.school_kind)
        .await?;
    Ok(Json(school.into()))
}

/// DELETE /schools/:school_id. The caller re-confirms their own password;
/// principals exclusive to the school go with it.
pub async fn delete_school(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(school_id): Path<i64>,
    ValidatedForm(form): ValidatedForm<DeleteSchoolForm>,
) -> Result<Json<MessageResponse>, AppError> {
    authorize(&ctx, Capability::ManageSchools, None)?;

    let users_deleted = state
        .schools
        .delete(ctx.principal_id, &form.password, school_id)
        .await?;
    Ok(Json(MessageResponse {
        message: format!("Escola removida; {} usuários exclusivos removidos.", users_deleted),
    }))
}

/// POST /affiliations. Attach a principal to a school with a role; if the
/// edge already exists, this changes its role instead.
pub async fn assign_affiliation(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    ValidatedForm(form): ValidatedForm<AffiliationForm>,
) -> Result<Json<MessageResponse>, AppError> {
    authorize(&ctx, Capability::ManageAffiliations, Some(form.school_id))?;

    let role = super::parse_role_field(&form.role)?;

    let inserted = state
        .affiliations
        .ensure(form.principal_id, form.school_id, role)
        .await?;
    if !inserted {
        state
            .affiliations
            .set_role(form.principal_id, form.school_id, role)
            .await?;
    }

    Ok(Json(MessageResponse {
        message: if inserted {
            "Vínculo criado.".to_string()
        } else {
            "Função atualizada.".to_string()
        },
    }))
}

/// DELETE /affiliations.
pub async fn remove_affiliation(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    ValidatedForm(form): ValidatedForm<RemoveAffiliationForm>,
) -> Result<Json<MessageResponse>, AppError> {
    authorize(&ctx, Capability::ManageAffiliations, Some(form.school_id))?;

    state
        .affiliations
        .remove(form.principal_id, form.school_id)
        .await?;
    Ok(Json(MessageResponse {
        message: "Vínculo removido.".to_string(),
    }))
}

/// POST /schools/:school_id/students/bulk-delete. Global roles only.
pub async fn bulk_delete_students(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(school_id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    let deleted = state
        .affiliations
        .bulk_delete_students_of(ctx.global_role, school_id)
        .await?;
    Ok(Json(MessageResponse {
        message: format!("{} alunos removidos.", deleted),
    }))
}

/// POST /schools/:school_id/instructors/bulk-delete. Global roles only.
pub async fn bulk_delete_instructors(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(school_id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    let deleted = state
        .affiliations
        .bulk_delete_instructors_of(ctx.global_role, school_id)
        .await?;
    Ok(Json(MessageResponse {
        message: format!("{} instrutores removidos.", deleted),
    }))
}

/// POST /repair/strip-global-affiliations. Removes affiliation rows held
/// by global principals, which are data corruption.
pub async fn strip_global_affiliations(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<MessageResponse>, AppError> {
    authorize(&ctx, Capability::ManageSchools, None)?;

    let dropped = state.affiliations.strip_global_affiliations().await?;
    Ok(Json(MessageResponse {
        message: format!("{} vínculos inválidos removidos.", dropped),
    }))
}
