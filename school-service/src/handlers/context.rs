//! School-context selection: the picker, the switch, and view-as.

use axum::{
    extract::{Path, State},
    response::Redirect,
    Json,
};
use axum_extra::extract::SignedCookieJar;
use service_core::error::AppError;

use crate::middleware::{remembered_days, write_session, CurrentSession};
use crate::models::{AffiliationDetail, SchoolResponse};
use crate::services::error::ServiceError;
use crate::AppState;

#[derive(Debug, serde::Serialize)]
pub struct SchoolPicker {
    /// Schools the principal may bind to. For globals this is every school,
    /// offered as view-as targets.
    pub choices: Vec<AffiliationDetail>,
    pub is_global: bool,
}

/// GET /select-school. Non-globals see their affiliations; globals see all
/// schools as view-as targets.
pub async fn select_school(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<SchoolPicker>, AppError> {
    let is_global = ctx.global_role.is_global();

    let choices = if is_global {
        state
            .schools
            .list()
            .await?
            .into_iter()
            .map(|s| AffiliationDetail {
                school_id: s.school_id,
                school_name: s.school_name,
                school_role: ctx.global_role.to_string(),
            })
            .collect()
    } else {
        state.affiliations.details_for(ctx.principal_id).await?
    };

    Ok(Json(SchoolPicker { choices, is_global }))
}

/// GET /set-school/:school_id. Binds the active school for the session.
/// The transition itself rejects schools the principal holds no edge to.
pub async fn set_school(
    State(state): State<AppState>,
    CurrentSession(mut ctx): CurrentSession,
    jar: SignedCookieJar,
    Path(school_id): Path<i64>,
) -> Result<(SignedCookieJar, Redirect), AppError> {
    ctx.set_active_school(school_id)?;

    let remember = remembered_days(&jar, state.config.session.remember_days);
    let jar = write_session(jar, &ctx, remember);
    Ok((jar, Redirect::to("/dashboard")))
}

/// GET /view-as/:school_id. Globals only: impersonate one school so scoped
/// listings show what that school's staff would see. The school name is
/// carried in the session for the UI banner.
pub async fn set_view_as(
    State(state): State<AppState>,
    CurrentSession(mut ctx): CurrentSession,
    jar: SignedCookieJar,
    Path(school_id): Path<i64>,
) -> Result<(SignedCookieJar, Redirect), AppError> {
    let school = state
        .schools
        .find_by_id(school_id)
        .await?
        .ok_or(ServiceError::UnknownSchool)?;

    ctx.set_view_as(school.school_id, school.school_name)?;

    let remember = remembered_days(&jar, state.config.session.remember_days);
    let jar = write_session(jar, &ctx, remember);
    Ok((jar, Redirect::to("/dashboard")))
}

/// GET /view-as/clear. Back to the unscoped global state.
pub async fn clear_view_as(
    State(state): State<AppState>,
    CurrentSession(mut ctx): CurrentSession,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Redirect), AppError> {
    if !ctx.global_role.is_global() {
        return Err(ServiceError::Forbidden.into());
    }
    ctx.clear_view_as();

    let remember = remembered_days(&jar, state.config.session.remember_days);
    let jar = write_session(jar, &ctx, remember);
    Ok((jar, Redirect::to("/dashboard")))
}

/// GET /context. The resolved session context, for the frontend shell:
/// state name, current school, and the view-as banner if any.
pub async fn current_context(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<ContextResponse>, AppError> {
    let school = match ctx.current_school_id() {
        Some(school_id) => state
            .schools
            .find_by_id(school_id)
            .await?
            .map(SchoolResponse::from),
        None => None,
    };

    Ok(Json(ContextResponse {
        state: format!("{:?}", ctx.state()),
        principal_id: ctx.principal_id,
        global_role: ctx.global_role.to_string(),
        school,
        view_as: ctx.view_as.clone(),
        must_change_password: ctx.must_change_password,
    }))
}

#[derive(Debug, serde::Serialize)]
pub struct ContextResponse {
    pub state: String,
    pub principal_id: i64,
    pub global_role: String,
    pub school: Option<SchoolResponse>,
    pub view_as: Option<crate::context::ViewAs>,
    pub must_change_password: bool,
}
