//! The dashboard and the scoped listings behind it.

use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::context::{authorize, scope, SessionState, VisibleSchools};
use crate::middleware::CurrentSession;
use crate::models::{Capability, SchoolResponse};
use crate::services::error::ServiceError;
use crate::AppState;

#[derive(Debug, serde::Serialize)]
pub struct DashboardResponse {
    pub school: Option<SchoolResponse>,
    pub effective_role: Option<String>,
    pub roster_size: usize,
    pub view_as_banner: Option<String>,
}

/// GET /dashboard.
///
/// Principals who still have to pick a school are redirected to the
/// picker. Globals land here even without a view-as; their listings are
/// simply empty until they impersonate a school.
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<DashboardResponse>, AppError> {
    if !ctx.global_role.is_global() {
        if matches!(
            ctx.state(),
            SessionState::MustChooseSchool | SessionState::AuthenticatedNoContext
        ) {
            return Err(ServiceError::NoActiveContext.into());
        }
        authorize(&ctx, Capability::ViewDashboard, None)?;
    }

    let school = match ctx.current_school_id() {
        Some(school_id) => state
            .schools
            .find_by_id(school_id)
            .await?
            .map(SchoolResponse::from),
        None => None,
    };

    let visible = VisibleSchools::of(&ctx);
    let roster = scope::list_roster(&state.pool, &visible).await?;

    Ok(Json(DashboardResponse {
        school,
        effective_role: ctx.effective_role().ok().map(|r| r.to_string()),
        roster_size: roster.len(),
        view_as_banner: ctx.view_as.as_ref().map(|v| v.school_name.clone()),
    }))
}

/// GET /roster. The full scoped roster; school staff only.
pub async fn roster(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<Vec<scope::RosterEntry>>, AppError> {
    authorize(&ctx, Capability::ReadSchoolRecords, None)?;

    let visible = VisibleSchools::of(&ctx);
    let rows = scope::list_roster(&state.pool, &visible).await?;
    Ok(Json(rows))
}

/// GET /classes. Classes of the visible schools, for pickers.
pub async fn classes(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<Vec<crate::models::Class>>, AppError> {
    authorize(&ctx, Capability::ViewDashboard, None)?;

    let visible = VisibleSchools::of(&ctx);
    let rows = scope::list_classes(&state.pool, &visible).await?;
    Ok(Json(rows))
}

/// GET /me. The one record a principal can always read: their own.
pub async fn me(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<crate::models::PrincipalResponse>, AppError> {
    let record = scope::find_self(&state.pool, ctx.principal_id)
        .await?
        .ok_or(ServiceError::UnknownPrincipal)?;
    Ok(Json(record))
}
