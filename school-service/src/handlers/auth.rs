//! Login, logout, activation, and password reset endpoints.

use axum::{
    extract::{Path, State},
    response::Redirect,
    Json,
};
use axum_extra::extract::SignedCookieJar;
use service_core::error::AppError;

use crate::context::SessionState;
use crate::dtos::{
    ActivateForm, LoginForm, MessageResponse, RequestResetForm, ResetPasswordForm,
};
use crate::middleware::{clear_session, write_session};
use crate::services::auth::ActivationInput;
use crate::services::error::ServiceError;
use crate::utils::{Password, ValidatedForm};
use crate::AppState;

/// POST /login. Resolves the identifier (matricula, email, or username),
/// checks the password, and writes the session cookies. The redirect
/// depends on how many schools the principal can pick from.
pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    ValidatedForm(form): ValidatedForm<LoginForm>,
) -> Result<(SignedCookieJar, Redirect), AppError> {
    let (_, ctx) = state.auth.login(&form.identifier, &form.password).await?;

    let remember_days = form
        .remember_me()
        .then_some(state.config.session.remember_days);
    let jar = write_session(jar, &ctx, remember_days);

    let target = match ctx.state() {
        SessionState::MustChooseSchool | SessionState::AuthenticatedNoContext => "/select-school",
        _ => "/dashboard",
    };
    Ok((jar, Redirect::to(target)))
}

/// GET /logout. Drops every session cookie.
pub async fn logout(jar: SignedCookieJar) -> (SignedCookieJar, Redirect) {
    (clear_session(jar), Redirect::to("/login"))
}

/// GET /register. Form data for the activation page: the class list, so a
/// student can pick theirs before being logged in.
pub async fn register_form(
    State(state): State<AppState>,
) -> Result<Json<Vec<crate::models::Class>>, AppError> {
    let rows = sqlx::query_as::<_, crate::models::Class>(
        "SELECT class_id, school_id, class_name FROM classes ORDER BY school_id, class_name",
    )
    .fetch_all(&state.pool)
    .await
    .map_err(ServiceError::from)?;
    Ok(Json(rows))
}

/// POST /register. Activates a pre-registered matricula.
pub async fn register(
    State(state): State<AppState>,
    ValidatedForm(form): ValidatedForm<ActivateForm>,
) -> Result<Redirect, AppError> {
    let role = super::parse_role_field(&form.role)?;

    state
        .auth
        .activate(ActivationInput {
            external_id: form.matricula,
            role,
            password: Password::new(form.password),
            password_confirm: Password::new(form.password2),
            full_name: form.full_name,
            war_name: form.war_name,
            rank: form.rank,
            email: form.email,
            class_id: form.class_id,
            unit: form.unit,
        })
        .await?;

    Ok(Redirect::to("/login"))
}

/// POST /recuperar-senha. The response never reveals whether the address
/// exists; delivery of the token is the mailer's problem, not ours.
pub async fn request_password_reset(
    State(state): State<AppState>,
    ValidatedForm(form): ValidatedForm<RequestResetForm>,
) -> Result<Json<MessageResponse>, AppError> {
    if let Some(token) = state.auth.request_password_reset(&form.email).await? {
        // Handed to the outbound mailer; the token itself stays out of logs.
        tracing::info!(token_len = token.len(), "password reset token issued");
    }

    Ok(Json(MessageResponse {
        message: "Se o email estiver cadastrado, as instruções foram enviadas.".to_string(),
    }))
}

/// GET /redefinir-senha/:token. Validates the token so the UI can show the
/// form or an "expired" message before the user types anything.
pub async fn reset_password_form(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.verify_reset_token(&token)?;
    Ok(Json(MessageResponse {
        message: "Token válido.".to_string(),
    }))
}

/// POST /redefinir-senha/:token. Consumes the token and writes the new
/// password.
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ValidatedForm(form): ValidatedForm<ResetPasswordForm>,
) -> Result<Redirect, AppError> {
    state
        .auth
        .confirm_password_reset(
            &token,
            Password::new(form.password),
            Password::new(form.password2),
        )
        .await?;
    Ok(Redirect::to("/login"))
}
