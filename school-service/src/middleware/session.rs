//! Session cookie handling and the per-request context extractor.
//!
//! The signed cookie jar is the source of truth for which principal is
//! logged in and which school context they picked; the database is the
//! source of truth for whether that pick is still legitimate. The
//! extractor re-validates on every request, so a revoked affiliation kills
//! the stored context immediately.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use service_core::error::AppError;

use crate::context::{SessionContext, ViewAs};
use crate::AppState;

pub const PRINCIPAL_COOKIE: &str = "principal_id";
pub const ACTIVE_SCHOOL_COOKIE: &str = "active_school_id";
pub const VIEW_AS_ID_COOKIE: &str = "view_as_school_id";
pub const VIEW_AS_NAME_COOKIE: &str = "view_as_school_name";
pub const REMEMBER_COOKIE: &str = "remember";

/// The authenticated request context.
pub struct CurrentSession(pub SessionContext);

/// Rejection: anonymous callers are sent to the login page; everything
/// else surfaces as a regular application error.
pub enum SessionRejection {
    NotLoggedIn,
    App(AppError),
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        match self {
            SessionRejection::NotLoggedIn => Redirect::to("/login").into_response(),
            SessionRejection::App(err) => err.into_response(),
        }
    }
}

impl From<AppError> for SessionRejection {
    fn from(err: AppError) -> Self {
        SessionRejection::App(err)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = SessionRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::<Key>::from_request_parts(parts, state)
            .await
            .map_err(|_| SessionRejection::NotLoggedIn)?;

        let principal_id: i64 = jar
            .get(PRINCIPAL_COOKIE)
            .and_then(|c| c.value().parse().ok())
            .ok_or(SessionRejection::NotLoggedIn)?;

        let principal = state
            .identity
            .find_by_id(principal_id)
            .await
            .map_err(|e| SessionRejection::App(e.into()))?
            .ok_or(SessionRejection::NotLoggedIn)?;

        if !principal.is_active {
            return Err(SessionRejection::NotLoggedIn);
        }

        let role = principal
            .role()
            .map_err(|e| SessionRejection::App(AppError::InternalError(anyhow::anyhow!(e))))?;

        let affiliations = if role.is_global() {
            Vec::new()
        } else {
            state
                .affiliations
                .edges_for(principal_id)
                .await
                .map_err(|e| SessionRejection::App(e.into()))?
        };

        let mut ctx = SessionContext {
            principal_id,
            global_role: role,
            affiliations,
            active_school_id: None,
            view_as: None,
            must_change_password: principal.must_change_password,
        };

        if role.is_global() {
            let view_as_id: Option<i64> = jar
                .get(VIEW_AS_ID_COOKIE)
                .and_then(|c| c.value().parse().ok());
            if let Some(school_id) = view_as_id {
                let school_name = jar
                    .get(VIEW_AS_NAME_COOKIE)
                    .map(|c| c.value().to_string())
                    .unwrap_or_default();
                ctx.view_as = Some(ViewAs {
                    school_id,
                    school_name,
                });
            }
        } else {
            // The stored pick only survives while the edge does.
            let stored: Option<i64> = jar
                .get(ACTIVE_SCHOOL_COOKIE)
                .and_then(|c| c.value().parse().ok());
            match stored {
                Some(school_id) if ctx.edge_for(school_id).is_some() => {
                    ctx.active_school_id = Some(school_id);
                }
                _ if ctx.affiliations.len() == 1 => {
                    ctx.active_school_id = Some(ctx.affiliations[0].school_id);
                }
                _ => {}
            }
        }

        Ok(CurrentSession(ctx))
    }
}

fn session_cookie(name: &'static str, value: String, remember_days: Option<i64>) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    if let Some(days) = remember_days {
        cookie.set_max_age(time::Duration::days(days));
    }
    cookie
}

/// Write the whole context into the jar. `remember_days` makes the cookies
/// persistent; `None` keeps them session-scoped.
pub fn write_session(
    jar: SignedCookieJar,
    ctx: &SessionContext,
    remember_days: Option<i64>,
) -> SignedCookieJar {
    let mut jar = jar.add(session_cookie(
        PRINCIPAL_COOKIE,
        ctx.principal_id.to_string(),
        remember_days,
    ));

    jar = match ctx.active_school_id {
        Some(school_id) => jar.add(session_cookie(
            ACTIVE_SCHOOL_COOKIE,
            school_id.to_string(),
            remember_days,
        )),
        None => jar.remove(Cookie::from(ACTIVE_SCHOOL_COOKIE)),
    };

    jar = match &ctx.view_as {
        Some(view_as) => jar
            .add(session_cookie(
                VIEW_AS_ID_COOKIE,
                view_as.school_id.to_string(),
                remember_days,
            ))
            .add(session_cookie(
                VIEW_AS_NAME_COOKIE,
                view_as.school_name.clone(),
                remember_days,
            )),
        None => jar
            .remove(Cookie::from(VIEW_AS_ID_COOKIE))
            .remove(Cookie::from(VIEW_AS_NAME_COOKIE)),
    };

    match remember_days {
        Some(_) => jar.add(session_cookie(REMEMBER_COOKIE, "1".to_string(), remember_days)),
        None => jar.remove(Cookie::from(REMEMBER_COOKIE)),
    }
}

/// Remembered-session lifetime of an existing jar, so context updates keep
/// the persistence the principal chose at login.
pub fn remembered_days(jar: &SignedCookieJar, remember_days: i64) -> Option<i64> {
    jar.get(REMEMBER_COOKIE).map(|_| remember_days)
}

/// Drop every session cookie.
pub fn clear_session(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(Cookie::from(PRINCIPAL_COOKIE))
        .remove(Cookie::from(ACTIVE_SCHOOL_COOKIE))
        .remove(Cookie::from(VIEW_AS_ID_COOKIE))
        .remove(Cookie::from(VIEW_AS_NAME_COOKIE))
        .remove(Cookie::from(REMEMBER_COOKIE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRef;
    use sqlx::postgres::PgPoolOptions;

    use crate::config::{
        DatabaseConfig, Environment, ResetTokenConfig, SchoolConfig, SessionConfig,
    };
    use crate::models::{AffiliationEdge, Role};

    fn test_state() -> crate::AppState {
        let config = SchoolConfig {
            common: service_core::config::Config {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            environment: Environment::Dev,
            service_name: "school-service".to_string(),
            log_level: "info".to_string(),
            database: DatabaseConfig {
                url: "postgres://localhost/school_test".to_string(),
                max_connections: 2,
                min_connections: 1,
            },
            session: SessionConfig {
                secret: "test-session-secret-test-session-secret-test-session-secret-test!!"
                    .to_string(),
                remember_days: 30,
            },
            reset_token: ResetTokenConfig {
                secret: "test-reset-secret".to_string(),
                validity_secs: 3600,
            },
            allowed_origins: vec!["http://localhost:3000".to_string()],
        };
        // Lazy pool: never connects in these tests.
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .expect("lazy pool");
        crate::AppState::new(config, pool)
    }

    #[tokio::test]
    async fn signing_key_resolves_from_the_state() {
        let state = test_state();
        let key = Key::from_ref(&state);

        // A value written under the state's key reads back under it.
        let jar = SignedCookieJar::new(key)
            .add(session_cookie(PRINCIPAL_COOKIE, "42".to_string(), None));
        assert_eq!(
            jar.get(PRINCIPAL_COOKIE).map(|c| c.value().to_string()),
            Some("42".to_string())
        );
    }

    #[tokio::test]
    async fn write_then_clear_round_trips_the_context() {
        let state = test_state();
        let jar = SignedCookieJar::new(Key::from_ref(&state));

        let ctx = SessionContext::on_login(
            7,
            Role::Instructor,
            vec![AffiliationEdge {
                school_id: 3,
                role: Role::Instructor,
            }],
            false,
        );
        let jar = write_session(jar, &ctx, None);
        assert_eq!(
            jar.get(PRINCIPAL_COOKIE).map(|c| c.value().to_string()),
            Some("7".to_string())
        );
        assert_eq!(
            jar.get(ACTIVE_SCHOOL_COOKIE).map(|c| c.value().to_string()),
            Some("3".to_string())
        );
        assert!(jar.get(REMEMBER_COOKIE).is_none());

        let jar = clear_session(jar);
        assert!(jar.get(PRINCIPAL_COOKIE).is_none());
        assert!(jar.get(ACTIVE_SCHOOL_COOKIE).is_none());
    }
}
