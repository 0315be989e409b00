pub mod config;
pub mod context;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::FromRef,
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::{delete, get, post, put},
    Router,
};
use axum_extra::extract::cookie::Key;
use service_core::middleware::request_id::request_id_middleware;
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::SchoolConfig;
use crate::services::{
    AffiliationService, AuthService, IdentityService, ResetTokenService, SchoolService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: SchoolConfig,
    pub pool: PgPool,
    pub cookie_key: Key,
    pub identity: IdentityService,
    pub affiliations: AffiliationService,
    pub schools: SchoolService,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(config: SchoolConfig, pool: PgPool) -> Self {
        let cookie_key = Key::from(config.session.secret.as_bytes());
        let identity = IdentityService::new(pool.clone());
        let affiliations = AffiliationService::new(pool.clone());
        let schools = SchoolService::new(pool.clone(), identity.clone());
        let reset_tokens = ResetTokenService::new(
            &config.reset_token.secret,
            config.reset_token.validity_secs,
        );
        let auth = AuthService::new(
            pool.clone(),
            identity.clone(),
            affiliations.clone(),
            reset_tokens,
        );

        Self {
            config,
            pool,
            cookie_key,
            identity,
            affiliations,
            schools,
            auth,
        }
    }
}

// SignedCookieJar pulls its key from the state.
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok())
                .collect::<Vec<HeaderValue>>(),
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        // Anonymous surface
        .route("/login", post(handlers::auth::login))
        .route("/logout", get(handlers::auth::logout))
        .route("/register", get(handlers::auth::register_form))
        .route("/register", post(handlers::auth::register))
        .route(
            "/recuperar-senha",
            post(handlers::auth::request_password_reset),
        )
        .route(
            "/redefinir-senha/:token",
            get(handlers::auth::reset_password_form).post(handlers::auth::reset_password),
        )
        // Session context
        .route("/select-school", get(handlers::context::select_school))
        .route("/set-school/:school_id", get(handlers::context::set_school))
        .route("/view-as/clear", get(handlers::context::clear_view_as))
        .route("/view-as/:school_id", get(handlers::context::set_view_as))
        .route("/context", get(handlers::context::current_context))
        // Scoped reads
        .route("/dashboard", get(handlers::dashboard::dashboard))
        .route("/roster", get(handlers::dashboard::roster))
        .route("/classes", get(handlers::dashboard::classes))
        .route("/me", get(handlers::dashboard::me))
        // Administration
        .route("/pre-cadastro", post(handlers::admin::pre_register))
        .route("/schools", get(handlers::admin::list_schools))
        .route("/schools", post(handlers::admin::create_school))
        .route("/schools/:school_id", put(handlers::admin::update_school))
        .route(
            "/schools/:school_id",
            delete(handlers::admin::delete_school),
        )
        .route("/affiliations", post(handlers::admin::assign_affiliation))
        .route(
            "/affiliations",
            delete(handlers::admin::remove_affiliation),
        )
        .route(
            "/schools/:school_id/students/bulk-delete",
            post(handlers::admin::bulk_delete_students),
        )
        .route(
            "/schools/:school_id/instructors/bulk-delete",
            post(handlers::admin::bulk_delete_instructors),
        )
        .route(
            "/repair/strip-global-affiliations",
            post(handlers::admin::strip_global_affiliations),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .layer(cors)
}
