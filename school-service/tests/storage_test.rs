//! Storage-backed flow tests. All of these require a running PostgreSQL
//! with an empty database; point DATABASE_URL at it and drop the ignores:
//!
//!   DATABASE_URL=postgres://localhost/school_test cargo test -- --ignored

use school_service::models::Role;
use school_service::services::{
    ActivationInput, AffiliationService, AuthService, IdentityService, ResetTokenService,
    SchoolService, ServiceError,
};
use school_service::utils::Password;
use sqlx::PgPool;

async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/school_test".to_string());
    let pool = PgPool::connect(&url).await.expect("connect to test db");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}

fn services(pool: &PgPool) -> (IdentityService, AffiliationService, SchoolService, AuthService) {
    let identity = IdentityService::new(pool.clone());
    let affiliations = AffiliationService::new(pool.clone());
    let schools = SchoolService::new(pool.clone(), identity.clone());
    let auth = AuthService::new(
        pool.clone(),
        identity.clone(),
        affiliations.clone(),
        ResetTokenService::new("test-secret", 3600),
    );
    (identity, affiliations, schools, auth)
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn pre_register_counts_new_existing_and_skipped() {
    let pool = test_pool().await;
    let (_, _, schools, auth) = services(&pool);

    let school = schools.create("Escola Teste PR", "cfs").await.unwrap();

    let batch = vec![
        "1234567".to_string(),
        "765-4321".to_string(),
        "1234567".to_string(),  // in-batch repeat counts as existing
        "12345678".to_string(), // too long, skipped
        "abc".to_string(),      // no digits, skipped
    ];
    let outcome = auth
        .pre_register_batch(&batch, Role::Student, school.school_id)
        .await
        .unwrap();

    assert_eq!(outcome.new, 2);
    assert_eq!(outcome.existing, 1);
    assert_eq!(outcome.skipped, 2);

    // Re-running the same batch creates nothing new.
    let outcome = auth
        .pre_register_batch(&batch, Role::Student, school.school_id)
        .await
        .unwrap();
    assert_eq!(outcome.new, 0);
    assert_eq!(outcome.existing, 3);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn pre_register_rejects_global_roles_and_unknown_schools() {
    let pool = test_pool().await;
    let (_, _, schools, auth) = services(&pool);

    let school = schools.create("Escola Teste PRG", "cfs").await.unwrap();
    let batch = vec!["1112223".to_string()];

    assert!(matches!(
        auth.pre_register_batch(&batch, Role::SuperAdmin, school.school_id)
            .await,
        Err(ServiceError::GlobalRoleHasNoAffiliations)
    ));
    assert!(matches!(
        auth.pre_register_batch(&batch, Role::Student, i64::MAX).await,
        Err(ServiceError::UnknownSchool)
    ));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn activation_then_login_by_matricula() {
    let pool = test_pool().await;
    let (_, _, schools, auth) = services(&pool);

    let school = schools.create("Escola Teste ACT", "cbfpm").await.unwrap();
    auth.pre_register_batch(&["9990001".to_string()], Role::Instructor, school.school_id)
        .await
        .unwrap();

    // Unknown matricula cannot log in before activation.
    assert!(matches!(
        auth.login("9990001", "whatever").await,
        Err(ServiceError::InvalidCredentials)
    ));

    auth.activate(ActivationInput {
        external_id: "999.0001".to_string(), // punctuation is stripped
        role: Role::Instructor,
        password: Password::new("Correta123".to_string()),
        password_confirm: Password::new("Correta123".to_string()),
        full_name: "maria DA silva".to_string(),
        war_name: "silva".to_string(),
        rank: Some("Sgt".to_string()),
        email: Some("Maria@Example.com ".to_string()),
        class_id: None,
        unit: None,
    })
    .await
    .unwrap();

    let (principal, ctx) = auth.login("9990001", "Correta123").await.unwrap();
    assert_eq!(principal.full_name.as_deref(), Some("Maria Da Silva"));
    assert_eq!(ctx.current_school_id(), Some(school.school_id));

    // Email login resolves to the same principal, lowercased.
    let (by_email, _) = auth.login("maria@example.com", "Correta123").await.unwrap();
    assert_eq!(by_email.principal_id, principal.principal_id);

    // A second activation of the same matricula is refused.
    let again = auth
        .activate(ActivationInput {
            external_id: "9990001".to_string(),
            role: Role::Instructor,
            password: Password::new("Correta123".to_string()),
            password_confirm: Password::new("Correta123".to_string()),
            full_name: "maria".to_string(),
            war_name: "silva".to_string(),
            rank: None,
            email: None,
            class_id: None,
            unit: None,
        })
        .await;
    assert!(matches!(again, Err(ServiceError::Duplicate(_))));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn password_reset_round_trip() {
    let pool = test_pool().await;
    let (_, _, schools, auth) = services(&pool);

    let school = schools.create("Escola Teste RST", "cspm").await.unwrap();
    auth.pre_register_batch(&["8880001".to_string()], Role::Student, school.school_id)
        .await
        .unwrap();

    // Students need a class; create one directly.
    let class_id: i64 = sqlx::query_scalar(
        "INSERT INTO classes (school_id, class_name) VALUES ($1, 'Turma A') RETURNING class_id",
    )
    .bind(school.school_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    auth.activate(ActivationInput {
        external_id: "8880001".to_string(),
        role: Role::Student,
        password: Password::new("Antiga1234".to_string()),
        password_confirm: Password::new("Antiga1234".to_string()),
        full_name: "joão pereira".to_string(),
        war_name: "pereira".to_string(),
        rank: None,
        email: Some("joao@example.com".to_string()),
        class_id: Some(class_id),
        unit: None,
    })
    .await
    .unwrap();

    // Unknown address: no token, no error.
    assert!(auth
        .request_password_reset("nobody@example.com")
        .await
        .unwrap()
        .is_none());

    let token = auth
        .request_password_reset("joao@example.com")
        .await
        .unwrap()
        .expect("token for known address");

    auth.confirm_password_reset(
        &token,
        Password::new("Nova12345".to_string()),
        Password::new("Nova12345".to_string()),
    )
    .await
    .unwrap();

    assert!(auth.login("8880001", "Antiga1234").await.is_err());
    assert!(auth.login("8880001", "Nova12345").await.is_ok());
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn duplicate_school_name_conflicts() {
    let pool = test_pool().await;
    let (_, _, schools, _) = services(&pool);

    schools.create("Escola Teste DUP", "cfs").await.unwrap();
    assert!(matches!(
        schools.create("Escola Teste DUP", "cfs").await,
        Err(ServiceError::Duplicate(_))
    ));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn affiliation_edges_never_attach_to_globals() {
    let pool = test_pool().await;
    let (_, affiliations, schools, _) = services(&pool);

    let school = schools.create("Escola Teste GLB", "cfs").await.unwrap();
    let principal_id: i64 = sqlx::query_scalar(
        "INSERT INTO principals (username, global_role, is_active)
         VALUES ('root-admin', 'super_admin', TRUE) RETURNING principal_id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    assert!(matches!(
        affiliations
            .ensure(principal_id, school.school_id, Role::Instructor)
            .await,
        Err(ServiceError::GlobalRoleHasNoAffiliations)
    ));
}
