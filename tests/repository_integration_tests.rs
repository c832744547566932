//! Runs the Postgres repository against a live database.
//! `DATABASE_URL=postgres://... cargo test --test repository_integration_tests -- --ignored`

use anime_catalog::{
    models::{Anime, NewUser, Role},
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use tokio::test;

// --- Test Context and Setup ---

/// A simple structure to hold the database pool for testing
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

/// Names unique to this run so tests can share one database.
fn unique(prefix: &str) -> String {
    format!(
        "{prefix}-{}",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

// --- Tests ---

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_anime_crud_round_trip() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let name = unique("anime");

    let saved = repo.save_anime(Anime::new(name.clone())).await.unwrap();
    let id = saved.id.expect("insert must assign an id");
    assert_eq!(saved.name, name);

    assert_eq!(repo.find_anime(id).await.unwrap(), Some(saved.clone()));
    assert!(repo.find_all_animes().await.unwrap().contains(&saved));

    let renamed = repo
        .save_anime(Anime::new("renamed").with_id(id))
        .await
        .unwrap();
    assert_eq!(renamed, Anime::new("renamed").with_id(id));

    assert!(repo.delete_anime(id).await.unwrap());
    assert!(!repo.delete_anime(id).await.unwrap());
    assert_eq!(repo.find_anime(id).await.unwrap(), None);
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_overwrite_missing_row_is_row_not_found() {
    let ctx = DbTestContext::setup().await;
    let result = ctx
        .repository()
        .save_anime(Anime::new("ghost").with_id(i32::MAX))
        .await;
    assert!(matches!(result, Err(sqlx::Error::RowNotFound)));
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_user_lookup_by_username() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let username = unique("user");

    assert!(repo.find_user_by_username(&username).await.unwrap().is_none());

    let created = repo
        .create_user(NewUser {
            username: username.clone(),
            password_hash: "$argon2id$placeholder".to_string(),
            roles: vec![Role::Admin, Role::User],
        })
        .await
        .unwrap();
    assert_eq!(created.roles, "ADMIN,USER");

    let found = repo.find_user_by_username(&username).await.unwrap().unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.roles(), vec![Role::Admin, Role::User]);

    // usernames are unique
    let duplicate = repo
        .create_user(NewUser {
            username,
            password_hash: "x".to_string(),
            roles: vec![],
        })
        .await;
    assert!(duplicate.is_err());
}
