use crate::models::{Anime, NewUser, Role, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

/// Repository Trait
///
/// The persistence contract behind the catalog service and the Basic-auth
/// extractor. Handlers never touch it directly; they go through
/// [`crate::service::AnimeService`].
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Anime ---
    /// All records in storage order (ascending id).
    async fn find_all_animes(&self) -> Result<Vec<Anime>, sqlx::Error>;
    async fn find_anime(&self, id: i32) -> Result<Option<Anime>, sqlx::Error>;
    /// Inserts when `anime.id` is `None`, otherwise overwrites the row with that id.
    /// Overwriting a missing row fails with `sqlx::Error::RowNotFound`.
    async fn save_anime(&self, anime: Anime) -> Result<Anime, sqlx::Error>;
    /// Returns whether a row was removed.
    async fn delete_anime(&self, id: i32) -> Result<bool, sqlx::Error>;

    // --- User/Auth ---
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_all_animes(&self) -> Result<Vec<Anime>, sqlx::Error> {
        sqlx::query_as::<_, Anime>("SELECT id, name FROM anime ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    async fn find_anime(&self, id: i32) -> Result<Option<Anime>, sqlx::Error> {
        sqlx::query_as::<_, Anime>("SELECT id, name FROM anime WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// save_anime
    ///
    /// A single entry point for both inserts and full replacements, keyed on
    /// whether the record already carries an id. `RETURNING` hands back the
    /// row as stored so callers see the database-assigned id.
    async fn save_anime(&self, anime: Anime) -> Result<Anime, sqlx::Error> {
        match anime.id {
            None => {
                sqlx::query_as::<_, Anime>("INSERT INTO anime (name) VALUES ($1) RETURNING id, name")
                    .bind(anime.name)
                    .fetch_one(&self.pool)
                    .await
            }
            Some(id) => {
                sqlx::query_as::<_, Anime>(
                    "UPDATE anime SET name = $2 WHERE id = $1 RETURNING id, name",
                )
                .bind(id)
                .bind(anime.name)
                .fetch_one(&self.pool)
                .await
            }
        }
    }

    async fn delete_anime(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM anime WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password, roles FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password, roles)
            VALUES ($1, $2, $3)
            RETURNING id, username, password, roles
            "#,
        )
        .bind(user.username)
        .bind(user.password_hash)
        .bind(Role::join(&user.roles))
        .fetch_one(&self.pool)
        .await
    }
}

/// InMemoryRepository
///
/// A mutex-guarded `Repository` used by the test suites and for running the
/// router without a database. Ids are assigned from a counter starting at 1,
/// like a fresh `SERIAL` column.
#[derive(Default)]
pub struct InMemoryRepository {
    inner: Mutex<InMemoryTables>,
}

#[derive(Default)]
struct InMemoryTables {
    animes: BTreeMap<i32, Anime>,
    users: Vec<User>,
    last_anime_id: i32,
    last_user_id: i32,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, InMemoryTables> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_all_animes(&self) -> Result<Vec<Anime>, sqlx::Error> {
        Ok(self.tables().animes.values().cloned().collect())
    }

    async fn find_anime(&self, id: i32) -> Result<Option<Anime>, sqlx::Error> {
        Ok(self.tables().animes.get(&id).cloned())
    }

    async fn save_anime(&self, anime: Anime) -> Result<Anime, sqlx::Error> {
        let mut tables = self.tables();
        let id = match anime.id {
            None => {
                tables.last_anime_id += 1;
                tables.last_anime_id
            }
            Some(id) if tables.animes.contains_key(&id) => id,
            Some(_) => return Err(sqlx::Error::RowNotFound),
        };
        let stored = anime.with_id(id);
        tables.animes.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete_anime(&self, id: i32) -> Result<bool, sqlx::Error> {
        Ok(self.tables().animes.remove(&id).is_some())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let mut tables = self.tables();
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(sqlx::Error::Protocol(format!(
                "duplicate username '{}'",
                user.username
            )));
        }
        tables.last_user_id += 1;
        let created = User {
            id: tables.last_user_id,
            username: user.username,
            password: user.password_hash,
            roles: Role::join(&user.roles),
        };
        tables.users.push(created.clone());
        Ok(created)
    }
}
