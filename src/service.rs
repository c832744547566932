use crate::{
    error::{AppError, AppResult},
    models::Anime,
    repository::RepositoryState,
};

const ANIME_NOT_FOUND: &str = "Anime not found";
const INVALID_NAME: &str = "Invalid name";

/// AnimeService
///
/// Business rules over the catalog: missing records become
/// `AppError::NotFound("Anime not found")` and batch inserts are checked for
/// empty names. Everything else is a straight pass-through to the repository.
#[derive(Clone)]
pub struct AnimeService {
    repo: RepositoryState,
}

impl AnimeService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn find_all(&self) -> AppResult<Vec<Anime>> {
        let animes = self.repo.find_all_animes().await?;
        tracing::debug!(count = animes.len(), "listed animes");
        Ok(animes)
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Anime> {
        self.repo
            .find_anime(id)
            .await?
            .ok_or_else(not_found)
    }

    /// Persists a new record. Any id on the input is discarded.
    pub async fn save(&self, anime: Anime) -> AppResult<Anime> {
        let saved = self.repo.save_anime(anime.without_id()).await?;
        tracing::info!(id = ?saved.id, "anime created");
        Ok(saved)
    }

    /// batch_save
    ///
    /// Inserts the records one by one and checks each stored name afterwards.
    /// The first empty name aborts with `BadRequest("Invalid name")`; rows
    /// inserted up to and including that one stay in storage.
    pub async fn batch_save(&self, animes: Vec<Anime>) -> AppResult<Vec<Anime>> {
        let mut saved = Vec::with_capacity(animes.len());
        for anime in animes {
            let stored = self.repo.save_anime(anime.without_id()).await?;
            if !stored.has_valid_name() {
                tracing::warn!(id = ?stored.id, "batch insert stored an empty name");
                return Err(AppError::BadRequest(INVALID_NAME.to_string()));
            }
            saved.push(stored);
        }
        tracing::info!(count = saved.len(), "anime batch created");
        Ok(saved)
    }

    /// Replaces the name of an existing record; the id never changes.
    pub async fn update(&self, anime: Anime) -> AppResult<()> {
        let id = anime.id.ok_or_else(not_found)?;
        let existing = self.find_by_id(id).await?;
        self.repo
            .save_anime(Anime {
                name: anime.name,
                ..existing
            })
            .await
            .map_err(|e| match e {
                // Deleted between the lookup and the write.
                sqlx::Error::RowNotFound => not_found(),
                e => AppError::Database(e),
            })?;
        tracing::info!(id, "anime updated");
        Ok(())
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.find_by_id(id).await?;
        if !self.repo.delete_anime(id).await? {
            return Err(not_found());
        }
        tracing::info!(id, "anime deleted");
        Ok(())
    }
}

fn not_found() -> AppError {
    AppError::NotFound(ANIME_NOT_FOUND.to_string())
}
