use std::collections::HashSet;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, warn};

use crate::{
    entities::{movie, movie_image},
    error::{AppError, AppResult},
    images::release_file,
    models::MovieDto,
    store::ImageStore,
};

const MOVIE_NOT_FOUND: &str = "Movie not found.";

#[derive(Clone)]
pub struct MovieService {
    db: DatabaseConnection,
    store: ImageStore,
}

impl MovieService {
    pub fn new(db: DatabaseConnection, store: ImageStore) -> Self {
        Self { db, store }
    }

    pub async fn list(&self) -> AppResult<Vec<MovieDto>> {
        let rows = movie::Entity::find()
            .order_by_asc(movie::Column::Id)
            .find_with_related(movie_image::Entity)
            .order_by_asc(movie_image::Column::Id)
            .all(&self.db)
            .await?;

        let movies = rows
            .into_iter()
            .map(|(movie, images)| MovieDto::from_model(movie, images))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(movies)
    }

    pub async fn get(&self, id: i32) -> AppResult<MovieDto> {
        let movie = self.find(id).await?;
        let images = movie
            .find_related(movie_image::Entity)
            .order_by_asc(movie_image::Column::Id)
            .all(&self.db)
            .await?;
        Ok(MovieDto::from_model(movie, images)?)
    }

    /// Any images on `dto` are ignored; they are attached through uploads.
    pub async fn create(&self, dto: MovieDto) -> AppResult<MovieDto> {
        let model = movie::ActiveModel {
            id: Default::default(),
            title: Set(dto.title),
            description: Set(dto.description),
            release_date: Set(dto.release_date.to_string()),
        };
        let created = model.insert(&self.db).await?;

        info!(movie_id = created.id, title = %created.title, "created movie");
        Ok(MovieDto::from_model(created, Vec::new())?)
    }

    /// Overwrites the movie fields and swaps its image rows for fresh ones
    /// built from `dto.movie_images`. Files only referenced by the discarded
    /// rows are removed once the swap has committed.
    pub async fn update(&self, id: i32, dto: MovieDto) -> AppResult<()> {
        let txn = self.db.begin().await?;

        let Some(existing) = movie::Entity::find_by_id(id).one(&txn).await? else {
            return Err(AppError::not_found(MOVIE_NOT_FOUND));
        };
        let previous = existing.find_related(movie_image::Entity).all(&txn).await?;

        let mut active: movie::ActiveModel = existing.into();
        active.title = Set(dto.title);
        active.description = Set(dto.description);
        active.release_date = Set(dto.release_date.to_string());
        active.update(&txn).await?;

        movie_image::Entity::delete_many()
            .filter(movie_image::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;

        let replacements: Vec<movie_image::ActiveModel> = dto
            .movie_images
            .iter()
            .map(|img| movie_image::ActiveModel {
                id: Default::default(),
                file_path: Set(img.file_path.clone()),
                is_cover: Set(img.is_cover),
                movie_id: Set(id),
            })
            .collect();
        if !replacements.is_empty() {
            movie_image::Entity::insert_many(replacements).exec(&txn).await?;
        }

        txn.commit().await?;

        let kept: HashSet<&str> =
            dto.movie_images.iter().map(|img| img.file_path.as_str()).collect();
        for img in previous.iter().filter(|img| !kept.contains(img.file_path.as_str())) {
            self.remove_file(img).await;
        }

        info!(
            movie_id = id,
            previous_images = previous.len(),
            images = dto.movie_images.len(),
            "updated movie"
        );
        Ok(())
    }

    /// Deletes the movie together with its image rows and their files.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let txn = self.db.begin().await?;

        let Some(existing) = movie::Entity::find_by_id(id).one(&txn).await? else {
            return Err(AppError::not_found(MOVIE_NOT_FOUND));
        };
        let images = existing.find_related(movie_image::Entity).all(&txn).await?;

        movie_image::Entity::delete_many()
            .filter(movie_image::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;
        movie::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        for img in &images {
            self.remove_file(img).await;
        }

        info!(movie_id = id, images = images.len(), "deleted movie");
        Ok(())
    }

    async fn find(&self, id: i32) -> AppResult<movie::Model> {
        movie::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found(MOVIE_NOT_FOUND))
    }

    /// The rows are already gone here, so a failure only leaves an orphaned
    /// file behind.
    async fn remove_file(&self, img: &movie_image::Model) {
        match release_file(&self.db, &self.store, &img.file_path, img.id).await {
            Ok(removed) => {
                debug!(image_id = img.id, path = %img.file_path, removed, "released image file");
            },
            Err(err) => {
                warn!(
                    image_id = img.id,
                    path = %img.file_path,
                    error = %err,
                    "failed to release image file"
                );
            },
        }
    }
}
