use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::{debug, info, warn};

use crate::{
    entities::{movie, movie_image},
    error::{AppError, AppResult},
    models::{MovieImageDto, UploadedFile},
    store::ImageStore,
};

pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png"];

const IMAGE_NOT_FOUND: &str = "Image not found.";

#[derive(Clone)]
pub struct ImageService {
    db: DatabaseConnection,
    store: ImageStore,
    report_stored_content_type: bool,
}

impl ImageService {
    pub fn new(db: DatabaseConnection, store: ImageStore, report_stored_content_type: bool) -> Self {
        Self { db, store, report_stored_content_type }
    }

    /// Stores `file` for `movie_id` and returns the new stored path.
    pub async fn upload(
        &self,
        movie_id: i32,
        file: Option<UploadedFile>,
        is_cover: bool,
    ) -> AppResult<String> {
        let file = validate_upload(file)?;

        if movie::Entity::find_by_id(movie_id).one(&self.db).await?.is_none() {
            return Err(AppError::not_found("Movie not found."));
        }

        let file_path = self.store.write(&file.bytes, &file.file_name).await?;

        let row = movie_image::ActiveModel {
            id: Default::default(),
            file_path: Set(file_path.clone()),
            is_cover: Set(is_cover),
            movie_id: Set(movie_id),
        };
        let created = match row.insert(&self.db).await {
            Ok(created) => created,
            Err(err) => {
                self.discard(&file_path).await;
                return Err(err.into());
            },
        };

        info!(movie_id, image_id = created.id, path = %file_path, is_cover, "uploaded image");
        Ok(file_path)
    }

    pub async fn list_all(&self) -> AppResult<Vec<MovieImageDto>> {
        let rows = movie_image::Entity::find()
            .order_by_asc(movie_image::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(MovieImageDto::from).collect())
    }

    /// An unknown movie and a movie without images both come back as
    /// NotFound.
    pub async fn list_for_movie(&self, movie_id: i32) -> AppResult<Vec<MovieImageDto>> {
        let rows = movie_image::Entity::find()
            .filter(movie_image::Column::MovieId.eq(movie_id))
            .order_by_asc(movie_image::Column::Id)
            .all(&self.db)
            .await?;

        if rows.is_empty() {
            return Err(AppError::not_found("No images found for this movie."));
        }
        Ok(rows.into_iter().map(MovieImageDto::from).collect())
    }

    /// Returns the stored bytes and the content type to serve them with.
    pub async fn read(&self, image_id: i32) -> AppResult<(Vec<u8>, &'static str)> {
        let row = self.find(image_id).await?;
        let bytes = self.store.read(&row.file_path).await?;

        let content_type = if self.report_stored_content_type {
            content_type_for(&row.file_path)
        } else {
            "image/jpeg"
        };
        Ok((bytes, content_type))
    }

    /// Swaps the file behind `image_id`. The row is looked up before the
    /// upload is validated.
    pub async fn update(
        &self,
        image_id: i32,
        file: Option<UploadedFile>,
        is_cover: bool,
    ) -> AppResult<String> {
        let row = self.find(image_id).await?;
        let file = validate_upload(file)?;

        release_file(&self.db, &self.store, &row.file_path, row.id).await?;
        let file_path = self.store.write(&file.bytes, &file.file_name).await?;

        let old_path = row.file_path.clone();
        let mut active: movie_image::ActiveModel = row.into();
        active.file_path = Set(file_path.clone());
        active.is_cover = Set(is_cover);
        if let Err(err) = active.update(&self.db).await {
            self.discard(&file_path).await;
            return Err(err.into());
        }

        info!(image_id, old_path = %old_path, path = %file_path, is_cover, "replaced image");
        Ok(file_path)
    }

    pub async fn delete(&self, image_id: i32) -> AppResult<()> {
        let row = self.find(image_id).await?;

        let removed = release_file(&self.db, &self.store, &row.file_path, row.id).await?;
        let path = row.file_path.clone();
        row.delete(&self.db).await?;

        info!(image_id, path = %path, file_removed = removed, "deleted image");
        Ok(())
    }

    async fn find(&self, image_id: i32) -> AppResult<movie_image::Model> {
        movie_image::Entity::find_by_id(image_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found(IMAGE_NOT_FOUND))
    }

    /// Drops a file whose row never made it into the database.
    async fn discard(&self, file_path: &str) {
        match self.store.delete(file_path).await {
            Ok(_) => debug!(path = %file_path, "discarded unreferenced upload"),
            Err(err) => warn!(path = %file_path, error = %err, "failed to discard upload"),
        }
    }
}

/// Unlinks `file_path` on behalf of image `owner_id` unless some other row
/// still points at the same file. Returns whether a file was removed.
pub(crate) async fn release_file<C>(
    db: &C,
    store: &ImageStore,
    file_path: &str,
    owner_id: i32,
) -> AppResult<bool>
where
    C: ConnectionTrait,
{
    let shared = movie_image::Entity::find()
        .filter(movie_image::Column::FilePath.eq(file_path))
        .filter(movie_image::Column::Id.ne(owner_id))
        .one(db)
        .await?;
    if let Some(other) = shared {
        debug!(
            image_id = owner_id,
            other_image_id = other.id,
            path = %file_path,
            "file still referenced"
        );
        return Ok(false);
    }

    store.delete(file_path).await
}

fn validate_upload(file: Option<UploadedFile>) -> AppResult<UploadedFile> {
    let Some(file) = file.filter(|f| !f.bytes.is_empty()) else {
        return Err(AppError::bad_request("No file selected."));
    };

    let allowed = file
        .content_type
        .as_deref()
        .is_some_and(|ct| ALLOWED_CONTENT_TYPES.contains(&ct));
    if !allowed {
        return Err(AppError::bad_request("Invalid file type."));
    }

    Ok(file)
}

fn content_type_for(file_path: &str) -> &'static str {
    let is_png = std::path::Path::new(file_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if is_png { "image/png" } else { "image/jpeg" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: Option<&str>, bytes: &[u8]) -> Option<UploadedFile> {
        Some(UploadedFile {
            file_name: "poster.png".to_string(),
            content_type: content_type.map(str::to_string),
            bytes: bytes.to_vec(),
        })
    }

    #[test]
    fn missing_or_empty_file_is_rejected() {
        assert!(matches!(
            validate_upload(None),
            Err(AppError::BadRequest(m)) if m == "No file selected."
        ));
        assert!(matches!(
            validate_upload(upload(Some("image/png"), b"")),
            Err(AppError::BadRequest(m)) if m == "No file selected."
        ));
    }

    #[test]
    fn only_jpeg_and_png_are_accepted() {
        assert!(validate_upload(upload(Some("image/jpeg"), b"x")).is_ok());
        assert!(validate_upload(upload(Some("image/png"), b"x")).is_ok());
        for bad in [Some("image/gif"), Some("IMAGE/PNG"), Some("image/png; q=1"), None] {
            assert!(matches!(
                validate_upload(upload(bad, b"x")),
                Err(AppError::BadRequest(m)) if m == "Invalid file type."
            ));
        }
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for("/uploads/a.PNG"), "image/png");
        assert_eq!(content_type_for("/uploads/a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("/uploads/a"), "image/jpeg");
    }
}
