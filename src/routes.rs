use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    AppState,
    config::parse_flag,
    error::{AppError, AppResult},
    models::{ImageSavedResponse, MessageResponse, MovieDto, MovieImageDto, UploadedFile},
};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_movies(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<MovieDto>>> {
    Ok(Json(state.movies.list().await?))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<MovieDto>> {
    Ok(Json(state.movies.get(id).await?))
}

pub async fn add_movie(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MovieDto>, JsonRejection>,
) -> AppResult<Response> {
    let Json(dto) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let created = state.movies.create(dto).await?;

    let location = format!("/api/movies/{}", created.movie_id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(created)).into_response())
}

pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    payload: Result<Json<MovieDto>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(dto) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    state.movies.update(id, dto).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.movies.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct CoverQuery {
    #[serde(rename = "isCover")]
    is_cover: Option<String>,
}

#[derive(Debug, Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    is_cover: Option<String>,
}

impl UploadForm {
    /// A multipart `isCover` field wins over the query string. Both accept
    /// the same spellings.
    fn is_cover(&self, query: &CoverQuery) -> AppResult<bool> {
        match self.is_cover.as_deref().or(query.is_cover.as_deref()) {
            None => Ok(false),
            Some(raw) => {
                parse_flag(raw).ok_or_else(|| AppError::bad_request("Invalid isCover value."))
            },
        }
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Uploaded file is too large.".to_string())
    } else {
        AppError::bad_request(format!("Invalid multipart payload: {}", err.body_text()))
    }
}

/// Pulls the `file` part and an optional `isCover` field out of the body.
/// A request without a multipart body yields an empty form so the service
/// reports the missing file in its usual order; a broken or oversized body
/// is an error of its own.
async fn read_upload(multipart: Result<Multipart, MultipartRejection>) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!(error = %rejection, "request carries no multipart body");
            return Ok(form);
        },
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(str::to_owned).unwrap_or_default();
        match field_name.as_str() {
            "file" if form.file.is_none() => {
                let file_name = field.file_name().map(str::to_owned).unwrap_or_default();
                // The raw header, not the parsed mime, which comes back lowercased.
                let content_type = field
                    .headers()
                    .get(header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.file = Some(UploadedFile { file_name, content_type, bytes: bytes.to_vec() });
            },
            "isCover" => {
                form.is_cover = Some(field.text().await.map_err(multipart_error)?);
            },
            _ => {},
        }
    }

    Ok(form)
}

fn cover_query(query: Result<Query<CoverQuery>, QueryRejection>) -> AppResult<CoverQuery> {
    query.map(|Query(q)| q).map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i32>,
    query: Result<Query<CoverQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ImageSavedResponse>> {
    let query = cover_query(query)?;
    let form = read_upload(multipart).await?;
    let is_cover = form.is_cover(&query)?;

    let file_path = state.images.upload(movie_id, form.file, is_cover).await?;
    Ok(Json(ImageSavedResponse { message: "Image uploaded!".to_string(), file_path }))
}

pub async fn list_images(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<MovieImageDto>>> {
    Ok(Json(state.images.list_all().await?))
}

pub async fn list_movie_images(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<i32>,
) -> AppResult<Json<Vec<MovieImageDto>>> {
    Ok(Json(state.images.list_for_movie(movie_id).await?))
}

pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<i32>,
) -> AppResult<Response> {
    let (bytes, content_type) = state.images.read(image_id).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

pub async fn update_image(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<i32>,
    query: Result<Query<CoverQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ImageSavedResponse>> {
    let query = cover_query(query)?;
    let form = read_upload(multipart).await?;
    let is_cover = form.is_cover(&query)?;

    let file_path = state.images.update(image_id, form.file, is_cover).await?;
    Ok(Json(ImageSavedResponse { message: "Image updated!".to_string(), file_path }))
}

pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<i32>,
) -> AppResult<Json<MessageResponse>> {
    state.images.delete(image_id).await?;
    Ok(Json(MessageResponse { message: "Image deleted successfully.".to_string() }))
}
