pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod images;
pub mod models;
pub mod movies;
pub mod routes;
pub mod store;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{config::Config, images::ImageService, movies::MovieService, store::ImageStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: ImageStore,
    pub movies: MovieService,
    pub images: ImageService,
}

impl AppState {
    pub fn new(config: Arc<Config>, db: DatabaseConnection) -> Self {
        let store = ImageStore::new(config.web_root.clone());
        let movies = MovieService::new(db.clone(), store.clone());
        let images = ImageService::new(db, store.clone(), config.report_stored_content_type);
        Self { config, store, movies, images }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(state.store.uploads_dir());
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/movies", get(routes::list_movies))
        .route("/api/movies/{id}", get(routes::get_movie))
        .route("/api/movies/add", post(routes::add_movie))
        .route("/api/movies/update/{id}", put(routes::update_movie))
        .route("/api/movies/delete/{id}", delete(routes::delete_movie))
        .route("/api/movieimages/{movie_id}/upload", post(routes::upload_image))
        .route("/api/movieimages/all", get(routes::list_images))
        .route("/api/movieimages/movie/{movie_id}", get(routes::list_movie_images))
        .route("/api/movieimages/get/{image_id}", get(routes::get_image))
        .route("/api/movieimages/update/{image_id}", put(routes::update_image))
        .route("/api/movieimages/delete/{image_id}", delete(routes::delete_image))
        .nest_service("/uploads", uploads)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}
