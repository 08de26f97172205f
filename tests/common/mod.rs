#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc};

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use movie_shelf::{AppState, config::Config, db, router, store::ImageStore};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "---------------------------movieshelf0123456789";

pub struct TestApp {
    pub app: Router,
    pub store: ImageStore,
    pub web_root: PathBuf,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(false, 10 * 1024 * 1024).await
    }

    pub async fn with_content_type_reporting(report_stored_content_type: bool) -> Self {
        Self::build(report_stored_content_type, 10 * 1024 * 1024).await
    }

    pub async fn with_upload_limit(max_upload_bytes: usize) -> Self {
        Self::build(false, max_upload_bytes).await
    }

    async fn build(report_stored_content_type: bool, max_upload_bytes: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let web_root = dir.path().join("wwwroot");
        let database_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

        let config = Arc::new(Config {
            addr: "127.0.0.1:0".parse().unwrap(),
            database_url: database_url.clone(),
            web_root: web_root.clone(),
            max_upload_bytes,
            report_stored_content_type,
        });

        let db = db::connect_and_migrate(&database_url).await.unwrap();
        let state = Arc::new(AppState::new(config, db));
        let store = state.store.clone();

        Self { app: router(state), store, web_root, _dir: dir }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().method("DELETE").uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn send_json(&self, method: &str, uri: &str, body: Value) -> Response<Body> {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn send_file(
        &self,
        method: &str,
        uri: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Response<Body> {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
                .body(Body::from(multipart_body(file_name, content_type, bytes)))
                .unwrap(),
        )
        .await
    }

    /// Creates a movie and returns its id.
    pub async fn create_movie(&self, title: &str) -> i64 {
        let response = self
            .send_json(
                "POST",
                "/api/movies/add",
                serde_json::json!({
                    "title": title,
                    "description": "test movie",
                    "releaseDate": "2021-10-22"
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["movieId"].as_i64().unwrap()
    }

    /// Uploads `bytes` as a PNG for `movie_id` and returns the stored path.
    pub async fn upload_png(&self, movie_id: i64, bytes: &[u8], is_cover: bool) -> String {
        let uri = format!("/api/movieimages/{movie_id}/upload?isCover={is_cover}");
        let response = self.send_file("POST", &uri, "still.png", "image/png", bytes).await;
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await["filePath"].as_str().unwrap().to_string()
    }

    /// Id of the first image listed for `movie_id`.
    pub async fn first_image_id(&self, movie_id: i64) -> i64 {
        let images = json_body(self.get(&format!("/api/movieimages/movie/{movie_id}")).await).await;
        images[0]["movieImageId"].as_i64().unwrap()
    }

    /// Number of files currently sitting in the uploads directory.
    pub fn stored_files(&self) -> usize {
        match std::fs::read_dir(self.web_root.join("uploads")) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

pub fn multipart_body(file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn json_body(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
