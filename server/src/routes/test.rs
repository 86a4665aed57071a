use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use camino::Utf8PathBuf as PathBuf;
use chrono::NaiveDate;
use claims::assert_ok;
use pretty_assertions::assert_eq;
use tower::ServiceExt;

use folio_core::model::Album;

use super::upload::UploadResponse;

const BOUNDARY: &str = "folio-test-boundary";

async fn test_app(max_upload_size: usize) -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let path = PathBuf::from_path_buf(dir.path().to_owned()).unwrap();
    let state = assert_ok!(crate::open_state(&path, "http://localhost:5000/").await);
    (dir, crate::app(state, max_upload_size))
}

fn album(id: &str) -> Album {
    Album {
        id: id.into(),
        title: format!("Album {}", id),
        publisher_name: "Publisher".to_owned(),
        publish_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        cover_image: String::new(),
        media: Vec::new(),
        albums: Vec::new(),
        is_locked: false,
        password_hash: None,
    }
}

fn json_request(method: Method, uri: &str, album: &Album) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(album).unwrap()))
        .unwrap()
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn upload_request(filename: &str, content_type: &str, contents: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn album_crud() {
    let (_dir, app) = test_app(1024).await;

    let mut parent = album("p");
    parent.albums.push(album("c"));
    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/albums", &parent))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(empty_request(Method::GET, "/albums/c"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let nested: Album = body_json(response).await;
    assert_eq!(nested, album("c"));

    let mut renamed = album("c");
    renamed.title = "Renamed".to_owned();
    let response = app
        .clone()
        .oneshot(json_request(Method::PUT, "/albums/c", &renamed))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(empty_request(Method::GET, "/albums"))
        .await
        .unwrap();
    let albums: Vec<Album> = body_json(response).await;
    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].albums[0].title, "Renamed");

    let response = app
        .clone()
        .oneshot(empty_request(Method::DELETE, "/albums/p"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = app
        .oneshot(empty_request(Method::GET, "/albums/c"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn error_statuses() {
    let (_dir, app) = test_app(1024).await;
    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/albums", &album("a")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/albums", &album("a")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(json_request(Method::PUT, "/albums/a", &album("b")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .clone()
        .oneshot(json_request(Method::PUT, "/albums/zzz", &album("zzz")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(empty_request(Method::DELETE, "/albums/zzz"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_then_serve() {
    let (_dir, app) = test_app(1024).await;
    let response = app
        .clone()
        .oneshot(upload_request("beach.jpg", "image/jpeg", b"not really a jpeg"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let upload: UploadResponse = body_json(response).await;
    let path = upload
        .url
        .strip_prefix("http://localhost:5000")
        .unwrap()
        .to_owned();
    assert!(path.starts_with("/uploads/"));
    assert!(path.ends_with(".jpg"));

    let response = app.oneshot(empty_request(Method::GET, &path)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"not really a jpeg");
}

#[tokio::test]
async fn upload_rejects_other_types_and_large_files() {
    let (_dir, app) = test_app(1024).await;
    let response = app
        .clone()
        .oneshot(upload_request("notes.pdf", "application/pdf", b"%PDF"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let response = app
        .oneshot(upload_request("big.png", "image/png", &[0u8; 4096]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn stored_uploads_never_take_the_client_extension() {
    let (_dir, app) = test_app(1024).await;
    let response = app
        .clone()
        .oneshot(upload_request("x.html", "image/bmp", b"<script>alert(1)</script>"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let upload: UploadResponse = body_json(response).await;
    let name = upload.url.rsplit('/').next().unwrap().to_owned();
    assert!(!name.contains('.'), "stored as {}", name);

    let response = app
        .oneshot(empty_request(Method::GET, &format!("/uploads/{}", name)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|value| value.to_str().unwrap().to_owned());
    assert_ne!(content_type.as_deref(), Some("text/html"));
}
