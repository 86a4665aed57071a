//! Client for the album persistence API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, StatusCode};
use serde::Deserialize;
use tracing::debug;

use folio_core::model::{Album, AlbumId};

const USER_AGENT: &str = concat!("folio/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error")]
    Network(#[from] reqwest::Error),
    #[error("{0} not found")]
    NotFound(String),
    #[error("server responded with {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// A file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Remote source of truth for the album forest
#[async_trait]
pub trait AlbumApi: Send + Sync {
    async fn list_albums(&self) -> Result<Vec<Album>, ApiError>;

    async fn get_album(&self, id: &AlbumId) -> Result<Album, ApiError>;

    async fn create_album(&self, album: &Album) -> Result<Album, ApiError>;

    /// Replaces the album with the same id, wherever it is nested
    async fn update_album(&self, album: &Album) -> Result<Album, ApiError>;

    async fn delete_album(&self, id: &AlbumId) -> Result<(), ApiError>;

    /// Stores `file` and returns the url it can be fetched from
    async fn upload(&self, file: UploadFile) -> Result<String, ApiError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

#[derive(Debug, Clone)]
pub struct HttpAlbumApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAlbumApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(HttpAlbumApi {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Media urls may be relative to the API base
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            url.to_owned()
        }
    }

    fn album_url(&self, id: &AlbumId) -> String {
        format!("{}/albums/{}", self.base_url, id.as_str())
    }
}

async fn check_status(
    response: reqwest::Response,
    what: impl FnOnce() -> String,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(what()));
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl AlbumApi for HttpAlbumApi {
    #[tracing::instrument(skip(self))]
    async fn list_albums(&self) -> Result<Vec<Album>, ApiError> {
        let url = format!("{}/albums", self.base_url);
        let response = self.http.get(&url).send().await?;
        let response = check_status(response, || url.clone()).await?;
        let albums: Vec<Album> = decode(response).await?;
        debug!(num_roots = albums.len(), "fetched albums");
        Ok(albums)
    }

    #[tracing::instrument(skip(self))]
    async fn get_album(&self, id: &AlbumId) -> Result<Album, ApiError> {
        let response = self.http.get(self.album_url(id)).send().await?;
        let response = check_status(response, || format!("album {}", id.as_str())).await?;
        decode(response).await
    }

    #[tracing::instrument(skip_all, fields(album_id = %album.id))]
    async fn create_album(&self, album: &Album) -> Result<Album, ApiError> {
        let url = format!("{}/albums", self.base_url);
        let response = self.http.post(&url).json(album).send().await?;
        let response = check_status(response, || url.clone()).await?;
        decode(response).await
    }

    #[tracing::instrument(skip_all, fields(album_id = %album.id))]
    async fn update_album(&self, album: &Album) -> Result<Album, ApiError> {
        let response = self
            .http
            .put(self.album_url(&album.id))
            .json(album)
            .send()
            .await?;
        let response =
            check_status(response, || format!("album {}", album.id.as_str())).await?;
        decode(response).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_album(&self, id: &AlbumId) -> Result<(), ApiError> {
        let response = self.http.delete(self.album_url(id)).send().await?;
        check_status(response, || format!("album {}", id.as_str())).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(filename = %file.filename, size = file.bytes.len()))]
    async fn upload(&self, file: UploadFile) -> Result<String, ApiError> {
        let url = format!("{}/upload", self.base_url);
        let part = multipart::Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(&file.mime)?;
        let form = multipart::Form::new().part("file", part);
        let response = self.http.post(&url).multipart(form).send().await?;
        let response = check_status(response, || url.clone()).await?;
        let uploaded: UploadResponse = decode(response).await?;
        Ok(uploaded.url)
    }
}

#[cfg(test)]
mod tests {
    use claims::assert_ok;

    use super::*;

    #[test]
    fn relative_media_urls_resolve_against_base() {
        let api = assert_ok!(HttpAlbumApi::new("http://localhost:5000/"));
        assert_eq!(api.base_url(), "http://localhost:5000");
        assert_eq!(
            api.resolve_url("/uploads/a.jpg"),
            "http://localhost:5000/uploads/a.jpg"
        );
        assert_eq!(
            api.resolve_url("https://cdn.example.com/a.jpg"),
            "https://cdn.example.com/a.jpg"
        );
        assert_eq!(
            api.album_url(&AlbumId::from("abc")),
            "http://localhost:5000/albums/abc"
        );
    }
}
