use camino::{Utf8Path as Path, Utf8PathBuf as PathBuf};
use tracing::{info, warn};

use folio_core::model::{Album, AlbumId, MediaItem};

use crate::api::HttpAlbumApi;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("album {} has no media to download", .0.as_str())]
    NothingToDownload(AlbumId),
    #[error("album {} has no media item at index {index}", .album_id.as_str())]
    NoSuchMedia { album_id: AlbumId, index: usize },
    #[error("could not download {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("could not create download directory")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadReport {
    pub saved: usize,
    pub failed: usize,
}

/// Target file for a media item. Only the last path component of the filename is used.
fn target_path(dir: &Path, item: &MediaItem) -> PathBuf {
    let name = Path::new(&item.filename)
        .file_name()
        .filter(|name| !name.is_empty())
        .unwrap_or(item.id.as_str());
    dir.join(name)
}

async fn fetch(api: &HttpAlbumApi, item: &MediaItem, target: &Path) -> eyre::Result<()> {
    let bytes = api
        .http()
        .get(api.resolve_url(&item.url))
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    tokio::fs::write(target, &bytes).await?;
    Ok(())
}

/// Saves every media item of `album` into `dir`. Items that fail are logged and counted.
#[tracing::instrument(skip(api, album), fields(album_id = %album.id))]
pub async fn download_album(
    api: &HttpAlbumApi,
    album: &Album,
    dir: &Path,
) -> Result<DownloadReport, DownloadError> {
    if album.media.is_empty() {
        return Err(DownloadError::NothingToDownload(album.id.clone()));
    }
    tokio::fs::create_dir_all(dir).await?;
    let mut report = DownloadReport::default();
    for item in &album.media {
        let target = target_path(dir, item);
        match fetch(api, item, &target).await {
            Ok(()) => report.saved += 1,
            Err(err) => {
                warn!(url = %item.url, "download failed: {:#}", err);
                report.failed += 1;
            }
        }
    }
    info!(saved = report.saved, failed = report.failed, "download finished");
    Ok(report)
}

/// Saves the media item at `index` of `album` into `dir` and returns where it was written
#[tracing::instrument(skip(api, album), fields(album_id = %album.id))]
pub async fn download_item(
    api: &HttpAlbumApi,
    album: &Album,
    index: usize,
    dir: &Path,
) -> Result<PathBuf, DownloadError> {
    let item = album.media.get(index).ok_or_else(|| DownloadError::NoSuchMedia {
        album_id: album.id.clone(),
        index,
    })?;
    tokio::fs::create_dir_all(dir).await?;
    let target = target_path(dir, item);
    fetch(api, item, &target)
        .await
        .map_err(|err| DownloadError::Fetch {
            url: item.url.clone(),
            reason: format!("{:#}", err),
        })?;
    info!(%target, "downloaded media item");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use folio_core::model::MediaType;

    use super::*;

    fn item(id: &str, filename: &str) -> MediaItem {
        MediaItem {
            id: id.into(),
            ty: MediaType::Image,
            url: format!("/uploads/{}", id),
            filename: filename.to_owned(),
        }
    }

    #[test]
    fn filenames_can_not_escape_the_directory() {
        let dir = Path::new("/tmp/out");
        assert_eq!(
            target_path(dir, &item("1", "../../etc/passwd")),
            PathBuf::from("/tmp/out/passwd")
        );
        assert_eq!(
            target_path(dir, &item("1", "beach.jpg")),
            PathBuf::from("/tmp/out/beach.jpg")
        );
        assert_eq!(target_path(dir, &item("abc", "")), PathBuf::from("/tmp/out/abc"));
    }
}
