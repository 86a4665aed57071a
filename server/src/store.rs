use std::collections::HashSet;

use camino::{Utf8Path as Path, Utf8PathBuf as PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use folio_core::model::{
    repository::album::{find_by_id, remove_in_place, update_in_place},
    Album, AlbumId,
};

const ALBUMS_FILE: &str = "albums.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no album with id {0}")]
    NotFound(AlbumId),
    #[error("album id {0} is already in use")]
    Conflict(AlbumId),
    #[error("invalid album: {0}")]
    Invalid(String),
    #[error("error accessing album file")]
    Io(#[from] std::io::Error),
    #[error("error (de)serializing albums")]
    Json(#[from] serde_json::Error),
}

/// The album forest, persisted as a single JSON file.
///
/// Every mutation holds the write lock until the file has been replaced,
/// so readers never observe a state that is not on disk.
#[derive(Debug)]
pub struct AlbumStore {
    path: PathBuf,
    albums: RwLock<Vec<Album>>,
}

fn check_invariants(album: &Album) -> Result<(), StoreError> {
    if album.id.as_str().is_empty() {
        return Err(StoreError::Invalid("album id can not be empty".to_owned()));
    }
    if let Some(broken) = album.find_locked_without_hash() {
        return Err(StoreError::Invalid(format!(
            "album {} is locked but has no password hash",
            broken.id
        )));
    }
    Ok(())
}

/// First id that appears more than once in the forest
fn duplicate_id(roots: &[Album]) -> Option<AlbumId> {
    let mut seen = HashSet::new();
    let mut duplicate = None;
    for root in roots {
        root.walk(&mut |album| {
            if duplicate.is_none() && !seen.insert(&album.id) {
                duplicate = Some(album.id.clone());
            }
        });
    }
    duplicate
}

impl AlbumStore {
    /// Opens the store in `data_dir`, creating the directory if needed.
    /// A missing album file is an empty forest.
    #[instrument]
    pub async fn open(data_dir: &Path) -> Result<AlbumStore, StoreError> {
        tokio::fs::create_dir_all(data_dir).await?;
        let path = data_dir.join(ALBUMS_FILE);
        let albums: Vec<Album> = match tokio::fs::read(&path).await {
            Ok(contents) => serde_json::from_slice(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(%path, "no album file yet, starting empty");
                Vec::new()
            }
            Err(err) => return Err(err.into()),
        };
        if let Some(id) = duplicate_id(&albums) {
            return Err(StoreError::Conflict(id));
        }
        debug!(num_roots = albums.len(), "loaded albums");
        Ok(AlbumStore {
            path,
            albums: RwLock::new(albums),
        })
    }

    pub async fn list(&self) -> Vec<Album> {
        self.albums.read().await.clone()
    }

    pub async fn get(&self, id: &AlbumId) -> Result<Album, StoreError> {
        let albums = self.albums.read().await;
        find_by_id(&albums, id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Adds `album` as a new root
    #[instrument(skip_all, fields(album_id = %album.id))]
    pub async fn create(&self, album: Album) -> Result<Album, StoreError> {
        check_invariants(&album)?;
        let mut albums = self.albums.write().await;
        let mut updated = albums.clone();
        updated.push(album.clone());
        if let Some(id) = duplicate_id(&updated) {
            return Err(StoreError::Conflict(id));
        }
        self.persist(&updated).await?;
        *albums = updated;
        info!("created album");
        Ok(album)
    }

    /// Replaces the album with `id`, wherever it is in the forest, by `album`
    #[instrument(skip(self, album))]
    pub async fn replace(&self, id: &AlbumId, album: Album) -> Result<Album, StoreError> {
        if &album.id != id {
            return Err(StoreError::Invalid(format!(
                "album id {} does not match {}",
                album.id, id
            )));
        }
        check_invariants(&album)?;
        let mut albums = self.albums.write().await;
        let mut updated = albums.clone();
        let replacement = album.clone();
        if !update_in_place(&mut updated, id, move |existing| *existing = replacement) {
            return Err(StoreError::NotFound(id.clone()));
        }
        if let Some(duplicate) = duplicate_id(&updated) {
            return Err(StoreError::Conflict(duplicate));
        }
        self.persist(&updated).await?;
        *albums = updated;
        info!("updated album");
        Ok(album)
    }

    /// Deletes the album with `id` and everything nested in it
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &AlbumId) -> Result<(), StoreError> {
        let mut albums = self.albums.write().await;
        let mut updated = albums.clone();
        let removed =
            remove_in_place(&mut updated, id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        self.persist(&updated).await?;
        *albums = updated;
        info!(num_nested = removed.album_count(), "deleted album");
        Ok(())
    }

    /// Writes to a temporary file first so a crash never leaves a truncated album file
    async fn persist(&self, albums: &[Album]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(albums)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}
