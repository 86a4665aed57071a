//! The gallery session: loaded albums, navigation and the actions a user can take.
//!
//! Every action runs to completion before the next one can start: the gate is
//! consulted, input validated, the remote API called and the album forest
//! reloaded from it. Local state is never patched after a mutation, the next
//! reload is the only way changes become visible.

use tracing::{debug, info, warn};

use folio_core::{
    access::{AccessError, AccessGate, Action, GateState, PasswordError, PasswordHasher, Pending},
    mime_type::media_type_of,
    model::{
        media_item_from_upload,
        repository::album::{contains, find_by_id, insert_child, path_to},
        Album, AlbumDraft, AlbumEdit, AlbumId, CountMode, DraftError, ValidationError,
    },
    view::{suggestions, ViewQuery},
};

use crate::api::{AlbumApi, ApiError, UploadFile};


#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    #[error("no album with id {0}")]
    NotFound(AlbumId),
    #[error("no album is being edited")]
    NotEditing,
    #[error("album has no media item at index {index}, it has {len}")]
    NoSuchMedia { index: usize, len: usize },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<DraftError> for GalleryError {
    fn from(err: DraftError) -> Self {
        match err {
            DraftError::Validation(err) => GalleryError::Validation(err),
            DraftError::Password(err) => GalleryError::Password(err),
        }
    }
}

/// Result of an action that may need a password first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The action was carried out
    Done,
    /// The album is locked, the action runs once the password is submitted
    Challenged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaReport {
    pub added: usize,
    pub failed: Vec<UploadFailure>,
}

pub struct Gallery<A, H> {
    api: A,
    hasher: H,
    albums: Vec<Album>,
    /// Ids from a root album down to the selected album
    path: Vec<AlbumId>,
    gate: AccessGate,
    editing: Option<AlbumId>,
    pub view: ViewQuery,
}

/// Follows `ids` down from the roots and stops at the first id that is not a child of the previous album
fn resolve_path<'a>(roots: &'a [Album], ids: &[AlbumId]) -> Vec<&'a Album> {
    let mut chain = Vec::with_capacity(ids.len());
    let mut siblings = roots;
    for id in ids {
        let Some(album) = siblings.iter().find(|album| &album.id == id) else {
            break;
        };
        chain.push(album);
        siblings = &album.albums;
    }
    chain
}

impl<A: AlbumApi, H: PasswordHasher> Gallery<A, H> {
    pub fn new(api: A, hasher: H) -> Self {
        Gallery {
            api,
            hasher,
            albums: Vec::new(),
            path: Vec::new(),
            gate: AccessGate::new(),
            editing: None,
            view: ViewQuery::default(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn find(&self, id: &AlbumId) -> Option<&Album> {
        find_by_id(&self.albums, id)
    }

    /// The album, provided neither it nor any album containing it is still locked
    pub fn accessible(&self, id: &AlbumId) -> Result<&Album, GalleryError> {
        let chain = path_to(&self.albums, id).ok_or_else(|| GalleryError::NotFound(id.clone()))?;
        self.gate.check(chain.iter().copied())?;
        chain
            .last()
            .copied()
            .ok_or_else(|| GalleryError::NotFound(id.clone()))
    }

    /// Fetches the whole forest. On failure the previously loaded albums are kept.
    #[tracing::instrument(skip(self))]
    pub async fn reload(&mut self) -> Result<(), GalleryError> {
        let albums = match self.api.list_albums().await {
            Ok(albums) => albums,
            Err(err) => {
                warn!("could not load albums: {}", err);
                return Err(err.into());
            }
        };
        self.albums = albums;
        let resolved = resolve_path(&self.albums, &self.path).len();
        if resolved < self.path.len() {
            debug!(
                dropped = self.path.len() - resolved,
                "selected album no longer exists"
            );
            self.path.truncate(resolved);
        }
        if let Some(editing) = &self.editing {
            if !contains(&self.albums, editing) {
                debug!(album_id = %editing, "album being edited no longer exists");
                self.editing = None;
            }
        }
        Ok(())
    }

    /// The album whose contents are shown, `None` at the top level
    pub fn selected(&self) -> Option<&Album> {
        resolve_path(&self.albums, &self.path).last().copied()
    }

    pub fn breadcrumbs(&self) -> Vec<&Album> {
        resolve_path(&self.albums, &self.path)
    }

    /// Albums at the current level after filtering and sorting
    pub fn visible_albums(&self) -> Vec<&Album> {
        match self.selected() {
            Some(selected) => self.view.apply(&selected.albums, CountMode::MediaAndAlbums),
            None => self.view.apply(&self.albums, CountMode::MediaOnly),
        }
    }

    /// Search-as-you-type suggestions for the current query at the current level
    pub fn suggestions(&self) -> Vec<&Album> {
        let level = match self.selected() {
            Some(selected) => &selected.albums[..],
            None => &self.albums[..],
        };
        suggestions(level, &self.view.query)
    }

    pub fn back(&mut self) {
        self.path.pop();
    }

    /// Jumps to a breadcrumb, `None` being the top level
    pub fn go_to(&mut self, crumb: Option<&AlbumId>) -> Result<(), GalleryError> {
        match crumb {
            None => self.path.clear(),
            Some(id) => {
                let pos = self
                    .path
                    .iter()
                    .position(|p| p == id)
                    .ok_or_else(|| GalleryError::NotFound(id.clone()))?;
                self.path.truncate(pos + 1);
            }
        }
        Ok(())
    }

    /// The album granted for editing, if any
    pub fn editing(&self) -> Option<&Album> {
        self.editing.as_ref().and_then(|id| self.find(id))
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub async fn open(&mut self, id: &AlbumId) -> Result<Outcome, GalleryError> {
        self.request(id, Action::View).await
    }

    pub async fn request_edit(&mut self, id: &AlbumId) -> Result<Outcome, GalleryError> {
        self.request(id, Action::Edit).await
    }

    pub async fn request_delete(&mut self, id: &AlbumId) -> Result<Outcome, GalleryError> {
        self.request(id, Action::Delete).await
    }

    /// Asks the gate for `action` on `id`. Albums containing it must already be unlocked,
    /// only the album itself can be challenged.
    async fn request(&mut self, id: &AlbumId, action: Action) -> Result<Outcome, GalleryError> {
        let chain = path_to(&self.albums, id).ok_or_else(|| GalleryError::NotFound(id.clone()))?;
        let Some((album, ancestors)) = chain.split_last() else {
            return Err(GalleryError::NotFound(id.clone()));
        };
        self.gate.check(ancestors.iter().copied())?;
        let challenged = matches!(self.gate.request(album, action), GateState::Challenging(_));
        if challenged {
            Ok(Outcome::Challenged)
        } else {
            self.perform_grant().await
        }
    }

    /// Checks the password for the album that is asking for one and carries out the deferred action
    pub async fn submit_password(&mut self, password: &str) -> Result<Outcome, GalleryError> {
        self.gate.submit(password, &self.hasher)?;
        self.perform_grant().await
    }

    pub fn cancel_challenge(&mut self) -> Option<Pending> {
        self.gate.cancel()
    }

    /// The album and action waiting for a password
    pub fn challenge(&self) -> Option<&Pending> {
        match self.gate.state() {
            GateState::Challenging(pending) => Some(pending),
            _ => None,
        }
    }

    async fn perform_grant(&mut self) -> Result<Outcome, GalleryError> {
        let Some(Pending { album, action }) = self.gate.take_grant() else {
            return Ok(Outcome::Done);
        };
        match action {
            Action::View => {
                let chain = path_to(&self.albums, &album.id)
                    .ok_or_else(|| GalleryError::NotFound(album.id.clone()))?;
                self.path = chain.into_iter().map(|a| a.id.clone()).collect();
            }
            Action::Edit => {
                self.editing = Some(album.id);
            }
            Action::Delete => {
                self.delete_now(&album).await?;
            }
        }
        Ok(Outcome::Done)
    }

    #[tracing::instrument(skip_all, fields(album_id = %album.id))]
    async fn delete_now(&mut self, album: &Album) -> Result<(), GalleryError> {
        self.api.delete_album(&album.id).await?;
        info!("deleted album");
        album.walk(&mut |deleted| self.gate.forget(&deleted.id));
        self.path.clear();
        self.reload().await
    }

    /// Creates an album from `draft`, as a new root or as the last child of `parent`.
    /// Nothing is sent if the draft does not validate.
    #[tracing::instrument(skip(self, draft))]
    pub async fn create(
        &mut self,
        draft: &AlbumDraft,
        parent: Option<&AlbumId>,
    ) -> Result<AlbumId, GalleryError> {
        if let Some(parent) = parent {
            self.accessible(parent)?;
        }
        let album = draft.to_album(&self.hasher)?;
        let id = album.id.clone();
        match parent {
            Some(parent_id) => {
                let forest = insert_child(&self.albums, parent_id, album)
                    .ok_or_else(|| GalleryError::NotFound(parent_id.clone()))?;
                let parent = find_by_id(&forest, parent_id)
                    .ok_or_else(|| GalleryError::NotFound(parent_id.clone()))?;
                self.api.update_album(parent).await?;
            }
            None => {
                self.api.create_album(&album).await?;
            }
        }
        info!(album_id = %id, "created album");
        self.reload().await?;
        Ok(id)
    }

    /// Applies `edit` to the album granted for editing and leaves edit mode on success
    pub async fn update(&mut self, edit: &AlbumEdit) -> Result<(), GalleryError> {
        let id = self.editing.clone().ok_or(GalleryError::NotEditing)?;
        let album = self.find(&id).ok_or_else(|| GalleryError::NotFound(id.clone()))?;
        let edited = edit.apply(album, &self.hasher)?;
        self.save(edited).await?;
        self.editing = None;
        Ok(())
    }

    /// Replaces the stored album with the same id. The stored album must not be locked.
    pub async fn save(&mut self, album: Album) -> Result<(), GalleryError> {
        self.accessible(&album.id)?;
        self.api.update_album(&album).await?;
        self.reload().await
    }

    /// Uploads `files` and appends them to the album's media. Files that can not be
    /// uploaded are reported, the remaining ones are still added.
    #[tracing::instrument(skip(self, files), fields(num_files = files.len()))]
    pub async fn add_media(
        &mut self,
        album_id: &AlbumId,
        files: Vec<UploadFile>,
    ) -> Result<MediaReport, GalleryError> {
        let mut album = self.accessible(album_id)?.clone();
        let mut report = MediaReport::default();
        for file in files {
            let filename = file.filename.clone();
            if media_type_of(&file.mime).is_none() {
                report.failed.push(UploadFailure {
                    filename,
                    reason: ValidationError::UnsupportedMediaType(file.mime).to_string(),
                });
                continue;
            }
            let mime = file.mime.clone();
            let uploaded = self
                .api
                .upload(file)
                .await
                .map_err(GalleryError::from)
                .and_then(|url| Ok(media_item_from_upload(url, filename.clone(), &mime)?));
            match uploaded {
                Ok(item) => {
                    album.media.push(item);
                    report.added += 1;
                }
                Err(err) => {
                    warn!(%filename, "upload failed: {}", err);
                    report.failed.push(UploadFailure {
                        filename,
                        reason: err.to_string(),
                    });
                }
            }
        }
        if report.added > 0 {
            self.save(album).await?;
        }
        Ok(report)
    }

    /// Removes one media item. A cover pointing at the removed item is cleared.
    pub async fn remove_media(&mut self, album_id: &AlbumId, index: usize) -> Result<(), GalleryError> {
        let mut album = self.accessible(album_id)?.clone();
        if index >= album.media.len() {
            return Err(GalleryError::NoSuchMedia {
                index,
                len: album.media.len(),
            });
        }
        let removed = album.media.remove(index);
        if album.cover_image == removed.url {
            album.cover_image.clear();
        }
        self.save(album).await
    }
}
