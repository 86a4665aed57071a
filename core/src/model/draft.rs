use chrono::NaiveDate;
use tracing::debug;

use super::{Album, AlbumId, MediaItem, MediaItemId, MediaType};
use crate::access::{PasswordError, PasswordHasher};

pub const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password must be at least {min} characters long")]
    PasswordTooShort { min: usize },
    #[error("'{0}' is neither an image nor a video")]
    UnsupportedMediaType(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// New password as typed twice into a form
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordEntry {
    pub password: String,
    pub confirm: String,
}

impl std::fmt::Debug for PasswordEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordEntry").finish_non_exhaustive()
    }
}

impl PasswordEntry {
    pub fn new(password: impl Into<String>, confirm: impl Into<String>) -> Self {
        PasswordEntry {
            password: password.into(),
            confirm: confirm.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.password.is_empty() {
            return Err(ValidationError::MissingField("password"));
        }
        if self.password != self.confirm {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        Ok(())
    }

    fn hash(&self, hasher: &impl PasswordHasher) -> Result<String, DraftError> {
        self.validate()?;
        Ok(hasher.hash(&self.password)?)
    }
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

/// State of the create album form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumDraft {
    pub title: String,
    pub publisher_name: String,
    pub publish_date: NaiveDate,
    /// Explicitly chosen cover, empty for none
    pub cover_image: String,
    pub media: Vec<MediaItem>,
    /// Set if the album should be locked
    pub lock: Option<PasswordEntry>,
}

impl AlbumDraft {
    /// Empty draft published today
    pub fn new(title: impl Into<String>, publisher_name: impl Into<String>) -> Self {
        AlbumDraft {
            title: title.into(),
            publisher_name: publisher_name.into(),
            publish_date: chrono::Local::now().date_naive(),
            cover_image: String::new(),
            media: Vec::new(),
            lock: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.title, "title")?;
        require(&self.publisher_name, "publisher name")?;
        if let Some(lock) = &self.lock {
            lock.validate()?;
        }
        Ok(())
    }

    /// Builds the album to submit: fresh id, hashed password. The draft is left as is,
    /// so it can be corrected and resubmitted if validation fails.
    pub fn to_album(&self, hasher: &impl PasswordHasher) -> Result<Album, DraftError> {
        self.validate()?;
        let password_hash = match &self.lock {
            Some(lock) => Some(lock.hash(hasher)?),
            None => None,
        };
        let album = Album {
            id: AlbumId::new_random(),
            title: self.title.trim().to_owned(),
            publisher_name: self.publisher_name.trim().to_owned(),
            publish_date: self.publish_date,
            cover_image: self.cover_image.clone(),
            media: self.media.clone(),
            albums: Vec::new(),
            is_locked: self.lock.is_some(),
            password_hash,
        };
        debug!(album_id = %album.id, "built album from draft");
        Ok(album)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LockChange {
    /// Leave lock state and password as they are
    #[default]
    Keep,
    Unlock,
    /// Lock with a new password, also used to change the password of a locked album
    Lock(PasswordEntry),
}

/// Changes from the edit album form. `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlbumEdit {
    pub title: Option<String>,
    pub publisher_name: Option<String>,
    pub publish_date: Option<NaiveDate>,
    pub cover_image: Option<String>,
    pub lock: LockChange,
}

impl AlbumEdit {
    /// Returns the edited album. Id, media and nested albums are kept.
    pub fn apply(&self, album: &Album, hasher: &impl PasswordHasher) -> Result<Album, DraftError> {
        let mut edited = album.clone();
        if let Some(title) = &self.title {
            require(title, "title")?;
            edited.title = title.trim().to_owned();
        }
        if let Some(publisher_name) = &self.publisher_name {
            require(publisher_name, "publisher name")?;
            edited.publisher_name = publisher_name.trim().to_owned();
        }
        if let Some(publish_date) = self.publish_date {
            edited.publish_date = publish_date;
        }
        if let Some(cover_image) = &self.cover_image {
            edited.cover_image = cover_image.clone();
        }
        match &self.lock {
            LockChange::Keep => {}
            LockChange::Unlock => {
                edited.is_locked = false;
                edited.password_hash = None;
            }
            LockChange::Lock(entry) => {
                edited.password_hash = Some(entry.hash(hasher)?);
                edited.is_locked = true;
            }
        }
        Ok(edited)
    }
}

/// Media item for a file that was uploaded to `url`. Returns an error for
/// anything that is neither an image nor a video.
pub fn media_item_from_upload(
    url: impl Into<String>,
    filename: impl Into<String>,
    mime: &str,
) -> Result<MediaItem, ValidationError> {
    let ty: MediaType = crate::mime_type::media_type_of(mime)
        .ok_or_else(|| ValidationError::UnsupportedMediaType(mime.to_owned()))?;
    Ok(MediaItem {
        id: MediaItemId::new_random(),
        ty,
        url: url.into(),
        filename: filename.into(),
    })
}
