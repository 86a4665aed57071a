use std::sync::Arc;

use camino::Utf8PathBuf as PathBuf;

use crate::store::AlbumStore;

pub struct AppState {
    pub store: AlbumStore,
    /// Uploaded files are stored here and served under `/uploads`
    pub uploads_dir: PathBuf,
    /// Prefix of the urls returned for uploads, without trailing slash
    pub public_url: String,
}

pub type SharedState = Arc<AppState>;
