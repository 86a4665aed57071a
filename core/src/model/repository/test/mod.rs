use crate::model::{Album, AlbumId};

pub mod album;

/// Ids of all albums in pre-order
pub fn all_ids(roots: &[Album]) -> Vec<AlbumId> {
    let mut ids = Vec::new();
    for root in roots {
        root.walk(&mut |album| ids.push(album.id.clone()));
    }
    ids
}
