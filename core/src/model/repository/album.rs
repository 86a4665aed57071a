use tracing::debug;

use crate::model::{Album, AlbumId};

/// Indices leading from the root list down to an album: the first entry indexes
/// the roots, every following entry indexes the previous album's children.
type IndexPath = Vec<usize>;

/// Pre-order search: an album is checked before its children, children in list order.
fn index_path(roots: &[Album], id: &AlbumId) -> Option<IndexPath> {
    for (idx, album) in roots.iter().enumerate() {
        if &album.id == id {
            return Some(vec![idx]);
        }
        if let Some(mut path) = index_path(&album.albums, id) {
            path.insert(0, idx);
            return Some(path);
        }
    }
    None
}

fn album_at_mut<'a>(roots: &'a mut [Album], path: &[usize]) -> Option<&'a mut Album> {
    let (first, rest) = path.split_first()?;
    let mut album = roots.get_mut(*first)?;
    for idx in rest {
        album = album.albums.get_mut(*idx)?;
    }
    Some(album)
}

pub fn find_by_id<'a>(roots: &'a [Album], id: &AlbumId) -> Option<&'a Album> {
    roots.iter().find_map(|album| {
        if &album.id == id {
            Some(album)
        } else {
            find_by_id(&album.albums, id)
        }
    })
}

pub fn contains(roots: &[Album], id: &AlbumId) -> bool {
    find_by_id(roots, id).is_some()
}

/// Chain of albums from a root down to the album with `id`, both ends included
pub fn path_to<'a>(roots: &'a [Album], id: &AlbumId) -> Option<Vec<&'a Album>> {
    let path = index_path(roots, id)?;
    let mut chain = Vec::with_capacity(path.len());
    let mut siblings = roots;
    for idx in path {
        let album = siblings.get(idx)?;
        chain.push(album);
        siblings = &album.albums;
    }
    Some(chain)
}

/// Returns a new forest in which the album with `id` is replaced by `updater(album)`.
/// If there is no such album the forest is returned unchanged and `updater` is not called.
pub fn update_by_id(
    roots: &[Album],
    id: &AlbumId,
    updater: impl FnOnce(&Album) -> Album,
) -> Vec<Album> {
    let mut forest = roots.to_vec();
    update_in_place(&mut forest, id, |album| {
        let updated = updater(album);
        *album = updated;
    });
    forest
}

/// Returns a new forest without the album with `id` and its whole subtree
pub fn delete_by_id(roots: &[Album], id: &AlbumId) -> Vec<Album> {
    let mut forest = roots.to_vec();
    remove_in_place(&mut forest, id);
    forest
}

/// Returns a new forest with `child` appended to the children of `parent_id`,
/// or `None` if there is no album with that id.
pub fn insert_child(roots: &[Album], parent_id: &AlbumId, child: Album) -> Option<Vec<Album>> {
    let mut forest = roots.to_vec();
    let parent = album_at_mut(&mut forest, &index_path(roots, parent_id)?)?;
    parent.albums.push(child);
    Some(forest)
}

/// Applies `f` to the album with `id`. Returns false if it was not found.
pub fn update_in_place(roots: &mut [Album], id: &AlbumId, f: impl FnOnce(&mut Album)) -> bool {
    let Some(path) = index_path(roots, id) else {
        debug!(%id, "album to update not found");
        return false;
    };
    match album_at_mut(roots, &path) {
        Some(album) => {
            f(album);
            true
        }
        None => false,
    }
}

/// Removes the album with `id` from its parent's children (or the roots) and returns it
pub fn remove_in_place(roots: &mut Vec<Album>, id: &AlbumId) -> Option<Album> {
    let Some(path) = index_path(roots, id) else {
        debug!(%id, "album to delete not found");
        return None;
    };
    let (last, parent_path) = path.split_last()?;
    let siblings: &mut Vec<Album> = if parent_path.is_empty() {
        roots
    } else {
        &mut album_at_mut(roots, parent_path)?.albums
    };
    Some(siblings.remove(*last))
}
