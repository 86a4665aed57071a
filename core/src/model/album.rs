use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{util::publish_date, AlbumId, MediaItemId};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: MediaItemId,
    #[serde(rename = "type")]
    pub ty: MediaType,
    pub url: String,
    pub filename: String,
}

/// A node in the album forest. Children are owned, so an album value is its whole subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: AlbumId,
    pub title: String,
    pub publisher_name: String,
    #[serde(with = "publish_date")]
    pub publish_date: NaiveDate,
    /// Explicitly chosen cover, empty if none was chosen. See [`Album::cover_url`].
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub albums: Vec<Album>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

/// What counts as an "item" when ordering albums by size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountMode {
    /// Used for the top level album list
    MediaOnly,
    /// Used for the list of albums nested inside another album
    MediaAndAlbums,
}

impl Album {
    /// The digest to verify against, if the album is locked.
    /// A locked album with an empty hash yields `None` and can not be unlocked.
    pub fn lock_hash(&self) -> Option<&str> {
        if !self.is_locked {
            return None;
        }
        self.password_hash.as_deref().filter(|hash| !hash.is_empty())
    }

    /// Cover to display: the stored cover, else the first media item, else the first child album's cover
    pub fn cover_url(&self) -> Option<&str> {
        if !self.cover_image.is_empty() {
            return Some(&self.cover_image);
        }
        if let Some(first) = self.media.first() {
            return Some(&first.url);
        }
        self.albums.first().and_then(|child| child.cover_url())
    }

    pub fn media_count(&self) -> usize {
        self.media.len()
    }

    pub fn album_count(&self) -> usize {
        self.albums.len()
    }

    pub fn item_count(&self, mode: CountMode) -> usize {
        match mode {
            CountMode::MediaOnly => self.media_count(),
            CountMode::MediaAndAlbums => self.media_count() + self.album_count(),
        }
    }

    /// First album in this subtree (pre-order) that is locked but has no password hash
    pub fn find_locked_without_hash(&self) -> Option<&Album> {
        if self.is_locked && self.lock_hash().is_none() {
            return Some(self);
        }
        self.albums
            .iter()
            .find_map(|child| child.find_locked_without_hash())
    }

    /// Visits this album and all descendants in pre-order
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Album)) {
        f(self);
        for child in &self.albums {
            child.walk(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use claims::{assert_none, assert_ok, assert_some_eq};
    use pretty_assertions::assert_eq;

    use super::*;

    fn album(id: &str) -> Album {
        Album {
            id: id.into(),
            title: format!("Album {}", id),
            publisher_name: "Someone".to_owned(),
            publish_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            cover_image: String::new(),
            media: Vec::new(),
            albums: Vec::new(),
            is_locked: false,
            password_hash: None,
        }
    }

    fn media(id: &str, url: &str) -> MediaItem {
        MediaItem {
            id: id.into(),
            ty: MediaType::Image,
            url: url.to_owned(),
            filename: format!("{}.jpg", id),
        }
    }

    #[test]
    fn deserializes_wire_format_with_absent_fields() {
        let json = r#"{
            "id": "1",
            "title": "Holidays",
            "publisherName": "Ann",
            "publishDate": "2024-06-01",
            "coverImage": "",
            "media": [{"id": "m1", "type": "video", "url": "/uploads/a.mp4", "filename": "a.mp4"}]
        }"#;
        let album: Album = assert_ok!(serde_json::from_str(json));
        assert_eq!(album.id, AlbumId::from("1"));
        assert_eq!(album.media[0].ty, MediaType::Video);
        assert!(album.albums.is_empty());
        assert!(!album.is_locked);
        assert_none!(album.password_hash);
    }

    #[test]
    fn empty_children_are_omitted_on_serialization() {
        let value = serde_json::to_value(album("1")).unwrap();
        assert!(value.get("albums").is_none());
        assert_eq!(value["publishDate"], "2024-01-01");
        assert_eq!(value["publisherName"], "Someone");
        assert_eq!(value["isLocked"], false);
    }

    #[test]
    fn cover_falls_back_to_media_then_first_child() {
        let mut parent = album("p");
        let mut child = album("c");
        child.media.push(media("m2", "/uploads/child.jpg"));
        parent.albums.push(child);
        assert_some_eq!(parent.cover_url(), "/uploads/child.jpg");

        parent.media.push(media("m1", "/uploads/own.jpg"));
        assert_some_eq!(parent.cover_url(), "/uploads/own.jpg");

        parent.cover_image = "/uploads/cover.jpg".to_owned();
        assert_some_eq!(parent.cover_url(), "/uploads/cover.jpg");

        assert_none!(album("empty").cover_url());
    }

    #[test]
    fn lock_hash_requires_locked_and_non_empty() {
        let mut a = album("1");
        a.password_hash = Some("digest".to_owned());
        assert_none!(a.lock_hash());
        a.is_locked = true;
        assert_some_eq!(a.lock_hash(), "digest");
        a.password_hash = Some(String::new());
        assert_none!(a.lock_hash());
    }

    #[test]
    fn finds_nested_lock_violation() {
        let mut root = album("root");
        let mut broken = album("broken");
        broken.is_locked = true;
        root.albums.push(album("fine"));
        root.albums.push(broken);
        assert_eq!(
            root.find_locked_without_hash().map(|a| a.id.clone()),
            Some(AlbumId::from("broken"))
        );
    }

    #[test]
    fn item_count_depends_on_mode() {
        let mut a = album("1");
        a.media.push(media("m1", "/1.jpg"));
        a.albums.push(album("2"));
        a.albums.push(album("3"));
        assert_eq!(a.item_count(CountMode::MediaOnly), 1);
        assert_eq!(a.item_count(CountMode::MediaAndAlbums), 3);
    }
}
