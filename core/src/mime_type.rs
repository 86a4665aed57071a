use std::borrow::Cow;

use crate::model::MediaType;

pub fn guess_mime_type(file_ext: &str) -> Option<Cow<'static, str>> {
    match file_ext {
        "mp4" | "m4v" => Some(Cow::Borrowed("video/mp4")),
        "mov" => Some(Cow::Borrowed("video/quicktime")),
        "webm" => Some(Cow::Borrowed("video/webm")),
        "mkv" => Some(Cow::Borrowed("video/x-matroska")),
        "avif" => Some(Cow::Borrowed("image/avif")),
        "webp" => Some(Cow::Borrowed("image/webp")),
        "jpg" | "jpeg" => Some(Cow::Borrowed("image/jpeg")),
        "png" => Some(Cow::Borrowed("image/png")),
        "gif" => Some(Cow::Borrowed("image/gif")),
        "heif" => Some(Cow::Borrowed("image/heif")),
        "heic" => Some(Cow::Borrowed("image/heic")),
        _ => None,
    }
}

pub fn guess_mime_type_path(path: &camino::Utf8Path) -> Option<Cow<'static, str>> {
    let ext = path.extension()?.to_ascii_lowercase();
    match guess_mime_type(&ext) {
        Some(m) => Some(m),
        None => {
            tracing::warn!(
                "can't guess MIME type for filename '{}'",
                &path
                    .file_name()
                    .map(|p| p.to_string())
                    .unwrap_or(String::new())
            );
            None
        }
    }
}

/// Only images and videos can be added to albums
pub fn media_type_of(mime: &str) -> Option<MediaType> {
    if mime.starts_with("image/") {
        Some(MediaType::Image)
    } else if mime.starts_with("video/") {
        Some(MediaType::Video)
    } else {
        None
    }
}

pub fn extension_for(mime: &str) -> Option<&'static str> {
    match mime {
        "video/mp4" => Some("mp4"),
        "video/quicktime" => Some("mov"),
        "video/webm" => Some("webm"),
        "video/x-matroska" => Some("mkv"),
        "image/avif" => Some("avif"),
        "image/webp" => Some("webp"),
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/heif" => Some("heif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use claims::{assert_none, assert_some_eq};

    use super::*;

    #[test]
    fn classifies_by_path() {
        let mime = guess_mime_type_path(camino::Utf8Path::new("/tmp/IMG_0001.JPG"));
        assert_some_eq!(mime.as_deref(), "image/jpeg");
        assert_none!(guess_mime_type_path(camino::Utf8Path::new("notes.txt")));
        assert_none!(guess_mime_type_path(camino::Utf8Path::new("no_extension")));
    }

    #[test]
    fn only_images_and_videos_are_media() {
        assert_some_eq!(media_type_of("image/png"), MediaType::Image);
        assert_some_eq!(media_type_of("video/webm"), MediaType::Video);
        assert_none!(media_type_of("application/pdf"));
    }
}
