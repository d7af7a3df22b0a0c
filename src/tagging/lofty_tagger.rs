//! Tag writing with lofty.

use super::{CoverArt, Tagger, TrackTags};
use crate::foundation::{Error, Result};
use async_trait::async_trait;
use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use std::path::Path;
use tracing::debug;

/// Writes the file type's primary tag (ID3v2 for mp3, Vorbis comments for
/// opus/flac, ilst for m4a).
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagger;

#[async_trait]
impl Tagger for LoftyTagger {
    async fn write_tags(
        &self,
        path: &Path,
        tags: &TrackTags,
        cover: Option<CoverArt>,
    ) -> Result<()> {
        let path = path.to_path_buf();
        let tags = tags.clone();

        tokio::task::spawn_blocking(move || write_tags_blocking(&path, &tags, cover))
            .await
            .map_err(|e| Error::Tagging(format!("tagging task failed: {e}")))?
    }
}

fn write_tags_blocking(path: &Path, tags: &TrackTags, cover: Option<CoverArt>) -> Result<()> {
    let tagged_file = Probe::open(path)?.read()?;

    let mut tag = tagged_file
        .primary_tag()
        .cloned()
        .unwrap_or_else(|| Tag::new(tagged_file.primary_tag_type()));

    tag.insert_text(ItemKey::TrackTitle, tags.title.clone());
    tag.insert_text(ItemKey::TrackArtist, tags.artist.clone());
    tag.insert_text(ItemKey::Genre, tags.genre.clone());

    if let Some(album) = &tags.album {
        tag.insert_text(ItemKey::AlbumTitle, album.clone());
    }
    if let Some(album_artist) = &tags.album_artist {
        tag.insert_text(ItemKey::AlbumArtist, album_artist.clone());
    }
    if let Some(year) = tags.year {
        tag.insert_text(ItemKey::RecordingDate, year.to_string());
    }
    if let Some(track) = tags.track_number {
        tag.set_track(track);
    }
    if let Some(comment) = &tags.comment {
        tag.insert_text(ItemKey::Comment, comment.clone());
    }

    if let Some(cover) = cover {
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(guess_mime_type(&cover.mime_type)),
            None,
            cover.data,
        ));
    }

    tag.save_to_path(path, WriteOptions::default())?;
    debug!("Tagged {}", path.display());
    Ok(())
}

/// Reads back the primary tag, e.g. to check what a previous run wrote.
pub fn read_tags(path: &Path) -> Result<(TrackTags, bool)> {
    let tagged_file = Probe::open(path)?.read()?;
    let tag = tagged_file
        .primary_tag()
        .ok_or_else(|| Error::Tagging(format!("no tag in {}", path.display())))?;

    let text = |key: ItemKey| tag.get_string(&key).map(str::to_string);

    let tags = TrackTags {
        title: text(ItemKey::TrackTitle).unwrap_or_default(),
        artist: text(ItemKey::TrackArtist).unwrap_or_default(),
        album: text(ItemKey::AlbumTitle),
        album_artist: text(ItemKey::AlbumArtist),
        genre: text(ItemKey::Genre).unwrap_or_default(),
        year: text(ItemKey::RecordingDate).and_then(|year| year.get(..4)?.parse().ok()),
        track_number: tag.track(),
        comment: text(ItemKey::Comment),
    };

    Ok((tags, !tag.pictures().is_empty()))
}

fn guess_mime_type(content_type: &str) -> MimeType {
    if content_type.contains("png") {
        MimeType::Png
    } else if content_type.contains("gif") {
        MimeType::Gif
    } else if content_type.contains("bmp") {
        MimeType::Bmp
    } else if content_type.contains("tiff") {
        MimeType::Tiff
    } else {
        MimeType::Jpeg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A few silent MPEG-1 Layer III frames (128 kbps, 44.1 kHz).
    fn silent_mp3() -> Vec<u8> {
        let mut frame = vec![0u8; 417];
        frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
        frame.repeat(8)
    }

    fn tags() -> TrackTags {
        TrackTags {
            title: "Lucid Dreams".to_string(),
            artist: "Juice WRLD".to_string(),
            album: Some("Goodbye & Good Riddance".to_string()),
            album_artist: Some("Juice WRLD".to_string()),
            genre: "Hip-Hop/Emo Rap".to_string(),
            year: Some(2018),
            track_number: Some(2),
            comment: Some("Viral Hit".to_string()),
        }
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("image/jpeg"), MimeType::Jpeg);
        assert_eq!(guess_mime_type("image/png"), MimeType::Png);
        assert_eq!(guess_mime_type("application/octet-stream"), MimeType::Jpeg);
    }

    #[tokio::test]
    async fn test_write_tags_rejects_non_audio() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        std::fs::write(&path, "definitely not audio").unwrap();

        let result = LoftyTagger.write_tags(&path, &tags(), None).await;
        assert!(matches!(result, Err(Error::Tagging(_))));
    }

    #[tokio::test]
    async fn test_write_then_read_tags() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Lucid Dreams.mp3");
        std::fs::write(&path, silent_mp3()).unwrap();

        let cover = CoverArt {
            data: vec![0xFF, 0xD8, 0xFF, 0xE0],
            mime_type: "image/jpeg".to_string(),
        };

        LoftyTagger
            .write_tags(&path, &tags(), Some(cover))
            .await
            .unwrap();

        let (read, has_picture) = read_tags(&path).unwrap();
        assert_eq!(read.title, "Lucid Dreams");
        assert_eq!(read.album.as_deref(), Some("Goodbye & Good Riddance"));
        assert_eq!(read.track_number, Some(2));
        assert_eq!(read.year, Some(2018));
        assert_eq!(read.comment.as_deref(), Some("Viral Hit"));
        assert!(has_picture);

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.windows(4).any(|frame| frame == b"TDRC"));
    }
}
