//! Tag values for a downloaded track, and the seams that write them.

mod artwork;
mod lofty_tagger;

pub use artwork::{fallback_thumbnail_url, HttpArtwork};
pub use lofty_tagger::{read_tags, LoftyTagger};

use crate::catalog::Candidate;
use crate::configuration::{Profile, ReleaseKind};
use crate::foundation::utils::contains_ignore_case;
use crate::foundation::Result;
use crate::source::SearchEntry;
use async_trait::async_trait;
use std::path::Path;

pub const VIRAL_HIT_COMMENT: &str = "Viral Hit";
pub const POSTHUMOUS_COMMENT: &str = "Posthumous Release";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genre: String,
    pub year: Option<i32>,
    pub track_number: Option<u32>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverArt {
    pub data: Vec<u8>,
    /// Value of the response's content type, e.g. `image/jpeg`.
    pub mime_type: String,
}

/// Derives the tags for a candidate from the profile's discography.
///
/// The album year wins over the upload year. The comment is the first of:
/// "Viral Hit" for highlights, the first matching comment rule, "Posthumous
/// Release" for posthumous albums, then the profile default. A location is
/// appended as `Location: …`.
pub fn build_tags(profile: &Profile, candidate: &Candidate) -> TrackTags {
    let title = candidate.title();
    let album = candidate
        .album
        .as_deref()
        .and_then(|name| profile.album(name));

    let track_number = album.and_then(|album| {
        album
            .tracks
            .iter()
            .position(|track| contains_ignore_case(title, track))
            .map(|index| index as u32 + 1)
    });

    let comment = if profile.is_highlight(title) {
        Some(VIRAL_HIT_COMMENT.to_string())
    } else if let Some(rule) = profile
        .comments
        .iter()
        .find(|rule| rule.when.matches(profile, title))
    {
        Some(rule.comment.clone())
    } else if album.map(|a| a.kind) == Some(ReleaseKind::Posthumous) {
        Some(POSTHUMOUS_COMMENT.to_string())
    } else {
        profile.default_comment.clone()
    };

    let comment = match (comment, profile.location.as_deref()) {
        (Some(comment), Some(location)) => Some(format!("{comment}\nLocation: {location}")),
        (None, Some(location)) => Some(format!("Location: {location}")),
        (comment, None) => comment,
    };

    TrackTags {
        title: title.to_string(),
        artist: profile.artist.clone(),
        album: candidate.album.clone(),
        album_artist: candidate.album.as_ref().map(|_| profile.artist.clone()),
        genre: profile.genre.clone(),
        year: album
            .and_then(|album| album.year)
            .or_else(|| candidate.entry.upload_year()),
        track_number,
        comment,
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Tagger: Send + Sync {
    /// Writes `tags` (and `cover`, when given) into the audio file at `path`.
    async fn write_tags(
        &self,
        path: &Path,
        tags: &TrackTags,
        cover: Option<CoverArt>,
    ) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtworkSource: Send + Sync {
    /// Fetches cover art for an entry; `Ok(None)` when it has none.
    async fn fetch(&self, entry: &SearchEntry) -> Result<Option<CoverArt>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::parse_profile_str;

    fn juice() -> Profile {
        parse_profile_str(
            r#"
artist: Juice WRLD
genre: Hip-Hop/Emo Rap
location: Chicago, Illinois
highlights: [Lucid Dreams]
albums:
  - name: Legends Never Die
    kind: posthumous
    year: 2020
    tracks: [Anxiety, Conversations, Titanic, Bad Energy, Righteous]
  - name: Goodbye & Good Riddance
    year: 2018
    tracks: [Intro, Lucid Dreams]
comments:
  - comment: Emotional Content
    when: { keywords: [sad, heartbreak] }
"#,
        )
        .unwrap()
    }

    fn candidate(title: &str, album: Option<&str>, upload_date: Option<&str>) -> Candidate {
        Candidate {
            entry: SearchEntry {
                title: title.to_string(),
                upload_date: upload_date.map(str::to_string),
                ..SearchEntry::default()
            },
            album: album.map(str::to_string),
        }
    }

    #[test]
    fn test_album_track_tags() {
        let tags = build_tags(
            &juice(),
            &candidate("Juice WRLD - Righteous (Official Video)", Some("Legends Never Die"), Some("20200424")),
        );

        assert_eq!(tags.artist, "Juice WRLD");
        assert_eq!(tags.album.as_deref(), Some("Legends Never Die"));
        assert_eq!(tags.album_artist.as_deref(), Some("Juice WRLD"));
        assert_eq!(tags.genre, "Hip-Hop/Emo Rap");
        assert_eq!(tags.year, Some(2020));
        assert_eq!(tags.track_number, Some(5));
        assert_eq!(
            tags.comment.as_deref(),
            Some("Posthumous Release\nLocation: Chicago, Illinois")
        );
    }

    #[test]
    fn test_comment_precedence() {
        let profile = juice();

        let viral = build_tags(&profile, &candidate("Lucid Dreams (sad edit)", Some("Legends Never Die"), None));
        assert!(viral.comment.unwrap().starts_with("Viral Hit\n"));

        let rule = build_tags(&profile, &candidate("Sad Juice WRLD mix", Some("Legends Never Die"), None));
        assert!(rule.comment.unwrap().starts_with("Emotional Content\n"));

        let plain = build_tags(&profile, &candidate("Wishing Well", None, None));
        assert_eq!(plain.comment.as_deref(), Some("Location: Chicago, Illinois"));
    }

    #[test]
    fn test_single_without_album_uses_upload_year() {
        let mut profile = juice();
        profile.location = None;
        profile.default_comment = Some("Underground/Independent Artist".to_string());

        let tags = build_tags(&profile, &candidate("Wishing Well", None, Some("20200612")));

        assert_eq!(tags.album, None);
        assert_eq!(tags.album_artist, None);
        assert_eq!(tags.year, Some(2020));
        assert_eq!(tags.track_number, None);
        assert_eq!(tags.comment.as_deref(), Some("Underground/Independent Artist"));
    }

    #[test]
    fn test_unknown_album_name_keeps_album_tag() {
        let tags = build_tags(&juice(), &candidate("Song", Some("Not In Profile"), Some("2019")));

        assert_eq!(tags.album.as_deref(), Some("Not In Profile"));
        assert_eq!(tags.year, Some(2019));
        assert_eq!(tags.track_number, None);
    }
}
