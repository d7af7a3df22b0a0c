//! Where audio comes from.
//!
//! The pipeline only talks to [`MediaSource`]; [`YtDlp`] is the real
//! implementation and tests swap in a mock.

mod yt_dlp;

pub use yt_dlp::{find_yt_dlp, parse_progress, parse_search_output, YtDlp};

use crate::configuration::AudioSettings;
use crate::foundation::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

/// One flat search result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchEntry {
    pub id: String,
    pub title: String,
    pub url: String,
    pub duration: Option<f64>,
    pub view_count: Option<u64>,
    pub uploader: Option<String>,
    /// `YYYYMMDD`, as yt-dlp reports it.
    pub upload_date: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
}

impl SearchEntry {
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn upload_year(&self) -> Option<i32> {
        self.upload_date
            .as_deref()
            .and_then(|date| date.get(..4))
            .and_then(|year| year.parse().ok())
    }
}

/// Everything needed to fetch and convert one track.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    /// File name without extension; the extension comes from `audio.format`.
    pub stem: String,
    pub audio: AudioSettings,
}

impl DownloadRequest {
    pub fn expected_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.stem, self.audio.format))
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Returns at most `limit` entries for `query`.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchEntry>>;

    /// Downloads and converts the track, returning the path of the audio file.
    async fn download(&self, request: &DownloadRequest) -> Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_year() {
        let entry = SearchEntry {
            upload_date: Some("20190524".to_string()),
            ..SearchEntry::default()
        };
        assert_eq!(entry.upload_year(), Some(2019));
        assert_eq!(SearchEntry::default().upload_year(), None);

        let short = SearchEntry {
            upload_date: Some("20".to_string()),
            ..SearchEntry::default()
        };
        assert_eq!(short.upload_year(), None);
    }

    #[test]
    fn test_expected_path_uses_format_extension() {
        let request = DownloadRequest {
            url: "https://www.youtube.com/watch?v=abc".to_string(),
            output_dir: PathBuf::from("/music/Singles"),
            stem: "Lucid Dreams".to_string(),
            audio: AudioSettings::default(),
        };
        assert_eq!(
            request.expected_path(),
            PathBuf::from("/music/Singles/Lucid Dreams.mp3")
        );
    }
}
