//! Per-item results and the end-of-run summary.

use crate::catalog::Candidate;
use crate::configuration::Profile;
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{fs, io};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Downloaded,
    /// The file was already on disk.
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemResult {
    pub title: String,
    pub url: String,
    pub path: Option<PathBuf>,
    pub album: Option<String>,
    pub outcome: Outcome,
    pub error: Option<String>,
    pub attempts: u32,
}

impl ItemResult {
    pub fn downloaded(candidate: &Candidate, path: PathBuf, attempts: u32) -> Self {
        Self::new(candidate, Outcome::Downloaded, Some(path), None, attempts)
    }

    pub fn skipped(candidate: &Candidate, path: PathBuf) -> Self {
        Self::new(candidate, Outcome::Skipped, Some(path), None, 0)
    }

    /// `path` is set when the download worked but a later step did not.
    pub fn failed(
        candidate: &Candidate,
        error: String,
        attempts: u32,
        path: Option<PathBuf>,
    ) -> Self {
        Self::new(candidate, Outcome::Failed, path, Some(error), attempts)
    }

    fn new(
        candidate: &Candidate,
        outcome: Outcome,
        path: Option<PathBuf>,
        error: Option<String>,
        attempts: u32,
    ) -> Self {
        Self {
            title: candidate.title().to_string(),
            url: candidate.url().to_string(),
            path,
            album: candidate.album.clone(),
            outcome,
            error,
            attempts,
        }
    }

    /// Downloaded now or already present; these are what playlists list.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Downloaded | Outcome::Skipped)
    }
}

/// Counters for one profile run.
///
/// `succeeded + failed == attempted` always holds; skipped items count as
/// succeeded and are also tallied in `skipped`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub artist: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub by_album: BTreeMap<String, usize>,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    #[serde(skip)]
    pub items: Vec<ItemResult>,
}

impl RunReport {
    pub fn new(artist: &str) -> Self {
        Self {
            artist: artist.to_string(),
            attempted: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            by_album: BTreeMap::new(),
            started_at: Local::now(),
            finished_at: None,
            items: Vec::new(),
        }
    }

    pub fn record(&mut self, item: ItemResult) {
        self.attempted += 1;
        match item.outcome {
            Outcome::Downloaded => {
                self.succeeded += 1;
                if let Some(album) = &item.album {
                    *self.by_album.entry(album.clone()).or_insert(0) += 1;
                }
            }
            Outcome::Skipped => {
                self.succeeded += 1;
                self.skipped += 1;
            }
            Outcome::Failed => self.failed += 1,
        }
        self.items.push(item);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Local::now());
    }

    pub fn successes(&self) -> impl Iterator<Item = &ItemResult> {
        self.items.iter().filter(|item| item.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemResult> {
        self.items
            .iter()
            .filter(|item| item.outcome == Outcome::Failed)
    }

    /// Percentage of attempted items that succeeded; 0 when nothing was attempted.
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.attempted as f64 * 100.0
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    /// Writes the statistics file, including a summary of the profile used.
    pub fn write_stats(&self, path: &Path, profile: &Profile) -> io::Result<()> {
        let stats = json!({
            "artist": self.artist,
            "total_attempted": self.attempted,
            "successful": self.succeeded,
            "failed": self.failed,
            "skipped": self.skipped,
            "by_album": self.by_album,
            "start_time": self.started_at.to_rfc3339(),
            "end_time": self.finished_at.map(|end| end.to_rfc3339()),
            "duration": self.duration().map(format_duration),
            "success_rate": self.success_rate(),
            "failures": self.failures().map(|item| json!({
                "title": item.title,
                "url": item.url,
                "error": item.error,
                "attempts": item.attempts,
            })).collect::<Vec<_>>(),
            "config": {
                "artist": profile.artist,
                "max_songs": profile.max_songs,
                "quality": profile.audio.quality,
                "format": profile.audio.format,
                "bitrate": profile.audio.bitrate,
                "sample_rate": profile.audio.sample_rate,
                "organize_by_album": profile.organize_by_album,
                "skip_existing": profile.skip_existing,
            },
            "discography_info": {
                "albums": profile.albums.len(),
                "highlights": profile.highlights.len(),
                "singles": profile.singles.len(),
                "collaborations": profile.collaborations.len(),
            },
        });

        let content = serde_json::to_string_pretty(&stats)?;
        fs::write(path, content)
    }

    pub fn log_summary(&self, download_dir: &Path) {
        info!("{}", "=".repeat(60));
        info!("{} download complete", self.artist);
        info!("{}", "=".repeat(60));
        info!("Total attempted: {}", self.attempted);
        info!("Successful: {}", self.succeeded);
        info!("Failed: {}", self.failed);
        info!("Skipped: {}", self.skipped);
        if self.attempted > 0 {
            info!("Success rate: {:.1}%", self.success_rate());
        }
        if !self.by_album.is_empty() {
            info!("Downloads by album:");
            for (album, count) in &self.by_album {
                info!("  {album}: {count} tracks");
            }
        }
        if let Some(duration) = self.duration() {
            info!("Duration: {}", format_duration(duration));
        }
        info!("Download directory: {}", download_dir.display());
        info!("{}", "=".repeat(60));
    }
}

fn format_duration(duration: chrono::Duration) -> String {
    let seconds = duration.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        seconds % 3600 / 60,
        seconds % 60
    )
}
