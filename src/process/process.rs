//! The per-profile download loop.
//!
//! Items are processed one at a time. Nothing that goes wrong with a single
//! item stops the run; it is recorded as failed and the loop moves on.

use super::layout::{expected_path, file_stem, LibraryIndex};
use super::report::{ItemResult, Outcome, RunReport};
use crate::catalog::Candidate;
use crate::configuration::Profile;
use crate::foundation::database::{existing_download, store_download, DownloadRecord};
use crate::foundation::utils::create_progress_bar;
use crate::foundation::Error;
use crate::playlist::write_main_playlist;
use crate::source::{DownloadRequest, MediaSource};
use crate::tagging::{build_tags, ArtworkSource, Tagger};
use indicatif::{MultiProgress, ProgressDrawTarget};
use sled::Db;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct Pipeline<'a> {
    profile: &'a Profile,
    base: PathBuf,
    source: &'a dyn MediaSource,
    tagger: &'a dyn Tagger,
    artwork: &'a dyn ArtworkSource,
    history: Option<&'a Db>,
    progress: MultiProgress,
}

impl<'a> Pipeline<'a> {
    /// `base` is the profile's download directory.
    pub fn new(
        profile: &'a Profile,
        base: PathBuf,
        source: &'a dyn MediaSource,
        tagger: &'a dyn Tagger,
        artwork: &'a dyn ArtworkSource,
    ) -> Self {
        Self {
            profile,
            base,
            source,
            tagger,
            artwork,
            history: None,
            progress: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        }
    }

    /// Records downloads in, and consults, the persistent history.
    pub fn with_history(mut self, db: &'a Db) -> Self {
        self.history = Some(db);
        self
    }

    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run(&self, candidates: &[Candidate]) -> RunReport {
        let profile = self.profile;
        let mut report = RunReport::new(&profile.artist);
        let mut library = if profile.skip_existing {
            LibraryIndex::scan(&self.base)
        } else {
            LibraryIndex::default()
        };
        debug!("{} audio files already under {}", library.len(), self.base.display());

        let overall = create_progress_bar(&self.progress, candidates.len() as u64, "songs");

        for (index, candidate) in candidates.iter().enumerate() {
            overall.set_message(candidate.title().to_string());
            info!(
                "Processing {}/{}: {}",
                index + 1,
                candidates.len(),
                candidate.title()
            );

            let item = self.process_item(candidate, &mut library).await;
            let downloaded = item.outcome == Outcome::Downloaded;
            let success = item.is_success();
            report.record(item);
            overall.inc(1);

            if success
                && profile.playlist_flush_every > 0
                && report.succeeded % profile.playlist_flush_every == 0
            {
                if let Err(e) = write_main_playlist(&self.base, profile, &report.items) {
                    warn!("Failed to update playlist: {e}");
                }
            }

            let is_last = index + 1 == candidates.len();
            if downloaded && !is_last && profile.delay_between_downloads > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(profile.delay_between_downloads)).await;
            }
        }

        overall.finish_with_message(format!(
            "{}: {} ok, {} failed",
            profile.artist, report.succeeded, report.failed
        ));
        report.finish();
        report
    }

    async fn process_item(&self, candidate: &Candidate, library: &mut LibraryIndex) -> ItemResult {
        let profile = self.profile;
        let title = candidate.title();
        let target = expected_path(&self.base, profile, candidate);

        if profile.skip_existing {
            if let Some(existing) = self.find_existing(candidate, &target, library) {
                info!("Skipping existing: {title}");
                return ItemResult::skipped(candidate, existing);
            }
        }

        let request = DownloadRequest {
            url: candidate.url().to_string(),
            output_dir: target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.base.clone()),
            stem: file_stem(candidate),
            audio: profile.audio.clone(),
        };

        let (path, attempts) = match self.download_with_retry(&request, title).await {
            Ok(done) => done,
            Err((e, attempts)) => {
                error!("Failed to download {title} after {attempts} attempt(s): {e}");
                return ItemResult::failed(candidate, e.to_string(), attempts, None);
            }
        };
        library.insert(&path);

        if profile.embed_metadata {
            if let Err(e) = self.tag(candidate, &path).await {
                error!("Failed to tag {}: {e}", path.display());
                return ItemResult::failed(
                    candidate,
                    format!("tagging failed: {e}"),
                    attempts,
                    Some(path),
                );
            }
        }

        self.remember(candidate, &path);
        ItemResult::downloaded(candidate, path, attempts)
    }

    /// The expected file, a history entry whose file still exists, or an
    /// audio file with the same stem in the routed folder.
    fn find_existing(
        &self,
        candidate: &Candidate,
        target: &Path,
        library: &LibraryIndex,
    ) -> Option<PathBuf> {
        if target.exists() {
            return Some(target.to_path_buf());
        }

        if let Some(db) = self.history {
            match existing_download(db, &candidate.entry.id) {
                Ok(Some(path)) => return Some(PathBuf::from(path)),
                Ok(None) => {}
                Err(e) => warn!("History lookup failed for {}: {e}", candidate.title()),
            }
        }

        let folder = target.parent()?;
        let stem = target.file_stem()?.to_str()?;
        library.find(folder, stem).map(Path::to_path_buf)
    }

    /// Up to `max_retries` attempts; returns the file and the attempts used.
    async fn download_with_retry(
        &self,
        request: &DownloadRequest,
        title: &str,
    ) -> Result<(PathBuf, u32), (Error, u32)> {
        let max_attempts = self.profile.max_retries.max(1);
        let mut delay = self.profile.retry_delay;
        let mut attempt = 1;

        loop {
            debug!("Downloading (attempt {attempt}/{max_attempts}): {title}");
            match self.source.download(request).await {
                Ok(path) => return Ok((path, attempt)),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!("Attempt {attempt} failed for {title}: {e}");
                    if delay > 0.0 {
                        tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                    }
                    if self.profile.retry_backoff {
                        delay *= 2.0;
                    }
                    attempt += 1;
                }
                Err(e) => return Err((e, attempt)),
            }
        }
    }

    async fn tag(&self, candidate: &Candidate, path: &Path) -> crate::foundation::Result<()> {
        let cover = if self.profile.embed_thumbnail {
            match self.artwork.fetch(&candidate.entry).await {
                Ok(cover) => cover,
                Err(e) => {
                    warn!("No cover art for {}: {e}", candidate.title());
                    None
                }
            }
        } else {
            None
        };

        let tags = build_tags(self.profile, candidate);
        self.tagger.write_tags(path, &tags, cover).await
    }

    fn remember(&self, candidate: &Candidate, path: &Path) {
        let Some(db) = self.history else {
            return;
        };
        if candidate.entry.id.is_empty() {
            return;
        }

        let record = DownloadRecord {
            artist: self.profile.artist.clone(),
            title: candidate.title().to_string(),
            path: path.to_string_lossy().into_owned(),
            downloaded_at: chrono::Utc::now().timestamp(),
        };
        if let Err(e) = store_download(db, &candidate.entry.id, &record) {
            warn!("Failed to record {} in history: {e}", candidate.title());
        }
    }
}
