//! yt-dlp as a [`MediaSource`].
//!
//! Searches run `--flat-playlist --dump-single-json` and parse the JSON;
//! downloads run with `--newline` so every progress update arrives as its own
//! stdout line and can drive a progress bar.

use super::{DownloadRequest, MediaSource, SearchEntry};
use crate::foundation::utils::create_progress_bar;
use crate::foundation::{Error, Result};
use async_trait::async_trait;
use indicatif::MultiProgress;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Extensions yt-dlp leaves behind while a download is still in flight.
const PARTIAL_EXTENSIONS: [&str; 4] = ["part", "ytdl", "temp", "tmp"];

pub struct YtDlp {
    binary: PathBuf,
    progress: MultiProgress,
}

impl YtDlp {
    pub fn new(binary: PathBuf, progress: MultiProgress) -> Self {
        Self { binary, progress }
    }

    /// Locates the binary with [`find_yt_dlp`] and fails when there is none.
    pub fn discover(configured: Option<&str>, progress: MultiProgress) -> Result<Self> {
        let binary = find_yt_dlp(configured).ok_or_else(|| {
            Error::Configuration(
                "yt-dlp not found. Install it, set YT_DLP_PATH or yt_dlp_path in config.yaml"
                    .to_string(),
            )
        })?;
        debug!("Using yt-dlp at {}", binary.display());
        Ok(Self::new(binary, progress))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn spawn_error(&self, source: std::io::Error) -> Error {
        Error::Spawn {
            program: self.binary.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl MediaSource for YtDlp {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        debug!("Searching '{query}' (limit {limit})");

        let output = Command::new(&self.binary)
            .args(search_args(query, limit))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            warn!(
                "yt-dlp search for '{query}' failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(Error::ExitStatus(output.status.code()));
        }

        parse_search_output(&output.stdout)
    }

    async fn download(&self, request: &DownloadRequest) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&request.output_dir).await?;

        let mut child = Command::new(&self.binary)
            .args(download_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let bar = create_progress_bar(&self.progress, 100, "%");
        bar.set_message(request.stem.clone());

        // Keep the last stderr line; it usually names the reason for a failure.
        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut last = String::new();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("yt-dlp stderr: {line}");
                    last = line;
                }
                last
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(percent) = parse_progress(&line) {
                    bar.set_position(percent.round() as u64);
                } else if line.starts_with("[ExtractAudio]") {
                    bar.set_message(format!("{} (converting)", request.stem));
                }
            }
        }

        let status = child.wait().await?;
        let last_error = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            bar.abandon_with_message(format!("Failed: {}", request.stem));
            if !last_error.is_empty() {
                warn!("yt-dlp: {last_error}");
            }
            return Err(Error::ExitStatus(status.code()));
        }
        bar.finish_and_clear();

        let path = find_output(&request.output_dir, &request.stem, &request.audio.format).await?;
        info!("Downloaded {}", path.display());
        Ok(path)
    }
}

fn search_args(query: &str, limit: usize) -> Vec<String> {
    vec![
        "--flat-playlist".to_string(),
        "--dump-single-json".to_string(),
        "--no-warnings".to_string(),
        format!("ytsearch{limit}:{query}"),
    ]
}

fn download_args(request: &DownloadRequest) -> Vec<String> {
    // `%` starts an output-template field, so literal ones are doubled.
    let template = request
        .output_dir
        .join(format!("{}.%(ext)s", request.stem.replace('%', "%%")));

    vec![
        "-f".to_string(),
        request.audio.quality.clone(),
        "-x".to_string(),
        "--audio-format".to_string(),
        request.audio.format.clone(),
        "--audio-quality".to_string(),
        format!("{}K", request.audio.bitrate),
        "--postprocessor-args".to_string(),
        format!("ffmpeg:-ar {}", request.audio.sample_rate),
        "--no-playlist".to_string(),
        "--newline".to_string(),
        "--no-warnings".to_string(),
        "-o".to_string(),
        template.to_string_lossy().into_owned(),
        request.url.clone(),
    ]
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    entries: Vec<RawEntry>,
}

#[derive(Deserialize)]
struct RawEntry {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    duration: Option<f64>,
    view_count: Option<u64>,
    uploader: Option<String>,
    channel: Option<String>,
    upload_date: Option<String>,
    description: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

impl From<RawEntry> for SearchEntry {
    fn from(raw: RawEntry) -> Self {
        let id = raw.id.unwrap_or_default();
        let url = raw
            .webpage_url
            .or(raw.url)
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| {
                if id.is_empty() {
                    String::new()
                } else {
                    format!("https://www.youtube.com/watch?v={id}")
                }
            });
        // Flat results list thumbnails smallest first.
        let thumbnail = raw
            .thumbnail
            .or_else(|| raw.thumbnails.into_iter().last().map(|thumb| thumb.url));

        SearchEntry {
            id,
            title: raw.title.unwrap_or_default(),
            url,
            duration: raw.duration,
            view_count: raw.view_count,
            uploader: raw.uploader.or(raw.channel),
            upload_date: raw.upload_date,
            description: raw.description,
            thumbnail,
        }
    }
}

/// Parses the single JSON document printed by `--dump-single-json`.
pub fn parse_search_output(stdout: &[u8]) -> Result<Vec<SearchEntry>> {
    let response: SearchResponse = serde_json::from_slice(stdout)?;
    Ok(response.entries.into_iter().map(SearchEntry::from).collect())
}

/// Extracts the percentage from a `[download]  45.3% of ...` line.
pub fn parse_progress(line: &str) -> Option<f64> {
    static PROGRESS: OnceLock<Regex> = OnceLock::new();
    let re = PROGRESS.get_or_init(|| Regex::new(r"^\[download\]\s+(\d+(?:\.\d+)?)%").unwrap());

    re.captures(line)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Finds the converted file for `stem`, preferring the requested extension.
async fn find_output(output_dir: &Path, stem: &str, format: &str) -> Result<PathBuf> {
    let expected = output_dir.join(format!("{stem}.{format}"));
    if tokio::fs::try_exists(&expected).await? {
        return Ok(expected);
    }

    let mut entries = tokio::fs::read_dir(output_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let same_stem = path.file_stem().and_then(|n| n.to_str()) == Some(stem);
        let partial = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| PARTIAL_EXTENSIONS.contains(&ext))
            .unwrap_or(false);

        if same_stem && !partial {
            return Ok(path);
        }
    }

    Err(Error::MissingOutput(stem.to_string()))
}

/// Finds a yt-dlp binary.
///
/// Searches in order:
/// 1. the configured path
/// 2. `YT_DLP_PATH`
/// 3. beside the current executable
/// 4. `PATH`
pub fn find_yt_dlp(configured: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = configured.map(PathBuf::from).filter(|p| p.exists()) {
        return Some(path);
    }

    if let Some(path) = env::var_os("YT_DLP_PATH")
        .map(PathBuf::from)
        .filter(|p| p.exists())
    {
        return Some(path);
    }

    if let Some(dir) = env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
        if let Some(found) = first_binary_in(&dir) {
            return Some(found);
        }
    }

    env::var_os("PATH").and_then(|path| env::split_paths(&path).find_map(|dir| first_binary_in(&dir)))
}

fn first_binary_in(dir: &Path) -> Option<PathBuf> {
    yt_dlp_binary_names()
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

fn yt_dlp_binary_names() -> &'static [&'static str] {
    #[cfg(windows)]
    return &["yt-dlp.exe", "yt-dlp"];

    #[cfg(not(windows))]
    return &["yt-dlp", "yt-dlp_macos", "yt-dlp_linux"];
}
