/// # The Main Entry Points
///
/// `run` drives one or more artist profiles end to end:
/// 1. Loads the settings and the selected profiles
/// 2. Opens the download history
/// 3. Searches the catalog for each profile
/// 4. Downloads, tags and files every candidate
/// 5. Writes playlists and statistics, then logs a summary
///
use crate::catalog::search_catalog;
use crate::configuration::{self, ConfigFolder, Profile};
use crate::foundation::database::{list_downloads, open_database};
use crate::foundation::logging::init_logging;
use crate::playlist::write_playlists;
use crate::process::{expected_path, prepare_directories, route, Pipeline};
use crate::source::YtDlp;
use crate::tagging::{HttpArtwork, LoftyTagger};
use anyhow::{bail, Context};
use chrono::{DateTime, Local};
use indicatif::MultiProgress;
use sled::Db;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// Statistics file written into each download directory.
pub const STATS_FILE: &str = "download_stats.json";

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub profiles: Vec<String>,
    pub all: bool,
    pub max_songs: Option<usize>,
    /// Search and print the plan without downloading anything.
    pub dry_run: bool,
}

pub async fn run(cfg_folder: ConfigFolder, options: RunOptions) -> anyhow::Result<()> {
    let settings = configuration::get_configuration(&cfg_folder.config_file)
        .context("Unable to parse configuration file")?;
    init_logging(&cfg_folder.log_file, &settings.log_level)
        .context("Unable to initialise logging")?;

    let profiles = select_profiles(&cfg_folder, &options)?;

    let progress = MultiProgress::new();
    let source = YtDlp::discover(settings.yt_dlp_path.as_deref(), progress.clone())?;
    let tagger = LoftyTagger;
    let artwork = HttpArtwork::default();

    let db = if options.dry_run {
        None
    } else {
        fs::create_dir_all(&cfg_folder.config_dir)?;
        let db_path = cfg_folder
            .history_db
            .to_str()
            .context("Failed to convert the database path to a string")?;
        Some(open_database(db_path)?)
    };

    for profile in &profiles {
        let base = settings.music_root().join(profile.download_dir_name());
        let result = run_profile(RunContext {
            profile,
            base: &base,
            source: &source,
            tagger: &tagger,
            artwork: &artwork,
            db: db.as_ref(),
            progress: &progress,
            dry_run: options.dry_run,
        })
        .await;

        if let Err(e) = result {
            error!("{} failed: {e:#}", profile.artist);
        }
    }

    if let Some(db) = db {
        db.flush_async().await?;
    }
    Ok(())
}

struct RunContext<'a> {
    profile: &'a Profile,
    base: &'a Path,
    source: &'a YtDlp,
    tagger: &'a LoftyTagger,
    artwork: &'a HttpArtwork,
    db: Option<&'a Db>,
    progress: &'a MultiProgress,
    dry_run: bool,
}

async fn run_profile(ctx: RunContext<'_>) -> anyhow::Result<()> {
    let profile = ctx.profile;
    info!("Starting {} downloader", profile.artist);

    let candidates = search_catalog(ctx.source, profile).await;
    if candidates.is_empty() {
        warn!("No songs found for {}", profile.artist);
        return Ok(());
    }

    if ctx.dry_run {
        println!(
            "\x1b[1m\x1b[34m{}: {} songs would be processed\x1b[0m",
            profile.artist,
            candidates.len()
        );
        for candidate in &candidates {
            let path = expected_path(ctx.base, profile, candidate);
            let exists = if path.exists() { " (exists)" } else { "" };
            println!(
                "  {} [{}]{exists}\n    -> {}",
                candidate.title(),
                route(profile, candidate).display(),
                path.display()
            );
        }
        return Ok(());
    }

    prepare_directories(ctx.base, profile)
        .with_context(|| format!("Failed to create {}", ctx.base.display()))?;

    let mut pipeline = Pipeline::new(
        profile,
        ctx.base.to_path_buf(),
        ctx.source,
        ctx.tagger,
        ctx.artwork,
    )
    .with_progress(ctx.progress.clone());
    if let Some(db) = ctx.db {
        pipeline = pipeline.with_history(db);
    }

    let report = pipeline.run(&candidates).await;

    match write_playlists(ctx.base, profile, &report.items) {
        Ok(written) => info!("Wrote {} playlist(s)", written.len()),
        Err(e) => error!("Failed to write playlists: {e}"),
    }
    if let Err(e) = report.write_stats(&ctx.base.join(STATS_FILE), profile) {
        error!("Failed to write statistics: {e}");
    }
    report.log_summary(ctx.base);

    Ok(())
}

/// Loads the profiles named on the command line, or every available one with
/// `--all`, applying command-line overrides.
pub fn select_profiles(cfg_folder: &ConfigFolder, options: &RunOptions) -> anyhow::Result<Vec<Profile>> {
    let names = if options.all {
        configuration::available_profiles(cfg_folder)
    } else {
        options.profiles.clone()
    };

    if names.is_empty() {
        bail!("No profile selected. Use -p <PROFILE> or --all (see 'catalogdl profiles')");
    }

    names
        .iter()
        .map(|name| -> anyhow::Result<Profile> {
            let mut profile = configuration::load_profile(cfg_folder, name)
                .with_context(|| format!("Unable to load profile '{name}'"))?;
            if let Some(max_songs) = options.max_songs {
                profile.max_songs = max_songs;
            }
            Ok(profile)
        })
        .collect()
}

pub fn list_profiles(cfg_folder: &ConfigFolder) -> anyhow::Result<()> {
    println!("\x1b[1m\x1b[34mAvailable profiles:\x1b[0m");
    for name in configuration::available_profiles(cfg_folder) {
        match configuration::load_profile(cfg_folder, &name) {
            Ok(profile) => println!(
                "  \x1b[1m\x1b[32m{name:<12}\x1b[0m {} ({} albums, up to {} songs)",
                profile.artist,
                profile.albums.len(),
                profile.max_songs
            ),
            Err(e) => println!("  \x1b[31m{name:<12} invalid: {e}\x1b[0m"),
        }
    }
    Ok(())
}

/// Prints recorded downloads, optionally for one profile or artist name.
pub fn show_history(cfg_folder: &ConfigFolder, profile: Option<&str>) -> anyhow::Result<()> {
    if !cfg_folder.history_db.exists() {
        println!("\x1b[33mNo downloads recorded yet.\x1b[0m");
        return Ok(());
    }

    let db_path = cfg_folder
        .history_db
        .to_str()
        .context("Failed to convert the database path to a string")?;
    let db = open_database(db_path)?;

    let artist = profile.map(|name| {
        configuration::load_profile(cfg_folder, name)
            .map(|profile| profile.artist)
            .unwrap_or_else(|_| name.to_string())
    });

    let records = list_downloads(&db, artist.as_deref())?;
    if records.is_empty() {
        println!("\x1b[33mNo downloads recorded.\x1b[0m");
        return Ok(());
    }

    for (video_id, record) in &records {
        let when = DateTime::from_timestamp(record.downloaded_at, 0)
            .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{when}  \x1b[1m{}\x1b[0m - {} [{video_id}]\n    {}",
            record.artist, record.title, record.path
        );
    }
    println!("\x1b[32m{} download(s)\x1b[0m", records.len());
    Ok(())
}
