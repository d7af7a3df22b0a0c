//! Playlists built from the successful items of a run.
//!
//! The main playlist sits in the download directory and lists every track by
//! its path relative to that directory. Album playlists sit inside their
//! album folder and list bare file names. Themed playlists are written only
//! when their matcher selects at least one track.

mod m3u;

pub use m3u::{render_playlist, write_playlist, M3uEntry};

use crate::configuration::Profile;
use crate::process::{album_folder, ItemResult};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Rewrites the main playlist. Called periodically during a run and once at the end.
pub fn write_main_playlist(
    base: &Path,
    profile: &Profile,
    items: &[ItemResult],
) -> io::Result<PathBuf> {
    let path = base.join(profile.playlist_file_name());
    let entries = relative_entries(base, items.iter());

    write_playlist(
        &path,
        &format!("{} Complete Discography", profile.artist),
        Some(&profile.genre),
        &entries,
    )?;
    debug!("Wrote {} ({} entries)", path.display(), entries.len());
    Ok(path)
}

/// Writes the main, album and themed playlists, returning the files written.
pub fn write_playlists(
    base: &Path,
    profile: &Profile,
    items: &[ItemResult],
) -> io::Result<Vec<PathBuf>> {
    let mut written = vec![write_main_playlist(base, profile, items)?];

    if profile.organize_by_album {
        for album in &profile.albums {
            let Some(folder) = album_folder(&album.name) else {
                continue;
            };
            let album_dir = base.join(&folder);

            let entries: Vec<M3uEntry> = successes(items)
                .filter(|item| item.album.as_deref() == Some(album.name.as_str()))
                .filter_map(|item| {
                    let path = item.path.as_deref()?;
                    if path.parent() != Some(album_dir.as_path()) {
                        return None;
                    }
                    Some(M3uEntry {
                        title: item.title.clone(),
                        location: path.file_name()?.to_string_lossy().into_owned(),
                    })
                })
                .collect();

            if entries.is_empty() {
                continue;
            }

            let path = album_dir.join(format!("{folder}.m3u"));
            write_playlist(
                &path,
                &format!("{} by {}", album.name, profile.artist),
                None,
                &entries,
            )?;
            written.push(path);
        }
    }

    for rule in &profile.playlists {
        let entries = relative_entries(
            base,
            items
                .iter()
                .filter(|item| rule.when.matches(profile, &item.title)),
        );
        if entries.is_empty() {
            continue;
        }

        let path = base.join(&rule.file);
        write_playlist(&path, &rule.title, None, &entries)?;
        written.push(path);
    }

    Ok(written)
}

fn successes<'a>(
    items: impl IntoIterator<Item = &'a ItemResult>,
) -> impl Iterator<Item = &'a ItemResult> {
    items.into_iter().filter(|item| item.is_success())
}

fn relative_entries<'a>(
    base: &Path,
    items: impl IntoIterator<Item = &'a ItemResult>,
) -> Vec<M3uEntry> {
    successes(items)
        .filter_map(|item| {
            let path = item.path.as_deref()?;
            let relative = path.strip_prefix(base).unwrap_or(path);
            Some(M3uEntry {
                title: item.title.clone(),
                location: relative.to_string_lossy().into_owned(),
            })
        })
        .collect()
}
