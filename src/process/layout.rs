//! Where each track lands on disk.
//!
//! Folder choice follows the profile's routing rules; the library scan walks an
//! existing download directory in parallel so a track already saved in its
//! folder under another audio format or letter case is recognised as present.

use crate::catalog::Candidate;
use crate::configuration::Profile;
use crate::foundation::utils::clean_filename;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::{fs, io};
use walkdir::WalkDir;

/// Supported audio file extensions.
const AUDIO_EXTENSIONS: [&str; 7] = ["mp3", "flac", "wav", "m4a", "opus", "ogg", "aac"];

/// Folder for known singles that match no other rule.
pub const SINGLES_FOLDER: &str = "Singles";

/// Folder for a candidate, relative to the profile's download directory.
///
/// An empty path means the download directory itself. With `organize_by_album`
/// on, the first matching route wins, then the album, then `Singles` for a
/// known single.
pub fn route(profile: &Profile, candidate: &Candidate) -> PathBuf {
    if !profile.organize_by_album {
        return PathBuf::new();
    }

    let title = candidate.title();
    if let Some(rule) = profile
        .routes
        .iter()
        .find(|rule| rule.when.matches(profile, title))
    {
        return PathBuf::from(&rule.folder);
    }

    if let Some(folder) = candidate.album.as_deref().and_then(album_folder) {
        return PathBuf::from(folder);
    }

    if profile.is_known_single(title) {
        return PathBuf::from(SINGLES_FOLDER);
    }

    PathBuf::new()
}

/// Directory name for an album, or `None` when nothing printable is left.
pub fn album_folder(album: &str) -> Option<String> {
    let folder = clean_filename(album);
    (!folder.is_empty()).then_some(folder)
}

/// File name without extension for a candidate.
///
/// Falls back to the video id when the cleaned title is empty.
pub fn file_stem(candidate: &Candidate) -> String {
    let cleaned = clean_filename(candidate.title());
    if !cleaned.is_empty() {
        cleaned
    } else if !candidate.entry.id.is_empty() {
        candidate.entry.id.clone()
    } else {
        "untitled".to_string()
    }
}

/// Full path the converted file will have.
pub fn expected_path(base: &Path, profile: &Profile, candidate: &Candidate) -> PathBuf {
    base.join(route(profile, candidate))
        .join(format!("{}.{}", file_stem(candidate), profile.audio.format))
}

/// Creates the download directory and, when organising by album, every folder
/// a track could be routed to.
pub fn prepare_directories(base: &Path, profile: &Profile) -> io::Result<()> {
    fs::create_dir_all(base)?;

    if !profile.organize_by_album {
        return Ok(());
    }

    let folders = profile
        .albums
        .iter()
        .filter_map(|album| album_folder(&album.name))
        .chain(profile.routes.iter().map(|rule| rule.folder.clone()))
        .chain(std::iter::once(SINGLES_FOLDER.to_string()));

    for folder in folders {
        fs::create_dir_all(base.join(folder))?;
    }
    Ok(())
}

/// Audio files already under a download directory, keyed by folder and
/// lowercased file stem.
#[derive(Debug, Default)]
pub struct LibraryIndex {
    files: HashMap<(PathBuf, String), PathBuf>,
}

impl LibraryIndex {
    /// Walks `root` in parallel. A missing root yields an empty index.
    pub fn scan(root: &Path) -> Self {
        if !root.is_dir() {
            return Self::default();
        }

        let files = WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .par_bridge()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && is_audio_file(entry.path()))
            .filter_map(|entry| {
                let key = library_key(entry.path())?;
                Some((key, entry.into_path()))
            })
            .collect();

        Self { files }
    }

    /// An audio file in `folder` whose stem matches `stem`, ignoring case and
    /// extension. Files of the same name in other folders never match.
    pub fn find(&self, folder: &Path, stem: &str) -> Option<&Path> {
        self.files
            .get(&(folder.to_path_buf(), stem.to_lowercase()))
            .map(PathBuf::as_path)
    }

    pub fn insert(&mut self, path: &Path) {
        if let Some(key) = library_key(path) {
            self.files.insert(key, path.to_path_buf());
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn library_key(path: &Path) -> Option<(PathBuf, String)> {
    let folder = path.parent()?.to_path_buf();
    let stem = path.file_stem()?.to_str()?.to_lowercase();
    Some((folder, stem))
}

/// Check if a file is an audio file based on its extension.
fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::parse_profile_str;
    use crate::source::SearchEntry;
    use std::fs::File;
    use tempfile::TempDir;

    fn profile() -> Profile {
        parse_profile_str(
            r#"
artist: Juice WRLD
singles: [Lucid Dreams, Bandit]
collaborations:
  - { artist: Marshmello, track: Come and Go }
albums:
  - name: "Goodbye & Good Riddance"
  - name: "Legends Never Die"
routes:
  - folder: Collaborations
    when: { collaborations: true }
  - folder: Tributes
    when: { keywords: [tribute, rip] }
"#,
        )
        .unwrap()
    }

    fn candidate(title: &str, album: Option<&str>) -> Candidate {
        Candidate {
            entry: SearchEntry {
                id: "vid".to_string(),
                title: title.to_string(),
                ..SearchEntry::default()
            },
            album: album.map(str::to_string),
        }
    }

    #[test]
    fn test_route_precedence() {
        let profile = profile();

        let collab = candidate("Marshmello & Juice WRLD - Come and Go", Some("Legends Never Die"));
        assert_eq!(route(&profile, &collab), PathBuf::from("Collaborations"));

        let tribute = candidate("Juice WRLD Tribute", Some("Legends Never Die"));
        assert_eq!(route(&profile, &tribute), PathBuf::from("Tributes"));

        let album = candidate("Lucid Dreams", Some("Goodbye & Good Riddance"));
        assert_eq!(route(&profile, &album), PathBuf::from("Goodbye & Good Riddance"));

        let single = candidate("Bandit ft. YoungBoy", None);
        assert_eq!(route(&profile, &single), PathBuf::from(SINGLES_FOLDER));

        let other = candidate("Unreleased snippet", None);
        assert_eq!(route(&profile, &other), PathBuf::new());
    }

    #[test]
    fn test_route_without_organizing() {
        let mut profile = profile();
        profile.organize_by_album = false;

        let tribute = candidate("Juice WRLD Tribute", Some("Legends Never Die"));
        assert_eq!(route(&profile, &tribute), PathBuf::new());
    }

    #[test]
    fn test_expected_path_and_stem() {
        let profile = profile();
        let base = Path::new("/music/Juice_WRLD_Music");

        let album = candidate("Lucid Dreams (Official Music Video)", Some("Goodbye & Good Riddance"));
        assert_eq!(
            expected_path(base, &profile, &album),
            base.join("Goodbye & Good Riddance").join("Lucid Dreams.mp3")
        );

        let noise_only = candidate("[Official Video]", None);
        assert_eq!(file_stem(&noise_only), "vid");
    }

    #[test]
    fn test_prepare_directories() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("Juice_WRLD_Music");

        prepare_directories(&base, &profile()).unwrap();

        for folder in ["Goodbye & Good Riddance", "Legends Never Die", "Collaborations", "Tributes", "Singles"] {
            assert!(base.join(folder).is_dir(), "missing {folder}");
        }
    }

    #[test]
    fn test_prepare_directories_flat() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("Eminem_Music");
        let mut profile = profile();
        profile.organize_by_album = false;

        prepare_directories(&base, &profile).unwrap();

        assert!(base.is_dir());
        assert!(!base.join("Singles").exists());
    }

    #[test]
    fn test_library_index() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("Singles");
        fs::create_dir(&nested).unwrap();
        File::create(nested.join("Bandit.mp3")).unwrap();
        File::create(temp_dir.path().join("notes.txt")).unwrap();

        let mut index = LibraryIndex::scan(temp_dir.path());

        assert_eq!(index.len(), 1);
        assert_eq!(index.find(&nested, "BANDIT"), Some(nested.join("Bandit.mp3").as_path()));
        assert!(index.find(temp_dir.path(), "Bandit").is_none());
        assert!(index.find(temp_dir.path(), "notes").is_none());

        index.insert(&temp_dir.path().join("Robbery.m4a"));
        assert!(index.find(temp_dir.path(), "robbery").is_some());
    }

    #[test]
    fn test_library_index_keeps_same_names_apart() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("Welcome to O'Block");
        let second = temp_dir.path().join("Levon James");
        fs::create_dir(&first).unwrap();
        fs::create_dir(&second).unwrap();
        File::create(first.join("Intro.mp3")).unwrap();
        File::create(second.join("Intro.opus")).unwrap();

        let index = LibraryIndex::scan(temp_dir.path());

        assert_eq!(index.len(), 2);
        assert_eq!(index.find(&first, "Intro"), Some(first.join("Intro.mp3").as_path()));
        assert_eq!(index.find(&second, "intro"), Some(second.join("Intro.opus").as_path()));
    }

    #[test]
    fn test_library_index_missing_root() {
        let index = LibraryIndex::scan(Path::new("/nonexistent/catalogdl/root"));
        assert!(index.is_empty());
    }

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("test.mp3")));
        assert!(is_audio_file(Path::new("test.FLAC")));
        assert!(is_audio_file(Path::new("test.opus")));
        assert!(!is_audio_file(Path::new("test.txt")));
        assert!(!is_audio_file(Path::new("test.mp3.part")));
    }
}
