use crate::foundation::utils::{contains_ignore_case, underscored};
use crate::foundation::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

/// Profiles compiled into the binary, so `catalogdl run -p eminem` works
/// before `catalogdl config` has ever been run.
const BUNDLED_PROFILES: [(&str, &str); 10] = [
    ("blueface", include_str!("profiles/blueface.yaml")),
    ("eminem", include_str!("profiles/eminem.yaml")),
    ("juice_wrld", include_str!("profiles/juice_wrld.yaml")),
    ("king_von", include_str!("profiles/king_von.yaml")),
    ("lil_loaded", include_str!("profiles/lil_loaded.yaml")),
    ("lil_tecca", include_str!("profiles/lil_tecca.yaml")),
    ("nle_choppa", include_str!("profiles/nle_choppa.yaml")),
    ("rembo", include_str!("profiles/rembo.yaml")),
    ("ynw_melly", include_str!("profiles/ynw_melly.yaml")),
    ("zeddy_will", include_str!("profiles/zeddy_will.yaml")),
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub music_root: String,
    pub yt_dlp_path: Option<String>,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            music_root: ".".to_string(),
            yt_dlp_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Base directory that relative profile `download_dir`s are resolved against.
    pub fn music_root(&self) -> PathBuf {
        expand_home(&self.music_root)
    }
}

/// Reads `config.yaml`, letting `CATALOGDL_*` environment variables override it.
///
/// A missing file is not an error: the defaults and the environment still apply.
pub fn get_configuration(cfg_file: &Path) -> Result<Settings> {
    let settings = config::Config::builder()
        .add_source(
            config::File::new(&cfg_file.to_string_lossy(), config::FileFormat::Yaml)
                .required(false),
        )
        .add_source(config::Environment::with_prefix("CATALOGDL"))
        .build()?;

    Ok(settings.try_deserialize::<Settings>()?)
}

/// One artist: what to search for, how to encode it, where to put it and how
/// to tag it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub artist: String,
    pub download_dir: String,
    pub max_songs: usize,
    pub audio: AudioSettings,
    pub embed_thumbnail: bool,
    pub embed_metadata: bool,
    pub skip_existing: bool,
    pub max_retries: u32,
    pub retry_delay: f64,
    pub retry_backoff: bool,
    pub delay_between_downloads: f64,
    pub organize_by_album: bool,
    pub prefer_official_videos: bool,
    pub playlist_name: String,
    pub playlist_flush_every: usize,
    pub genre: String,
    pub location: Option<String>,
    pub default_comment: Option<String>,
    pub albums: Vec<Album>,
    pub singles: Vec<String>,
    pub highlights: Vec<String>,
    pub collaborations: Vec<Collaboration>,
    pub search: SearchSettings,
    pub filter: FilterSettings,
    pub routes: Vec<RouteRule>,
    pub comments: Vec<CommentRule>,
    pub playlists: Vec<PlaylistRule>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            artist: String::new(),
            download_dir: String::new(),
            max_songs: 100,
            audio: AudioSettings::default(),
            embed_thumbnail: true,
            embed_metadata: true,
            skip_existing: true,
            max_retries: 3,
            retry_delay: 1.0,
            retry_backoff: true,
            delay_between_downloads: 2.0,
            organize_by_album: true,
            prefer_official_videos: true,
            playlist_name: String::new(),
            playlist_flush_every: 10,
            genre: "Hip-Hop/Rap".to_string(),
            location: None,
            default_comment: None,
            albums: Vec::new(),
            singles: Vec::new(),
            highlights: Vec::new(),
            collaborations: Vec::new(),
            search: SearchSettings::default(),
            filter: FilterSettings::default(),
            routes: Vec::new(),
            comments: Vec::new(),
            playlists: Vec::new(),
        }
    }
}

impl Profile {
    pub fn validate(&self) -> Result<()> {
        if self.artist.trim().is_empty() {
            return Err(Error::Configuration("profile has no artist".to_string()));
        }
        if self.max_retries == 0 {
            return Err(Error::Configuration(format!(
                "{}: max_retries must be at least 1",
                self.artist
            )));
        }
        if self.audio.format.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "{}: audio.format must not be empty",
                self.artist
            )));
        }
        if self.search.results_per_query == 0 {
            return Err(Error::Configuration(format!(
                "{}: search.results_per_query must be at least 1",
                self.artist
            )));
        }
        Ok(())
    }

    /// Directory name used when the profile leaves `download_dir` empty.
    pub fn download_dir_name(&self) -> String {
        if self.download_dir.trim().is_empty() {
            format!("{}_Music", underscored(&self.artist))
        } else {
            self.download_dir.clone()
        }
    }

    pub fn playlist_file_name(&self) -> String {
        if self.playlist_name.trim().is_empty() {
            format!("{}_Complete.m3u", underscored(&self.artist))
        } else {
            self.playlist_name.clone()
        }
    }

    pub fn album(&self, name: &str) -> Option<&Album> {
        self.albums.iter().find(|album| album.name == name)
    }

    pub fn is_highlight(&self, title: &str) -> bool {
        self.highlights
            .iter()
            .any(|hit| contains_ignore_case(title, hit))
    }

    pub fn is_known_single(&self, title: &str) -> bool {
        self.singles
            .iter()
            .any(|single| contains_ignore_case(title, single))
    }

    /// A collaboration counts only when both the guest and the track appear.
    pub fn is_collaboration(&self, title: &str) -> bool {
        self.collaborations.iter().any(|collab| {
            contains_ignore_case(title, &collab.artist) && contains_ignore_case(title, &collab.track)
        })
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioSettings {
    pub quality: String,
    pub format: String,
    pub bitrate: u32,
    pub sample_rate: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            quality: "bestaudio/best".to_string(),
            format: "mp3".to_string(),
            bitrate: 320,
            sample_rate: 44100,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseKind {
    Album,
    Ep,
    Mixtape,
    Single,
    Posthumous,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Album {
    pub name: String,
    #[serde(default = "default_release_kind")]
    pub kind: ReleaseKind,
    pub year: Option<i32>,
    #[serde(default)]
    pub tracks: Vec<String>,
}

fn default_release_kind() -> ReleaseKind {
    ReleaseKind::Album
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Collaboration {
    pub artist: String,
    pub track: String,
}

/// Knobs for turning a profile into search terms.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    pub results_per_query: usize,
    pub delay: f64,
    pub general: Vec<String>,
    pub album_suffixes: Vec<String>,
    pub highlight_limit: usize,
    pub highlight_suffixes: Vec<String>,
    pub single_limit: usize,
    pub single_suffix: String,
    pub themes: Vec<String>,
    pub collaboration_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            results_per_query: 25,
            delay: 1.5,
            general: strings(&[
                "official music video",
                "official audio",
                "clean version",
                "explicit version",
            ]),
            album_suffixes: strings(&["full album", "official", "playlist"]),
            highlight_limit: 5,
            highlight_suffixes: strings(&["official", "remix", "lyrics"]),
            single_limit: 10,
            single_suffix: "official".to_string(),
            themes: Vec::new(),
            collaboration_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterSettings {
    pub skip: Vec<String>,
    pub allow: Vec<String>,
    pub indicators: Vec<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            skip: strings(&[
                "interview",
                "reaction",
                "review",
                "analysis",
                "behind the scenes",
                "making of",
                "documentary",
                "news",
                "explaining",
                "breakdown",
                "meaning",
                "commentary",
            ]),
            allow: Vec::new(),
            indicators: strings(&[
                "official music video",
                "official audio",
                "lyrics",
                "visualizer",
                "remix",
                "clean version",
                "explicit",
                "radio edit",
                "instrumental",
            ]),
        }
    }
}

/// Title predicate shared by routes, comments and themed playlists.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TitleMatcher {
    pub keywords: Vec<String>,
    pub highlights: bool,
    pub collaborations: bool,
}

impl TitleMatcher {
    pub fn matches(&self, profile: &Profile, title: &str) -> bool {
        (self.highlights && profile.is_highlight(title))
            || (self.collaborations && profile.is_collaboration(title))
            || self
                .keywords
                .iter()
                .any(|keyword| contains_ignore_case(title, keyword))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RouteRule {
    pub folder: String,
    #[serde(default)]
    pub when: TitleMatcher,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CommentRule {
    pub comment: String,
    #[serde(default)]
    pub when: TitleMatcher,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlaylistRule {
    pub file: String,
    pub title: String,
    #[serde(default)]
    pub when: TitleMatcher,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Loads a profile by file path, by name from the profiles folder, or from the
/// bundled set, in that order.
pub fn load_profile(cfg_folder: &ConfigFolder, name: &str) -> Result<Profile> {
    let as_path = Path::new(name);
    let on_disk = cfg_folder.profiles_dir.join(format!("{name}.yaml"));

    let profile = if is_yaml_path(as_path) && as_path.exists() {
        parse_profile_file(as_path)?
    } else if on_disk.exists() {
        parse_profile_file(&on_disk)?
    } else if let Some(content) = bundled_profile(name) {
        parse_profile_str(content)?
    } else {
        return Err(Error::Configuration(format!("unknown profile '{name}'")));
    };

    profile.validate()?;
    Ok(profile)
}

pub fn parse_profile_file(path: &Path) -> Result<Profile> {
    let profile = config::Config::builder()
        .add_source(config::File::new(
            &path.to_string_lossy(),
            config::FileFormat::Yaml,
        ))
        .build()?;

    Ok(profile.try_deserialize::<Profile>()?)
}

pub fn parse_profile_str(content: &str) -> Result<Profile> {
    let profile = config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()?;

    Ok(profile.try_deserialize::<Profile>()?)
}

pub fn bundled_profile(name: &str) -> Option<&'static str> {
    BUNDLED_PROFILES
        .iter()
        .find(|(bundled, _)| *bundled == name)
        .map(|(_, content)| *content)
}

/// Every profile name that `load_profile` would accept, sorted.
pub fn available_profiles(cfg_folder: &ConfigFolder) -> Vec<String> {
    let mut names: Vec<String> = BUNDLED_PROFILES
        .iter()
        .map(|(name, _)| name.to_string())
        .collect();

    if let Ok(entries) = fs::read_dir(&cfg_folder.profiles_dir) {
        names.extend(entries.filter_map(|entry| {
            let path = entry.ok()?.path();
            if is_yaml_path(&path) {
                path.file_stem()?.to_str().map(str::to_string)
            } else {
                None
            }
        }));
    }

    names.sort();
    names.dedup();
    names
}

fn is_yaml_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), env::var("HOME")) {
        (Some(rest), Ok(home)) => Path::new(&home).join(rest),
        _ => PathBuf::from(path),
    }
}

pub struct ConfigFolder {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub profiles_dir: PathBuf,
    pub history_db: PathBuf,
    pub log_file: PathBuf,
}

impl ConfigFolder {
    pub fn new() -> Result<Self> {
        let home_dir = env::var("HOME").map_err(|e| {
            Error::Configuration(format!("Failed to get HOME environment variable: {e}"))
        })?;

        Ok(Self::in_home(Path::new(&home_dir)))
    }

    pub fn in_home(home_dir: &Path) -> Self {
        let config_dir = home_dir.join(".catalogdl");

        Self {
            config_file: config_dir.join("config.yaml"),
            profiles_dir: config_dir.join("profiles"),
            history_db: config_dir.join("history_db"),
            log_file: config_dir.join("catalogdl.log"),
            config_dir,
        }
    }
}

pub fn create_config(cfg_folder: &ConfigFolder) -> Result<()> {
    create_config_with(cfg_folder, confirm_overwrite)
}

/// Writes the config template and every bundled profile.
///
/// `confirm` is only consulted when the folder already exists.
pub fn create_config_with<F>(cfg_folder: &ConfigFolder, confirm: F) -> Result<()>
where
    F: FnOnce() -> io::Result<bool>,
{
    println!("\x1b[1m\x1b[32mCreating configuration...\x1b[0m");

    if cfg_folder.config_dir.exists() && !confirm()? {
        println!("\x1b[33mOperation cancelled.\x1b[0m");
        return Ok(());
    }

    fs::create_dir_all(&cfg_folder.profiles_dir)?;

    let config_content = include_str!("config_template.yaml");
    fs::write(&cfg_folder.config_file, config_content)?;

    for (name, content) in BUNDLED_PROFILES {
        fs::write(cfg_folder.profiles_dir.join(format!("{name}.yaml")), content)?;
    }

    println!("\x1b[32mConfiguration file created at:");
    println!("  -> {}", cfg_folder.config_file.display());
    println!("Artist profiles written to:");
    println!("  -> {}", cfg_folder.profiles_dir.display());
    println!("\x1b[0mEdit a profile or copy one to add a new artist.");

    Ok(())
}

fn confirm_overwrite() -> io::Result<bool> {
    println!("\x1b[31mThe configuration folder already exists.");
    println!("Do you want to overwrite config.yaml and the bundled profiles? (y/N)\x1b[0m");

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(input.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_every_bundled_profile_parses() {
        for (name, content) in BUNDLED_PROFILES {
            let profile = parse_profile_str(content)
                .unwrap_or_else(|e| panic!("profile {name} failed to parse: {e}"));
            profile
                .validate()
                .unwrap_or_else(|e| panic!("profile {name} is invalid: {e}"));
        }
    }

    #[test]
    fn test_profile_defaults() {
        let profile = parse_profile_str("artist: Test Artist\n").unwrap();

        assert_eq!(profile.max_songs, 100);
        assert_eq!(profile.max_retries, 3);
        assert_eq!(profile.audio, AudioSettings::default());
        assert_eq!(profile.download_dir_name(), "Test_Artist_Music");
        assert_eq!(profile.playlist_file_name(), "Test_Artist_Complete.m3u");
        assert!(profile.skip_existing);
        assert_eq!(profile.search.results_per_query, 25);
    }

    #[test]
    fn test_profile_nested_values() {
        let yaml = r#"
artist: Juice WRLD
download_dir: Juice
audio:
  bitrate: 256
albums:
  - name: Legends Never Die
    kind: posthumous
    year: 2020
    tracks: [Bandit, Conversations]
collaborations:
  - artist: Marshmello
    track: Come & Go
routes:
  - folder: Tributes
    when:
      keywords: [tribute, rip]
"#;
        let profile = parse_profile_str(yaml).unwrap();

        assert_eq!(profile.download_dir_name(), "Juice");
        assert_eq!(profile.audio.bitrate, 256);
        assert_eq!(profile.audio.format, "mp3");
        let album = profile.album("Legends Never Die").unwrap();
        assert_eq!(album.kind, ReleaseKind::Posthumous);
        assert_eq!(album.year, Some(2020));
        assert_eq!(album.tracks.len(), 2);
        assert_eq!(profile.routes[0].folder, "Tributes");
        assert!(profile.is_collaboration("Juice WRLD & Marshmello - Come & Go"));
        assert!(!profile.is_collaboration("Marshmello - Alone"));
    }

    #[test]
    fn test_validate_rejects_bad_profiles() {
        assert!(parse_profile_str("max_songs: 3\n").unwrap().validate().is_err());
        assert!(parse_profile_str("artist: A\nmax_retries: 0\n")
            .unwrap()
            .validate()
            .is_err());
    }

    #[test]
    fn test_title_matcher() {
        let profile = parse_profile_str(
            "artist: Blueface\nhighlights: [Thotiana]\ncollaborations:\n  - artist: Lil Pump\n    track: Bust Down\n",
        )
        .unwrap();

        let viral = TitleMatcher {
            highlights: true,
            ..TitleMatcher::default()
        };
        assert!(viral.matches(&profile, "Blueface - THOTIANA (Remix)"));
        assert!(!viral.matches(&profile, "Blueface - Bleed It"));

        let collab = TitleMatcher {
            collaborations: true,
            ..TitleMatcher::default()
        };
        assert!(collab.matches(&profile, "Blueface x Lil Pump - Bust Down"));

        let keywords = TitleMatcher {
            keywords: vec!["tiktok".to_string()],
            ..TitleMatcher::default()
        };
        assert!(keywords.matches(&profile, "Blueface TikTok compilation"));
        assert!(!TitleMatcher::default().matches(&profile, "anything"));
    }

    #[test]
    fn test_load_profile_sources() {
        let home = TempDir::new().unwrap();
        let folder = ConfigFolder::in_home(home.path());

        let bundled = load_profile(&folder, "king_von").unwrap();
        assert_eq!(bundled.artist, "King Von");

        fs::create_dir_all(&folder.profiles_dir).unwrap();
        fs::write(folder.profiles_dir.join("king_von.yaml"), "artist: Override\n").unwrap();
        assert_eq!(load_profile(&folder, "king_von").unwrap().artist, "Override");

        let custom = home.path().join("custom.yml");
        fs::write(&custom, "artist: Custom\n").unwrap();
        let loaded = load_profile(&folder, custom.to_str().unwrap()).unwrap();
        assert_eq!(loaded.artist, "Custom");

        assert!(load_profile(&folder, "nobody").is_err());
    }

    #[test]
    fn test_available_profiles_merges_disk_and_bundled() {
        let home = TempDir::new().unwrap();
        let folder = ConfigFolder::in_home(home.path());
        fs::create_dir_all(&folder.profiles_dir).unwrap();
        fs::write(folder.profiles_dir.join("aaa_custom.yaml"), "artist: X\n").unwrap();
        fs::write(folder.profiles_dir.join("eminem.yaml"), "artist: Eminem\n").unwrap();
        fs::write(folder.profiles_dir.join("notes.txt"), "ignored").unwrap();

        let names = available_profiles(&folder);
        assert_eq!(names.first().map(String::as_str), Some("aaa_custom"));
        assert_eq!(names.len(), BUNDLED_PROFILES.len() + 1);
        assert!(!names.iter().any(|n| n == "notes"));
    }

    #[test]
    fn test_create_config_writes_template_and_profiles() {
        let home = TempDir::new().unwrap();
        let folder = ConfigFolder::in_home(home.path());

        create_config_with(&folder, || Ok(true)).unwrap();

        assert!(folder.config_file.exists());
        assert!(folder.profiles_dir.join("juice_wrld.yaml").exists());
        let settings = get_configuration(&folder.config_file).unwrap();
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_create_config_respects_declined_overwrite() {
        let home = TempDir::new().unwrap();
        let folder = ConfigFolder::in_home(home.path());
        fs::create_dir_all(&folder.config_dir).unwrap();

        create_config_with(&folder, || Ok(false)).unwrap();

        assert!(!folder.config_file.exists());
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let home = TempDir::new().unwrap();
        let settings = get_configuration(&home.path().join("absent.yaml")).unwrap();
        assert_eq!(settings.yt_dlp_path, None);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        if let Ok(home) = env::var("HOME") {
            assert_eq!(expand_home("~/Music"), Path::new(&home).join("Music"));
        }
    }
}
