use chrono::{DateTime, Local};
use std::path::Path;
use std::{fs, io};

/// One `#EXTINF` line plus its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct M3uEntry {
    pub title: String,
    /// Path relative to the playlist file.
    pub location: String,
}

/// Renders an extended M3U playlist.
///
/// ```
/// use catalogdl::playlist::{render_playlist, M3uEntry};
///
/// let entries = vec![M3uEntry {
///     title: "Lucid Dreams".to_string(),
///     location: "Singles/Lucid Dreams.mp3".to_string(),
/// }];
/// let generated = chrono::Local::now();
/// let text = render_playlist("Juice WRLD Complete Discography", Some("Hip-Hop/Emo Rap"), generated, &entries);
///
/// assert!(text.starts_with("#EXTM3U\n#PLAYLIST: Juice WRLD Complete Discography\n"));
/// assert!(text.ends_with("#EXTINF:-1,Lucid Dreams\nSingles/Lucid Dreams.mp3\n"));
/// ```
pub fn render_playlist(
    title: &str,
    genre: Option<&str>,
    generated: DateTime<Local>,
    entries: &[M3uEntry],
) -> String {
    let mut out = String::from("#EXTM3U\n");
    out.push_str(&format!("#PLAYLIST: {title}\n"));
    out.push_str(&format!(
        "#GENERATED: {}\n",
        generated.format("%Y-%m-%d %H:%M:%S")
    ));
    if let Some(genre) = genre {
        out.push_str(&format!("#GENRE: {genre}\n"));
    }
    out.push('\n');

    for entry in entries {
        out.push_str(&format!("#EXTINF:-1,{}\n{}\n", entry.title, entry.location));
    }
    out
}

pub fn write_playlist(
    path: &Path,
    title: &str,
    genre: Option<&str>,
    entries: &[M3uEntry],
) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_playlist(title, genre, Local::now(), entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_render_playlist_exact_format() {
        let generated = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let entries = vec![
            M3uEntry {
                title: "Crazy Story".to_string(),
                location: "Singles/Crazy Story.mp3".to_string(),
            },
            M3uEntry {
                title: "Armed & Dangerous".to_string(),
                location: "Armed & Dangerous.mp3".to_string(),
            },
        ];

        let text = render_playlist("King Von Complete Discography", Some("Hip-Hop/Drill"), generated, &entries);

        assert_eq!(
            text,
            "#EXTM3U\n\
             #PLAYLIST: King Von Complete Discography\n\
             #GENERATED: 2024-03-09 14:05:07\n\
             #GENRE: Hip-Hop/Drill\n\
             \n\
             #EXTINF:-1,Crazy Story\n\
             Singles/Crazy Story.mp3\n\
             #EXTINF:-1,Armed & Dangerous\n\
             Armed & Dangerous.mp3\n"
        );
    }

    #[test]
    fn test_render_playlist_without_genre() {
        let generated = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let text = render_playlist("Empty", None, generated, &[]);

        assert_eq!(text, "#EXTM3U\n#PLAYLIST: Empty\n#GENERATED: 2024-01-01 00:00:00\n\n");
    }
}
