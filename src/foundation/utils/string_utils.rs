use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// Longest file stem, in grapheme clusters, that `clean_filename` produces.
pub const MAX_FILENAME_GRAPHEMES: usize = 150;

/// Longest file stem in UTF-8 bytes. Leaves room for an extension and
/// yt-dlp's temporary suffixes under the usual 255-byte name limit.
pub const MAX_FILENAME_BYTES: usize = 200;

struct FilenamePatterns {
    invalid_chars: Regex,
    brackets: Regex,
    video_noise: Vec<Regex>,
    whitespace: Regex,
}

fn filename_patterns() -> &'static FilenamePatterns {
    static PATTERNS: OnceLock<FilenamePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| FilenamePatterns {
        invalid_chars: Regex::new(r#"[<>:"/\\|?*]"#).unwrap(),
        brackets: Regex::new(r"\[.*?\]").unwrap(),
        video_noise: [
            r"(?i)\(.*?official.*?\)",
            r"(?i)\(.*?music.*?video.*?\)",
            r"(?i)\(.*?audio.*?\)",
            r"(?i)\(.*?remix.*?\)",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).unwrap())
        .collect(),
        whitespace: Regex::new(r"\s+").unwrap(),
    })
}

/// Turns a video title into a file stem that is safe on every common filesystem.
///
/// Removes characters that are reserved on Windows, anything in square
/// brackets, and parenthesised video noise such as "(Official Music Video)",
/// then collapses whitespace and truncates to [`MAX_FILENAME_GRAPHEMES`] and
/// [`MAX_FILENAME_BYTES`], whichever is shorter.
///
/// # Examples
///
/// ```
/// use catalogdl::foundation::utils::clean_filename;
///
/// let cleaned = clean_filename("Lucid Dreams (Official Music Video) [HD]");
/// assert_eq!(cleaned, "Lucid Dreams");
/// ```
pub fn clean_filename(title: &str) -> String {
    let patterns = filename_patterns();

    let mut cleaned = patterns.invalid_chars.replace_all(title, "").into_owned();
    cleaned = patterns.brackets.replace_all(&cleaned, "").into_owned();
    for noise in &patterns.video_noise {
        cleaned = noise.replace_all(&cleaned, "").into_owned();
    }
    let cleaned = patterns.whitespace.replace_all(&cleaned, " ");

    let truncated = truncate_graphemes(cleaned.trim(), MAX_FILENAME_GRAPHEMES);
    truncate_bytes(&truncated, MAX_FILENAME_BYTES)
}

/// Cuts a string to at most `max` grapheme clusters without splitting one.
pub fn truncate_graphemes(input: &str, max: usize) -> String {
    input.graphemes(true).take(max).collect::<String>().trim_end().to_string()
}

/// Cuts a string to at most `max` UTF-8 bytes, ending on a grapheme boundary.
pub fn truncate_bytes(input: &str, max: usize) -> String {
    if input.len() <= max {
        return input.to_string();
    }

    let end = input
        .grapheme_indices(true)
        .map(|(start, grapheme)| start + grapheme.len())
        .take_while(|&end| end <= max)
        .last()
        .unwrap_or(0);
    input[..end].trim_end().to_string()
}

/// Normalizes Unicode characters and converts text to lowercase.
///
/// Decomposes the input (NFD) before lowercasing so that differently
/// composed spellings of the same name compare equal.
///
/// # Examples
///
/// ```
/// use catalogdl::foundation::utils::normalize_unicode;
///
/// assert_eq!(normalize_unicode("Caf\u{e9}"), normalize_unicode("CAFE\u{301}"));
/// ```
pub fn normalize_unicode(input: &str) -> String {
    input.nfd().collect::<String>().to_lowercase()
}

/// Key used to spot the same song uploaded under slightly different titles.
///
/// Punctuation is dropped and whitespace collapsed, so
/// "Lucid Dreams!" and "lucid  dreams" share a key.
pub fn title_key(title: &str) -> String {
    static PUNCTUATION: OnceLock<Regex> = OnceLock::new();
    let punctuation = PUNCTUATION.get_or_init(|| Regex::new(r"[^\w\s]").unwrap());

    let normalized = normalize_unicode(title);
    let stripped = punctuation.replace_all(&normalized, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-insensitive substring test used by every keyword rule.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Turns "Juice WRLD" into "Juice_WRLD" for directory and playlist names.
pub fn underscored(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}
