use crate::configuration::Profile;
use crate::foundation::utils::contains_ignore_case;

/// Decides whether a search result is a song rather than talk about one.
///
/// Rules, first decisive one wins:
/// 1. a `skip` pattern in the title or description rejects;
/// 2. an `allow` pattern in the title accepts;
/// 3. an empty indicator list accepts;
/// 4. otherwise an indicator or a known single must appear in the title.
pub fn is_music_content(profile: &Profile, title: &str, description: &str) -> bool {
    let filter = &profile.filter;

    if filter
        .skip
        .iter()
        .any(|pattern| contains_ignore_case(title, pattern) || contains_ignore_case(description, pattern))
    {
        return false;
    }

    if filter
        .allow
        .iter()
        .any(|pattern| contains_ignore_case(title, pattern))
    {
        return true;
    }

    if filter.indicators.is_empty() {
        return true;
    }

    filter
        .indicators
        .iter()
        .any(|indicator| contains_ignore_case(title, indicator))
        || profile.is_known_single(title)
}

/// Returns the first profile album whose name appears in the title or description.
pub fn extract_album(profile: &Profile, title: &str, description: &str) -> Option<String> {
    let text = format!("{title} {description}");
    profile
        .albums
        .iter()
        .find(|album| contains_ignore_case(&text, &album.name))
        .map(|album| album.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::parse_profile_str;

    fn juice() -> Profile {
        parse_profile_str(
            r#"
artist: Juice WRLD
singles: [Bandit]
albums:
  - name: Goodbye & Good Riddance
  - name: Legends Never Die
filter:
  skip: [interview, reaction]
  allow: [tribute, slowed]
  indicators: [official audio, lyrics]
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_skip_beats_everything() {
        let profile = juice();
        assert!(!is_music_content(&profile, "Juice WRLD Interview (Official Audio)", ""));
        assert!(!is_music_content(&profile, "Lucid Dreams lyrics", "my REACTION to this"));
        assert!(!is_music_content(&profile, "Tribute interview", ""));
    }

    #[test]
    fn test_allow_accepts_without_indicator() {
        let profile = juice();
        assert!(is_music_content(&profile, "Juice WRLD Tribute Mix", ""));
        assert!(is_music_content(&profile, "Wishing Well (Slowed)", ""));
        // allow patterns only look at the title
        assert!(!is_music_content(&profile, "Wishing Well", "a tribute"));
    }

    #[test]
    fn test_indicators_and_known_singles() {
        let profile = juice();
        assert!(is_music_content(&profile, "Robbery (Official Audio)", ""));
        assert!(is_music_content(&profile, "Juice WRLD - BANDIT ft. YoungBoy", ""));
        assert!(!is_music_content(&profile, "Juice WRLD vlog", ""));
    }

    #[test]
    fn test_empty_indicators_accept_anything_not_skipped() {
        let profile = parse_profile_str("artist: Eminem\nfilter:\n  indicators: []\n").unwrap();
        assert!(is_music_content(&profile, "Eminem - Stan", ""));
        assert!(!is_music_content(&profile, "Eminem interview 2002", ""));
    }

    #[test]
    fn test_extract_album() {
        let profile = juice();
        assert_eq!(
            extract_album(&profile, "Righteous", "From the album LEGENDS NEVER DIE"),
            Some("Legends Never Die".to_string())
        );
        assert_eq!(
            extract_album(&profile, "Lucid Dreams - Goodbye & Good Riddance", ""),
            Some("Goodbye & Good Riddance".to_string())
        );
        assert_eq!(extract_album(&profile, "Bandit", ""), None);
    }
}
