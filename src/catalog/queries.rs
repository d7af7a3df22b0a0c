use crate::configuration::Profile;
use std::collections::HashSet;

/// Builds every search term for a profile, most general first.
///
/// Terms are `"{artist} {suffix}"` in this order: general suffixes, each album
/// with every album suffix, the leading highlights with every highlight suffix,
/// the leading singles with the single suffix, themes, then the leading
/// collaborators. Case-insensitive duplicates keep their first position.
pub fn build_search_queries(profile: &Profile) -> Vec<String> {
    let search = &profile.search;
    let mut suffixes: Vec<String> = search.general.clone();

    for album in &profile.albums {
        suffixes.extend(
            search
                .album_suffixes
                .iter()
                .map(|suffix| format!("{} {suffix}", album.name)),
        );
    }

    for hit in profile.highlights.iter().take(search.highlight_limit) {
        suffixes.extend(
            search
                .highlight_suffixes
                .iter()
                .map(|suffix| format!("{hit} {suffix}")),
        );
    }

    for single in profile.singles.iter().take(search.single_limit) {
        suffixes.push(format!("{single} {}", search.single_suffix));
    }

    suffixes.extend(search.themes.iter().cloned());

    suffixes.extend(
        profile
            .collaborations
            .iter()
            .take(search.collaboration_limit)
            .map(|collab| collab.artist.clone()),
    );

    let mut seen = HashSet::new();
    suffixes
        .into_iter()
        .map(|suffix| format!("{} {}", profile.artist, suffix.trim()).trim().to_string())
        .filter(|query| seen.insert(query.to_lowercase()))
        .collect()
}
