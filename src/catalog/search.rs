use super::{build_search_queries, extract_album, is_music_content, Candidate};
use crate::configuration::Profile;
use crate::foundation::utils::{contains_ignore_case, title_key};
use crate::source::MediaSource;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Runs every query for the profile and returns up to `max_songs` candidates,
/// most viewed first.
///
/// A failing query is logged and skipped. Results are filtered with
/// [`is_music_content`] and de-duplicated by title key and by URL.
pub async fn search_catalog(source: &dyn MediaSource, profile: &Profile) -> Vec<Candidate> {
    let queries = build_search_queries(profile);
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut seen_titles = HashSet::new();
    let mut seen_urls = HashSet::new();

    info!(
        "Searching {} queries for {} (up to {} songs)",
        queries.len(),
        profile.artist,
        profile.max_songs
    );

    for (index, query) in queries.iter().enumerate() {
        let remaining = profile.max_songs.saturating_sub(candidates.len());
        if remaining == 0 {
            break;
        }
        if index > 0 && profile.search.delay > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(profile.search.delay)).await;
        }

        let limit = profile.search.results_per_query.min(remaining);
        let entries = match source.search(query, limit).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Search failed for '{query}': {e}");
                continue;
            }
        };

        let before = candidates.len();
        for entry in entries {
            if candidates.len() >= profile.max_songs {
                break;
            }
            if entry.title.is_empty() || entry.url.is_empty() {
                continue;
            }

            let key = title_key(&entry.title);
            if seen_titles.contains(&key) || seen_urls.contains(&entry.url) {
                continue;
            }
            if !is_music_content(profile, &entry.title, entry.description()) {
                debug!("Filtered out: {}", entry.title);
                continue;
            }

            seen_titles.insert(key);
            seen_urls.insert(entry.url.clone());
            let album = extract_album(profile, &entry.title, entry.description());
            candidates.push(Candidate { entry, album });
        }

        debug!("'{query}': {} new candidates", candidates.len() - before);
    }

    sort_candidates(&mut candidates, profile.prefer_official_videos);
    info!("Found {} candidates for {}", candidates.len(), profile.artist);
    candidates
}

fn sort_candidates(candidates: &mut [Candidate], prefer_official: bool) {
    candidates.sort_by(|a, b| {
        let by_views = b
            .entry
            .view_count
            .unwrap_or(0)
            .cmp(&a.entry.view_count.unwrap_or(0));

        if by_views != Ordering::Equal || !prefer_official {
            return by_views;
        }

        let official = |c: &Candidate| contains_ignore_case(c.title(), "official");
        official(b).cmp(&official(a))
    });
}
