//! Turning a profile into a ranked list of things to download.

mod filter;
mod queries;
mod search;

pub use filter::{extract_album, is_music_content};
pub use queries::build_search_queries;
pub use search::search_catalog;

use crate::source::SearchEntry;
use serde::Serialize;

/// A search entry that passed the filter, with the album it appears to belong to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Candidate {
    pub entry: SearchEntry,
    pub album: Option<String>,
}

impl Candidate {
    pub fn title(&self) -> &str {
        &self.entry.title
    }

    pub fn url(&self) -> &str {
        &self.entry.url
    }
}
