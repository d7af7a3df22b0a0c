use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DownloadRecord {
    pub artist: String,
    pub title: String,
    pub path: String,
    pub downloaded_at: i64, // unix seconds
}
