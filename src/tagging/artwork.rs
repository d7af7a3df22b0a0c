use super::{ArtworkSource, CoverArt};
use crate::foundation::Result;
use crate::source::SearchEntry;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Upper bound for one thumbnail request, body included.
pub const ARTWORK_TIMEOUT: Duration = Duration::from_secs(15);

/// Downloads thumbnails over HTTP.
#[derive(Debug, Clone)]
pub struct HttpArtwork {
    client: Client,
    timeout: Duration,
}

impl HttpArtwork {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: ARTWORK_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for HttpArtwork {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl ArtworkSource for HttpArtwork {
    async fn fetch(&self, entry: &SearchEntry) -> Result<Option<CoverArt>> {
        let mut last_error = None;

        for url in thumbnail_urls(entry) {
            let response = match self.client.get(&url).timeout(self.timeout).send().await {
                Ok(response) => response,
                Err(e) => {
                    debug!("Thumbnail request to {url} failed: {e}");
                    last_error = Some(e);
                    continue;
                }
            };

            if !response.status().is_success() {
                debug!("Thumbnail {url} returned {}", response.status());
                continue;
            }

            let mime_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("image/jpeg")
                .to_string();
            let data = match response.bytes().await {
                Ok(bytes) => bytes.to_vec(),
                Err(e) => {
                    debug!("Reading thumbnail {url} failed: {e}");
                    last_error = Some(e);
                    continue;
                }
            };

            if !data.is_empty() {
                return Ok(Some(CoverArt { data, mime_type }));
            }
        }

        match last_error {
            Some(e) => Err(e.into()),
            None => Ok(None),
        }
    }
}

/// `hqdefault.jpg` exists for every public video, even when the flat search
/// result carried no thumbnail.
pub fn fallback_thumbnail_url(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg")
}

/// URLs to try in order. WebP thumbnails go last since not every tag format
/// can label them.
fn thumbnail_urls(entry: &SearchEntry) -> Vec<String> {
    let mut urls = Vec::new();
    let mut webp = None;

    if let Some(thumbnail) = entry.thumbnail.as_deref().filter(|t| !t.is_empty()) {
        if thumbnail.contains(".webp") {
            webp = Some(thumbnail.to_string());
        } else {
            urls.push(thumbnail.to_string());
        }
    }
    if !entry.id.is_empty() {
        let fallback = fallback_thumbnail_url(&entry.id);
        if !urls.contains(&fallback) {
            urls.push(fallback);
        }
    }
    urls.extend(webp);
    urls
}
