use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("yt-dlp exited with status: {0:?}")]
    ExitStatus(Option<i32>),

    #[error("Downloaded file not found for: {0}")]
    MissingOutput(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Tagging error: {0}")]
    Tagging(String),

    #[error("Artwork request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether another download attempt could succeed.
    ///
    /// A failed yt-dlp run or a missing output file is usually transient
    /// (throttling, a flaky fragment). A binary that cannot be spawned, or a
    /// broken output directory, will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ExitStatus(_) | Error::MissingOutput(_))
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Configuration(err.to_string())
    }
}

impl From<lofty::error::LoftyError> for Error {
    fn from(err: lofty::error::LoftyError) -> Self {
        Error::Tagging(err.to_string())
    }
}
