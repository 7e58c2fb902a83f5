use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlerError {
    #[error("invalid seed URL '{url}': {reason}")]
    InvalidSeed { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("unsupported content type '{0}'")]
    UnsupportedContentType(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("crawl cancelled")]
    Cancelled,

    #[error("crawl exceeded the {0:?} wall-clock ceiling")]
    Timeout(Duration),

    #[error("storage error: {0}")]
    Storage(#[from] storage::StorageError),
}

impl CrawlerError {
    /// True for failures worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            CrawlerError::Status { status, .. } => *status >= 500,
            CrawlerError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CrawlerError>;
