use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("invalid query: {0}")]
    InvalidInput(String),

    #[error("failed to parse query: {0}")]
    ParseFailed(String),

    #[error("search failed: {0}")]
    Internal(String),
}

impl From<storage::StorageError> for SearchError {
    fn from(e: storage::StorageError) -> Self {
        SearchError::Internal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
