//! Preference storage errors

use bot_core::DomainError;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<CacheError> for DomainError {
    fn from(err: CacheError) -> Self {
        DomainError::Storage(err.to_string())
    }
}
