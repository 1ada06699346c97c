use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    #[error("quote has an empty stock id")]
    EmptyStock,
}
