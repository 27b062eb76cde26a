use thiserror::Error;

pub type Result<T> = std::result::Result<T, WikidataError>;

#[derive(Debug, Error)]
pub enum WikidataError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("SPARQL endpoint error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed SPARQL response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for WikidataError {
    fn from(err: reqwest::Error) -> Self {
        WikidataError::Network(err.to_string())
    }
}
