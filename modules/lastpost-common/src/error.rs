use thiserror::Error;

#[derive(Error, Debug)]
pub enum LastpostError {
    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
