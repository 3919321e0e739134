use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("modifier store database error: {0}")]
    Database(String),

    #[error("modifier store holds malformed data: {0}")]
    Data(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
