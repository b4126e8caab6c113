use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("poll not found")]
    NotFound,
    #[error("poll {0} already exists")]
    AlreadyExists(String),
    #[error("creator already has an active poll in this guild")]
    CreatorHasActivePoll,
    #[error("option {index} is out of range for a poll with {len} options")]
    OptionOutOfRange { index: usize, len: usize },
    #[error("poll has ended")]
    PollEnded,
    #[error("corrupt poll record: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
