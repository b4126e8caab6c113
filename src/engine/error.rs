use crate::db::StoreError;
use crate::notify::DeliveryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("creator already has an active poll in this guild")]
    DuplicateActivePoll,
    #[error("a poll needs between {min} and {max} options, got {got}")]
    WrongOptionCount { min: usize, max: usize, got: usize },
    #[error("option {position} exceeds {max} characters")]
    OptionTooLong { position: usize, max: usize },
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
    #[error("duration cannot exceed {max_hours} hours")]
    DurationTooLong { max_hours: i64 },
    #[error("option {index} is out of range")]
    OptionOutOfRange { index: usize },
    #[error("poll not found")]
    NotFound,
    #[error("poll has ended")]
    PollEnded,
    #[error("store error: {0}")]
    Store(StoreError),
    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

impl From<StoreError> for PollError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => PollError::NotFound,
            StoreError::PollEnded => PollError::PollEnded,
            StoreError::CreatorHasActivePoll => PollError::DuplicateActivePoll,
            StoreError::OptionOutOfRange { index, .. } => PollError::OptionOutOfRange { index },
            other => PollError::Store(other),
        }
    }
}

impl PollError {
    /// Text shown to the user who triggered the failing action.
    pub fn user_message(&self) -> String {
        match self {
            PollError::DuplicateActivePoll => "You already have a poll running in this server!".to_string(),
            PollError::WrongOptionCount { min, max, .. } => {
                format!("Failed to create poll: a poll needs between {} and {} options", min, max)
            }
            PollError::OptionTooLong { position, max } => {
                format!("Failed to create poll: option {} exceeds {} characters", position, max)
            }
            PollError::InvalidDuration(_) => "Failed to create poll: invalid duration".to_string(),
            PollError::DurationTooLong { max_hours } => {
                format!("Failed to create poll: duration cannot exceed {} hours", max_hours)
            }
            PollError::OptionOutOfRange { .. } => "That option isn't part of this poll.".to_string(),
            PollError::NotFound => "This poll has already ended.".to_string(),
            PollError::PollEnded => "This poll has ended.".to_string(),
            PollError::Store(_) | PollError::Delivery(_) => {
                "Something went wrong, please try again later.".to_string()
            }
        }
    }
}
