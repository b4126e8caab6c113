pub mod discord;

use crate::models::Poll;
use crate::render::PollView;
use async_trait::async_trait;
use thiserror::Error;

pub use discord::DiscordNotifier;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid {kind} id: {value:?}")]
    InvalidId { kind: &'static str, value: String },
    #[error("discord api error: {0}")]
    Discord(#[from] serenity::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Outbound side of the chat platform, as seen by the poll engine.
///
/// Every call is best effort: the engine logs a [`DeliveryError`] and moves on.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Posts a stand-in message in the channel and returns its id, so the
    /// poll can be stored with the message it will live in.
    async fn send_placeholder(&self, channel_id: &str) -> Result<String, DeliveryError>;

    /// Removes a message, used to drop a placeholder whose poll was never stored.
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), DeliveryError>;

    /// Replaces the poll message with the view and one vote button per option.
    async fn publish_poll(&self, poll: &Poll, view: &PollView) -> Result<(), DeliveryError>;

    /// Replaces the poll message with the view and removes the buttons.
    async fn close_poll(&self, poll: &Poll, view: &PollView) -> Result<(), DeliveryError>;

    /// Sends a direct message to a user.
    async fn send_results(
        &self,
        user_id: &str,
        content: &str,
        view: &PollView,
    ) -> Result<(), DeliveryError>;

    async fn user_profile(&self, user_id: &str) -> Result<UserProfile, DeliveryError>;

    async fn guild_name(&self, guild_id: &str) -> Result<String, DeliveryError>;
}
