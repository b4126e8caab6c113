use super::{DeliveryError, Notifier, UserProfile};
use crate::handlers::vote::vote_button_id;
use crate::models::Poll;
use crate::render::PollView;
use async_trait::async_trait;
use serenity::builder::{CreateComponents, CreateEmbed};
use serenity::http::Http;
use serenity::model::application::component::ButtonStyle;
use serenity::model::id::{ChannelId, MessageId, UserId};
use serenity::model::Timestamp;
use std::sync::Arc;

const PLACEHOLDER: &str = "Creating poll...";
// Discord allows five buttons per action row
const BUTTONS_PER_ROW: usize = 5;

pub struct DiscordNotifier {
    http: Arc<Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send_placeholder(&self, channel_id: &str) -> Result<String, DeliveryError> {
        let channel = ChannelId(parse_id("channel", channel_id)?);
        let message = channel.say(&self.http, PLACEHOLDER).await?;
        Ok(message.id.0.to_string())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), DeliveryError> {
        let channel = ChannelId(parse_id("channel", channel_id)?);
        let message = MessageId(parse_id("message", message_id)?);
        channel.delete_message(&self.http, message).await?;
        Ok(())
    }

    async fn publish_poll(&self, poll: &Poll, view: &PollView) -> Result<(), DeliveryError> {
        let channel = ChannelId(parse_id("channel", &poll.channel_id)?);
        let message = MessageId(parse_id("message", &poll.message_id)?);
        let embed = build_embed(view);

        channel
            .edit_message(&self.http, message, |m| {
                m.content("")
                    .set_embed(embed)
                    .components(|c| vote_buttons(c, poll))
            })
            .await?;
        Ok(())
    }

    async fn close_poll(&self, poll: &Poll, view: &PollView) -> Result<(), DeliveryError> {
        let channel = ChannelId(parse_id("channel", &poll.channel_id)?);
        let message = MessageId(parse_id("message", &poll.message_id)?);
        let embed = build_embed(view);

        channel
            .edit_message(&self.http, message, |m| {
                // An empty component list strips the buttons
                m.set_embed(embed).components(|c| c)
            })
            .await?;
        Ok(())
    }

    async fn send_results(
        &self,
        user_id: &str,
        content: &str,
        view: &PollView,
    ) -> Result<(), DeliveryError> {
        let user = UserId(parse_id("user", user_id)?);
        let channel = user.create_dm_channel(&*self.http).await?;
        let embed = build_embed(view);

        channel
            .id
            .send_message(&self.http, |m| m.content(content).set_embed(embed))
            .await?;
        Ok(())
    }

    async fn user_profile(&self, user_id: &str) -> Result<UserProfile, DeliveryError> {
        let user = self.http.get_user(parse_id("user", user_id)?).await?;
        Ok(UserProfile {
            avatar_url: Some(user.face()),
            name: user.name,
        })
    }

    async fn guild_name(&self, guild_id: &str) -> Result<String, DeliveryError> {
        let guild = self.http.get_guild(parse_id("guild", guild_id)?).await?;
        Ok(guild.name)
    }
}

fn parse_id(kind: &'static str, value: &str) -> Result<u64, DeliveryError> {
    value.parse().map_err(|_| DeliveryError::InvalidId {
        kind,
        value: value.to_string(),
    })
}

pub fn build_embed(view: &PollView) -> CreateEmbed {
    let mut embed = CreateEmbed::default();
    embed
        .title(&view.title)
        .description(&view.description)
        .colour(view.colour);

    for field in &view.fields {
        embed.field(&field.name, &field.value, field.inline);
    }

    if let Some(footer) = &view.footer {
        embed.footer(|f| {
            f.text(&footer.text);
            if let Some(url) = &footer.icon_url {
                f.icon_url(url);
            }
            f
        });
    }

    if let Ok(timestamp) = Timestamp::from_unix_timestamp(view.timestamp.timestamp()) {
        embed.timestamp(timestamp);
    }

    embed
}

fn vote_buttons<'a>(components: &'a mut CreateComponents, poll: &Poll) -> &'a mut CreateComponents {
    for (row_start, labels) in poll.options.chunks(BUTTONS_PER_ROW).enumerate() {
        components.create_action_row(|row| {
            for (offset, label) in labels.iter().enumerate() {
                let index = row_start * BUTTONS_PER_ROW + offset;
                row.create_button(|btn| {
                    btn.custom_id(vote_button_id(&poll.id, index))
                        .label(label)
                        .style(ButtonStyle::Success)
                });
            }
            row
        });
    }
    components
}
