use super::HandlerResult;
use crate::engine::{PollEngine, PollError};
use crate::notify::discord::build_embed;
use log::{debug, error, info};
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::prelude::*;
use std::sync::Arc;

const VOTE_PREFIX: &str = "poll";

/// Custom id of the button for `option` on a poll message: `poll|<id>|<option>`.
pub fn vote_button_id(poll_id: &str, option: usize) -> String {
    format!("{}|{}|{}", VOTE_PREFIX, poll_id, option)
}

pub fn parse_vote_button_id(custom_id: &str) -> Option<(String, usize)> {
    let mut parts = custom_id.split('|');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(VOTE_PREFIX), Some(poll_id), Some(option), None) if !poll_id.is_empty() => {
            option.parse().ok().map(|option| (poll_id.to_string(), option))
        }
        _ => None,
    }
}

pub async fn handle_vote_button(
    engine: &Arc<PollEngine>,
    ctx: &Context,
    component: &MessageComponentInteraction,
    poll_id: &str,
    option: usize,
) -> HandlerResult {
    // Acknowledge first; Discord only waits three seconds.
    component
        .create_interaction_response(&ctx.http, |response| {
            response.kind(InteractionResponseType::DeferredUpdateMessage)
        })
        .await?;

    let user_id = component.user.id.to_string();
    match engine.apply_vote(poll_id, &user_id, option).await {
        // Re-read so a poll finalized meanwhile keeps its closed embed.
        Ok(_) => match engine.live_view(poll_id).await {
            Ok(Some(view)) => {
                let embed = build_embed(&view);
                component
                    .edit_original_interaction_response(&ctx.http, |response| response.set_embed(embed))
                    .await?;
            }
            Ok(None) => debug!("Poll {} closed before its message could be refreshed", poll_id),
            Err(e) => error!("Failed to refresh poll {} after a vote: {}", poll_id, e),
        },
        Err(e) => {
            match e {
                PollError::Store(_) | PollError::Delivery(_) => {
                    error!("Failed to record vote by {} on poll {}: {}", user_id, poll_id, e)
                }
                _ => info!("Rejected vote by {} on poll {}: {}", user_id, poll_id, e),
            }
            component
                .create_followup_message(&ctx.http, |message| {
                    message.content(e.user_message()).ephemeral(true)
                })
                .await?;
        }
    }

    Ok(())
}
