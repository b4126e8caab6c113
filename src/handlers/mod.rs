pub mod vote;

use crate::commands::CommandRegistry;
use crate::engine::PollEngine;
use log::{error, info, warn};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::prelude::*;
use std::sync::Arc;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

// Handle slash commands
pub async fn handle_command(
    engine: &Arc<PollEngine>,
    registry: &CommandRegistry,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> HandlerResult {
    info!("Received command: {}", command.data.name);
    match registry.get(&command.data.name) {
        Some(handler) => handler.run(engine, ctx, command).await?,
        None => {
            warn!("Got unknown command: {}", command.data.name);
            command
                .create_interaction_response(&ctx.http, |response| {
                    response
                        .kind(InteractionResponseType::ChannelMessageWithSource)
                        .interaction_response_data(|message| message.content("Unknown command").ephemeral(true))
                })
                .await?;
        }
    }
    Ok(())
}

// Routes button clicks by their custom id
pub async fn handle_component(
    engine: &Arc<PollEngine>,
    ctx: &Context,
    component: &MessageComponentInteraction,
) -> HandlerResult {
    let custom_id = &component.data.custom_id;
    info!("Received component interaction: {}", custom_id);

    match vote::parse_vote_button_id(custom_id) {
        Some((poll_id, option)) => vote::handle_vote_button(engine, ctx, component, &poll_id, option).await?,
        None => {
            warn!("Unhandled component custom_id: {}", custom_id);
            component
                .create_interaction_response(&ctx.http, |response| {
                    response
                        .kind(InteractionResponseType::ChannelMessageWithSource)
                        .interaction_response_data(|message| message.content("Unknown button action.").ephemeral(true))
                })
                .await?;
        }
    }

    Ok(())
}

pub async fn handle_interaction(
    engine: &Arc<PollEngine>,
    registry: &CommandRegistry,
    ctx: &Context,
    interaction: Interaction,
) {
    let result = match interaction {
        Interaction::ApplicationCommand(command) => handle_command(engine, registry, ctx, &command).await,
        Interaction::MessageComponent(component) => handle_component(engine, ctx, &component).await,
        other => {
            warn!("Unhandled interaction type: {:?}", other.kind());
            Ok(())
        }
    };

    if let Err(why) = result {
        error!("Interaction handler error: {:?}", why);
    }
}
