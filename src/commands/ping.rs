use super::SlashCommand;
use crate::engine::PollEngine;
use crate::handlers::HandlerResult;
use async_trait::async_trait;
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::*;
use std::sync::Arc;

pub struct PingCommand;

#[async_trait]
impl SlashCommand for PingCommand {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        command.name(self.name()).description("Ping the bot")
    }

    async fn run(
        &self,
        _engine: &Arc<PollEngine>,
        ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> HandlerResult {
        command
            .create_interaction_response(&ctx.http, |response| {
                response
                    .kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|message| message.content("Pong!"))
            })
            .await?;
        Ok(())
    }
}
