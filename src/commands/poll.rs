use super::SlashCommand;
use crate::engine::{MAX_OPTION_CHARS, MAX_OPTIONS, PollEngine, PollError};
use crate::handlers::HandlerResult;
use crate::models::CreatePollRequest;
use crate::render::{TimestampStyle, discord_timestamp};
use async_trait::async_trait;
use log::{error, info};
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOption,
};
use serenity::prelude::*;
use std::sync::Arc;

pub struct PollCommand;

#[async_trait]
impl SlashCommand for PollCommand {
    fn name(&self) -> &'static str {
        "poll"
    }

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand {
        create_poll_command(command)
    }

    async fn run(
        &self,
        engine: &Arc<PollEngine>,
        ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> HandlerResult {
        handle_poll_command(engine, ctx, command).await
    }
}

pub fn create_poll_command(command: &mut CreateApplicationCommand) -> &mut CreateApplicationCommand {
    command
        .name("poll")
        .description("Poll commands")
        .create_option(|option| {
            option
                .name("create")
                .description("Create a poll")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("question")
                        .description("The question to ask")
                        .kind(CommandOptionType::String)
                        .required(true)
                });

            for n in 1..=MAX_OPTIONS {
                option.create_sub_option(|sub_option| {
                    sub_option
                        .name(format!("option{}", n))
                        .description("Name of an option that users can vote on")
                        .kind(CommandOptionType::String)
                        .max_length(MAX_OPTION_CHARS as u16)
                        .required(n <= 2)
                });
            }

            option.create_sub_option(|sub_option| {
                sub_option
                    .name("duration")
                    .description("How long the poll should last, e.g. 30m or 2h (default 1h, max 24h)")
                    .kind(CommandOptionType::String)
                    .required(false)
            })
        })
        .create_option(|option| {
            option
                .name("end")
                .description("End your poll")
                .kind(CommandOptionType::SubCommand)
        })
}

pub async fn handle_poll_command(
    engine: &Arc<PollEngine>,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> HandlerResult {
    let Some(subcommand) = command.data.options.first() else {
        send_error_response(ctx, command, "No subcommand provided").await?;
        return Ok(());
    };

    match subcommand.name.as_str() {
        "create" => handle_create_poll(engine, ctx, command, subcommand).await?,
        "end" => handle_end_poll(engine, ctx, command).await?,
        _ => {
            send_error_response(ctx, command, "Unknown subcommand").await?;
        }
    }

    Ok(())
}

async fn handle_create_poll(
    engine: &Arc<PollEngine>,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    subcommand: &CommandDataOption,
) -> HandlerResult {
    defer_ephemeral(ctx, command).await?;

    let Some(guild_id) = command.guild_id else {
        edit_response(ctx, command, "Polls can only be created in a server.").await?;
        return Ok(());
    };

    let values: Vec<(&str, &str)> = subcommand
        .options
        .iter()
        .filter_map(|o| Some((o.name.as_str(), o.value.as_ref()?.as_str()?)))
        .collect();
    let request = build_create_request(
        guild_id.to_string(),
        command.channel_id.to_string(),
        command.user.id.to_string(),
        &values,
    );

    let reply = match engine.create_poll(request).await {
        Ok(poll) => format!(
            "Poll created! It will end at {}.",
            discord_timestamp(poll.end_time, TimestampStyle::ShortDateTime)
        ),
        Err(e) => {
            log_failure("create poll", &e);
            e.user_message()
        }
    };
    edit_response(ctx, command, &reply).await?;

    Ok(())
}

async fn handle_end_poll(
    engine: &Arc<PollEngine>,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> HandlerResult {
    defer_ephemeral(ctx, command).await?;

    let Some(guild_id) = command.guild_id else {
        edit_response(ctx, command, "Polls only exist in servers.").await?;
        return Ok(());
    };

    let reply = match engine
        .end_poll(&command.user.id.to_string(), &guild_id.to_string())
        .await
    {
        Ok(_) => "Your poll has ended. The results have been sent to you.".to_string(),
        Err(PollError::NotFound) => "You don't have a poll running in this server.".to_string(),
        Err(e) => {
            log_failure("end poll", &e);
            e.user_message()
        }
    };
    edit_response(ctx, command, &reply).await?;

    Ok(())
}

/// Collects `/poll create` arguments into a request. Options keep their
/// numbered order even when some in the middle were left out.
pub fn build_create_request(
    guild_id: String,
    channel_id: String,
    creator_id: String,
    values: &[(&str, &str)],
) -> CreatePollRequest {
    let mut numbered: Vec<(u32, String)> = values
        .iter()
        .filter_map(|(name, value)| {
            let n = name.strip_prefix("option")?.parse().ok()?;
            Some((n, value.to_string()))
        })
        .collect();
    numbered.sort_by_key(|(n, _)| *n);

    let lookup = |key: &str| {
        values
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.to_string())
    };

    CreatePollRequest {
        guild_id,
        channel_id,
        creator_id,
        question: lookup("question").unwrap_or_default(),
        options: numbered.into_iter().map(|(_, value)| value).collect(),
        duration: lookup("duration"),
    }
}

fn log_failure(action: &str, err: &PollError) {
    match err {
        PollError::Store(_) | PollError::Delivery(_) => error!("Failed to {}: {}", action, err),
        _ => info!("Rejected {}: {}", action, err),
    }
}

async fn defer_ephemeral(
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> Result<(), serenity::Error> {
    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::DeferredChannelMessageWithSource)
                .interaction_response_data(|message| message.ephemeral(true))
        })
        .await
}

async fn edit_response(
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    content: &str,
) -> Result<(), serenity::Error> {
    command
        .edit_original_interaction_response(&ctx.http, |response| response.content(content))
        .await?;
    Ok(())
}

async fn send_error_response(
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    error_message: &str,
) -> Result<(), serenity::Error> {
    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.content(error_message).ephemeral(true))
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_keeps_numbered_option_order() {
        let values = [
            ("question", "Pick a day"),
            ("option2", "Tuesday"),
            ("option1", "Monday"),
            ("option4", "Thursday"),
            ("duration", "2h"),
        ];
        let request = build_create_request("1".into(), "2".into(), "3".into(), &values);

        assert_eq!(request.guild_id, "1");
        assert_eq!(request.channel_id, "2");
        assert_eq!(request.creator_id, "3");
        assert_eq!(request.question, "Pick a day");
        assert_eq!(request.options, vec!["Monday", "Tuesday", "Thursday"]);
        assert_eq!(request.duration.as_deref(), Some("2h"));
    }

    #[test]
    fn option_arguments_are_length_limited() {
        let mut command = CreateApplicationCommand::default();
        create_poll_command(&mut command);

        let subcommands = command.0["options"].as_array().unwrap();
        let create = subcommands.iter().find(|o| o["name"] == "create").unwrap();
        let options: Vec<_> = create["options"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|o| o["name"].as_str().is_some_and(|n| n.starts_with("option")))
            .collect();

        assert_eq!(options.len(), MAX_OPTIONS);
        assert!(options.iter().all(|o| o["max_length"] == MAX_OPTION_CHARS as u64));
        assert!(create["options"][0].get("max_length").is_none());
    }

    #[test]
    fn duration_is_optional() {
        let values = [("question", "Q"), ("option1", "A"), ("option2", "B")];
        let request = build_create_request("1".into(), "2".into(), "3".into(), &values);
        assert_eq!(request.duration, None);
        assert_eq!(request.options.len(), 2);
    }
}
