pub mod ping;
pub mod poll;

use crate::engine::PollEngine;
use crate::handlers::HandlerResult;
use async_trait::async_trait;
use serenity::builder::{CreateApplicationCommand, CreateApplicationCommands};
use serenity::http::Http;
use serenity::model::application::command::Command;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

#[async_trait]
pub trait SlashCommand: Send + Sync {
    fn name(&self) -> &'static str;

    fn register<'a>(&self, command: &'a mut CreateApplicationCommand) -> &'a mut CreateApplicationCommand;

    async fn run(
        &self,
        engine: &Arc<PollEngine>,
        ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> HandlerResult;
}

/// Name -> command lookup, fixed once the bot starts.
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Box<dyn SlashCommand>>,
}

impl CommandRegistry {
    pub fn new(commands: Vec<Box<dyn SlashCommand>>) -> Self {
        let commands = commands.into_iter().map(|c| (c.name(), c)).collect();
        Self { commands }
    }

    /// Every command the bot ships with.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(ping::PingCommand) as Box<dyn SlashCommand>,
            Box::new(poll::PollCommand),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&dyn SlashCommand> {
        self.commands.get(name).map(|c| &**c)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    /// Registers the commands for one guild (applied instantly) or globally.
    pub async fn register_all(&self, http: &Http, dev_guild: Option<GuildId>) -> Result<(), serenity::Error> {
        match dev_guild {
            Some(guild_id) => {
                guild_id
                    .set_application_commands(http, |commands| self.add_all(commands))
                    .await?;
            }
            None => {
                Command::set_global_application_commands(http, |commands| self.add_all(commands)).await?;
            }
        }
        Ok(())
    }

    fn add_all<'a>(&self, commands: &'a mut CreateApplicationCommands) -> &'a mut CreateApplicationCommands {
        for command in self.commands.values() {
            commands.create_application_command(|c| command.register(c));
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_knows_ping_and_poll() {
        let registry = CommandRegistry::standard();
        assert_eq!(registry.names(), vec!["ping", "poll"]);
        assert_eq!(registry.get("poll").map(|c| c.name()), Some("poll"));
        assert!(registry.get("vote").is_none());
    }
}
