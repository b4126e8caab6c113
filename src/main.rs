mod commands;
mod config;
mod db;
mod engine;
mod handlers;
mod models;
mod notify;
mod render;
mod tasks;
mod voting;

#[cfg(test)]
mod testing;

use commands::CommandRegistry;
use config::Config;
use db::Database;
use engine::{PollEngine, SystemClock};
use log::{error, info};
use notify::DiscordNotifier;
use serenity::async_trait;
use serenity::http::Http;
use serenity::model::application::interaction::Interaction;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

struct Bot {
    engine: Arc<PollEngine>,
    registry: Arc<CommandRegistry>,
    dev_guild: Option<GuildId>,
    sweep_interval: Duration,
    // Ready fires again on every reconnect
    started: AtomicBool,
}

#[async_trait]
impl EventHandler for Bot {
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let engine = Arc::clone(&self.engine);
        let registry = Arc::clone(&self.registry);

        // Spawn a task to handle the interaction concurrently
        tokio::spawn(async move {
            handlers::handle_interaction(&engine, &registry, &ctx, interaction).await;
        });
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        match self.registry.register_all(&ctx.http, self.dev_guild).await {
            Ok(()) => match self.dev_guild {
                Some(guild) => info!("Registered slash commands {:?} in guild {}", self.registry.names(), guild),
                None => info!("Registered global slash commands {:?}", self.registry.names()),
            },
            Err(why) => error!("Failed to register slash commands: {:?}", why),
        }

        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        // Polls that outlived the last run
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            if let Err(e) = engine.recover().await {
                error!("Failed to recover stored polls: {}", e);
            }
        });

        let engine = Arc::clone(&self.engine);
        let period = self.sweep_interval;
        tokio::spawn(async move {
            tasks::poll_ender::check_expired_polls_task(engine, period).await;
        });
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    let database = match Database::new(&config.database_url).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return;
        }
    };

    let http = Arc::new(Http::new(&config.discord_token));
    let engine = Arc::new(PollEngine::new(
        database,
        Arc::new(DiscordNotifier::new(http)),
        Arc::new(SystemClock),
    ));

    let bot = Bot {
        engine,
        registry: Arc::new(CommandRegistry::standard()),
        dev_guild: config.dev_guild.map(GuildId),
        sweep_interval: config.sweep_interval,
        started: AtomicBool::new(false),
    };

    let intents = GatewayIntents::GUILDS;

    let mut client = match Client::builder(&config.discord_token, intents)
        .event_handler(bot)
        .await
    {
        Ok(client) => client,
        Err(why) => {
            error!("Error creating client: {:?}", why);
            return;
        }
    };

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }
}
