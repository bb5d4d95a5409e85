mod commands;
mod config;
mod constants;
mod database;
mod games;
mod handlers;
mod metrics;
mod models;
mod music;
mod options;
mod pets;
mod schedule;
mod services;
mod utils;

use poise::serenity_prelude as serenity;
use songbird::SerenityInit;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::{
    commands::build_registry,
    config::Config,
    constants::LOG_DIRECTIVE,
    database::Database,
    metrics::{CATEGORIES, COMMAND_LATENCY, COMMANDS, PROMETHEUS},
    models::{Context, Data, Error},
    options::guild::build_option_registry,
    schedule::start_schedule_manager,
};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    initialize_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let db = match Database::new(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    let data = Data::new(db, config, build_option_registry());
    if let Err(e) = data.load_from_database().await {
        error!("Failed to load data from database: {}", e);
    }

    metrics::init();
    if let Some(port) = data.config.prometheus_port
        && let Err(e) = PROMETHEUS.enable(port).await
    {
        error!("Failed to start metrics exporter on port {}: {}", port, e);
    }

    data.birthdays.spawn_refresh_task(
        data.db.clone(),
        Duration::from_secs(data.config.birthday_refresh_hours * 60 * 60),
    );

    if let Err(e) = start_bot(data).await {
        error!("Bot error: {}", e);
        PROMETHEUS.disable().await;
        std::process::exit(1);
    }
    PROMETHEUS.disable().await;
}

fn initialize_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(LOG_DIRECTIVE.parse().expect("valid log directive")),
        )
        .init();
}

/// Count the command and its category, and remember when it started
async fn pre_command(ctx: Context<'_>) {
    let command = ctx.command();
    let category = ctx
        .parent_commands()
        .first()
        .map(|parent| parent.category.clone())
        .unwrap_or_else(|| command.category.clone());

    COMMANDS
        .with_label_values(&[&command.qualified_name])
        .inc();
    if let Some(category) = category {
        CATEGORIES.with_label_values(&[&category]).inc();
    }
    ctx.set_invocation_data(Instant::now()).await;
}

async fn post_command(ctx: Context<'_>) {
    if let Some(started) = ctx.invocation_data::<Instant>().await {
        COMMAND_LATENCY.observe(started.elapsed().as_secs_f64());
    }
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(
                "Command {} failed for {}: {}",
                ctx.command().qualified_name,
                ctx.author().id,
                error
            );
            if let Err(e) = ctx
                .say("❌ Something went wrong while running this command")
                .await
            {
                warn!("Failed to report command error: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Failed to handle framework error: {}", e);
            }
        }
    }
}

/// Create and start the Discord bot
async fn start_bot(data: Data) -> Result<(), Error> {
    let token = data.config.discord_token.clone();
    let dev_guild_id = data.config.dev_guild_id;
    let data = Arc::new(data);
    let data_for_setup = Arc::clone(&data);

    let registry = build_registry();
    info!("Registered {} commands", registry.len());

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: registry.into_commands(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(data.config.prefix.clone()),
                dynamic_prefix: Some(|ctx| {
                    Box::pin(async move {
                        Ok(ctx
                            .guild_id
                            .and_then(|guild_id| ctx.data.prefixes.get(&guild_id))
                            .map(|prefix| prefix.clone()))
                    })
                }),
                ..Default::default()
            },
            pre_command: |ctx| Box::pin(pre_command(ctx)),
            post_command: |ctx| Box::pin(post_command(ctx)),
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            start_schedule_manager(
                ctx.http.clone(),
                ctx.cache.clone(),
                Arc::clone(&data_for_setup),
            );
            metrics::start_gauge_updater(ctx.cache.clone());

            Box::pin(async move {
                if let Some(guild_id) = dev_guild_id {
                    let guild = serenity::GuildId::new(guild_id);
                    info!("Registering commands in development guild {}", guild_id);
                    poise::builtins::register_in_guild(ctx, &framework.options().commands, guild)
                        .await?;
                } else {
                    info!("Registering commands globally (may take up to 1 hour)");
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                }

                info!("Bot is ready!");
                Ok((*data_for_setup).clone())
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .register_songbird()
        .await?;

    info!("Starting bot...");
    client.start().await?;

    Ok(())
}
