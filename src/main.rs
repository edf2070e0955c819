use std::sync::Arc;

use config::Config;
use database::Database;
use event_manager::BotEvents;
use relay::MemberLocks;
use serenity::{Client, all::GatewayIntents};
use tracing::{error, info};
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

mod commands;
mod config;
mod database;
mod error;
mod event_manager;
mod model;
mod relay;

#[tokio::main]
async fn main() {
    drop(dotenvy::dotenv());

    let _sentry = sentry::init((
        std::env::var("SENTRY_DSN").ok(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ));
    tracing_subscriber::registry()
        .with(LevelFilter::INFO)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry::integrations::tracing::layer())
        .init();

    let config = match Config::load() {
        Ok(config) => Arc::new(config),
        Err(why) => {
            error!("Couldn't load config: {why}");
            std::process::exit(1);
        },
    };

    let db = match Database::setup(&config.database).await {
        Ok(db) => db,
        Err(why) => {
            error!("Couldn't set up database: {why}");
            std::process::exit(1);
        },
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = match Client::builder(&config.token, intents)
        .event_handler(BotEvents {
            db,
            config: config.clone(),
            locks: MemberLocks::default(),
        })
        .await
    {
        Ok(client) => client,
        Err(why) => {
            error!("Couldn't create client: {why}");
            std::process::exit(1);
        },
    };

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(why) = tokio::signal::ctrl_c().await {
            error!("Couldn't listen for ctrl-c: {why}");
            return;
        }
        info!("Shutting down...");
        shard_manager.shutdown_all().await;
    });

    info!("Connecting to Discord...");
    if let Err(why) = client.start().await {
        error!("Client error: {why}");
    }
}
