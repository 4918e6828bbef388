use serenity::all::GatewayIntents;
use serenity::Client;
use std::sync::Arc;

use crate::bot::Handler;
use crate::component;
use crate::config::Config;
use crate::error::AppError;
use crate::pattern::PatternRegistry;

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` takes precedence when set; otherwise the level falls back to
/// `info`, or `debug` when `COMMANDS_DEBUG=true`.
pub fn init_logging(config: &Config) {
    let default_level = if config.debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

/// Creates an HTTP client for external API requests (GitHub raw content).
pub fn setup_reqwest_client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Builds the component registry with every handler registered in match
/// priority order.
pub fn build_registry() -> Arc<PatternRegistry> {
    let mut registry = PatternRegistry::new();
    component::register_all(&mut registry);

    tracing::info!("Registered {} component patterns", registry.len());

    Arc::new(registry)
}

/// Creates the serenity client for the bot.
///
/// Interactions arrive over the gateway, so only the `GUILDS` intent is
/// needed. The returned client blocks on `start` until shutdown.
///
/// # Arguments
/// - `config` - Application configuration containing the bot token
/// - `handler` - Event handler carrying the shared application state
///
/// # Returns
/// - `Ok(Client)` - Configured client ready to start
/// - `Err(AppError)` - Client initialization failed
pub async fn init_bot(config: &Config, handler: Handler) -> Result<Client, AppError> {
    let intents = GatewayIntents::GUILDS;

    let client = Client::builder(&config.discord_bot_token, intents)
        .event_handler(handler)
        .await?;

    Ok(client)
}
