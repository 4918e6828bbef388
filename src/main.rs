mod bot;
mod command;
mod component;
mod config;
mod error;
mod model;
mod pattern;
mod service;
mod startup;
mod state;
mod util;

use crate::bot::Handler;
use crate::config::Config;
use crate::error::AppError;
use crate::service::error_tracking::ErrorStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    startup::init_logging(&config);

    let registry = startup::build_registry();
    let http_client = startup::setup_reqwest_client();
    let errors = ErrorStore::new(config.lockout_scope);

    let state = AppState::new(registry, errors, http_client, config.home_guild_id);

    tracing::info!("Starting Discord bot...");

    let mut client = startup::init_bot(&config, Handler { state }).await?;

    // Blocks until shutdown.
    client.start().await?;

    Ok(())
}
