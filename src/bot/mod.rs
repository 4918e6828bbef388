//! Discord gateway event handling.

pub mod dispatch;

use serenity::all::{Command, Context, EventHandler, Interaction, Ready};
use serenity::async_trait;

use crate::command;
use crate::state::AppState;

/// Discord bot event handler
pub struct Handler {
    pub state: AppState,
}

#[async_trait]
impl EventHandler for Handler {
    /// Called when the bot is ready and connected to Discord
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!("{} is connected to Discord!", ready.user.name);

        if let Err(e) = Command::create_global_command(&ctx.http, command::webhook::register()).await
        {
            tracing::error!("Failed to register the webhook command: {e:?}");
        }

        // The error command stays out of the global set; it is only usable in
        // the configured home guild.
        if let Some(guild_id) = self.state.home_guild_id {
            if let Err(e) = guild_id
                .set_commands(&ctx.http, vec![command::error::register()])
                .await
            {
                tracing::error!("Failed to register home guild commands: {e:?}");
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Component(interaction) => {
                dispatch::dispatch_component(&self.state, &ctx, &interaction).await;
            }
            Interaction::Command(interaction) => {
                command::dispatch_command(&self.state, &ctx, &interaction).await;
            }
            _ => {}
        }
    }
}
