//! Slash command definitions and dispatch.

pub mod error;
pub mod webhook;

use serenity::all::{
    CommandInteraction, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage,
};
use serenity::client::Context;

use crate::state::AppState;
use crate::util::undi;

/// Routes a command interaction to its handler and reports failures back to
/// the invoker.
pub async fn dispatch_command(state: &AppState, ctx: &Context, interaction: &CommandInteraction) {
    let name = interaction.data.name.as_str();
    tracing::info!("{} ran command {name}", undi(&interaction.user));

    let result = match name {
        "error" => error::run(state, ctx, interaction).await,
        "webhook" => webhook::run(ctx, interaction).await,
        other => {
            tracing::warn!("Received unknown command {other}");
            return;
        }
    };

    if let Err(err) = result {
        tracing::error!("Command {name} failed: {err:?}");

        let content = format!("An error occurred: {err}");
        let initial = interaction
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(content.clone())
                        .ephemeral(true),
                ),
            )
            .await;

        if initial.is_err() {
            let _ = interaction
                .create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new()
                        .content(content)
                        .ephemeral(true),
                )
                .await;
        }
    }
}
