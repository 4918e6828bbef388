//! `/webhook` manages webhooks for the invoking server.

use serenity::all::{
    CommandInteraction, CommandOptionType, CreateCommand, CreateCommandOption, CreateEmbed,
    CreateInteractionResponse, CreateInteractionResponseMessage, CreateWebhook, Permissions,
    ResolvedOption, ResolvedValue, WebhookId,
};
use serenity::client::Context;
use secrecy::{ExposeSecret, Secret};

use crate::error::AppError;
use crate::util::undi;

pub fn register() -> CreateCommand {
    CreateCommand::new("webhook")
        .description("Manage webhooks for this server")
        .default_member_permissions(Permissions::MANAGE_WEBHOOKS)
        .add_option(
            CreateCommandOption::new(CommandOptionType::SubCommand, "create", "Create a webhook")
                .add_sub_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        "name",
                        "The name of the webhook",
                    )
                    .required(true),
                )
                .add_sub_option(CreateCommandOption::new(
                    CommandOptionType::Channel,
                    "channel",
                    "The channel to create the webhook in",
                )),
        )
        .add_option(
            CreateCommandOption::new(CommandOptionType::SubCommand, "delete", "Delete a webhook")
                .add_sub_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        "id",
                        "The ID of the webhook",
                    )
                    .required(true),
                ),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "list",
            "List all webhooks (owned by the bot).",
        ))
}

pub async fn run(ctx: &Context, interaction: &CommandInteraction) -> Result<(), AppError> {
    if !interaction
        .app_permissions
        .is_some_and(|permissions| permissions.manage_webhooks())
    {
        return respond(
            ctx,
            interaction,
            CreateInteractionResponseMessage::new()
                .content("I do not have the `MANAGE_WEBHOOKS` permission.")
                .ephemeral(true),
        )
        .await;
    }

    let options = interaction.data.options();
    let Some(subcommand) = options.first() else {
        return Err(AppError::InternalError(
            "webhook command invoked without a subcommand".to_string(),
        ));
    };
    let ResolvedValue::SubCommand(args) = &subcommand.value else {
        return Err(AppError::InternalError(
            "webhook command invoked without a subcommand".to_string(),
        ));
    };

    let response = match subcommand.name {
        "create" => create(ctx, interaction, args).await?,
        "delete" => delete(ctx, interaction, args).await?,
        "list" => list(ctx, interaction).await?,
        other => {
            return Err(AppError::InternalError(format!(
                "unknown webhook subcommand {other}"
            )))
        }
    };

    respond(ctx, interaction, response).await
}

async fn create(
    ctx: &Context,
    interaction: &CommandInteraction,
    args: &[ResolvedOption<'_>],
) -> Result<CreateInteractionResponseMessage, AppError> {
    let name = str_arg(args, "name").unwrap_or_default();
    let channel_id = args
        .iter()
        .find(|option| option.name == "channel")
        .and_then(|option| match &option.value {
            ResolvedValue::Channel(channel) => Some(channel.id),
            _ => None,
        })
        .unwrap_or(interaction.channel_id);

    let webhook = channel_id
        .create_webhook(&ctx.http, CreateWebhook::new(name))
        .await?;

    let description = [
        format!("**Name:** {}", webhook.name.as_deref().unwrap_or(name)),
        format!("**ID:** {}", webhook.id),
        format!("**Channel:** <#{channel_id}>"),
        format!(
            "**URL:** ||{}||",
            webhook_url(webhook.id, webhook.token.as_ref())
        ),
        "> Only show the URL to people you trust, as it can be used to send messages you may not want in your server.".to_string(),
    ]
    .join("\n");

    Ok(CreateInteractionResponseMessage::new()
        .embed(
            CreateEmbed::new()
                .title("Webhook created")
                .description(description),
        )
        .ephemeral(true))
}

async fn delete(
    ctx: &Context,
    interaction: &CommandInteraction,
    args: &[ResolvedOption<'_>],
) -> Result<CreateInteractionResponseMessage, AppError> {
    let id = str_arg(args, "id")
        .and_then(|raw| raw.parse::<u64>().ok())
        .map(WebhookId::new);

    let webhook = match id {
        Some(id) => ctx.http.get_webhook(id).await.ok(),
        None => None,
    };
    let Some(webhook) = webhook else {
        return Ok(CreateInteractionResponseMessage::new()
            .embed(
                CreateEmbed::new()
                    .title("Webhook not found")
                    .description("The webhook you provided does not exist."),
            )
            .ephemeral(true));
    };

    if webhook.guild_id != interaction.guild_id {
        return Ok(CreateInteractionResponseMessage::new()
            .embed(
                CreateEmbed::new()
                    .title("Error")
                    .description("That webhook does not belong to this server."),
            )
            .ephemeral(true));
    }

    let reason = format!("Requested by {}", undi(&interaction.user));
    ctx.http
        .delete_webhook(webhook.id, Some(&reason))
        .await?;

    Ok(CreateInteractionResponseMessage::new()
        .content("Webhook deleted.")
        .ephemeral(true))
}

async fn list(
    ctx: &Context,
    interaction: &CommandInteraction,
) -> Result<CreateInteractionResponseMessage, AppError> {
    let Some(guild_id) = interaction.guild_id else {
        return Ok(CreateInteractionResponseMessage::new()
            .content("This command can only be used in a server.")
            .ephemeral(true));
    };

    let webhooks = guild_id.webhooks(&ctx.http).await?;
    let description = webhooks
        .iter()
        .filter(|webhook| webhook.application_id == Some(interaction.application_id))
        .map(|webhook| {
            format!(
                "**{}** in <#{}> - ||{}||",
                webhook.name.as_deref().unwrap_or("unnamed"),
                webhook
                    .channel_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                webhook_url(webhook.id, webhook.token.as_ref())
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    Ok(CreateInteractionResponseMessage::new()
        .embed(CreateEmbed::new().title("Webhooks").description(description))
        .ephemeral(true))
}

async fn respond(
    ctx: &Context,
    interaction: &CommandInteraction,
    message: CreateInteractionResponseMessage,
) -> Result<(), AppError> {
    interaction
        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
        .await?;
    Ok(())
}

fn str_arg<'a>(args: &[ResolvedOption<'a>], name: &str) -> Option<&'a str> {
    args.iter().find(|option| option.name == name).and_then(
        |option| match &option.value {
            ResolvedValue::String(value) => Some(*value),
            _ => None,
        },
    )
}

/// Execute URL for a webhook. The token is wrapped in `Secret` and has to be
/// exposed explicitly; a token the API withheld renders as an empty tail.
fn webhook_url(id: WebhookId, token: Option<&Secret<String>>) -> String {
    format!(
        "https://discord.com/api/v10/webhooks/{id}/{}",
        token.map(|token| token.expose_secret().as_str()).unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_url_exposes_the_token() {
        let url = webhook_url(
            WebhookId::new(123456789012345678),
            Some(&Secret::new("abc-token".to_string())),
        );
        assert_eq!(
            url,
            "https://discord.com/api/v10/webhooks/123456789012345678/abc-token"
        );
    }

    #[test]
    fn webhook_url_without_token_has_an_empty_tail() {
        let url = webhook_url(WebhookId::new(123456789012345678), None);
        assert_eq!(url, "https://discord.com/api/v10/webhooks/123456789012345678/");
    }
}
