//! `/error` is the operator surface for the failure store.
//!
//! Registered only in the home guild and gated on administrator permission.
//! `get` and `all` inspect records, `clear` removes every record for one
//! origin (lifting its lockout), `wipe` empties the store.

use serenity::all::{
    CommandInteraction, CommandOptionType, Colour, CreateCommand, CreateCommandOption,
    CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage, Permissions,
    ResolvedOption, ResolvedValue, Timestamp,
};
use serenity::client::Context;

use crate::error::AppError;
use crate::service::error_tracking::ErrorRecord;
use crate::state::AppState;

const GREEN: Colour = Colour::new(0x00ff00);
const YELLOW: Colour = Colour::new(0xffff00);
const RED: Colour = Colour::new(0xff0000);

pub fn register() -> CreateCommand {
    CreateCommand::new("error")
        .description("Error management")
        .default_member_permissions(Permissions::ADMINISTRATOR)
        .dm_permission(false)
        .add_option(
            CreateCommandOption::new(CommandOptionType::SubCommand, "get", "Get error")
                .add_sub_option(
                    CreateCommandOption::new(CommandOptionType::String, "hash", "Error hash")
                        .required(true),
                )
                .add_sub_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        "origin",
                        "Error origin (either user ID or guild ID)",
                    )
                    .required(true),
                ),
        )
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "all",
                "List all errors for one origin (messages and hashes only).",
            )
            .add_sub_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "origin",
                    "Error origin (either user ID or guild ID)",
                )
                .required(true),
            ),
        )
        .add_option(
            CreateCommandOption::new(CommandOptionType::SubCommand, "clear", "Clear errors")
                .add_sub_option(
                    CreateCommandOption::new(CommandOptionType::String, "type", "Origin type")
                        .required(true)
                        .add_string_choice("User", "user")
                        .add_string_choice("Guild", "guild"),
                )
                .add_sub_option(CreateCommandOption::new(
                    CommandOptionType::String,
                    "origin",
                    "Error origin (either user ID or guild ID)",
                )),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "wipe",
            "Wipe all errors",
        ))
}

pub async fn run(
    state: &AppState,
    ctx: &Context,
    interaction: &CommandInteraction,
) -> Result<(), AppError> {
    let options = interaction.data.options();
    let Some(subcommand) = options.first() else {
        return Err(AppError::InternalError(
            "error command invoked without a subcommand".to_string(),
        ));
    };
    let ResolvedValue::SubCommand(args) = &subcommand.value else {
        return Err(AppError::InternalError(
            "error command invoked without a subcommand".to_string(),
        ));
    };

    let response = match subcommand.name {
        "get" => get(state, args).await,
        "all" => all(state, args).await,
        "clear" => clear(state, interaction, args).await,
        "wipe" => wipe(state).await,
        other => {
            return Err(AppError::InternalError(format!(
                "unknown error subcommand {other}"
            )))
        }
    };

    interaction
        .create_response(&ctx.http, CreateInteractionResponse::Message(response))
        .await?;

    Ok(())
}

async fn get(
    state: &AppState,
    args: &[ResolvedOption<'_>],
) -> CreateInteractionResponseMessage {
    let hash = str_arg(args, "hash").unwrap_or_default();
    let origin = str_arg(args, "origin").unwrap_or_default();

    let Some(record) = state.errors.get(&format!("{origin}-{hash}")).await else {
        return CreateInteractionResponseMessage::new()
            .content("Error not found.")
            .ephemeral(true);
    };

    CreateInteractionResponseMessage::new()
        .embed(record_embed(hash, &record))
        .ephemeral(true)
}

async fn all(state: &AppState, args: &[ResolvedOption<'_>]) -> CreateInteractionResponseMessage {
    let origin = str_arg(args, "origin").unwrap_or_default();
    let errors = state.errors.get_all_by(origin, true).await;

    if errors.is_empty() {
        return CreateInteractionResponseMessage::new()
            .content("No errors found.")
            .ephemeral(true);
    }

    let mut embed = CreateEmbed::new().title(format!("Errors for {origin}"));
    // Discord caps embeds at 25 fields.
    for (hash, record) in errors.iter().take(25) {
        embed = embed.field(hash.clone(), record.message.clone(), false);
    }

    CreateInteractionResponseMessage::new().embed(embed)
}

async fn clear(
    state: &AppState,
    interaction: &CommandInteraction,
    args: &[ResolvedOption<'_>],
) -> CreateInteractionResponseMessage {
    let origin_type = str_arg(args, "type").unwrap_or_default();

    let origin = match (origin_type, str_arg(args, "origin")) {
        (_, Some(origin)) => Some(origin.to_string()),
        ("user", None) => Some(interaction.user.id.to_string()),
        ("guild", None) => interaction.guild_id.map(|id| id.to_string()),
        _ => None,
    };
    let Some(origin) = origin else {
        return CreateInteractionResponseMessage::new()
            .content("Invalid type.")
            .ephemeral(true);
    };

    let errors = state.errors.get_all_by(&origin, false).await;
    if errors.is_empty() {
        return CreateInteractionResponseMessage::new()
            .content("No errors found.")
            .ephemeral(true);
    }

    for (hash, _) in &errors {
        state.errors.remove(hash).await;
    }

    let label = match origin_type {
        "user" => format!("<@{origin}> (user)"),
        _ => format!("{origin} (guild)"),
    };

    CreateInteractionResponseMessage::new()
        .content(format!("Cleared all errors for {label}."))
        .ephemeral(true)
}

async fn wipe(state: &AppState) -> CreateInteractionResponseMessage {
    state.errors.clear().await;

    CreateInteractionResponseMessage::new().embed(
        CreateEmbed::new()
            .title("Cleared errors")
            .description("All errors have been cleared.")
            .colour(GREEN)
            .timestamp(Timestamp::now()),
    )
}

fn record_embed(hash: &str, record: &ErrorRecord) -> CreateEmbed {
    let invocations = if record.invocations.is_empty() {
        "No additional invocations.".to_string()
    } else {
        record
            .invocations
            .iter()
            .map(|invocation| {
                format!(
                    "<@{}> - <t:{}:F>",
                    invocation.user,
                    invocation.timestamp.timestamp()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    CreateEmbed::new()
        .colour(invocation_colour(record.invocations.len()))
        .title("Error")
        .description(format!("```json\n{}\n```", record.stack))
        .field("Hash", hash.to_string(), true)
        .field(
            "Origin",
            [
                format!("User: <@{}>", record.origin.user),
                format!("Channel: <#{}>", record.origin.channel),
                format!("Guild: {}", record.origin.guild),
            ]
            .join("\n"),
            true,
        )
        .field(
            "Timestamp",
            format!("<t:{}:F>", record.first_seen.timestamp()),
            true,
        )
        .field("Invocations", invocations, false)
}

/// Color scales with how often the failure recurred: quiet records stay
/// green, a busy one goes red.
fn invocation_colour(invocations: usize) -> Colour {
    match invocations {
        0..=2 => GREEN,
        3 => YELLOW,
        _ => RED,
    }
}

fn str_arg<'a>(args: &[ResolvedOption<'a>], name: &str) -> Option<&'a str> {
    args.iter().find(|option| option.name == name).and_then(
        |option| match &option.value {
            ResolvedValue::String(value) => Some(*value),
            _ => None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colour_scales_with_invocation_count() {
        assert_eq!(invocation_colour(0), GREEN);
        assert_eq!(invocation_colour(2), GREEN);
        assert_eq!(invocation_colour(3), YELLOW);
        assert_eq!(invocation_colour(5), RED);
        assert_eq!(invocation_colour(40), RED);
    }
}
