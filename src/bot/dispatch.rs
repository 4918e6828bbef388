//! Component interaction dispatcher.
//!
//! Each inbound component interaction walks a fixed pipeline: lockout gate,
//! registry resolution, pre-invoke logging, handler execution, then exactly
//! one user-visible outcome. Failures are hashed into the error store and
//! reported with a correlation hash; they are never swallowed.

use serenity::all::{ComponentInteraction, CreateInteractionResponse};
use serenity::client::Context;

use crate::error::AppError;
use crate::model::reply::{Reply, ReplyEmbed, ReplyEmbedAuthor, ReplyEmbedField};
use crate::pattern::{ComponentKind, Invocation, PatternEntry};
use crate::service::error_tracking::{ErrorRecord, Origin};
use crate::state::AppState;
use crate::util::{format_log_fields, undi};

const LOCKOUT_MESSAGE: &str = "Error lockout in effect, contact an engineer to unlock.";
const INVALID_MESSAGE: &str = "Invalid component interaction.";

/// What the pre-handler stages decided for one interaction.
pub enum Routing<'a> {
    /// The origin is locked out; no handler runs.
    Locked,
    /// No registry entry matched the identifier and kind.
    Unmatched,
    /// Run this entry's handler.
    Run(&'a PatternEntry),
}

/// Lock check then registry resolution, in that order. A locked origin is
/// rejected before any pattern matching happens.
pub async fn route<'a>(
    state: &'a AppState,
    scope: &str,
    identifier: &str,
    kind: Option<ComponentKind>,
) -> Routing<'a> {
    if state.errors.is_locked(scope).await {
        return Routing::Locked;
    }

    let Some(kind) = kind else {
        return Routing::Unmatched;
    };

    match state.registry.resolve(identifier, kind) {
        Some(entry) => Routing::Run(entry),
        None => Routing::Unmatched,
    }
}

/// Runs the full dispatch pipeline for one component interaction.
pub async fn dispatch_component(
    state: &AppState,
    ctx: &Context,
    interaction: &ComponentInteraction,
) {
    let identifier = interaction.data.custom_id.as_str();
    let actor = undi(&interaction.user);

    tracing::info!("{actor} attempting to use {identifier}");

    let origin = Origin::new(
        interaction.guild_id,
        interaction.channel_id,
        interaction.user.id,
    );
    let scope = state.errors.scope_key(&origin);
    let kind = ComponentKind::of(&interaction.data.kind);

    match route(state, &scope, identifier, kind).await {
        Routing::Locked => {
            send_reply(ctx, interaction, Reply::ephemeral_text(LOCKOUT_MESSAGE)).await;
        }
        Routing::Unmatched => {
            tracing::warn!("{actor} hit unroutable identifier {identifier}");
            send_reply(ctx, interaction, Reply::ephemeral_text(INVALID_MESSAGE)).await;
        }
        Routing::Run(entry) => {
            // Logged before the handler so a crash mid-handler still leaves a
            // trail of what was attempted.
            match entry.log_fields(interaction) {
                Some(fields) => tracing::info!(
                    "{actor} in {} running {} ({})",
                    interaction.channel_id,
                    entry.command(),
                    format_log_fields(&fields)
                ),
                None => tracing::info!(
                    "{actor} in {} running {}",
                    interaction.channel_id,
                    entry.command()
                ),
            }

            let invocation = Invocation {
                ctx,
                interaction,
                rest: &state.http_client,
            };

            match entry.handler().run(&invocation).await {
                Ok(None) => acknowledge(ctx, interaction).await,
                Ok(Some(reply)) => send_reply(ctx, interaction, reply).await,
                Err(error) => {
                    let (hash, record) = state.errors.add(&origin, &error).await;
                    report_failure(ctx, interaction, &hash, &record, &error).await;
                }
            }
        }
    }
}

/// Acknowledges the interaction with no visible message.
async fn acknowledge(ctx: &Context, interaction: &ComponentInteraction) {
    if let Err(error) = interaction
        .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
        .await
    {
        tracing::error!("Failed to acknowledge interaction: {error:?}");
    }
}

/// Sends a handler reply.
///
/// Replies marked ephemeral go out as the initial response, falling back to a
/// follow-up when the interaction already got one (an interaction may receive
/// only a single initial response). Unmarked replies edit the message the
/// component lives on.
async fn send_reply(ctx: &Context, interaction: &ComponentInteraction, mut reply: Reply) {
    reply.normalize_timestamps();

    let result = if reply.is_marked_ephemeral() {
        let initial = interaction
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(reply.clone().into_response_message()),
            )
            .await;

        match initial {
            Ok(()) => Ok(()),
            Err(_) => interaction
                .create_followup(&ctx.http, reply.into_followup())
                .await
                .map(|_| ()),
        }
    } else {
        interaction
            .create_response(
                &ctx.http,
                CreateInteractionResponse::UpdateMessage(reply.into_response_message()),
            )
            .await
    };

    if let Err(error) = result {
        tracing::error!("Failed to respond to component interaction: {error:?}");
    }
}

/// Sends the fixed-shape developer report for a hard handler failure.
async fn report_failure(
    ctx: &Context,
    interaction: &ComponentInteraction,
    hash: &str,
    record: &ErrorRecord,
    error: &AppError,
) {
    let (origin, digest) = hash.split_once('-').unwrap_or((hash, hash));

    tracing::error!("Error in {origin} (Error Hash: {digest}): {error:?}");

    let invocations = match record.invocations.last() {
        Some(last) => format!(
            "This has been invoked an additional {} times. The most recent invocation was at <t:{}:F>.",
            record.invocations.len(),
            last.timestamp.timestamp()
        ),
        None => "No additional invocations found.".to_string(),
    };

    let reply = Reply {
        content: Some(
            [
                "An error occurred while processing your request. Please report this error to the bot owner:".to_string(),
                format!("> Origin: {origin}"),
                format!("> Hash: `{digest}`"),
            ]
            .join("\n"),
        ),
        embeds: vec![ReplyEmbed {
            title: Some("Developer Information".to_string()),
            author: Some(ReplyEmbedAuthor {
                name: undi(&interaction.user),
                icon_url: Some(interaction.user.face()),
            }),
            fields: vec![
                ReplyEmbedField {
                    name: "Origin".to_string(),
                    value: format!("```json\n\"{origin}\"```"),
                    inline: false,
                },
                ReplyEmbedField {
                    name: "Message".to_string(),
                    value: record.message.clone(),
                    inline: true,
                },
                ReplyEmbedField {
                    name: "Invocations".to_string(),
                    value: invocations,
                    inline: true,
                },
            ],
            ..ReplyEmbed::default()
        }],
        ephemeral: Some(true),
        ..Reply::default()
    };

    send_reply(ctx, interaction, reply).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::all::{ChannelId, GuildId, UserId};
    use serenity::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::pattern::{ComponentHandler, PatternRegistry, RegexMatcher};
    use crate::service::error_tracking::{ErrorStore, ScopePolicy, LOCKOUT_THRESHOLD};

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ComponentHandler for CountingHandler {
        async fn run(&self, _invocation: &Invocation<'_>) -> Result<Option<Reply>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    fn state_with_counter(calls: Arc<AtomicUsize>) -> AppState {
        let mut registry = PatternRegistry::new();
        registry.register(
            PatternEntry::new("btn-role", Arc::new(CountingHandler { calls }))
                .with_matcher(RegexMatcher::new(r"^btn-role:(\d{17,21})((?:&\d{17,21})*)$"))
                .require_kind(ComponentKind::Button),
        );

        AppState::new(
            Arc::new(registry),
            ErrorStore::new(ScopePolicy::default()),
            reqwest::Client::new(),
            None,
        )
    }

    fn origin() -> Origin {
        Origin::new(
            Some(GuildId::new(900000000000000001)),
            ChannelId::new(100000000000000001),
            UserId::new(200000000000000001),
        )
    }

    #[tokio::test]
    async fn locked_origin_never_reaches_the_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = state_with_counter(calls.clone());
        let origin = origin();
        let scope = state.errors.scope_key(&origin);

        for i in 0..LOCKOUT_THRESHOLD {
            state
                .errors
                .add(&origin, &AppError::InternalError(format!("failure {i}")))
                .await;
        }

        let routing = route(
            &state,
            &scope,
            "btn-role:123456789012345678",
            Some(ComponentKind::Button),
        )
        .await;

        assert!(matches!(routing, Routing::Locked));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unlocked_origin_routes_to_the_matching_entry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = state_with_counter(calls);
        let origin = origin();
        let scope = state.errors.scope_key(&origin);

        let routing = route(
            &state,
            &scope,
            "btn-role:123456789012345678",
            Some(ComponentKind::Button),
        )
        .await;

        match routing {
            Routing::Run(entry) => assert_eq!(entry.command(), "btn-role"),
            _ => panic!("expected a matched entry"),
        }
    }

    #[tokio::test]
    async fn wrong_kind_and_malformed_identifiers_miss() {
        let state = state_with_counter(Arc::new(AtomicUsize::new(0)));
        let scope = state.errors.scope_key(&origin());

        let by_kind = route(
            &state,
            &scope,
            "btn-role:123456789012345678",
            Some(ComponentKind::StringSelect),
        )
        .await;
        assert!(matches!(by_kind, Routing::Unmatched));

        let by_shape = route(&state, &scope, "btn-role:nope", Some(ComponentKind::Button)).await;
        assert!(matches!(by_shape, Routing::Unmatched));

        let by_component = route(&state, &scope, "btn-role:123456789012345678", None).await;
        assert!(matches!(by_component, Routing::Unmatched));
    }

    #[tokio::test]
    async fn lockout_outranks_routing_misses() {
        let state = state_with_counter(Arc::new(AtomicUsize::new(0)));
        let origin = origin();
        let scope = state.errors.scope_key(&origin);

        for i in 0..LOCKOUT_THRESHOLD {
            state
                .errors
                .add(&origin, &AppError::InternalError(format!("failure {i}")))
                .await;
        }

        // Even an unroutable identifier reports the lockout, not a miss.
        let routing = route(&state, &scope, "garbage", Some(ComponentKind::Button)).await;
        assert!(matches!(routing, Routing::Locked));
    }
}
