//! Inert diagnostic component.
//!
//! Identifier shape: `dud[:<identifier>][?<options>]`. A plain dud swallows
//! the interaction silently; with `?debug` it replies with the component's
//! position, custom ID and any resolved select data, which is handy when
//! laying out component grids.

use serde_json::json;
use serenity::all::ComponentInteractionDataKind;
use serenity::async_trait;
use std::sync::Arc;

use crate::error::AppError;
use crate::model::reply::{Reply, ReplyEmbed, ReplyEmbedField};
use crate::pattern::{ComponentHandler, ComponentKind, Invocation, PatternEntry, RegexMatcher};
use crate::util::{find_component_position, find_select_menu};

pub fn entry() -> PatternEntry {
    PatternEntry::new("dud", Arc::new(Dud))
        .with_matcher(RegexMatcher::new(r"^dud(?::?[$&\w]*)?(?:\?[\w_]*)?"))
        .with_log_projector(|interaction| {
            let (identifier, debug) = deconstruct_input(&interaction.data.custom_id);
            let kind = ComponentKind::of(&interaction.data.kind)
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| "Unknown".to_string());

            let values = match &interaction.data.kind {
                ComponentInteractionDataKind::StringSelect { values } => Some(values.clone()),
                _ => None,
            };

            json!({
                "identifier": identifier,
                "debug": debug,
                "type": kind,
                "values": values,
            })
        })
}

/// Splits a dud custom ID into its inner identifier and the debug flag from
/// the query-ish option tail.
fn deconstruct_input(input: &str) -> (String, bool) {
    let mut parts = input.splitn(3, [':', '?']);
    let _routing_key = parts.next();
    let identifier = parts.next().unwrap_or_default().to_string();
    let options = parts.next().unwrap_or_default();

    let debug = options.split('&').any(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        key == "debug" && matches!(value.to_lowercase().as_str(), "" | "true" | "1")
    });

    (identifier, debug)
}

struct Dud;

#[async_trait]
impl ComponentHandler for Dud {
    async fn run(&self, invocation: &Invocation<'_>) -> Result<Option<Reply>, AppError> {
        let interaction = invocation.interaction;
        let custom_id = interaction.data.custom_id.as_str();
        let (identifier, debug) = deconstruct_input(custom_id);

        if !debug {
            return Ok(None);
        }

        let rows = &interaction.message.components;
        let (row, column) = find_component_position(rows, custom_id).ok_or_else(|| {
            AppError::InvalidComponent(
                "Originating message no longer carries this component".to_string(),
            )
        })?;

        let kind = ComponentKind::of(&interaction.data.kind)
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        let column_max = match ComponentKind::of(&interaction.data.kind) {
            Some(ComponentKind::Button) => 5,
            _ => 1,
        };

        let mut description = vec![
            format!("**Row**: {row} (Max 5)"),
            format!("**Column**: {column} (Max {column_max})"),
            format!("**Custom ID:** `{custom_id}`\n"),
        ];
        let mut fields = Vec::new();

        if let ComponentInteractionDataKind::StringSelect { values } = &interaction.data.kind {
            if let Some(menu) = find_select_menu(rows, custom_id) {
                let resolved: Vec<String> = values
                    .iter()
                    .filter_map(|value| {
                        menu.options.iter().find(|option| option.value == *value)
                    })
                    .map(|option| {
                        let mut line = format!("{} ({})", option.label, option.value);
                        if let Some(description) = &option.description {
                            line.push_str("\n> ");
                            line.push_str(description);
                        }
                        line
                    })
                    .collect();

                if !resolved.is_empty() {
                    fields.push(ReplyEmbedField {
                        name: "Resolved Data".to_string(),
                        value: resolved.join("\n"),
                        inline: false,
                    });
                }

                if let Some(min) = menu.min_values {
                    description.push(format!("**Min Values:** {min}"));
                }
                if let Some(max) = menu.max_values {
                    description.push(format!("**Max Values:** {max}"));
                }
                if let Some(placeholder) = &menu.placeholder {
                    description.push(format!("**Placeholder:** {placeholder}"));
                }
            }
        }

        Ok(Some(Reply {
            embeds: vec![ReplyEmbed {
                title: Some(format!("Debugging for `{identifier}` on {kind}")),
                description: Some(description.join("\n")),
                fields,
                ..ReplyEmbed::default()
            }],
            ephemeral: Some(true),
            ..Reply::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_dud_is_not_debug() {
        let (identifier, debug) = deconstruct_input("dud");
        assert_eq!(identifier, "");
        assert!(!debug);
    }

    #[test]
    fn debug_flag_variants() {
        assert!(deconstruct_input("dud:grid?debug").1);
        assert!(deconstruct_input("dud:grid?debug=true").1);
        assert!(deconstruct_input("dud:grid?debug=1").1);
        assert!(!deconstruct_input("dud:grid?debug=no").1);
        assert!(!deconstruct_input("dud:grid").1);
    }

    #[test]
    fn inner_identifier_is_extracted() {
        let (identifier, debug) = deconstruct_input("dud:left$3?debug");
        assert_eq!(identifier, "left$3");
        assert!(debug);
    }
}
