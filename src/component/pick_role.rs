//! Role-pick select menu.
//!
//! Identifier shape: `pick-role(&<restrictionRoleID>)*`. The menu's option
//! values are role IDs; a submit syncs the member's roles to the selection,
//! adding what was picked and removing what was deselected.

use serde_json::json;
use serenity::all::{ComponentInteractionDataKind, EditMember, RoleId};
use serenity::async_trait;
use std::sync::Arc;

use crate::component::{GUILD_ONLY_MESSAGE, MISSING_ROLES_MESSAGE};
use crate::error::AppError;
use crate::model::reply::{Reply, ReplyEmbed, ReplyEmbedField};
use crate::pattern::{ComponentHandler, ComponentKind, Invocation, PatternEntry, RegexMatcher};
use crate::util::{find_select_menu, identifier, member_has_roles};

pub fn entry() -> PatternEntry {
    PatternEntry::new("pick-role", Arc::new(PickRole))
        .with_matcher(RegexMatcher::new(r"^pick-role((?:&\d{17,21})*)$"))
        .require_kind(ComponentKind::StringSelect)
        .with_log_projector(|interaction| match &interaction.data.kind {
            ComponentInteractionDataKind::StringSelect { values } => json!({ "values": values }),
            _ => json!({}),
        })
}

struct PickRole;

#[async_trait]
impl ComponentHandler for PickRole {
    async fn run(&self, invocation: &Invocation<'_>) -> Result<Option<Reply>, AppError> {
        let interaction = invocation.interaction;

        let Some(guild_id) = interaction.guild_id else {
            return Ok(Some(Reply::ephemeral_text(GUILD_ONLY_MESSAGE)));
        };
        let Some(member) = interaction.member.as_ref() else {
            return Err(AppError::InvalidComponent(
                "Guild interaction without member data".to_string(),
            ));
        };

        if !interaction
            .app_permissions
            .is_some_and(|permissions| permissions.manage_roles())
        {
            return Err(AppError::MissingBotPermission("Manage Roles"));
        }

        let restrictions = identifier::decode(&interaction.data.custom_id).restrictions;
        if !member_has_roles(&member.roles, &restrictions) {
            return Ok(Some(Reply::ephemeral_text(MISSING_ROLES_MESSAGE)));
        }

        let menu = find_select_menu(&interaction.message.components, &interaction.data.custom_id)
            .ok_or_else(|| {
            AppError::InvalidComponent(
                "Originating message no longer carries this select menu".to_string(),
            )
        })?;

        let values = match &interaction.data.kind {
            ComponentInteractionDataKind::StringSelect { values } => values.clone(),
            _ => Vec::new(),
        };

        let mut roles = member.roles.clone();
        let mut added: Vec<RoleId> = Vec::new();
        let mut removed: Vec<RoleId> = Vec::new();

        for option in &menu.options {
            let Ok(role) = option.value.parse::<u64>().map(RoleId::new) else {
                continue;
            };

            let selected = values.contains(&option.value);
            let held = roles.contains(&role);

            if selected && !held {
                roles.push(role);
                added.push(role);
            } else if !selected && held {
                roles.retain(|existing| *existing != role);
                removed.push(role);
            }
        }

        guild_id
            .edit_member(
                &invocation.ctx.http,
                interaction.user.id,
                EditMember::new().roles(roles),
            )
            .await?;

        let mut allowed = added.clone();
        allowed.extend(&removed);

        Ok(Some(Reply {
            content: Some("Roles updated.".to_string()),
            ephemeral: Some(true),
            allowed_mention_roles: allowed,
            embeds: vec![ReplyEmbed {
                title: Some("Roles updated".to_string()),
                fields: vec![
                    ReplyEmbedField {
                        name: "Added".to_string(),
                        value: mention_list(&added),
                        inline: true,
                    },
                    ReplyEmbedField {
                        name: "Removed".to_string(),
                        value: mention_list(&removed),
                        inline: true,
                    },
                ],
                ..ReplyEmbed::default()
            }],
            ..Reply::default()
        }))
    }
}

fn mention_list(roles: &[RoleId]) -> String {
    if roles.is_empty() {
        return "None".to_string();
    }

    roles
        .iter()
        .map(|role| format!("<@&{role}>"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mention_list_renders_none_and_mentions() {
        assert_eq!(mention_list(&[]), "None");
        assert_eq!(
            mention_list(&[RoleId::new(111111111111111111), RoleId::new(222222222222222222)]),
            "<@&111111111111111111>\n<@&222222222222222222>"
        );
    }
}
