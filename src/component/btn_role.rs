//! Role-toggle button.
//!
//! Identifier shape: `btn-role:<roleID>(&<restrictionRoleID>)*`. Pressing the
//! button toggles the encoded role on the invoking member, provided they hold
//! every restriction role. A member who lost the restriction roles while
//! still holding the button's role has it revoked; the role is never granted
//! to a member who does not qualify.

use serenity::all::EditMember;
use serenity::async_trait;
use std::sync::Arc;

use crate::component::{GUILD_ONLY_MESSAGE, MISSING_ROLES_MESSAGE};
use crate::error::AppError;
use crate::model::reply::Reply;
use crate::pattern::{ComponentHandler, ComponentKind, Invocation, PatternEntry, RegexMatcher};
use crate::util::{identifier, member_has_roles};

pub fn entry() -> PatternEntry {
    PatternEntry::new("btn-role", Arc::new(BtnRole))
        .with_matcher(RegexMatcher::new(r"^btn-role:(\d{17,21})((?:&\d{17,21})*)$"))
        .require_kind(ComponentKind::Button)
}

struct BtnRole;

#[async_trait]
impl ComponentHandler for BtnRole {
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

        let decoded = identifier::decode(&interaction.data.custom_id);
        let role = decoded
            .arg(0)
            .and_then(|arg| arg.parse::<u64>().ok())
            .map(serenity::all::RoleId::new)
            .ok_or_else(|| {
                AppError::InvalidComponent(format!(
                    "Invalid role match ({:?})",
                    decoded.arg(0)
                ))
            })?;

        let mut roles = member.roles.clone();

        if !member_has_roles(&roles, &decoded.restrictions) {
            // A member who no longer qualifies loses the role if they still
            // hold it; either way they get the denial, not the toggle.
            if roles.contains(&role) {
                roles.retain(|held| *held != role);
                guild_id
                    .edit_member(
                        &invocation.ctx.http,
                        interaction.user.id,
                        EditMember::new().roles(roles),
                    )
                    .await?;
            }

            return Ok(Some(Reply::ephemeral_text(MISSING_ROLES_MESSAGE)));
        }

        let action = if roles.contains(&role) {
            roles.retain(|held| *held != role);
            "removed"
        } else {
            roles.push(role);
            "added"
        };

        guild_id
            .edit_member(
                &invocation.ctx.http,
                interaction.user.id,
                EditMember::new().roles(roles),
            )
            .await?;

        Ok(Some(Reply {
            content: Some(format!("I have {action} the <@&{role}> role to you.")),
            ephemeral: Some(true),
            allowed_mention_roles: vec![role],
            ..Reply::default()
        }))
    }
}
