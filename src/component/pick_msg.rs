//! Message-pick select menu.
//!
//! Identifier shape: `pick-msg(&<restrictionRoleID>)*`; each option value
//! encodes `<owner/repo>[@<branch>][#<path>]`.
//!
//! Despite the menu allowing multiple values, only the first one found is
//! honored. Only one message can be returned to Discord at a time; merging
//! payloads is possible but risky at best given the limits imposed on the
//! response.

use serenity::all::ComponentInteractionDataKind;
use serenity::async_trait;
use std::sync::Arc;

use crate::component::MISSING_ROLES_MESSAGE;
use crate::error::AppError;
use crate::model::reply::Reply;
use crate::pattern::{ComponentHandler, ComponentKind, Invocation, PatternEntry, RegexMatcher};
use crate::util::content::parse_file_content;
use crate::util::{fetch_from_github, identifier, member_has_roles, resolve_message};

const DEFAULT_BRANCH: &str = "main";
const DEFAULT_PATH: &str = "README.md";

pub fn entry() -> PatternEntry {
    PatternEntry::new("pick-msg", Arc::new(PickMsg))
        .with_matcher(RegexMatcher::new(r"^pick-msg((?:&\d{17,21})*)$"))
        .require_kind(ComponentKind::StringSelect)
}

struct PickMsg;

#[async_trait]
impl ComponentHandler for PickMsg {
    async fn run(&self, invocation: &Invocation<'_>) -> Result<Option<Reply>, AppError> {
        let interaction = invocation.interaction;

        let values = match &interaction.data.kind {
            ComponentInteractionDataKind::StringSelect { values } => values.as_slice(),
            _ => &[],
        };
        let Some(picked) = values.first() else {
            return Ok(None);
        };

        // The option value has no routing key, so the leading token is the
        // repository itself; branch and path follow as positional args.
        let target = identifier::decode(picked);
        let repo = target.routing_key.as_str();
        let branch = target.arg(0).unwrap_or(DEFAULT_BRANCH);
        let path = target.arg(1).unwrap_or(DEFAULT_PATH);

        let restrictions = identifier::decode(&interaction.data.custom_id).restrictions;
        let member_roles = interaction
            .member
            .as_ref()
            .map(|member| member.roles.clone())
            .unwrap_or_default();
        if !member_has_roles(&member_roles, &restrictions) {
            return Ok(Some(Reply::ephemeral_text(MISSING_ROLES_MESSAGE)));
        }

        let file_content = fetch_from_github(invocation.rest, repo, branch, path).await?;
        let file_type = path.rsplit('.').next().unwrap_or_default();

        let reply = parse_file_content(&file_content, file_type)?;

        Ok(Some(resolve_message(reply, interaction)))
    }
}
