//! GitHub-backed message button.
//!
//! Identifier shape: `btn-msg:<owner/repo>[@<branch>][#<path>](&<roleID>)*`.
//! The button fetches a payload file from the repository's raw endpoint,
//! parses it by extension and replies with the resolved message. Branch
//! defaults to `main`, path to `README.md`.

use serde_json::json;
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
    PatternEntry::new("btn-msg", Arc::new(BtnMsg))
        .with_matcher(RegexMatcher::new(
            r"^btn-msg:([^@]+)@([^#]+)#([a-zA-Z0-9_\-/]+\.(?:ya?ml|json|md))((?:&\d{17,19})*)?$",
        ))
        .require_kind(ComponentKind::Button)
        .with_log_projector(|interaction| {
            let decoded = identifier::decode(&interaction.data.custom_id);
            json!({
                "repo": decoded.arg(0),
                "branch": decoded.arg(1),
                "path": decoded.arg(2),
                "restrictions": decoded.restrictions.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
            })
        })
}

struct BtnMsg;

#[async_trait]
impl ComponentHandler for BtnMsg {
    async fn run(&self, invocation: &Invocation<'_>) -> Result<Option<Reply>, AppError> {
        let interaction = invocation.interaction;
        let decoded = identifier::decode(&interaction.data.custom_id);

        let repo = decoded.arg(0).ok_or_else(|| {
            AppError::InvalidComponent("btn-msg identifier without a repository".to_string())
        })?;
        let branch = decoded.arg(1).unwrap_or(DEFAULT_BRANCH);
        let path = decoded.arg(2).unwrap_or(DEFAULT_PATH);

        let member_roles = interaction
            .member
            .as_ref()
            .map(|member| member.roles.clone())
            .unwrap_or_default();
        if !member_has_roles(&member_roles, &decoded.restrictions) {
            return Ok(Some(Reply::ephemeral_text(MISSING_ROLES_MESSAGE)));
        }

        let file_content = fetch_from_github(invocation.rest, repo, branch, path).await?;
        let file_type = path.rsplit('.').next().unwrap_or_default();

        let reply = parse_file_content(&file_content, file_type)?;

        Ok(Some(resolve_message(reply, interaction)))
    }
}
