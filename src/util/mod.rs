//! Shared helpers for component handlers.

pub mod content;
pub mod identifier;

use serenity::all::{
    ActionRow, ActionRowComponent, ButtonKind, ComponentInteraction, MessageFlags, RoleId,
    SelectMenu, User,
};

use crate::error::AppError;
use crate::model::reply::{Reply, COMPONENT_TYPE_BUTTON, COMPONENT_TYPE_STRING_SELECT};

/// If `required` is empty, it should return true. Else, it should return true
/// if the member has all the roles.
///
/// *i.e. no roles means there should be nothing to hide.*
pub fn member_has_roles(member_roles: &[RoleId], required: &[RoleId]) -> bool {
    required.iter().all(|role| member_roles.contains(role))
}

/// `username#discriminator (id)` for log lines and report embeds.
pub fn undi(user: &User) -> String {
    format!("{} ({})", user.tag(), user.id)
}

/// Finds the row and column of the component whose custom ID starts with `id`.
pub fn find_component_position(rows: &[ActionRow], id: &str) -> Option<(usize, usize)> {
    for (row_index, row) in rows.iter().enumerate() {
        for (component_index, component) in row.components.iter().enumerate() {
            let custom_id = match component {
                ActionRowComponent::Button(button) => match &button.data {
                    ButtonKind::NonLink { custom_id, .. } => custom_id.as_str(),
                    _ => continue,
                },
                ActionRowComponent::SelectMenu(menu) => match &menu.custom_id {
                    Some(custom_id) => custom_id.as_str(),
                    None => continue,
                },
                _ => continue,
            };

            if custom_id.starts_with(id) {
                return Some((row_index, component_index));
            }
        }
    }

    None
}

/// Finds the select menu whose custom ID starts with `id`.
pub fn find_select_menu<'a>(rows: &'a [ActionRow], id: &str) -> Option<&'a SelectMenu> {
    rows.iter()
        .flat_map(|row| row.components.iter())
        .find_map(|component| match component {
            ActionRowComponent::SelectMenu(menu)
                if menu
                    .custom_id
                    .as_deref()
                    .is_some_and(|cid| cid.starts_with(id)) =>
            {
                Some(menu)
            }
            _ => None,
        })
}

/// Fetches a file from GitHub's raw endpoint; the repo is expected to be
/// public.
///
/// # Arguments
/// - `repo` - The repository name, in the format of `owner/repo`
/// - `branch` - The branch name
/// - `path` - The path to the file
pub async fn fetch_from_github(
    client: &reqwest::Client,
    repo: &str,
    branch: &str,
    path: &str,
) -> Result<String, AppError> {
    let url = format!("https://raw.githubusercontent.com/{repo}/{branch}/{path}");
    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        return Err(AppError::FetchFailed {
            location: format!("{repo}/{branch}/{path}"),
            status: response.status(),
        });
    }

    Ok(response.text().await?)
}

/// Fills gaps in a parsed payload from the message the component lives on and
/// applies member-dependent component state.
///
/// Partial payloads lean on the originating message: a payload without
/// `content` keeps an empty string when the source message had content, so an
/// edit clears rather than silently keeps stale text. Components re-derive
/// their disabled state from the member's roles, `pick-role` menus get
/// member-derived default selections, and `pick-msg` menus are pinned to a
/// single value. Anything shown outside an ephemeral context comes back
/// ephemeral.
pub fn resolve_message(mut reply: Reply, interaction: &ComponentInteraction) -> Reply {
    let source = &interaction.message;
    let member_roles: Vec<RoleId> = interaction
        .member
        .as_ref()
        .map(|member| member.roles.clone())
        .unwrap_or_default();

    if reply.content.is_none() && !source.content.is_empty() {
        reply.content = Some(String::new());
    }

    for row in &mut reply.components {
        for component in &mut row.components {
            if component.kind != COMPONENT_TYPE_BUTTON
                && component.kind != COMPONENT_TYPE_STRING_SELECT
            {
                continue;
            }

            // Link buttons cannot carry a custom ID, leave them untouched.
            if component.url.is_some() {
                continue;
            }

            let custom_id = component.custom_id.clone().unwrap_or_default();
            let restrictions: Vec<RoleId> = custom_id
                .split('&')
                .skip(1)
                .filter_map(|token| token.parse::<u64>().ok().map(RoleId::new))
                .collect();

            component.disabled = Some(
                component
                    .disabled
                    .unwrap_or_else(|| !member_has_roles(&member_roles, &restrictions)),
            );

            if component.kind == COMPONENT_TYPE_STRING_SELECT {
                if custom_id.starts_with("pick-role") {
                    for option in &mut component.options {
                        let is_default = option.default.unwrap_or_else(|| {
                            option
                                .value
                                .parse::<u64>()
                                .is_ok_and(|id| member_roles.contains(&RoleId::new(id)))
                        });
                        option.default = Some(is_default);
                    }
                }

                if custom_id.starts_with("pick-msg") {
                    // Forcing both to the constant of 1, ensuring that a value
                    // is always selected.
                    component.min_values = component.min_values.map(|_| 1);
                    component.max_values = component.max_values.map(|_| 1);
                }
            }
        }
    }

    // Ensure no message outside of an ephemeral context can be edited.
    let source_ephemeral = source
        .flags
        .is_some_and(|flags| flags.contains(MessageFlags::EPHEMERAL));
    if !source_ephemeral {
        reply.ephemeral = Some(true);
    }

    reply
}

/// Renders projected log fields as `key=value` pairs, dropping nulls and
/// empty arrays.
pub fn format_log_fields(fields: &serde_json::Value) -> String {
    let Some(map) = fields.as_object() else {
        return fields.to_string();
    };

    map.iter()
        .filter(|(_, value)| match value {
            serde_json::Value::Null => false,
            serde_json::Value::Array(items) => !items.is_empty(),
            _ => true,
        })
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_restrictions_hide_nothing() {
        let member = vec![RoleId::new(123456789012345678)];
        assert!(member_has_roles(&member, &[]));
        assert!(member_has_roles(&[], &[]));
    }

    #[test]
    fn requires_every_listed_role() {
        let member = vec![
            RoleId::new(111111111111111111),
            RoleId::new(222222222222222222),
        ];

        assert!(member_has_roles(&member, &[RoleId::new(111111111111111111)]));
        assert!(member_has_roles(
            &member,
            &[
                RoleId::new(111111111111111111),
                RoleId::new(222222222222222222)
            ]
        ));
        assert!(!member_has_roles(
            &member,
            &[
                RoleId::new(111111111111111111),
                RoleId::new(333333333333333333)
            ]
        ));
    }

    #[test]
    fn log_fields_skip_null_and_empty_values() {
        let fields = serde_json::json!({
            "repo": "owner/repo",
            "branch": null,
            "values": [],
            "restrictions": ["123"],
        });

        let rendered = format_log_fields(&fields);
        assert_eq!(rendered, r#"repo="owner/repo", restrictions=["123"]"#);
    }
}
