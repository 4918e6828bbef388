//! Handler reply model.
//!
//! `Reply` is what a component handler hands back to the dispatcher, and also
//! the serde model for message payload files fetched from GitHub (YAML, JSON,
//! or Markdown front matter). Component rows use Discord's raw numeric `type`
//! discriminants so payload files read like the wire format.
//!
//! The `ephemeral` field is deliberately an `Option`: a reply that *marks*
//! ephemerality (`Some`, either value) is sent as a fresh message or
//! follow-up, while an unmarked reply (`None`) edits the message the
//! component lives on.

use serde::{Deserialize, Serialize};
use serenity::all::{
    ButtonStyle, Colour, CreateActionRow, CreateAllowedMentions, CreateButton, CreateEmbed,
    CreateEmbedAuthor, CreateInteractionResponseFollowup, CreateInteractionResponseMessage,
    CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption, ReactionType, RoleId,
    Timestamp,
};

/// Discord component `type` discriminant for buttons.
pub const COMPONENT_TYPE_BUTTON: u8 = 2;
/// Discord component `type` discriminant for string select menus.
pub const COMPONENT_TYPE_STRING_SELECT: u8 = 3;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Reply {
    pub content: Option<String>,
    pub embeds: Vec<ReplyEmbed>,
    pub components: Vec<ReplyRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ephemeral: Option<bool>,
    /// Roles the reply is allowed to ping. Set by handlers, never by payload
    /// files.
    #[serde(skip)]
    pub allowed_mention_roles: Vec<RoleId>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplyEmbed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub color: Option<u32>,
    pub timestamp: Option<EmbedTimestamp>,
    pub author: Option<ReplyEmbedAuthor>,
    pub fields: Vec<ReplyEmbedField>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplyEmbedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplyEmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Embed timestamps in payload files may be epoch seconds or RFC 3339 text.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum EmbedTimestamp {
    Epoch(i64),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReplyRow {
    #[serde(default)]
    pub components: Vec<ReplyComponent>,
}

/// One component in a row, either a button or a string select menu.
///
/// A single struct rather than an enum so partially specified payload files
/// deserialize leniently; `kind` and `url` decide how the component is built.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplyComponent {
    #[serde(rename = "type")]
    pub kind: u8,
    pub custom_id: Option<String>,
    pub label: Option<String>,
    pub style: Option<u8>,
    pub url: Option<String>,
    pub emoji: Option<String>,
    pub disabled: Option<bool>,
    pub options: Vec<ReplyMenuOption>,
    pub min_values: Option<u8>,
    pub max_values: Option<u8>,
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplyMenuOption {
    pub label: String,
    pub value: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub default: Option<bool>,
}

impl Reply {
    /// Plain ephemeral text reply, the shape every soft denial uses.
    pub fn ephemeral_text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ephemeral: Some(true),
            ..Self::default()
        }
    }

    /// Whether the reply should be sent as a new message rather than editing
    /// the originating one.
    pub fn is_marked_ephemeral(&self) -> bool {
        self.ephemeral.is_some()
    }

    /// Converts numeric epoch-second embed timestamps into RFC 3339 text so
    /// they render as native dates.
    pub fn normalize_timestamps(&mut self) {
        for embed in &mut self.embeds {
            if let Some(EmbedTimestamp::Epoch(seconds)) = embed.timestamp {
                embed.timestamp = chrono::DateTime::from_timestamp(seconds, 0)
                    .map(|dt| EmbedTimestamp::Text(dt.to_rfc3339()));
            }
        }
    }

    pub fn into_response_message(self) -> CreateInteractionResponseMessage {
        let mut message = CreateInteractionResponseMessage::new();

        if let Some(content) = &self.content {
            message = message.content(content.clone());
        }
        message = message
            .embeds(self.build_embeds())
            .components(self.build_rows())
            .ephemeral(self.ephemeral.unwrap_or(false));

        if !self.allowed_mention_roles.is_empty() {
            message = message.allowed_mentions(
                CreateAllowedMentions::new()
                    .everyone(false)
                    .roles(self.allowed_mention_roles.clone()),
            );
        }

        message
    }

    pub fn into_followup(self) -> CreateInteractionResponseFollowup {
        let mut followup = CreateInteractionResponseFollowup::new();

        if let Some(content) = &self.content {
            followup = followup.content(content.clone());
        }
        followup = followup
            .embeds(self.build_embeds())
            .components(self.build_rows())
            .ephemeral(self.ephemeral.unwrap_or(false));

        if !self.allowed_mention_roles.is_empty() {
            followup = followup.allowed_mentions(
                CreateAllowedMentions::new()
                    .everyone(false)
                    .roles(self.allowed_mention_roles.clone()),
            );
        }

        followup
    }

    fn build_embeds(&self) -> Vec<CreateEmbed> {
        self.embeds.iter().map(ReplyEmbed::build).collect()
    }

    fn build_rows(&self) -> Vec<CreateActionRow> {
        self.components.iter().filter_map(ReplyRow::build).collect()
    }
}

impl ReplyEmbed {
    fn build(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::new();

        if let Some(title) = &self.title {
            embed = embed.title(title.clone());
        }
        if let Some(description) = &self.description {
            embed = embed.description(description.clone());
        }
        if let Some(url) = &self.url {
            embed = embed.url(url.clone());
        }
        if let Some(color) = self.color {
            embed = embed.colour(Colour::new(color));
        }
        if let Some(author) = &self.author {
            let mut builder = CreateEmbedAuthor::new(author.name.clone());
            if let Some(icon_url) = &author.icon_url {
                builder = builder.icon_url(icon_url.clone());
            }
            embed = embed.author(builder);
        }
        if let Some(timestamp) = &self.timestamp {
            let parsed = match timestamp {
                EmbedTimestamp::Epoch(seconds) => Timestamp::from_unix_timestamp(*seconds).ok(),
                EmbedTimestamp::Text(text) => Timestamp::parse(text).ok(),
            };
            if let Some(parsed) = parsed {
                embed = embed.timestamp(parsed);
            }
        }
        for field in &self.fields {
            embed = embed.field(field.name.clone(), field.value.clone(), field.inline);
        }

        embed
    }
}

impl ReplyRow {
    /// Builds a serenity action row. Rows mix either buttons or a single
    /// select menu; anything else is dropped.
    fn build(&self) -> Option<CreateActionRow> {
        if let Some(menu) = self
            .components
            .iter()
            .find(|c| c.kind == COMPONENT_TYPE_STRING_SELECT)
        {
            return menu.build_select().map(CreateActionRow::SelectMenu);
        }

        let buttons: Vec<CreateButton> = self
            .components
            .iter()
            .filter(|c| c.kind == COMPONENT_TYPE_BUTTON)
            .map(ReplyComponent::build_button)
            .collect();

        if buttons.is_empty() {
            None
        } else {
            Some(CreateActionRow::Buttons(buttons))
        }
    }
}

impl ReplyComponent {
    fn build_button(&self) -> CreateButton {
        let mut button = match &self.url {
            Some(url) => CreateButton::new_link(url.clone()),
            None => CreateButton::new(self.custom_id.clone().unwrap_or_default())
                .style(button_style(self.style)),
        };

        if let Some(label) = &self.label {
            button = button.label(label.clone());
        }
        if let Some(emoji) = &self.emoji {
            button = button.emoji(ReactionType::Unicode(emoji.clone()));
        }

        button.disabled(self.disabled.unwrap_or(false))
    }

    fn build_select(&self) -> Option<CreateSelectMenu> {
        let custom_id = self.custom_id.clone()?;

        let options = self
            .options
            .iter()
            .map(|option| {
                let mut builder = CreateSelectMenuOption::new(option.label.clone(), option.value.clone())
                    .default_selection(option.default.unwrap_or(false));
                if let Some(description) = &option.description {
                    builder = builder.description(description.clone());
                }
                if let Some(emoji) = &option.emoji {
                    builder = builder.emoji(ReactionType::Unicode(emoji.clone()));
                }
                builder
            })
            .collect();

        let mut menu =
            CreateSelectMenu::new(custom_id, CreateSelectMenuKind::String { options })
                .disabled(self.disabled.unwrap_or(false));

        if let Some(placeholder) = &self.placeholder {
            menu = menu.placeholder(placeholder.clone());
        }
        if let Some(min) = self.min_values {
            menu = menu.min_values(min);
        }
        if let Some(max) = self.max_values {
            menu = menu.max_values(max);
        }

        Some(menu)
    }
}

/// Maps a raw Discord button style number onto serenity's enum; unknown or
/// missing styles fall back to primary.
fn button_style(raw: Option<u8>) -> ButtonStyle {
    match raw {
        Some(2) => ButtonStyle::Secondary,
        Some(3) => ButtonStyle::Success,
        Some(4) => ButtonStyle::Danger,
        _ => ButtonStyle::Primary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_timestamps_normalize_to_rfc3339() {
        let mut reply = Reply {
            embeds: vec![ReplyEmbed {
                timestamp: Some(EmbedTimestamp::Epoch(1_700_000_000)),
                ..ReplyEmbed::default()
            }],
            ..Reply::default()
        };

        reply.normalize_timestamps();

        match &reply.embeds[0].timestamp {
            Some(EmbedTimestamp::Text(text)) => assert!(text.starts_with("2023-11-14T")),
            other => panic!("expected text timestamp, got {other:?}"),
        }
    }

    #[test]
    fn text_timestamps_are_left_alone() {
        let mut reply = Reply {
            embeds: vec![ReplyEmbed {
                timestamp: Some(EmbedTimestamp::Text("2024-01-01T00:00:00Z".to_string())),
                ..ReplyEmbed::default()
            }],
            ..Reply::default()
        };

        reply.normalize_timestamps();

        assert_eq!(
            reply.embeds[0].timestamp,
            Some(EmbedTimestamp::Text("2024-01-01T00:00:00Z".to_string()))
        );
    }

    #[test]
    fn unmarked_replies_edit_the_parent() {
        assert!(!Reply::default().is_marked_ephemeral());
        assert!(Reply::ephemeral_text("hi").is_marked_ephemeral());

        // `ephemeral: false` still counts as marked; presence of the field is
        // what selects send-as-new over edit-in-place.
        let reply = Reply {
            ephemeral: Some(false),
            ..Reply::default()
        };
        assert!(reply.is_marked_ephemeral());
    }

    #[test]
    fn deserializes_raw_component_rows() {
        let reply: Reply = serde_json::from_str(
            r#"{
                "content": "pick one",
                "components": [{
                    "components": [{
                        "type": 3,
                        "custom_id": "pick-role&123456789012345678",
                        "options": [{ "label": "Blue", "value": "111111111111111111" }]
                    }]
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(reply.components.len(), 1);
        let menu = &reply.components[0].components[0];
        assert_eq!(menu.kind, COMPONENT_TYPE_STRING_SELECT);
        assert_eq!(menu.options[0].value, "111111111111111111");
        assert!(reply.ephemeral.is_none());
    }
}
