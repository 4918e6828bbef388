//! Message payload file parsing.
//!
//! Payload files fetched from GitHub become [`Reply`] values. JSON and YAML
//! files are the reply model verbatim; Markdown files carry an optional YAML
//! front-matter block for everything except `content`, which is the document
//! body itself.

use crate::error::AppError;
use crate::model::reply::Reply;

const FRONT_MATTER_FENCE: &str = "---";

/// Parses raw file content into a reply based on the file extension.
pub fn parse_file_content(input: &str, file_type: &str) -> Result<Reply, AppError> {
    match file_type {
        "md" => Ok(parse_front_matter(input)),
        "json" => Ok(serde_json::from_str(input)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(input)?),
        other => Err(AppError::UnknownFileType(other.to_string())),
    }
}

/// Splits a Markdown document into its YAML front matter and body.
///
/// A document without a leading `---` fence is all body. A malformed or
/// unclosed fence is treated the same way rather than rejected; the body is
/// still a perfectly displayable message.
fn parse_front_matter(input: &str) -> Reply {
    let Some(rest) = input
        .strip_prefix(&format!("{FRONT_MATTER_FENCE}\n"))
        .or_else(|| input.strip_prefix(&format!("{FRONT_MATTER_FENCE}\r\n")))
    else {
        return Reply {
            content: Some(input.to_string()),
            ..Reply::default()
        };
    };

    let Some((matter, body)) = rest
        .split_once(&format!("\n{FRONT_MATTER_FENCE}\n"))
        .or_else(|| rest.split_once(&format!("\n{FRONT_MATTER_FENCE}\r\n")))
    else {
        return Reply {
            content: Some(input.to_string()),
            ..Reply::default()
        };
    };

    let mut reply: Reply = serde_yaml::from_str(matter).unwrap_or_default();
    reply.content = Some(body.trim_start_matches('\n').to_string());
    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_payload() {
        let reply = parse_file_content(r#"{ "content": "hello" }"#, "json").unwrap();
        assert_eq!(reply.content.as_deref(), Some("hello"));
    }

    #[test]
    fn parses_yaml_payload() {
        let input = "content: hello\nembeds:\n  - title: Rules\n";
        for ext in ["yaml", "yml"] {
            let reply = parse_file_content(input, ext).unwrap();
            assert_eq!(reply.content.as_deref(), Some("hello"));
            assert_eq!(reply.embeds[0].title.as_deref(), Some("Rules"));
        }
    }

    #[test]
    fn parses_markdown_front_matter() {
        let input = "---\nembeds:\n  - title: Welcome\n---\nRead the rules first.";
        let reply = parse_file_content(input, "md").unwrap();

        assert_eq!(reply.content.as_deref(), Some("Read the rules first."));
        assert_eq!(reply.embeds[0].title.as_deref(), Some("Welcome"));
    }

    #[test]
    fn markdown_without_front_matter_is_all_body() {
        let reply = parse_file_content("Just some text.", "md").unwrap();
        assert_eq!(reply.content.as_deref(), Some("Just some text."));
        assert!(reply.embeds.is_empty());
    }

    #[test]
    fn unknown_file_type_is_a_hard_error() {
        let err = parse_file_content("x", "toml").unwrap_err();
        assert!(matches!(err, AppError::UnknownFileType(ext) if ext == "toml"));
    }
}
