//! Component identifier codec.
//!
//! Custom IDs embedded in buttons and select menus follow a compact grammar:
//!
//! ```text
//! <routingKey>[:<arg>][@<arg>][#<arg>](&<snowflake>)*
//! ```
//!
//! Segments introduced by `:`, `@` or `#` are positional arguments; every
//! trailing `&`-joined numeric token is a role restriction. The codec does not
//! validate identifiers; the registry matcher has already rejected anything
//! that does not fit a registered pattern by the time `decode` runs. What a
//! positional argument *means* (and its default when absent) is up to the
//! handler that owns the routing key.

use serenity::all::RoleId;

/// Delimiters that introduce positional arguments, in grammar order.
const ARG_DELIMITERS: [char; 3] = [':', '@', '#'];

/// A decoded component identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedId {
    pub routing_key: String,
    pub args: Vec<String>,
    pub restrictions: Vec<RoleId>,
}

impl DecodedId {
    /// Positional argument by index, `None` when absent or empty.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str).filter(|a| !a.is_empty())
    }
}

/// Splits an identifier into routing key, positional arguments and the
/// trailing restriction list.
pub fn decode(identifier: &str) -> DecodedId {
    let mut routing_key = String::new();
    let mut args = Vec::new();
    let mut restrictions = Vec::new();

    let mut current = String::new();
    let mut delimiter: Option<char> = None;

    let mut push = |delimiter: Option<char>, segment: String| match delimiter {
        None => routing_key = segment,
        Some('&') => {
            if let Ok(id) = segment.parse::<u64>() {
                restrictions.push(RoleId::new(id));
            }
        }
        Some(_) => args.push(segment),
    };

    for ch in identifier.chars() {
        if ch == '&' || ARG_DELIMITERS.contains(&ch) {
            push(delimiter, std::mem::take(&mut current));
            delimiter = Some(ch);
        } else {
            current.push(ch);
        }
    }
    push(delimiter, current);

    DecodedId {
        routing_key,
        args,
        restrictions,
    }
}

/// Rebuilds the identifier string from its decoded parts.
///
/// Positional arguments are re-joined with `:`, `@`, `#` in grammar order, so
/// `encode(decode(id)) == id` holds for any identifier that conforms to the
/// documented grammar.
pub fn encode(decoded: &DecodedId) -> String {
    let mut out = decoded.routing_key.clone();

    for (arg, delimiter) in decoded.args.iter().zip(ARG_DELIMITERS) {
        out.push(delimiter);
        out.push_str(arg);
    }

    for role in &decoded.restrictions {
        out.push('&');
        out.push_str(&role.to_string());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_role_toggle_identifier() {
        let decoded = decode("role-toggle:123456789012345678&987654321098765432");

        assert_eq!(decoded.routing_key, "role-toggle");
        assert_eq!(decoded.args, vec!["123456789012345678"]);
        assert_eq!(decoded.restrictions, vec![RoleId::new(987654321098765432)]);
    }

    #[test]
    fn decodes_all_delimiter_kinds() {
        let decoded = decode("btn-msg:owner/repo@main#docs/rules.md&111111111111111111");

        assert_eq!(decoded.routing_key, "btn-msg");
        assert_eq!(decoded.args, vec!["owner/repo", "main", "docs/rules.md"]);
        assert_eq!(decoded.restrictions, vec![RoleId::new(111111111111111111)]);
    }

    #[test]
    fn bare_routing_key_has_no_args() {
        let decoded = decode("pick-role");

        assert_eq!(decoded.routing_key, "pick-role");
        assert!(decoded.args.is_empty());
        assert!(decoded.restrictions.is_empty());
    }

    #[test]
    fn empty_restriction_segments_are_dropped() {
        let decoded = decode("pick-role&&123456789012345678");

        assert_eq!(decoded.restrictions, vec![RoleId::new(123456789012345678)]);
    }

    #[test]
    fn multiple_restrictions_preserve_order() {
        let decoded = decode("btn-role:111111111111111111&222222222222222222&333333333333333333");

        assert_eq!(decoded.args, vec!["111111111111111111"]);
        assert_eq!(
            decoded.restrictions,
            vec![
                RoleId::new(222222222222222222),
                RoleId::new(333333333333333333)
            ]
        );
    }

    #[test]
    fn round_trips_grammar_conforming_identifiers() {
        let inputs = [
            "btn-role:123456789012345678&987654321098765432",
            "btn-msg:owner/repo@develop#guide.yml&111111111111111111&222222222222222222",
            "pick-role&123456789012345678",
            "dud",
        ];

        for input in inputs {
            assert_eq!(encode(&decode(input)), input, "round trip for {input}");
        }
    }
}
