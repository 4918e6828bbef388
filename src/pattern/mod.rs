//! Pattern-matched component routing.
//!
//! Components embed opaque identifier strings in their custom IDs. Each
//! handler family registers a [`PatternEntry`] describing which identifiers it
//! owns (a matcher predicate), which component kind may trigger it, and how to
//! project loggable fields from an interaction without running the handler.
//!
//! The registry is append-only and resolution is strictly first-match-wins in
//! registration order. It is built once at startup and shared read-only
//! through [`crate::state::AppState`].

use regex::Regex;
use serde_json::Value;
use serenity::all::{ComponentInteraction, ComponentInteractionDataKind};
use serenity::async_trait;
use serenity::client::Context;
use std::fmt;
use std::sync::Arc;

use crate::error::AppError;
use crate::model::reply::Reply;

/// Which category of UI component an entry accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Button,
    StringSelect,
}

impl ComponentKind {
    /// Maps serenity's interaction data onto the kinds the registry routes.
    /// Other kinds (user/role/channel selects, modals) have no handlers.
    pub fn of(data: &ComponentInteractionDataKind) -> Option<Self> {
        match data {
            ComponentInteractionDataKind::Button => Some(Self::Button),
            ComponentInteractionDataKind::StringSelect { .. } => Some(Self::StringSelect),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Button => write!(f, "Button"),
            Self::StringSelect => write!(f, "StringSelect"),
        }
    }
}

/// Everything a handler gets to work with for one interaction.
pub struct Invocation<'a> {
    pub ctx: &'a Context,
    pub interaction: &'a ComponentInteraction,
    /// HTTP client for external fetches (GitHub raw content).
    pub rest: &'a reqwest::Client,
}

/// Business logic behind a pattern entry.
///
/// Returning `Ok(None)` acknowledges the interaction silently. Soft denials
/// (missing roles, wrong context) are `Ok(Some(reply))`; `Err` is reserved for
/// unexpected failures worth hashing and tracking.
#[async_trait]
pub trait ComponentHandler: Send + Sync {
    async fn run(&self, invocation: &Invocation<'_>) -> Result<Option<Reply>, AppError>;
}

/// Identifier match test, pluggable so matching strategies stay swappable
/// without touching the dispatcher.
pub trait IdentifierMatcher: Send + Sync {
    fn matches(&self, identifier: &str) -> bool;
}

/// Structural regular-expression matcher, the strategy every built-in
/// component uses.
pub struct RegexMatcher(Regex);

impl RegexMatcher {
    /// Component patterns are hard-coded; a pattern that does not compile is a
    /// programmer error caught the first time the registry is built.
    pub fn new(pattern: &str) -> Self {
        Self(Regex::new(pattern).expect("component pattern must compile"))
    }
}

impl IdentifierMatcher for RegexMatcher {
    fn matches(&self, identifier: &str) -> bool {
        self.0.is_match(identifier)
    }
}

/// Leading-token matcher, the default when an entry registers no explicit
/// pattern.
pub struct PrefixMatcher(String);

impl IdentifierMatcher for PrefixMatcher {
    fn matches(&self, identifier: &str) -> bool {
        identifier.starts_with(&self.0)
    }
}

/// Extracts loggable fields from an interaction without executing the handler.
pub type LogProjector = fn(&ComponentInteraction) -> Value;

/// One registered handler family: routing key, match predicate, kind
/// restriction and the handler itself. Immutable once registered.
pub struct PatternEntry {
    command: String,
    matcher: Box<dyn IdentifierMatcher>,
    kind: Option<ComponentKind>,
    log_projector: Option<LogProjector>,
    handler: Arc<dyn ComponentHandler>,
}

impl PatternEntry {
    pub fn new(command: impl Into<String>, handler: Arc<dyn ComponentHandler>) -> Self {
        let command = command.into();
        Self {
            matcher: Box::new(PrefixMatcher(command.clone())),
            command,
            kind: None,
            log_projector: None,
            handler,
        }
    }

    pub fn with_matcher(mut self, matcher: impl IdentifierMatcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    pub fn require_kind(mut self, kind: ComponentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_log_projector(mut self, projector: LogProjector) -> Self {
        self.log_projector = Some(projector);
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn handler(&self) -> &Arc<dyn ComponentHandler> {
        &self.handler
    }

    /// Projected log fields for this interaction, `None` when the entry has
    /// no projector.
    pub fn log_fields(&self, interaction: &ComponentInteraction) -> Option<Value> {
        self.log_projector.map(|project| project(interaction))
    }

    fn accepts(&self, identifier: &str, kind: ComponentKind) -> bool {
        self.kind.is_none_or(|required| required == kind) && self.matcher.matches(identifier)
    }
}

/// Ordered, append-only collection of pattern entries.
#[derive(Default)]
pub struct PatternRegistry {
    entries: Vec<PatternEntry>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. No de-duplication: registering the same routing key
    /// twice yields two entries and lookup takes the earlier one.
    pub fn register(&mut self, entry: PatternEntry) {
        self.entries.push(entry);
    }

    /// First entry (in registration order) whose kind restriction and matcher
    /// both accept the identifier.
    pub fn resolve(&self, identifier: &str, kind: ComponentKind) -> Option<&PatternEntry> {
        self.entries
            .iter()
            .find(|entry| entry.accepts(identifier, kind))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl ComponentHandler for Noop {
        async fn run(&self, _invocation: &Invocation<'_>) -> Result<Option<Reply>, AppError> {
            Ok(None)
        }
    }

    fn entry(command: &str) -> PatternEntry {
        PatternEntry::new(command, Arc::new(Noop))
    }

    #[test]
    fn resolves_first_match_in_registration_order() {
        let mut registry = PatternRegistry::new();
        registry.register(
            entry("strict").with_matcher(RegexMatcher::new(r"^btn-role:\d+$")),
        );
        registry.register(entry("loose").with_matcher(PrefixMatcher("btn-role".to_string())));

        // Both entries match; the one registered first wins.
        let resolved = registry
            .resolve("btn-role:123456789012345678", ComponentKind::Button)
            .unwrap();
        assert_eq!(resolved.command(), "strict");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_registered_earlier_changes_selection() {
        let mut shadowed = PatternRegistry::new();
        shadowed.register(entry("pick").require_kind(ComponentKind::StringSelect));
        shadowed.register(entry("pick-override").with_matcher(PrefixMatcher("pick".to_string())));

        let first = shadowed
            .resolve("pick-role&123", ComponentKind::StringSelect)
            .unwrap();
        assert_eq!(first.command(), "pick");

        // Same patterns registered in the opposite order select the other
        // handler.
        let mut reordered = PatternRegistry::new();
        reordered.register(entry("pick-override").with_matcher(PrefixMatcher("pick".to_string())));
        reordered.register(entry("pick").require_kind(ComponentKind::StringSelect));

        let first = reordered
            .resolve("pick-role&123", ComponentKind::StringSelect)
            .unwrap();
        assert_eq!(first.command(), "pick-override");
    }

    #[test]
    fn kind_restriction_filters_entries() {
        let mut registry = PatternRegistry::new();
        registry.register(entry("dud-button").require_kind(ComponentKind::Button));
        registry.register(entry("dud").require_kind(ComponentKind::StringSelect));

        // The button-only entry's prefix also matches, but the kind gate
        // skips it for select interactions.
        let resolved = registry
            .resolve("dud-button:x", ComponentKind::StringSelect)
            .unwrap();
        assert_eq!(resolved.command(), "dud");

        assert!(registry.resolve("unknown", ComponentKind::Button).is_none());
    }

    #[test]
    fn absent_kind_restriction_accepts_any_kind() {
        let mut registry = PatternRegistry::new();
        registry.register(entry("dud"));

        assert!(registry.resolve("dud?debug", ComponentKind::Button).is_some());
        assert!(registry
            .resolve("dud?debug", ComponentKind::StringSelect)
            .is_some());
    }

    #[test]
    fn regex_matcher_enforces_structure() {
        let matcher = RegexMatcher::new(r"^btn-role:(\d{17,21})((?:&\d{17,21})*)$");

        assert!(matcher.matches("btn-role:123456789012345678"));
        assert!(matcher.matches("btn-role:123456789012345678&987654321098765432"));
        assert!(!matcher.matches("btn-role:oops"));
        assert!(!matcher.matches("btn-role:123"));
    }
}
