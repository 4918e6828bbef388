//! Application state shared across all interaction handlers.
//!
//! The state is initialized once during startup and cloned into the serenity
//! event handler. Nothing here is reachable through ambient globals; the
//! registry and error store travel with the state so tests can build fresh
//! instances per case.

use serenity::all::GuildId;
use std::sync::Arc;

use crate::pattern::PatternRegistry;
use crate::service::error_tracking::ErrorStore;

/// Application state containing shared resources and dependencies.
///
/// All fields are cheap to clone: the registry is behind an `Arc` (read-only
/// after startup), the error store clones share one locked map, and
/// `reqwest::Client` uses an `Arc` internally.
#[derive(Clone)]
pub struct AppState {
    /// Ordered component pattern registry, immutable after startup.
    pub registry: Arc<PatternRegistry>,

    /// Content-addressed failure store backing the lockout gate.
    pub errors: ErrorStore,

    /// HTTP client for external API requests (GitHub raw content).
    pub http_client: reqwest::Client,

    /// Guild the admin-only `/error` command is registered in, when set.
    pub home_guild_id: Option<GuildId>,
}

impl AppState {
    pub fn new(
        registry: Arc<PatternRegistry>,
        errors: ErrorStore,
        http_client: reqwest::Client,
        home_guild_id: Option<GuildId>,
    ) -> Self {
        Self {
            registry,
            errors,
            http_client,
            home_guild_id,
        }
    }
}
