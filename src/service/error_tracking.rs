//! Content-addressed failure tracking with per-origin lockout.
//!
//! Every hard handler failure is hashed from its origin scope and stack
//! signature. Identical failures collapse into one record that accumulates
//! repeat invocations, while each occurrence (new or repeat) bumps the
//! origin's live-failure counter. Once a counter reaches
//! [`LOCKOUT_THRESHOLD`] the dispatcher stops running handlers for that
//! origin until an operator removes or clears records.
//!
//! State is process-lifetime only; nothing is persisted. Both maps live
//! behind a single mutex so counter updates stay consistent across
//! concurrently failing interactions and `clear` is atomic to every observer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serenity::all::{ChannelId, GuildId, UserId};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::AppError;

/// Live failures per origin before the lockout gate closes.
pub const LOCKOUT_THRESHOLD: u32 = 5;

/// Which origin the failure counter and lockout gate key on.
///
/// The observed deployments disagreed on this (channel-only counters versus a
/// per-user counter in DMs), so the policy is explicit rather than unified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScopePolicy {
    /// Channel ID inside a guild, invoking user ID in DMs. The documented
    /// primary behavior.
    #[default]
    GuildChannelElseUser,
    /// Always the channel ID.
    Channel,
    /// Always the invoking user ID.
    User,
}

impl FromStr for ScopePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guild-channel" => Ok(Self::GuildChannelElseUser),
            "channel" => Ok(Self::Channel),
            "user" => Ok(Self::User),
            _ => Err(()),
        }
    }
}

/// Where an interaction came from, fixed at dispatch time.
#[derive(Debug, Clone)]
pub struct Origin {
    pub guild: Option<GuildId>,
    pub channel: ChannelId,
    pub user: UserId,
}

impl Origin {
    pub fn new(guild: Option<GuildId>, channel: ChannelId, user: UserId) -> Self {
        Self {
            guild,
            channel,
            user,
        }
    }
}

/// One repeat occurrence of an already-recorded failure.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInvocation {
    pub user: UserId,
    pub timestamp: DateTime<Utc>,
}

/// The origin snapshot stored on a record, stringly typed for lookup by
/// arbitrary operator-supplied IDs.
#[derive(Debug, Clone, Serialize)]
pub struct RecordOrigin {
    pub guild: String,
    pub channel: String,
    pub user: String,
}

/// A deduplicated failure: one record per `(origin scope, stack signature)`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub stack: String,
    pub message: String,
    pub first_seen: DateTime<Utc>,
    /// Repeat occurrences, appended without bound. Retention is an open
    /// question; see DESIGN.md.
    pub invocations: Vec<ErrorInvocation>,
    pub origin: RecordOrigin,
    /// The counter key this record was attributed to at creation.
    scope: String,
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, ErrorRecord>,
    counts: HashMap<String, u32>,
}

/// Content-addressed failure store shared across interaction flows.
#[derive(Clone)]
pub struct ErrorStore {
    inner: Arc<Mutex<Inner>>,
    policy: ScopePolicy,
}

impl ErrorStore {
    pub fn new(policy: ScopePolicy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            policy,
        }
    }

    /// The counter key for an origin under this store's scope policy.
    pub fn scope_key(&self, origin: &Origin) -> String {
        match self.policy {
            ScopePolicy::GuildChannelElseUser => {
                if origin.guild.is_some() {
                    origin.channel.to_string()
                } else {
                    origin.user.to_string()
                }
            }
            ScopePolicy::Channel => origin.channel.to_string(),
            ScopePolicy::User => origin.user.to_string(),
        }
    }

    /// Records a failure occurrence.
    ///
    /// The first occurrence of a `(scope, stack)` pair creates the record with
    /// an empty invocation list; identical repeats append an invocation
    /// instead. The origin's counter is incremented either way. Returns the
    /// hash and a snapshot of the record.
    pub async fn add(&self, origin: &Origin, error: &AppError) -> (String, ErrorRecord) {
        let scope = self.scope_key(origin);
        let stack = format!("{error:?}");
        let hash = generate_hash(&scope, &stack);

        let mut inner = self.inner.lock().await;

        let record = inner
            .records
            .entry(hash.clone())
            .and_modify(|record| {
                record.invocations.push(ErrorInvocation {
                    user: origin.user,
                    timestamp: Utc::now(),
                });
            })
            .or_insert_with(|| ErrorRecord {
                stack,
                message: error.to_string(),
                first_seen: Utc::now(),
                invocations: Vec::new(),
                origin: RecordOrigin {
                    guild: origin
                        .guild
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "DM".to_string()),
                    channel: origin.channel.to_string(),
                    user: origin.user.to_string(),
                },
                scope: scope.clone(),
            })
            .clone();

        *inner.counts.entry(scope).or_insert(0) += 1;

        (hash, record)
    }

    /// Removes a record and decrements its origin's counter by exactly one,
    /// never below zero. Returns whether a record was found; an absent hash
    /// has no side effects.
    pub async fn remove(&self, hash: &str) -> bool {
        let mut inner = self.inner.lock().await;

        let Some(record) = inner.records.remove(hash) else {
            return false;
        };

        if let Some(count) = inner.counts.get_mut(&record.scope) {
            *count = count.saturating_sub(1);
        }

        true
    }

    pub async fn get(&self, hash: &str) -> Option<ErrorRecord> {
        self.inner.lock().await.records.get(hash).cloned()
    }

    /// Every record whose origin guild, channel or user matches `origin`.
    /// With `include_invocation_authors`, records where `origin` shows up as
    /// a repeat invoker are included even when their own origin differs.
    pub async fn get_all_by(
        &self,
        origin: &str,
        include_invocation_authors: bool,
    ) -> Vec<(String, ErrorRecord)> {
        let inner = self.inner.lock().await;

        inner
            .records
            .iter()
            .filter(|(_, record)| {
                record.origin.guild == origin
                    || record.origin.channel == origin
                    || record.origin.user == origin
                    || (include_invocation_authors
                        && record
                            .invocations
                            .iter()
                            .any(|invocation| invocation.user.to_string() == origin))
            })
            .map(|(hash, record)| (hash.clone(), record.clone()))
            .collect()
    }

    /// Empties both maps. Atomic from any caller's perspective: the single
    /// lock means no one observes a partially-cleared store.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.records.clear();
        inner.counts.clear();
    }

    pub async fn error_count(&self, scope: &str) -> u32 {
        self.inner.lock().await.counts.get(scope).copied().unwrap_or(0)
    }

    /// Lockout gate: pure read of the origin's live-failure counter.
    pub async fn is_locked(&self, scope: &str) -> bool {
        self.error_count(scope).await >= LOCKOUT_THRESHOLD
    }
}

/// Deterministic content hash for a failure: the dedup key, not a security
/// primitive. Stack signatures are hashed verbatim, so the same underlying
/// bug rendered differently produces distinct records.
fn generate_hash(scope: &str, stack: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(scope.as_bytes());
    hasher.update(stack.as_bytes());
    format!("{scope}-{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild_origin(channel: u64, user: u64) -> Origin {
        Origin::new(
            Some(GuildId::new(900000000000000001)),
            ChannelId::new(channel),
            UserId::new(user),
        )
    }

    fn dm_origin(user: u64) -> Origin {
        Origin::new(None, ChannelId::new(800000000000000001), UserId::new(user))
    }

    fn store() -> ErrorStore {
        ErrorStore::new(ScopePolicy::default())
    }

    fn boom() -> AppError {
        AppError::InternalError("boom".to_string())
    }

    #[tokio::test]
    async fn identical_failures_share_a_record_but_count_twice() {
        let store = store();
        let origin = guild_origin(100000000000000001, 200000000000000001);
        let scope = store.scope_key(&origin);

        let (first_hash, first) = store.add(&origin, &boom()).await;
        assert!(first.invocations.is_empty());
        assert_eq!(store.error_count(&scope).await, 1);

        let (second_hash, second) = store.add(&origin, &boom()).await;
        assert_eq!(first_hash, second_hash);
        assert_eq!(second.invocations.len(), 1);
        assert_eq!(store.error_count(&scope).await, 2);

        // Still one record.
        assert_eq!(store.get_all_by(&origin.channel.to_string(), false).await.len(), 1);
    }

    #[tokio::test]
    async fn distinct_stacks_create_distinct_records() {
        let store = store();
        let origin = guild_origin(100000000000000001, 200000000000000001);

        let (a, _) = store.add(&origin, &boom()).await;
        let (b, _) = store
            .add(&origin, &AppError::InternalError("bang".to_string()))
            .await;

        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn gate_flips_exactly_at_threshold() {
        let store = store();
        let origin = guild_origin(100000000000000001, 200000000000000001);
        let scope = store.scope_key(&origin);

        for i in 0..4u32 {
            store
                .add(&origin, &AppError::InternalError(format!("failure {i}")))
                .await;
            assert!(!store.is_locked(&scope).await, "locked after {} errors", i + 1);
        }

        store
            .add(&origin, &AppError::InternalError("failure 4".to_string()))
            .await;
        assert!(store.is_locked(&scope).await);
    }

    #[tokio::test]
    async fn remove_decrements_by_exactly_one() {
        let store = store();
        let origin = guild_origin(100000000000000001, 200000000000000001);
        let scope = store.scope_key(&origin);

        let (hash, _) = store.add(&origin, &boom()).await;
        assert_eq!(store.error_count(&scope).await, 1);

        assert!(store.remove(&hash).await);
        assert_eq!(store.error_count(&scope).await, 0);
        assert!(store.get(&hash).await.is_none());

        // Absent hash: no effect, counter does not go below zero.
        assert!(!store.remove(&hash).await);
        assert_eq!(store.error_count(&scope).await, 0);
    }

    #[tokio::test]
    async fn clear_resets_records_and_counters() {
        let store = store();
        let origin = guild_origin(100000000000000001, 200000000000000001);
        let scope = store.scope_key(&origin);

        for i in 0..LOCKOUT_THRESHOLD {
            store
                .add(&origin, &AppError::InternalError(format!("failure {i}")))
                .await;
        }
        assert!(store.is_locked(&scope).await);

        store.clear().await;

        assert!(!store.is_locked(&scope).await);
        assert_eq!(store.error_count(&scope).await, 0);
        assert!(store.get_all_by(&origin.channel.to_string(), false).await.is_empty());
    }

    #[tokio::test]
    async fn dm_failures_are_scoped_to_the_user() {
        let store = store();
        let origin = dm_origin(200000000000000042);

        assert_eq!(store.scope_key(&origin), "200000000000000042");

        let (hash, record) = store.add(&origin, &boom()).await;
        assert!(hash.starts_with("200000000000000042-"));
        assert_eq!(record.origin.guild, "DM");
    }

    #[tokio::test]
    async fn channel_policy_ignores_dm_distinction() {
        let store = ErrorStore::new(ScopePolicy::Channel);
        let origin = dm_origin(200000000000000042);

        assert_eq!(store.scope_key(&origin), origin.channel.to_string());
    }

    #[tokio::test]
    async fn lookup_by_invocation_author_is_opt_in() {
        let store = store();
        let origin = guild_origin(100000000000000001, 200000000000000001);

        // First occurrence by one user, repeat by another.
        store.add(&origin, &boom()).await;
        let repeat = Origin::new(origin.guild, origin.channel, UserId::new(200000000000000042));
        store.add(&repeat, &boom()).await;

        let by_author = store.get_all_by("200000000000000042", true).await;
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].1.origin.user, "200000000000000001");

        assert!(store.get_all_by("200000000000000042", false).await.is_empty());
    }

    #[tokio::test]
    async fn hash_is_deterministic_for_scope_and_stack() {
        assert_eq!(generate_hash("chan", "stack"), generate_hash("chan", "stack"));
        assert_ne!(generate_hash("chan", "stack"), generate_hash("other", "stack"));
        assert_ne!(generate_hash("chan", "stack"), generate_hash("chan", "other"));
    }
}
