use serenity::all::GuildId;

use crate::error::{config::ConfigError, AppError};
use crate::service::error_tracking::ScopePolicy;

pub struct Config {
    pub discord_bot_token: String,

    /// Guild the admin-only `/error` command is registered in. When unset the
    /// command is not registered anywhere.
    pub home_guild_id: Option<GuildId>,

    /// `COMMANDS_DEBUG=true` raises the default log level to debug.
    pub debug: bool,

    /// Which origin the failure counter and lockout gate key on.
    pub lockout_scope: ScopePolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let home_guild_id = match std::env::var("HOME_GUILD_ID") {
            Ok(value) => Some(
                value
                    .parse::<u64>()
                    .map(GuildId::new)
                    .map_err(|_| ConfigError::InvalidEnvVar {
                        name: "HOME_GUILD_ID".to_string(),
                        value,
                    })?,
            ),
            Err(_) => None,
        };

        let lockout_scope = match std::env::var("LOCKOUT_SCOPE") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidEnvVar {
                name: "LOCKOUT_SCOPE".to_string(),
                value,
            })?,
            Err(_) => ScopePolicy::default(),
        };

        Ok(Self {
            discord_bot_token: std::env::var("DISCORD_BOT_TOKEN")
                .map_err(|_| ConfigError::MissingEnvVar("DISCORD_BOT_TOKEN".to_string()))?,
            home_guild_id,
            debug: std::env::var("COMMANDS_DEBUG").is_ok_and(|v| v == "true"),
            lockout_scope,
        })
    }
}
