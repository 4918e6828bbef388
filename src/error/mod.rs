//! Application error types.
//!
//! `AppError` is the top-level error for everything the bot does: startup and
//! configuration, Discord API calls, GitHub fetches, and payload parsing.
//! Component handlers return `Result<Option<Reply>, AppError>`; an `Err` from
//! a handler is a *hard* failure that the dispatcher records in the error
//! store and reports to the invoking user. Access denials are ordinary
//! `Reply` values, never errors, so they stay out of the store.

pub mod config;

use reqwest::StatusCode;
use thiserror::Error;

use crate::error::config::ConfigError;

/// Top-level application error type.
///
/// The debug representation of a value of this type doubles as the error's
/// stack signature for content hashing, so variants carry enough context to
/// distinguish genuinely different failures.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error during startup or environment variable loading.
    #[error(transparent)]
    ConfigErr(#[from] ConfigError),

    /// Discord API error from Serenity.
    ///
    /// Boxed due to large size.
    #[error(transparent)]
    DiscordErr(#[from] Box<serenity::Error>),

    /// HTTP client request error from reqwest.
    #[error(transparent)]
    ReqwestErr(#[from] reqwest::Error),

    /// JSON payload parsing error.
    #[error(transparent)]
    JsonErr(#[from] serde_json::Error),

    /// YAML payload parsing error.
    #[error(transparent)]
    YamlErr(#[from] serde_yaml::Error),

    /// A payload file extension the parser does not understand.
    #[error("Unknown file type: {0}")]
    UnknownFileType(String),

    /// GitHub raw-content fetch came back non-2xx.
    #[error("Failed to fetch file from GitHub (`{location}`): {status}")]
    FetchFailed { location: String, status: StatusCode },

    /// A component identifier matched its pattern but carried unusable data,
    /// or the originating message no longer holds the expected component.
    #[error("{0}")]
    InvalidComponent(String),

    /// The bot itself lacks a permission a handler needs.
    #[error("I do not have the `{0}` permission.")]
    MissingBotPermission(&'static str),

    /// Internal error with a custom message.
    #[error("{0}")]
    InternalError(String),
}

/// Manual conversion from serenity::Error to AppError.
///
/// Boxes the error to reduce the size of the AppError enum, as serenity::Error
/// is very large and would make all AppError variants larger if not boxed.
impl From<serenity::Error> for AppError {
    fn from(err: serenity::Error) -> Self {
        AppError::DiscordErr(Box::new(err))
    }
}
