//! Error types for the poll cycle.

use thiserror::Error;

use crate::config::ConfigKey;

/// Errors that can occur during a poll cycle.
#[derive(Debug, Error)]
pub enum Error {
    /// The script is structurally malformed, or a value cannot be parsed.
    #[error("{}", config_parse_message(.line, .message))]
    ConfigParse {
        /// 1-based line number, when the problem is tied to one line.
        line: Option<usize>,
        /// Description of what went wrong.
        message: String,
    },

    /// Required properties are absent or blank.
    #[error("[{}]", missing_messages(.0))]
    MissingRequiredFields(Vec<ConfigKey>),

    /// Reaching or authenticating with the store failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The requested folder does not exist.
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    /// The store could not run the search.
    #[error("Search failed: {0}")]
    Search(String),

    /// The store rejected the processed-marker update.
    #[error("Failed to mark message as read: {0}")]
    Mark(String),

    /// The job dispatcher rejected the event.
    #[error("Dispatch failed: {0}")]
    Dispatch(String),
}

impl Error {
    /// Returns true if the error must end the poll cycle.
    ///
    /// Only mark failures are tolerated; the message stays unread and is
    /// picked up again on the next cycle.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Mark(_))
    }
}

#[allow(clippy::ref_option)]
fn config_parse_message(line: &Option<usize>, message: &str) -> String {
    match line {
        Some(n) => format!("invalid configuration at line {n}: {message}"),
        None => format!("invalid configuration: {message}"),
    }
}

fn missing_messages(keys: &[ConfigKey]) -> String {
    keys.iter()
        .map(|k| k.required_message())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn only_mark_is_non_fatal() {
        assert!(!Error::Mark("NO".to_string()).is_fatal());
        assert!(Error::Search("BAD".to_string()).is_fatal());
        assert!(Error::FolderNotFound("Archive".to_string()).is_fatal());
        assert!(Error::Dispatch("spawn".to_string()).is_fatal());
    }

    #[test]
    fn missing_fields_render_every_message() {
        let err = Error::MissingRequiredFields(vec![ConfigKey::Host, ConfigKey::Password]);
        assert_eq!(
            err.to_string(),
            "[Email property 'host' is required!, Email property 'password' is required!]"
        );
    }

    #[test]
    fn config_parse_mentions_line() {
        let err = Error::ConfigParse {
            line: Some(3),
            message: "missing '='".to_string(),
        };
        assert_eq!(err.to_string(), "invalid configuration at line 3: missing '='");
    }
}
