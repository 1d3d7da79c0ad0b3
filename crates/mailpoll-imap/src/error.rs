//! Client errors.

use std::time::Duration;

use thiserror::Error;

use crate::types::ResponseCode;

/// Everything that can go wrong talking to the server.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket failure, including TLS records that fail to decrypt.
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),

    /// The host cannot be used as a TLS server name.
    #[error("invalid TLS server name '{0}'")]
    ServerName(String),

    /// A response did not follow the grammar.
    #[error("malformed response at byte {position}: {message}")]
    Parse {
        /// Offset into the response line.
        position: usize,
        /// What was expected.
        message: String,
    },

    /// Tagged `NO`: the command was refused.
    #[error("server refused: {text}")]
    No {
        /// Bracketed code, if the server sent one.
        code: Option<ResponseCode>,
        /// Text after the code.
        text: String,
    },

    /// Tagged `BAD`: the server could not make sense of the command.
    #[error("server rejected command: {0}")]
    Bad(String),

    /// `BYE` where a completion was expected.
    #[error("server closed the session: {0}")]
    Bye(String),

    /// No response within the configured limit.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The operation makes no sense in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Well-formed data that breaks the protocol's rules.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl Error {
    /// True when the connection is gone and nothing more can be sent on it.
    #[must_use]
    pub const fn is_connection_lost(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Bye(_) | Self::Timeout(_))
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
