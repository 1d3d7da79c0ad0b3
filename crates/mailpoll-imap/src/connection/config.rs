//! Where and how to connect.

use std::time::Duration;

/// Transport security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Plaintext for the whole session.
    None,
    /// Plaintext greeting, then STARTTLS before LOGIN.
    StartTls,
    /// TLS before the first byte of IMAP.
    #[default]
    Implicit,
}

impl Security {
    /// Well-known port: 993 for implicit TLS, 143 otherwise.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        if matches!(self, Self::Implicit) { 993 } else { 143 }
    }
}

/// Debug logging of the raw exchange.
///
/// LOGIN passwords are always masked; the username shows only with
/// `reveal_auth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtocolTrace {
    /// Log every command and server line at debug level.
    pub enabled: bool,
    /// Show the LOGIN username.
    pub reveal_auth: bool,
}

/// Connection settings.
///
/// ```
/// use std::time::Duration;
/// use mailpoll_imap::{Config, Security};
///
/// let config = Config::new("imap.example.com")
///     .with_security(Security::StartTls)
///     .with_io_timeout(Duration::from_secs(10));
/// assert_eq!(config.port(), 143);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host; also the TLS server name.
    pub host: String,
    /// Explicit port. `None` uses [`Security::default_port`].
    pub port: Option<u16>,
    /// Transport security.
    pub security: Security,
    /// Limit for TCP connect plus any implicit TLS handshake.
    pub connect_timeout: Duration,
    /// Limit for each server response.
    pub io_timeout: Duration,
    /// Protocol logging.
    pub trace: ProtocolTrace,
}

impl Config {
    /// Implicit TLS, 30 s to connect, 60 s per response, no tracing.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::Implicit,
            connect_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(60),
            trace: ProtocolTrace::default(),
        }
    }

    /// Port to dial.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.security.default_port())
    }

    /// Overrides the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the transport security.
    #[must_use]
    pub const fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the connect limit.
    #[must_use]
    pub const fn with_connect_timeout(mut self, limit: Duration) -> Self {
        self.connect_timeout = limit;
        self
    }

    /// Sets the per-response limit.
    #[must_use]
    pub const fn with_io_timeout(mut self, limit: Duration) -> Self {
        self.io_timeout = limit;
        self
    }

    /// Sets protocol logging.
    #[must_use]
    pub const fn with_trace(mut self, trace: ProtocolTrace) -> Self {
        self.trace = trace;
        self
    }
}

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
    fn defaults() {
        let config = Config::new("imap.example.com");
        assert_eq!(config.port(), 993);
        assert_eq!(config.security, Security::Implicit);
        assert_eq!(config.io_timeout, Duration::from_secs(60));
        assert!(!config.trace.enabled);
    }

    #[test]
    fn port_tracks_security_until_overridden() {
        let config = Config::new("h").with_security(Security::None);
        assert_eq!(config.port(), 143);
        assert_eq!(config.with_port(1143).port(), 1143);
    }

    #[test]
    fn limits_and_trace() {
        let config = Config::new("h")
            .with_connect_timeout(Duration::from_millis(500))
            .with_trace(ProtocolTrace {
                enabled: true,
                reveal_auth: false,
            });
        assert_eq!(config.connect_timeout, Duration::from_millis(500));
        assert!(config.trace.enabled);
        assert!(!config.trace.reveal_auth);
    }
}
