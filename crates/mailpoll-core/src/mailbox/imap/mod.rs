//! IMAP implementation of the mailbox seam.

mod session;

use std::time::Duration;

use async_trait::async_trait;
use mailpoll_imap::{Address, Client, Config, FetchItem, ProtocolTrace, SeqNum, Security};

pub use session::ImapSession;

use super::{ConnectRequest, MailboxConnector, MailboxSession, Message};
use crate::headers::decode_header;
use crate::{Error, Result};

/// Connects to `imap` and `imaps` stores.
///
/// Passthrough properties understood:
/// - `mail.<store>.host` / `mail.<store>.port`
/// - `mail.<store>.connectiontimeout` / `mail.<store>.timeout` (milliseconds)
/// - `mail.imap.starttls.enable`
/// - `mail.debug` / `mail.debug.auth`
#[derive(Debug, Clone, Copy, Default)]
pub struct ImapConnector;

impl ImapConnector {
    /// Creates a connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Translates a request into a client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] for an unsupported store or a malformed
    /// port or timeout.
    pub fn client_config(request: &ConnectRequest) -> Result<Config> {
        let security = match request.store.to_ascii_lowercase().as_str() {
            "imaps" => Security::Implicit,
            "imap" if request.flag("mail.imap.starttls.enable") => Security::StartTls,
            "imap" => Security::None,
            _ => {
                return Err(Error::Connection(format!(
                    "unsupported store '{}'",
                    request.store
                )));
            }
        };

        let host = request
            .store_property("host")
            .unwrap_or(&request.host)
            .trim()
            .to_string();
        if host.is_empty() {
            return Err(Error::Connection("no host configured".to_string()));
        }

        let mut config = Config::new(host)
            .with_security(security)
            .with_trace(ProtocolTrace {
                enabled: request.flag("mail.debug"),
                reveal_auth: request.flag("mail.debug.auth"),
            });
        if let Some(port) = request.store_property("port") {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::Connection(format!("invalid port '{port}'")))?;
            config = config.with_port(port);
        }
        if let Some(limit) = millis(request, "connectiontimeout")? {
            config = config.with_connect_timeout(limit);
        }
        if let Some(limit) = millis(request, "timeout")? {
            config = config.with_io_timeout(limit);
        }
        Ok(config)
    }
}

fn millis(request: &ConnectRequest, name: &str) -> Result<Option<Duration>> {
    request
        .store_property(name)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| Error::Connection(format!("invalid {name} '{value}'")))
        })
        .transpose()
}

#[async_trait]
impl MailboxConnector for ImapConnector {
    async fn connect(&self, request: &ConnectRequest) -> Result<Box<dyn MailboxSession>> {
        let config = Self::client_config(request)?;
        tracing::debug!(
            host = %config.host,
            port = config.port(),
            security = ?config.security,
            "connecting"
        );

        let client = Client::open(&config)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        let client = client
            .login(&request.username, &request.password)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        tracing::info!(host = %config.host, user = %request.username, "logged in");
        Ok(Box::new(ImapSession::new(client)))
    }
}

/// Builds a [`Message`] from one FETCH response. Responses without a UID
/// are dropped.
pub(crate) fn message_from_fetch(seq: SeqNum, items: Vec<FetchItem>) -> Option<Message> {
    let mut message = Message {
        sequence: seq.get(),
        ..Message::default()
    };

    for item in items {
        match item {
            FetchItem::Uid(uid) => message.uid = uid.get(),
            FetchItem::Flags(flags) => {
                message.flags = flags.iter().map(|f| f.as_str().to_string()).collect();
            }
            FetchItem::InternalDate(raw) => {
                message.received = mailpoll_imap::parser::parse_internal_date(&raw);
                if message.received.is_none() {
                    tracing::debug!(value = %raw, "unparseable INTERNALDATE");
                }
            }
            FetchItem::Rfc822Size(size) => message.size = Some(size),
            FetchItem::Envelope(envelope) => {
                let envelope = *envelope;
                message.subject = envelope.subject.as_deref().map(decode_header);
                message.sent_date = envelope.date;
                message.message_id = envelope.message_id;
                message.from = format_addresses(&envelope.from);
                message.reply_to = format_addresses(&envelope.reply_to);
                message.to = format_addresses(&envelope.to);
                message.cc = format_addresses(&envelope.cc);
                message.bcc = format_addresses(&envelope.bcc);
            }
        }
    }

    (message.uid > 0).then_some(message)
}

fn format_addresses(addresses: &[Address]) -> Vec<String> {
    addresses.iter().filter_map(format_address).collect()
}

fn format_address(address: &Address) -> Option<String> {
    let email = address.email()?;
    let name = address
        .name
        .as_deref()
        .map(decode_header)
        .filter(|n| !n.trim().is_empty());

    Some(match name {
        Some(name) => format!("{name} <{email}>"),
        None => email,
    })
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
    use std::collections::BTreeMap;

    use mailpoll_imap::{Envelope, Flag, Uid};

    use super::*;

    fn request(store: &str, props: &[(&str, &str)]) -> ConnectRequest {
        ConnectRequest {
            host: "mail.example.com".to_string(),
            store: store.to_string(),
            username: "ci".to_string(),
            password: "secret".to_string(),
            properties: props
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn imaps_uses_implicit_tls() {
        let config = ImapConnector::client_config(&request("imaps", &[])).unwrap();
        assert_eq!(config.security, Security::Implicit);
        assert_eq!(config.port(), 993);
        assert_eq!(config.host, "mail.example.com");
    }

    #[test]
    fn imap_honours_starttls_property() {
        let plain = ImapConnector::client_config(&request("imap", &[])).unwrap();
        assert_eq!(plain.security, Security::None);
        assert_eq!(plain.port(), 143);

        let upgraded = ImapConnector::client_config(&request(
            "IMAP",
            &[("mail.imap.starttls.enable", "true")],
        ))
        .unwrap();
        assert_eq!(upgraded.security, Security::StartTls);
    }

    #[test]
    fn store_properties_override_host_and_port() {
        let config = ImapConnector::client_config(&request(
            "imaps",
            &[
                ("mail.imaps.host", "other.example.com"),
                ("mail.imaps.port", "10993"),
                ("mail.imaps.connectiontimeout", "2500"),
                ("mail.imaps.timeout", "7000"),
            ],
        ))
        .unwrap();
        assert_eq!(config.host, "other.example.com");
        assert_eq!(config.port(), 10993);
        assert_eq!(config.connect_timeout, Duration::from_millis(2500));
        assert_eq!(config.io_timeout, Duration::from_millis(7000));
    }

    #[test]
    fn debug_properties_enable_trace() {
        let config = ImapConnector::client_config(&request(
            "imaps",
            &[("mail.debug", "true"), ("mail.debug.auth", "TRUE")],
        ))
        .unwrap();
        assert!(config.trace.enabled);
        assert!(config.trace.reveal_auth);
    }

    #[test]
    fn rejects_unsupported_store() {
        let err = ImapConnector::client_config(&request("pop3", &[])).unwrap_err();
        assert!(matches!(err, Error::Connection(m) if m.contains("pop3")));
    }

    #[test]
    fn rejects_malformed_port() {
        let err =
            ImapConnector::client_config(&request("imaps", &[("mail.imaps.port", "x")]))
                .unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[test]
    fn converts_fetch_items() {
        let envelope = Envelope {
            date: Some("Sat, 7 Mar 2026 09:15:00 +0000".to_string()),
            subject: Some("=?UTF-8?Q?jenkins_>_caf=C3=A9?=".to_string()),
            from: vec![Address {
                name: Some("Jenkins".to_string()),
                mailbox: Some("ci".to_string()),
                host: Some("example.com".to_string()),
                ..Address::default()
            }],
            to: vec![Address {
                mailbox: Some("dev".to_string()),
                host: Some("example.com".to_string()),
                ..Address::default()
            }],
            message_id: Some("<1@example.com>".to_string()),
            ..Envelope::default()
        };
        let items = vec![
            FetchItem::Uid(Uid::new(42).unwrap()),
            FetchItem::Flags([Flag::Flagged].into_iter().collect()),
            FetchItem::InternalDate("07-Mar-2026 09:15:05 +0000".to_string()),
            FetchItem::Rfc822Size(512),
            FetchItem::Envelope(Box::new(envelope)),
        ];

        let message = message_from_fetch(SeqNum::new(3).unwrap(), items).unwrap();
        assert_eq!(message.uid, 42);
        assert_eq!(message.sequence, 3);
        assert_eq!(message.subject.as_deref(), Some("jenkins > café"));
        assert_eq!(message.from, vec!["Jenkins <ci@example.com>"]);
        assert_eq!(message.to, vec!["dev@example.com"]);
        assert_eq!(message.flags, vec!["\\Flagged"]);
        assert_eq!(message.size, Some(512));
        assert!(message.received.is_some());
    }

    #[test]
    fn fetch_without_uid_is_dropped() {
        let items = vec![FetchItem::Rfc822Size(10)];
        assert!(message_from_fetch(SeqNum::new(1).unwrap(), items).is_none());
    }
}
