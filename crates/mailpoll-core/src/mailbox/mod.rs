//! Mailbox access.
//!
//! [`MailboxConnector`] opens a [`MailboxSession`]; the poll cycle only
//! talks to these traits, so tests can script a store without a network.

mod imap;
mod message;

use std::collections::BTreeMap;

use async_trait::async_trait;

pub use imap::{ImapConnector, ImapSession};
pub use message::{Message, extract_properties};

use crate::Result;
use crate::config::{ConfigKey, Configuration};
use crate::criteria::Criteria;

/// What a connector needs to open a session.
#[derive(Clone, Default)]
pub struct ConnectRequest {
    /// Server host from the `host` key.
    pub host: String,
    /// Store protocol name from the `storeName` key.
    pub store: String,
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Every script entry, forwarded verbatim.
    pub properties: BTreeMap<String, String>,
}

impl ConnectRequest {
    /// Builds a request from resolved properties.
    #[must_use]
    pub fn from_config(config: &Configuration) -> Self {
        let field = |key: ConfigKey| config.get(key).unwrap_or_default().to_string();
        Self {
            host: field(ConfigKey::Host),
            store: field(ConfigKey::StoreName),
            username: field(ConfigKey::Username),
            password: field(ConfigKey::Password),
            properties: config
                .protocol_properties()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Returns a passthrough property when it is non-blank.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Returns `mail.<store>.<name>` when it is non-blank.
    #[must_use]
    pub fn store_property(&self, name: &str) -> Option<&str> {
        self.property(&format!("mail.{}.{name}", self.store))
    }

    /// Returns true if the property is set to `true` (case-insensitive).
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.property(key)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}

impl std::fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("host", &self.host)
            .field("store", &self.store)
            .field("username", &self.username)
            .field("password", &"****")
            .field("properties", &self.properties.len())
            .finish()
    }
}

/// Opens authenticated sessions.
#[async_trait]
pub trait MailboxConnector: Send + Sync {
    /// Connects and logs in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`](crate::Error::Connection) on network,
    /// TLS or authentication failure, or for an unsupported store.
    async fn connect(&self, request: &ConnectRequest) -> Result<Box<dyn MailboxSession>>;
}

/// One authenticated connection with at most one selected folder.
#[async_trait]
pub trait MailboxSession: Send {
    /// Selects `name` for searching and flag updates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FolderNotFound`](crate::Error::FolderNotFound) when
    /// the folder does not exist, and
    /// [`Error::Connection`](crate::Error::Connection) for anything else.
    async fn select_folder(&mut self, name: &str) -> Result<()>;

    /// Lists every folder name the store reports.
    ///
    /// Works after a failed selection as long as the connection is alive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`](crate::Error::Connection) if the listing fails.
    async fn list_folder_names(&mut self) -> Result<Vec<String>>;

    /// Returns the messages of the selected folder matching every predicate,
    /// in store order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Search`](crate::Error::Search) if the store cannot run
    /// the search.
    async fn search(&mut self, criteria: &Criteria) -> Result<Vec<Message>>;

    /// Sets `\Seen` on the message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mark`](crate::Error::Mark) if the store rejects the update.
    async fn mark_processed(&mut self, message: &Message) -> Result<()>;

    /// Releases the connection. Safe to call repeatedly; never fails.
    async fn close(&mut self);
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
    use crate::config::apply_defaults;

    #[test]
    fn request_carries_passthrough_properties() {
        let mut config = Configuration::parse(
            "host=mail.x.com\nusername=u\npassword=p\nmail.imaps.timeout=5000",
        )
        .unwrap();
        apply_defaults(&mut config);
        let request = ConnectRequest::from_config(&config);

        assert_eq!(request.host, "mail.x.com");
        assert_eq!(request.store, "imaps");
        assert_eq!(request.store_property("port"), Some("993"));
        assert_eq!(request.store_property("timeout"), Some("5000"));
        assert!(request.flag("mail.debug"));
        assert_eq!(request.property("missing"), None);
    }

    #[test]
    fn debug_output_hides_password() {
        let request = ConnectRequest {
            password: "hunter2".to_string(),
            ..ConnectRequest::default()
        };
        assert!(!format!("{request:?}").contains("hunter2"));
    }
}
