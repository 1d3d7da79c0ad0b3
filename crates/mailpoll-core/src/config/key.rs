//! The fixed schema of recognised script keys.

/// A script key the poll cycle understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigKey {
    /// Store protocol name: `imaps` or `imap`.
    StoreName,
    /// Mail server host.
    Host,
    /// Login name.
    Username,
    /// Login password.
    Password,
    /// Folder to search.
    Folder,
    /// Subject substring filter.
    SubjectContains,
    /// Only consider messages received within this many minutes.
    ReceivedXMinutesAgo,
}

impl ConfigKey {
    /// Every key, in schema order.
    pub const ALL: [Self; 7] = [
        Self::StoreName,
        Self::Host,
        Self::Username,
        Self::Password,
        Self::Folder,
        Self::SubjectContains,
        Self::ReceivedXMinutesAgo,
    ];

    /// Keys that must be present before connecting, in reporting order.
    pub const REQUIRED: [Self; 4] = [Self::Host, Self::StoreName, Self::Username, Self::Password];

    /// Returns the key as written in a script.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StoreName => "storeName",
            Self::Host => "host",
            Self::Username => "username",
            Self::Password => "password",
            Self::Folder => "folder",
            Self::SubjectContains => "subjectContains",
            Self::ReceivedXMinutesAgo => "receivedXMinutesAgo",
        }
    }

    /// Returns the value filled in when the key is absent or blank.
    #[must_use]
    pub const fn default_value(self) -> Option<&'static str> {
        match self {
            Self::StoreName => Some("imaps"),
            Self::Folder => Some("INBOX"),
            Self::SubjectContains => Some("jenkins >"),
            // one day
            Self::ReceivedXMinutesAgo => Some("1440"),
            Self::Host | Self::Username | Self::Password => None,
        }
    }

    /// Message reported when a required key is missing.
    #[must_use]
    pub fn required_message(self) -> String {
        format!("Email property '{}' is required!", self.as_str())
    }

    /// Looks up a key by its script name (case-sensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl AsRef<str> for ConfigKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
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
    fn names_round_trip() {
        for key in ConfigKey::ALL {
            assert_eq!(ConfigKey::from_name(key.as_str()), Some(key));
        }
        assert_eq!(ConfigKey::from_name("Host"), None);
    }

    #[test]
    fn only_optional_keys_have_defaults() {
        for key in ConfigKey::REQUIRED {
            if key != ConfigKey::StoreName {
                assert!(key.default_value().is_none(), "{key} has a default");
            }
        }
        assert_eq!(ConfigKey::Folder.default_value(), Some("INBOX"));
    }
}
