//! Script parsing and property resolution.
//!
//! A script is a flat list of `key=value` lines. Recognised keys are listed
//! in [`ConfigKey`]; everything else is kept and forwarded to the mailbox
//! connector untouched.

mod defaults;
mod key;
mod validation;

pub use defaults::{apply_defaults, default_port};
pub use key::ConfigKey;
pub use validation::{missing_required, validate};

use crate::{Error, Result};

/// Ordered property bag parsed from a script.
///
/// Keys are case-sensitive. A key that appears twice keeps its first
/// position and takes the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    entries: Vec<(String, String)>,
}

impl Configuration {
    /// Creates an empty configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Parses a script.
    ///
    /// Blank lines and lines starting with `#` or `!` are ignored. Keys and
    /// values are trimmed; the value is everything after the first `=`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] for a line without `=` or with an
    /// empty key.
    pub fn parse(script: &str) -> Result<Self> {
        let mut config = Self::new();

        for (index, raw) in script.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(Error::ConfigParse {
                    line: Some(index + 1),
                    message: format!("expected key=value, got '{line}'"),
                });
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::ConfigParse {
                    line: Some(index + 1),
                    message: "empty key".to_string(),
                });
            }

            config.set(key, value.trim());
        }

        Ok(config)
    }

    /// Returns the raw value for `key`, which may be empty.
    #[must_use]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if `key` is present with a non-blank value.
    #[must_use]
    pub fn has(&self, key: impl AsRef<str>) -> bool {
        self.get(key).is_some_and(|v| !v.trim().is_empty())
    }

    /// Returns the value for `key` when it is non-blank.
    #[must_use]
    pub fn value(&self, key: impl AsRef<str>) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    /// Sets `key`, keeping its position if it already exists.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Sets `key` only when it is absent or blank.
    pub fn put_if_blank(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if !self.has(&key) {
            self.set(key, value);
        }
    }

    /// Iterates over every entry in insertion order, recognised or not.
    pub fn protocol_properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses `receivedXMinutesAgo` when present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] if the value is not an integer.
    pub fn received_minutes(&self) -> Result<Option<i64>> {
        self.value(ConfigKey::ReceivedXMinutesAgo)
            .map(|raw| {
                raw.trim().parse::<i64>().map_err(|_| Error::ConfigParse {
                    line: None,
                    message: format!(
                        "'{}' must be a whole number of minutes, got '{raw}'",
                        ConfigKey::ReceivedXMinutesAgo
                    ),
                })
            })
            .transpose()
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
    fn parses_pairs_and_skips_comments() {
        let config = Configuration::parse(
            "# mailbox\n\nhost = mail.x.com\n! legacy comment\nusername=u\n  password =p=q \n",
        )
        .unwrap();

        assert_eq!(config.len(), 3);
        assert_eq!(config.get("host"), Some("mail.x.com"));
        assert_eq!(config.get("password"), Some("p=q"));
    }

    #[test]
    fn keys_are_case_sensitive() {
        let config = Configuration::parse("Host=a\nhost=b").unwrap();
        assert_eq!(config.get("Host"), Some("a"));
        assert_eq!(config.get("host"), Some("b"));
    }

    #[test]
    fn has_and_get_differ_for_blank_values() {
        let config = Configuration::parse("folder=\nhost=  ").unwrap();
        assert_eq!(config.get("folder"), Some(""));
        assert!(!config.has("folder"));
        assert!(!config.has("host"));
        assert!(!config.has("missing"));
        assert_eq!(config.get("missing"), None);
    }

    #[test]
    fn repeated_key_keeps_position_takes_last_value() {
        let config = Configuration::parse("a=1\nb=2\na=3").unwrap();
        let entries: Vec<_> = config.protocol_properties().collect();
        assert_eq!(entries, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn line_without_separator_is_rejected() {
        let err = Configuration::parse("host=a\njust words\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { line: Some(2), .. }));
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = Configuration::parse(" = value").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { line: Some(1), .. }));
    }

    #[test]
    fn passthrough_keys_are_kept() {
        let config = Configuration::parse("mail.imaps.timeout=5000\nx-custom=yes").unwrap();
        assert_eq!(config.get("mail.imaps.timeout"), Some("5000"));
        assert_eq!(config.get("x-custom"), Some("yes"));
    }

    #[test]
    fn received_minutes_parses_signed_integers() {
        let config = Configuration::parse("receivedXMinutesAgo= -30 ").unwrap();
        assert_eq!(config.received_minutes().unwrap(), Some(-30));

        let config = Configuration::parse("receivedXMinutesAgo=soon").unwrap();
        assert!(matches!(
            config.received_minutes(),
            Err(Error::ConfigParse { line: None, .. })
        ));

        assert_eq!(Configuration::new().received_minutes().unwrap(), None);
    }
}
