//! Mailboxes as LIST and SELECT describe them.

use std::fmt;

use super::{Flags, Uid};

/// A mailbox (folder) name, as the server spells it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(String);

impl Mailbox {
    /// Wraps a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Untagged data returned by SELECT.
#[derive(Debug, Clone, Default)]
pub struct MailboxStatus {
    /// `EXISTS` count.
    pub exists: u32,
    /// `RECENT` count.
    pub recent: u32,
    /// `UIDNEXT`, when sent.
    pub uid_next: Option<Uid>,
    /// `UIDVALIDITY`, when sent.
    pub uid_validity: Option<u32>,
    /// Flags the mailbox knows about.
    pub flags: Flags,
    /// True after a `READ-ONLY` completion.
    pub read_only: bool,
}

/// Attribute of a LIST entry. Only the selectability markers get a variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MailboxAttribute {
    /// `\Noselect`.
    NoSelect,
    /// `\NonExistent`.
    NonExistent,
    /// `\HasChildren`.
    HasChildren,
    /// `\HasNoChildren`.
    HasNoChildren,
    /// Anything else, verbatim (special-use markers such as `\Sent` included).
    Other(String),
}

impl MailboxAttribute {
    /// Reads one attribute, ignoring case.
    #[must_use]
    pub fn parse(atom: &str) -> Self {
        [
            ("\\Noselect", Self::NoSelect),
            ("\\NonExistent", Self::NonExistent),
            ("\\HasChildren", Self::HasChildren),
            ("\\HasNoChildren", Self::HasNoChildren),
        ]
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(atom))
        .map_or_else(|| Self::Other(atom.to_string()), |(_, attribute)| attribute)
    }
}

/// One `* LIST` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResponse {
    /// Attributes in server order.
    pub attributes: Vec<MailboxAttribute>,
    /// Hierarchy separator; `None` for a flat namespace.
    pub delimiter: Option<char>,
    /// The mailbox.
    pub mailbox: Mailbox,
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
    fn attributes_ignore_case() {
        assert_eq!(MailboxAttribute::parse("\\NOSELECT"), MailboxAttribute::NoSelect);
        assert_eq!(
            MailboxAttribute::parse("\\Sent"),
            MailboxAttribute::Other("\\Sent".to_string())
        );
    }

    #[test]
    fn list_entry_keeps_placeholders() {
        let entry = ListResponse {
            attributes: vec![MailboxAttribute::NoSelect],
            delimiter: Some('/'),
            mailbox: Mailbox::new("[Gmail]"),
        };
        assert_eq!(entry.mailbox.to_string(), "[Gmail]");
        assert!(entry.attributes.contains(&MailboxAttribute::NoSelect));
    }
}
