//! Arguments of the message commands.

use chrono::NaiveDate;

/// Something to FETCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchAttribute {
    /// `UID`
    Uid,
    /// `FLAGS`
    Flags,
    /// `INTERNALDATE`, when the server received the message.
    InternalDate,
    /// `RFC822.SIZE`
    Rfc822Size,
    /// `ENVELOPE`: date, subject, addresses and message id.
    Envelope,
}

impl FetchAttribute {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Uid => "UID",
            Self::Flags => "FLAGS",
            Self::InternalDate => "INTERNALDATE",
            Self::Rfc822Size => "RFC822.SIZE",
            Self::Envelope => "ENVELOPE",
        }
    }
}

/// A SEARCH key.
///
/// The server compares dates by calendar day in its own time zone, and
/// SUBJECT as a case-insensitive substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// `UNSEEN`
    Unseen,
    /// `SUBJECT text`
    Subject(String),
    /// `SINCE day`: received on or after the day.
    Since(NaiveDate),
    /// Every key must hold. Empty means `ALL`.
    And(Vec<Self>),
}

impl SearchCriteria {
    /// True when a text argument is not plain ASCII, so the command has to
    /// declare `CHARSET UTF-8`.
    #[must_use]
    pub fn needs_utf8(&self) -> bool {
        match self {
            Self::Subject(text) => !text.is_ascii(),
            Self::And(keys) => keys.iter().any(Self::needs_utf8),
            Self::Unseen | Self::Since(_) => false,
        }
    }
}
