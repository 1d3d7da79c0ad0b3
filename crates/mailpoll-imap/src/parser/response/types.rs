//! What a parsed response can carry.

use crate::types::{Capability, Flags, ListResponse, ResponseCode, SeqNum, Status, Uid};

/// Data the server sends with a `*` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// `* OK`, `* NO`, `* BAD`, `* PREAUTH` or `* BYE`.
    Status {
        /// Which of the five.
        status: Status,
        /// Bracketed code.
        code: Option<ResponseCode>,
        /// Free text after the code.
        text: String,
    },
    /// `* CAPABILITY ...`
    Capability(Vec<Capability>),
    /// One `* LIST` line.
    List(ListResponse),
    /// Flags the selected mailbox knows about.
    Flags(Flags),
    /// `* n EXISTS`
    Exists(u32),
    /// `* n RECENT`
    Recent(u32),
    /// `* n EXPUNGE`
    Expunge(SeqNum),
    /// `* n FETCH (...)`
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// The attributes that were understood.
        items: Vec<FetchItem>,
    },
    /// `* SEARCH ...`; UIDs when answering UID SEARCH.
    Search(Vec<u32>),
    /// Well-formed data this client has no use for, by keyword.
    Other(String),
}

/// One attribute of a FETCH response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// `UID`
    Uid(Uid),
    /// `FLAGS`
    Flags(Flags),
    /// `INTERNALDATE`, unparsed.
    InternalDate(String),
    /// `RFC822.SIZE`
    Rfc822Size(u32),
    /// `ENVELOPE`
    Envelope(Box<Envelope>),
}

/// Header summary from an `ENVELOPE` item. Strings are as sent, so encoded
/// words are still encoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// `Date:`
    pub date: Option<String>,
    /// `Subject:`
    pub subject: Option<String>,
    /// `From:`
    pub from: Vec<Address>,
    /// `Sender:`
    pub sender: Vec<Address>,
    /// `Reply-To:`
    pub reply_to: Vec<Address>,
    /// `To:`
    pub to: Vec<Address>,
    /// `Cc:`
    pub cc: Vec<Address>,
    /// `Bcc:`
    pub bcc: Vec<Address>,
    /// `In-Reply-To:`
    pub in_reply_to: Option<String>,
    /// `Message-ID:`
    pub message_id: Option<String>,
}

/// An envelope address: `(name adl mailbox host)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Obsolete source route.
    pub adl: Option<String>,
    /// Local part.
    pub mailbox: Option<String>,
    /// Domain.
    pub host: Option<String>,
}

impl Address {
    /// `mailbox@host`, or the bare mailbox when there is no host.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        let local = self.mailbox.as_deref()?;
        Some(self.host.as_deref().map_or_else(
            || local.to_owned(),
            |host| format!("{local}@{host}"),
        ))
    }

    /// Group syntax shows up as addresses without a host.
    #[must_use]
    pub const fn is_group_marker(&self) -> bool {
        self.host.is_none()
    }
}
