//! What the server says about itself: completion status, capabilities and
//! bracketed response codes.

use super::{Flag, Uid};

/// Status word of a status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `OK`.
    Ok,
    /// `NO`: the command was understood but refused.
    No,
    /// `BAD`: the command was malformed.
    Bad,
    /// `PREAUTH` greeting; the connection starts authenticated.
    PreAuth,
    /// `BYE`: the server is hanging up.
    Bye,
}

impl Status {
    /// Reads a status keyword in any case.
    #[must_use]
    pub fn from_atom(atom: &str) -> Option<Self> {
        [
            ("OK", Self::Ok),
            ("NO", Self::No),
            ("BAD", Self::Bad),
            ("PREAUTH", Self::PreAuth),
            ("BYE", Self::Bye),
        ]
        .into_iter()
        .find_map(|(word, status)| atom.eq_ignore_ascii_case(word).then_some(status))
    }

    /// True for `OK` and `PREAUTH`.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::PreAuth)
    }
}

/// An advertised capability. Only the ones the client acts on get a variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4rev1`.
    Imap4Rev1,
    /// `STARTTLS`.
    StartTls,
    /// `LOGINDISABLED`: LOGIN is refused until the link is encrypted.
    LoginDisabled,
    /// `LITERAL+` (RFC 7888): literals need no continuation.
    LiteralPlus,
    /// `AUTH=<mechanism>`.
    Auth(String),
    /// Anything else, verbatim.
    Other(String),
}

impl Capability {
    /// Reads one capability atom.
    #[must_use]
    pub fn parse(atom: &str) -> Self {
        if atom.eq_ignore_ascii_case("IMAP4rev1") {
            Self::Imap4Rev1
        } else if atom.eq_ignore_ascii_case("STARTTLS") {
            Self::StartTls
        } else if atom.eq_ignore_ascii_case("LOGINDISABLED") {
            Self::LoginDisabled
        } else if atom.eq_ignore_ascii_case("LITERAL+") {
            Self::LiteralPlus
        } else {
            match atom.split_at_checked(5) {
                Some((prefix, mechanism))
                    if prefix.eq_ignore_ascii_case("AUTH=") && !mechanism.is_empty() =>
                {
                    Self::Auth(mechanism.to_ascii_uppercase())
                }
                _ => Self::Other(atom.to_string()),
            }
        }
    }
}

/// Bracketed code at the start of a status response's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// `ALERT`.
    Alert,
    /// `CAPABILITY ...`, sent with greetings and LOGIN completions.
    Capability(Vec<Capability>),
    /// `PERMANENTFLAGS (...)`.
    PermanentFlags(Vec<Flag>),
    /// `READ-ONLY`.
    ReadOnly,
    /// `READ-WRITE`.
    ReadWrite,
    /// `TRYCREATE`: the target mailbox is missing.
    TryCreate,
    /// `NONEXISTENT` (RFC 5530).
    NonExistent,
    /// `AUTHENTICATIONFAILED` (RFC 5530).
    AuthenticationFailed,
    /// `UIDNEXT n`.
    UidNext(Uid),
    /// `UIDVALIDITY n`.
    UidValidity(u32),
    /// Any other code, by name.
    Unknown(String),
}

impl ResponseCode {
    /// True when the code says the named mailbox does not exist.
    #[must_use]
    pub const fn is_missing_mailbox(&self) -> bool {
        matches!(self, Self::NonExistent | Self::TryCreate)
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
    fn capabilities() {
        assert_eq!(Capability::parse("imap4REV1"), Capability::Imap4Rev1);
        assert_eq!(Capability::parse("StartTLS"), Capability::StartTls);
        assert_eq!(Capability::parse("literal+"), Capability::LiteralPlus);
        assert_eq!(Capability::parse("LITERAL-"), Capability::Other("LITERAL-".to_string()));
        assert_eq!(Capability::parse("auth=plain"), Capability::Auth("PLAIN".to_string()));
        assert_eq!(Capability::parse("AUTH="), Capability::Other("AUTH=".to_string()));
        assert_eq!(Capability::parse("IDLE"), Capability::Other("IDLE".to_string()));
    }

    #[test]
    fn ok_statuses() {
        assert!(Status::PreAuth.is_ok());
        assert!(!Status::Bad.is_ok());
    }

    #[test]
    fn missing_mailbox_codes() {
        assert!(ResponseCode::NonExistent.is_missing_mailbox());
        assert!(ResponseCode::TryCreate.is_missing_mailbox());
        assert!(!ResponseCode::AuthenticationFailed.is_missing_mailbox());
        assert!(!ResponseCode::Unknown("CANNOT".to_string()).is_missing_mailbox());
    }
}
