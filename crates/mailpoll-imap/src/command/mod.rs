//! The commands a poll cycle sends, and their wire form.

mod serialize;
mod tag_generator;
mod types;

use crate::types::{Flag, Mailbox, UidSet};

pub use serialize::imap_date;
pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, SearchCriteria};

use serialize::Line;

/// One client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `CAPABILITY`
    Capability,
    /// `STARTTLS`
    StartTls,
    /// `LOGIN user password`
    Login {
        /// User name.
        username: String,
        /// Password; never logged.
        password: String,
    },
    /// `LIST reference pattern`
    List {
        /// Reference name, usually empty.
        reference: String,
        /// Name pattern; `*` and `%` are wildcards.
        pattern: String,
    },
    /// `SELECT mailbox`
    Select {
        /// Mailbox to open.
        mailbox: Mailbox,
    },
    /// `CLOSE`: leave the selected mailbox.
    Close,
    /// `UID SEARCH [CHARSET UTF-8] criteria`
    UidSearch {
        /// What to look for.
        criteria: SearchCriteria,
    },
    /// `UID FETCH set (items)`
    UidFetch {
        /// Target messages.
        uids: UidSet,
        /// Attributes wanted.
        items: Vec<FetchAttribute>,
    },
    /// `UID STORE set +FLAGS[.SILENT] (flags)`
    UidStore {
        /// Target messages.
        uids: UidSet,
        /// Flags to add.
        flags: Vec<Flag>,
        /// Ask the server not to echo the new flags.
        silent: bool,
    },
    /// `LOGOUT`
    Logout,
}

impl Command {
    /// The CRLF-terminated command under `tag`, literals sent as `{n+}`.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        self.encode(tag, true).concat()
    }

    /// The command as pieces to write in order. Without `literal_plus`
    /// every piece but the last ends in a `{n}` header, and the server's
    /// continuation must arrive before the next piece is sent.
    #[must_use]
    pub fn encode(&self, tag: &str, literal_plus: bool) -> Vec<Vec<u8>> {
        let mut line = Line::with_tag(tag, literal_plus);

        match self {
            Self::Capability => {
                line.word("CAPABILITY");
            }
            Self::StartTls => {
                line.word("STARTTLS");
            }
            Self::Close => {
                line.word("CLOSE");
            }
            Self::Logout => {
                line.word("LOGOUT");
            }
            Self::Login { username, password } => {
                line.word("LOGIN").astring(username).astring(password);
            }
            Self::List { reference, pattern } => {
                line.word("LIST").astring(reference);
                if is_wildcard(pattern) {
                    line.word(pattern);
                } else {
                    line.astring(pattern);
                }
            }
            Self::Select { mailbox } => {
                line.word("SELECT").astring(mailbox.as_str());
            }
            Self::UidSearch { criteria } => {
                line.word("UID SEARCH");
                if criteria.needs_utf8() {
                    line.word("CHARSET UTF-8");
                }
                line.search(criteria);
            }
            Self::UidFetch { uids, items } => {
                line.word("UID FETCH")
                    .word(&uids.to_string())
                    .list(items.iter().map(|item| item.as_str()));
            }
            Self::UidStore {
                uids,
                flags,
                silent,
            } => {
                line.word("UID STORE")
                    .word(&uids.to_string())
                    .add_flags(flags, *silent);
            }
        }

        line.finish()
    }

    /// The command as it may appear in logs, without CRLF. The LOGIN
    /// password is always masked, the username unless `reveal_user`.
    #[must_use]
    pub fn redacted(&self, tag: &str, reveal_user: bool) -> String {
        if let Self::Login { username, .. } = self {
            let user = if reveal_user { username.as_str() } else { "***" };
            return format!("{tag} LOGIN {user} ****");
        }
        String::from_utf8_lossy(&self.serialize(tag))
            .trim_end()
            .to_owned()
    }
}

/// `*` and `%` patterns go out bare so the server sees them as wildcards.
fn is_wildcard(pattern: &str) -> bool {
    !pattern.is_empty() && pattern.bytes().all(|b| b == b'*' || b == b'%')
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
    use chrono::NaiveDate;

    use super::*;
    use crate::types::{Flag, Uid};

    fn wire(command: &Command) -> String {
        String::from_utf8(command.serialize("A0042")).unwrap()
    }

    fn login(username: &str, password: &str) -> Command {
        Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn bare_commands() {
        assert_eq!(wire(&Command::Capability), "A0042 CAPABILITY\r\n");
        assert_eq!(wire(&Command::StartTls), "A0042 STARTTLS\r\n");
        assert_eq!(wire(&Command::Logout), "A0042 LOGOUT\r\n");
        assert_eq!(wire(&Command::Close), "A0042 CLOSE\r\n");
    }

    #[test]
    fn login_arguments_quote_only_when_needed() {
        assert_eq!(
            wire(&login("ci@example.org", "hunter2")),
            "A0042 LOGIN ci@example.org hunter2\r\n"
        );
        assert_eq!(
            wire(&login("ci", "two words \"and\" \\")),
            "A0042 LOGIN ci \"two words \\\"and\\\" \\\\\"\r\n"
        );
        assert_eq!(wire(&login("", "pw")), "A0042 LOGIN \"\" pw\r\n");
    }

    #[test]
    fn login_never_logs_the_password() {
        let command = login("ci", "s3cret");
        assert_eq!(command.redacted("A0001", true), "A0001 LOGIN ci ****");
        assert_eq!(command.redacted("A0001", false), "A0001 LOGIN *** ****");
        assert_eq!(Command::Logout.redacted("A0009", false), "A0009 LOGOUT");
    }

    #[test]
    fn list_wildcards_and_names() {
        let all = Command::List {
            reference: String::new(),
            pattern: "*".to_string(),
        };
        assert_eq!(wire(&all), "A0042 LIST \"\" *\r\n");

        let named = Command::List {
            reference: String::new(),
            pattern: "Work/*x".to_string(),
        };
        assert_eq!(wire(&named), "A0042 LIST \"\" \"Work/*x\"\r\n");
    }

    #[test]
    fn select_quotes_spaces() {
        let command = Command::Select {
            mailbox: Mailbox::new("Build Reports"),
        };
        assert_eq!(wire(&command), "A0042 SELECT \"Build Reports\"\r\n");
    }

    #[test]
    fn search_with_every_poll_key() {
        let command = Command::UidSearch {
            criteria: SearchCriteria::And(vec![
                SearchCriteria::Unseen,
                SearchCriteria::Subject("[jenkins] nightly".to_string()),
                SearchCriteria::Since(day(2026, 3, 7)),
            ]),
        };
        assert_eq!(
            wire(&command),
            "A0042 UID SEARCH UNSEEN SUBJECT \"[jenkins] nightly\" SINCE 7-Mar-2026\r\n"
        );
    }

    #[test]
    fn empty_conjunction_searches_everything() {
        let command = Command::UidSearch {
            criteria: SearchCriteria::And(Vec::new()),
        };
        assert_eq!(wire(&command), "A0042 UID SEARCH ALL\r\n");
    }

    #[test]
    fn non_ascii_subject_is_a_literal() {
        let command = Command::UidSearch {
            criteria: SearchCriteria::And(vec![
                SearchCriteria::Unseen,
                SearchCriteria::Subject("сборка >".to_string()),
            ]),
        };
        let subject = "сборка >";

        assert_eq!(
            wire(&command),
            format!(
                "A0042 UID SEARCH CHARSET UTF-8 UNSEEN SUBJECT {{{}+}}\r\n{subject}\r\n",
                subject.len()
            )
        );

        let pieces = command.encode("A0002", false);
        assert_eq!(pieces.len(), 2);
        assert_eq!(
            pieces[0],
            format!(
                "A0002 UID SEARCH CHARSET UTF-8 UNSEEN SUBJECT {{{}}}\r\n",
                subject.len()
            )
            .into_bytes()
        );
        assert_eq!(pieces[1], format!("{subject}\r\n").into_bytes());
        assert!(!pieces[0].iter().any(|b| *b >= 0x80));
    }

    #[test]
    fn line_breaks_force_a_literal() {
        let pieces = login("ci", "a\r\nb").encode("A0001", false);
        assert_eq!(pieces, [b"A0001 LOGIN ci {4}\r\n".to_vec(), b"a\r\nb\r\n".to_vec()]);
    }

    #[test]
    fn ascii_commands_are_one_piece() {
        let pieces = Command::Close.encode("A0003", false);
        assert_eq!(pieces, [b"A0003 CLOSE\r\n".to_vec()]);
    }

    #[test]
    fn fetch_collapses_uid_runs() {
        let command = Command::UidFetch {
            uids: [7, 5, 6, 11].into_iter().filter_map(Uid::new).collect(),
            items: vec![FetchAttribute::Uid, FetchAttribute::Rfc822Size],
        };
        assert_eq!(
            wire(&command),
            "A0042 UID FETCH 5:7,11 (UID RFC822.SIZE)\r\n"
        );
    }

    #[test]
    fn store_flags() {
        let seen = Command::UidStore {
            uids: UidSet::single(Uid::new(311).unwrap()),
            flags: vec![Flag::Seen],
            silent: true,
        };
        assert_eq!(
            wire(&seen),
            "A0042 UID STORE 311 +FLAGS.SILENT (\\Seen)\r\n"
        );

        let loud = Command::UidStore {
            uids: UidSet::single(Uid::new(2).unwrap()),
            flags: vec![Flag::Seen, Flag::Flagged],
            silent: false,
        };
        assert_eq!(
            wire(&loud),
            "A0042 UID STORE 2 +FLAGS (\\Seen \\Flagged)\r\n"
        );
    }

    #[test]
    fn dates_are_not_zero_padded() {
        assert_eq!(imap_date(day(2026, 10, 1)), "1-Oct-2026");
        assert_eq!(imap_date(day(2026, 3, 17)), "17-Mar-2026");
    }
}
