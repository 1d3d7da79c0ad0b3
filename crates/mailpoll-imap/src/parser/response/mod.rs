//! Turns one complete server response into a [`Response`].
//!
//! The grammar is the subset of RFC 3501 a poller receives. Untagged data
//! the client never asked for is reported as [`UntaggedResponse::Other`]
//! rather than failing the whole exchange.

#![allow(clippy::missing_errors_doc)]

mod fetch;
mod helpers;
mod types;

pub use helpers::parse_internal_date;
pub use types::{Address, Envelope, FetchItem, UntaggedResponse};

use crate::Result;
use crate::parser::lexer::{Lexer, Token};
use crate::types::{ResponseCode, Status};

/// A parsed response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Completion of the command that carried `tag`.
    Tagged {
        /// Tag echoed from the command.
        tag: String,
        /// Outcome.
        status: Status,
        /// Bracketed code.
        code: Option<ResponseCode>,
        /// Free text after the code.
        text: String,
    },
    /// `*` data.
    Untagged(UntaggedResponse),
    /// `+` request for more client data.
    Continuation {
        /// Prompt, when the server sent one.
        text: Option<String>,
    },
}

/// Entry point of the parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one response. `input` must hold the whole response, including
    /// the payload of any literal it announces.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Star => {
                lexer.space()?;
                untagged(&mut lexer).map(Response::Untagged)
            }
            Token::Plus => Ok(continuation(&mut lexer)),
            Token::Atom(tag) => tagged(&mut lexer, tag),
            other => Err(lexer.error(&format!("response starts with {other:?}"))),
        }
    }
}

fn tagged(lexer: &mut Lexer<'_>, tag: &str) -> Result<Response> {
    lexer.space()?;
    let word = lexer.atom()?;
    let status =
        Status::from_atom(word).ok_or_else(|| lexer.error(&format!("'{word}' is not a status")))?;
    let (code, text) = resp_text(lexer)?;

    Ok(Response::Tagged {
        tag: tag.to_owned(),
        status,
        code,
        text,
    })
}

fn untagged(lexer: &mut Lexer<'_>) -> Result<UntaggedResponse> {
    let word = match lexer.next_token()? {
        Token::Number(n) => return message_data(lexer, n),
        Token::Atom(word) => word,
        other => return Err(lexer.error(&format!("untagged data starts with {other:?}"))),
    };

    if let Some(status) = Status::from_atom(word) {
        let (code, text) = resp_text(lexer)?;
        return Ok(UntaggedResponse::Status { status, code, text });
    }

    let keyword = word.to_ascii_uppercase();
    let data = match keyword.as_str() {
        "CAPABILITY" => UntaggedResponse::Capability(helpers::capabilities(lexer)?),
        "FLAGS" => {
            lexer.space()?;
            UntaggedResponse::Flags(helpers::flag_list(lexer)?)
        }
        "LIST" => {
            lexer.space()?;
            UntaggedResponse::List(helpers::list_entry(lexer)?)
        }
        "SEARCH" => UntaggedResponse::Search(helpers::numbers(lexer)?),
        _ => {
            lexer.rest_of_line();
            UntaggedResponse::Other(keyword)
        }
    };
    Ok(data)
}

/// `* n KEYWORD ...`
fn message_data(lexer: &mut Lexer<'_>, n: u32) -> Result<UntaggedResponse> {
    lexer.space()?;
    let keyword = lexer.atom()?.to_ascii_uppercase();

    match keyword.as_str() {
        "EXISTS" => Ok(UntaggedResponse::Exists(n)),
        "RECENT" => Ok(UntaggedResponse::Recent(n)),
        "EXPUNGE" => helpers::seq_num(lexer, n).map(UntaggedResponse::Expunge),
        "FETCH" => {
            let seq = helpers::seq_num(lexer, n)?;
            lexer.space()?;
            let items = fetch::items(lexer)?;
            Ok(UntaggedResponse::Fetch { seq, items })
        }
        _ => {
            lexer.rest_of_line();
            Ok(UntaggedResponse::Other(keyword))
        }
    }
}

fn continuation(lexer: &mut Lexer<'_>) -> Response {
    lexer.eat(b' ');
    let text = lexer.rest_of_line();
    Response::Continuation {
        text: (!text.is_empty()).then_some(text),
    }
}

/// `[SP] ["[" code "]"] [SP] text`. Several servers leave the text out.
fn resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
    lexer.eat(b' ');
    let code = if lexer.peek() == Some(b'[') {
        Some(helpers::response_code(lexer)?)
    } else {
        None
    };
    lexer.eat(b' ');
    Ok((code, lexer.rest_of_line()))
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
    use crate::types::{Capability, Flag, MailboxAttribute};

    use super::*;

    fn untagged(line: &[u8]) -> UntaggedResponse {
        match ResponseParser::parse(line).unwrap() {
            Response::Untagged(data) => data,
            other => panic!("not untagged: {other:?}"),
        }
    }

    #[test]
    fn plain_greeting() {
        assert_eq!(
            untagged(b"* OK Dovecot ready.\r\n"),
            UntaggedResponse::Status {
                status: Status::Ok,
                code: None,
                text: "Dovecot ready.".to_string(),
            }
        );
    }

    #[test]
    fn greeting_with_capabilities() {
        let data = untagged(b"* OK [CAPABILITY IMAP4rev1 LOGINDISABLED STARTTLS] hi\r\n");
        let UntaggedResponse::Status {
            status: Status::Ok,
            code: Some(ResponseCode::Capability(caps)),
            text,
        } = data
        else {
            panic!("greeting lost its capabilities");
        };
        assert_eq!(
            caps,
            vec![Capability::Imap4Rev1, Capability::LoginDisabled, Capability::StartTls]
        );
        assert_eq!(text, "hi");
    }

    #[test]
    fn preauth_and_bye_are_statuses() {
        assert!(matches!(
            untagged(b"* PREAUTH welcome\r\n"),
            UntaggedResponse::Status { status: Status::PreAuth, .. }
        ));
        assert!(matches!(
            untagged(b"* bye Autologout; idle too long\r\n"),
            UntaggedResponse::Status { status: Status::Bye, text, .. } if text == "Autologout; idle too long"
        ));
    }

    #[test]
    fn tagged_completion() {
        assert_eq!(
            ResponseParser::parse(b"A0001 OK LOGIN completed\r\n").unwrap(),
            Response::Tagged {
                tag: "A0001".to_string(),
                status: Status::Ok,
                code: None,
                text: "LOGIN completed".to_string(),
            }
        );
    }

    #[test]
    fn missing_mailbox_refusal() {
        let Response::Tagged { status, code, text, .. } =
            ResponseParser::parse(b"A0003 NO [NONEXISTENT] Unknown Mailbox: Builds\r\n").unwrap()
        else {
            panic!("expected a tagged response");
        };
        assert_eq!(status, Status::No);
        assert!(code.is_some_and(|c| c.is_missing_mailbox()));
        assert_eq!(text, "Unknown Mailbox: Builds");
    }

    #[test]
    fn tagged_status_may_have_no_text() {
        let response = ResponseParser::parse(b"A0002 OK\r\n").unwrap();
        assert!(matches!(response, Response::Tagged { text, code: None, .. } if text.is_empty()));
    }

    #[test]
    fn tagged_non_status_is_rejected() {
        assert!(ResponseParser::parse(b"A0002 MAYBE later\r\n").is_err());
    }

    #[test]
    fn uid_validity_in_untagged_ok() {
        assert_eq!(
            untagged(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n"),
            UntaggedResponse::Status {
                status: Status::Ok,
                code: Some(ResponseCode::UidValidity(3_857_529_045)),
                text: "UIDs valid".to_string(),
            }
        );
    }

    #[test]
    fn capability_data() {
        let UntaggedResponse::Capability(caps) =
            untagged(b"* CAPABILITY IMAP4rev1 STARTTLS AUTH=plain IDLE\r\n")
        else {
            panic!("expected CAPABILITY");
        };
        assert_eq!(caps.len(), 4);
        assert!(caps.contains(&Capability::Auth("PLAIN".to_string())));
        assert!(caps.contains(&Capability::Other("IDLE".to_string())));
    }

    #[test]
    fn mailbox_counters() {
        assert_eq!(untagged(b"* 172 EXISTS\r\n"), UntaggedResponse::Exists(172));
        assert_eq!(untagged(b"* 1 recent\r\n"), UntaggedResponse::Recent(1));
        assert!(matches!(
            untagged(b"* 4 EXPUNGE\r\n"),
            UntaggedResponse::Expunge(seq) if seq.get() == 4
        ));
        assert!(ResponseParser::parse(b"* 0 EXPUNGE\r\n").is_err());
    }

    #[test]
    fn mailbox_flags() {
        let UntaggedResponse::Flags(flags) =
            untagged(b"* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft $Forwarded)\r\n")
        else {
            panic!("expected FLAGS");
        };
        assert_eq!(flags.len(), 6);
        assert!(flags.is_seen());
        assert!(flags.contains(&Flag::Keyword("$Forwarded".to_string())));
    }

    #[test]
    fn list_entries() {
        let UntaggedResponse::List(inbox) = untagged(b"* LIST (\\HasNoChildren) \".\" INBOX\r\n")
        else {
            panic!("expected LIST");
        };
        assert_eq!(inbox.delimiter, Some('.'));
        assert_eq!(inbox.mailbox.as_str(), "INBOX");
        assert!(inbox.attributes.contains(&MailboxAttribute::HasNoChildren));

        let UntaggedResponse::List(archive) =
            untagged(b"* LIST (\\Noselect \\HasChildren) NIL \"[Gmail]\"\r\n")
        else {
            panic!("expected LIST");
        };
        assert_eq!(archive.delimiter, None);
        assert_eq!(archive.mailbox.as_str(), "[Gmail]");
        assert_eq!(archive.attributes[0], MailboxAttribute::NoSelect);
    }

    #[test]
    fn fetch_data() {
        let UntaggedResponse::Fetch { seq, items } = untagged(
            b"* 12 FETCH (UID 4827 RFC822.SIZE 2210 FLAGS (\\Seen) INTERNALDATE \"08-Mar-2026 10:02:11 +0000\")\r\n",
        ) else {
            panic!("expected FETCH");
        };
        assert_eq!(seq.get(), 12);
        assert_eq!(items.len(), 4);
        assert!(matches!(items[0], FetchItem::Uid(uid) if uid.get() == 4827));
        assert_eq!(items[1], FetchItem::Rfc822Size(2210));
        assert!(matches!(&items[3], FetchItem::InternalDate(d) if d.starts_with("08-Mar")));
    }

    #[test]
    fn search_results() {
        assert_eq!(
            untagged(b"* SEARCH 2 84 882\r\n"),
            UntaggedResponse::Search(vec![2, 84, 882])
        );
        assert_eq!(untagged(b"* SEARCH\r\n"), UntaggedResponse::Search(Vec::new()));
    }

    #[test]
    fn unrequested_data_is_passed_over() {
        assert_eq!(
            untagged(b"* ENABLED UTF8=ACCEPT\r\n"),
            UntaggedResponse::Other("ENABLED".to_string())
        );
    }

    #[test]
    fn continuation_requests() {
        assert_eq!(
            ResponseParser::parse(b"+ go ahead\r\n").unwrap(),
            Response::Continuation {
                text: Some("go ahead".to_string())
            }
        );
        assert_eq!(
            ResponseParser::parse(b"+\r\n").unwrap(),
            Response::Continuation { text: None }
        );
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(ResponseParser::parse(b"(oops)\r\n").is_err());
        assert!(ResponseParser::parse(b"* (oops)\r\n").is_err());
    }
}
