//! Grammar pieces shared by the untagged and tagged parsers.

use chrono::{DateTime, FixedOffset};

use crate::Result;
use crate::parser::lexer::{Lexer, Token};
use crate::types::{
    Capability, Flag, Flags, ListResponse, Mailbox, MailboxAttribute, ResponseCode, SeqNum, Uid,
};

/// Codes that take no argument.
const BARE_CODES: [(&str, ResponseCode); 6] = [
    ("ALERT", ResponseCode::Alert),
    ("READ-ONLY", ResponseCode::ReadOnly),
    ("READ-WRITE", ResponseCode::ReadWrite),
    ("TRYCREATE", ResponseCode::TryCreate),
    ("NONEXISTENT", ResponseCode::NonExistent),
    ("AUTHENTICATIONFAILED", ResponseCode::AuthenticationFailed),
];

/// `"[" code "]"`. Arguments of codes without a variant are skipped.
pub fn response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::OpenBracket)?;
    let name = lexer.atom()?;

    let code = if let Some((_, bare)) = BARE_CODES
        .iter()
        .find(|(word, _)| word.eq_ignore_ascii_case(name))
    {
        bare.clone()
    } else {
        match name.to_ascii_uppercase().as_str() {
            "UIDNEXT" => {
                lexer.space()?;
                let n = lexer.number()?;
                ResponseCode::UidNext(Uid::new(n).ok_or_else(|| lexer.error("UIDNEXT 0"))?)
            }
            "UIDVALIDITY" => {
                lexer.space()?;
                ResponseCode::UidValidity(lexer.number()?)
            }
            "CAPABILITY" => ResponseCode::Capability(capabilities(lexer)?),
            "PERMANENTFLAGS" => {
                lexer.space()?;
                ResponseCode::PermanentFlags(flag_list(lexer)?.into_vec())
            }
            _ => ResponseCode::Unknown(name.to_owned()),
        }
    };

    while !lexer.at_end() && lexer.peek() != Some(b']') {
        lexer.bump();
    }
    lexer.expect(Token::CloseBracket)?;
    Ok(code)
}

/// Space-prefixed capability atoms, up to the end of the line or the code.
pub fn capabilities(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut found = Vec::new();
    while lexer.eat(b' ') {
        if let Token::Atom(name) = lexer.next_token()? {
            found.push(Capability::parse(name));
        }
    }
    Ok(found)
}

/// `"(" flag *(SP flag) ")"`.
pub fn flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(Token::Open)?;
    let mut flags = Flags::new();

    loop {
        match lexer.next_token()? {
            Token::Close => return Ok(flags),
            Token::Space => {}
            // `\*` in PERMANENTFLAGS lexes as a lone backslash and a star.
            Token::Atom("\\") | Token::Star => {}
            Token::Atom(name) => flags.insert(Flag::parse(name)),
            other => return Err(lexer.error(&format!("{other:?} inside a flag list"))),
        }
    }
}

/// `"(" attributes ")" SP delimiter SP mailbox`, after `LIST SP`.
pub fn list_entry(lexer: &mut Lexer<'_>) -> Result<ListResponse> {
    lexer.expect(Token::Open)?;
    let mut attributes = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::Close => break,
            Token::Space => {}
            Token::Atom(name) => attributes.push(MailboxAttribute::parse(name)),
            other => return Err(lexer.error(&format!("{other:?} among LIST attributes"))),
        }
    }

    lexer.space()?;
    let delimiter = match lexer.next_token()? {
        Token::Nil => None,
        Token::Quoted(sep) => sep.chars().next(),
        other => return Err(lexer.error(&format!("{other:?} as hierarchy delimiter"))),
    };
    lexer.space()?;

    Ok(ListResponse {
        attributes,
        delimiter,
        mailbox: Mailbox::new(lexer.astring()?),
    })
}

/// Space-prefixed non-zero numbers of a SEARCH line.
pub fn numbers(lexer: &mut Lexer<'_>) -> Result<Vec<u32>> {
    let mut found = Vec::new();
    while lexer.eat(b' ') {
        match lexer.next_token()? {
            Token::Number(0) => {}
            Token::Number(n) => found.push(n),
            Token::Crlf | Token::Eof => break,
            // Trailing `(MODSEQ n)` and the like.
            _ => {}
        }
    }
    Ok(found)
}

/// Sequence numbers start at one.
pub fn seq_num(lexer: &Lexer<'_>, n: u32) -> Result<SeqNum> {
    SeqNum::new(n).ok_or_else(|| lexer.error("sequence number 0"))
}

/// Reads an INTERNALDATE such as `" 7-Mar-2026 09:15:00 +0100"`.
#[must_use]
pub fn parse_internal_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value.trim_start(), "%d-%b-%Y %H:%M:%S %z").ok()
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
    use chrono::{Datelike, Timelike};

    use super::*;

    fn code(input: &[u8]) -> ResponseCode {
        response_code(&mut Lexer::new(input)).unwrap()
    }

    #[test]
    fn bare_codes_in_any_case() {
        assert_eq!(code(b"[read-only]"), ResponseCode::ReadOnly);
        assert_eq!(code(b"[TRYCREATE]"), ResponseCode::TryCreate);
        assert_eq!(
            code(b"[AuthenticationFailed]"),
            ResponseCode::AuthenticationFailed
        );
    }

    #[test]
    fn codes_with_arguments() {
        assert_eq!(
            code(b"[UIDNEXT 4392]"),
            ResponseCode::UidNext(Uid::new(4392).unwrap())
        );
        assert!(response_code(&mut Lexer::new(b"[UIDNEXT 0]")).is_err());
        assert_eq!(
            code(b"[PERMANENTFLAGS (\\Deleted \\Seen \\*)]"),
            ResponseCode::PermanentFlags(vec![Flag::Deleted, Flag::Seen])
        );
    }

    #[test]
    fn unknown_code_arguments_are_skipped() {
        let mut lexer = Lexer::new(b"[HIGHESTMODSEQ 715194045007] ok");
        assert_eq!(
            response_code(&mut lexer).unwrap(),
            ResponseCode::Unknown("HIGHESTMODSEQ".to_string())
        );
        assert_eq!(lexer.rest(), b" ok");
    }

    #[test]
    fn search_numbers_skip_modifiers() {
        let mut lexer = Lexer::new(b" 3 7 (MODSEQ 917162500)\r\n");
        assert_eq!(numbers(&mut lexer).unwrap(), vec![3, 7]);
    }

    #[test]
    fn internal_dates() {
        let padded = parse_internal_date(" 7-Mar-2026 09:15:00 +0100").unwrap();
        assert_eq!((padded.day(), padded.hour()), (7, 9));
        assert_eq!(padded.offset().local_minus_utc(), 3600);

        let wide = parse_internal_date("17-Jul-1996 02:44:25 -0700").unwrap();
        assert_eq!(wide.year(), 1996);
        assert_eq!(wide.offset().local_minus_utc(), -7 * 3600);

        assert!(parse_internal_date("last tuesday").is_none());
    }
}
