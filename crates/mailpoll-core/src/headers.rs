//! RFC 2047 encoded-word decoding for envelope fields.
//!
//! IMAP returns subjects and display names exactly as they appear in the
//! header, so `=?UTF-8?B?...?=` words have to be decoded before they are
//! handed to a job.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Decodes every encoded word in a header value.
///
/// Text outside encoded words is kept as is. Whitespace between two
/// adjacent encoded words is dropped, as RFC 2047 section 6.2 requires.
/// Words that cannot be decoded are left untouched.
#[must_use]
pub fn decode_header(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    let mut pending_space = String::new();
    let mut after_word = false;

    while !rest.is_empty() {
        if let Some((decoded, consumed)) = encoded_word(rest) {
            // whitespace between encoded words is not part of the text
            if !after_word {
                out.push_str(&pending_space);
            }
            pending_space.clear();
            out.push_str(&decoded);
            rest = &rest[consumed..];
            after_word = true;
            continue;
        }

        let Some(c) = rest.chars().next() else {
            break;
        };
        rest = &rest[c.len_utf8()..];
        if c.is_whitespace() {
            pending_space.push(c);
        } else {
            out.push_str(&pending_space);
            pending_space.clear();
            out.push(c);
            after_word = false;
        }
    }

    out.push_str(&pending_space);
    out
}

/// Decodes one `=?charset?enc?text?=` word at the start of `input`.
///
/// Returns the decoded text and the number of bytes consumed.
fn encoded_word(input: &str) -> Option<(String, usize)> {
    let body = input.strip_prefix("=?")?;
    let (charset, body) = body.split_once('?')?;
    let (encoding, body) = body.split_once('?')?;
    let end = body.find("?=")?;
    let text = &body[..end];
    if text.contains(char::is_whitespace) {
        return None;
    }

    // RFC 2231 language suffix: charset*lang
    let charset = charset.split('*').next().unwrap_or(charset);

    let bytes = match encoding {
        "B" | "b" => STANDARD.decode(text).ok()?,
        "Q" | "q" => decode_q(text)?,
        _ => return None,
    };
    let decoded = decode_charset(charset, &bytes)?;

    let consumed = 2 + charset_len(input) + 1 + encoding.len() + 1 + end + 2;
    Some((decoded, consumed))
}

/// Length of the raw charset segment, including any language suffix.
fn charset_len(input: &str) -> usize {
    input[2..].find('?').unwrap_or(0)
}

/// Q encoding: `_` is a space, `=XX` a hex byte.
fn decode_q(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    let mut bytes = text.bytes();

    while let Some(b) = bytes.next() {
        match b {
            b'_' => out.push(b' '),
            b'=' => {
                let hi = hex_value(bytes.next()?)?;
                let lo = hex_value(bytes.next()?)?;
                out.push((hi << 4) | lo);
            }
            _ => out.push(b),
        }
    }

    Some(out)
}

const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn decode_charset(charset: &str, bytes: &[u8]) -> Option<String> {
    match charset.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => String::from_utf8(bytes.to_vec()).ok(),
        "us-ascii" | "ascii" => bytes
            .is_ascii()
            .then(|| String::from_utf8_lossy(bytes).into_owned()),
        // Latin-1 maps byte for byte onto the first 256 code points
        "iso-8859-1" | "latin1" | "latin-1" => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        _ => Some(String::from_utf8_lossy(bytes).into_owned()),
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
    fn plain_text_is_unchanged() {
        assert_eq!(decode_header("jenkins > build #42"), "jenkins > build #42");
        assert_eq!(decode_header(""), "");
    }

    #[test]
    fn base64_word() {
        assert_eq!(decode_header("=?utf-8?B?SMOpbGxv?="), "Héllo");
    }

    #[test]
    fn q_word_with_underscores() {
        assert_eq!(decode_header("=?UTF-8?Q?Build_f=C3=A4iled?="), "Build fäiled");
    }

    #[test]
    fn latin1_word() {
        assert_eq!(decode_header("=?ISO-8859-1?Q?Gr=FC=DFe?="), "Grüße");
    }

    #[test]
    fn space_between_encoded_words_is_dropped() {
        assert_eq!(
            decode_header("=?utf-8?Q?jenkins_>?= =?utf-8?Q?_build?="),
            "jenkins > build"
        );
    }

    #[test]
    fn mixed_text_and_words() {
        assert_eq!(
            decode_header("Re: =?utf-8?B?SMOpbGxv?= world"),
            "Re: Héllo world"
        );
    }

    #[test]
    fn malformed_words_are_kept() {
        assert_eq!(decode_header("=?utf-8?X?abc?="), "=?utf-8?X?abc?=");
        assert_eq!(decode_header("=?utf-8?Q?=ZZ?="), "=?utf-8?Q?=ZZ?=");
        assert_eq!(decode_header("=?broken"), "=?broken");
    }

    #[test]
    fn language_suffix_is_ignored() {
        assert_eq!(decode_header("=?utf-8*en?Q?hi?="), "hi");
    }
}
