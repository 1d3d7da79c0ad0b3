//! Sans-I/O parser for IMAP server responses.
//!
//! The [`Lexer`] turns one complete response (including any literals) into
//! tokens and [`ResponseParser`] builds a [`Response`] from them. Nothing in
//! this module touches the network.
//!
//! ```
//! use mailpoll_imap::parser::{Response, ResponseParser, UntaggedResponse};
//!
//! let response = ResponseParser::parse(b"* 3 EXISTS\r\n").unwrap();
//! assert!(matches!(response, Response::Untagged(UntaggedResponse::Exists(3))));
//! ```

pub mod lexer;
pub mod response;

pub use lexer::{Lexer, Token};
pub use response::{Address, Envelope, FetchItem, Response, ResponseParser, UntaggedResponse};
pub use response::parse_internal_date;
