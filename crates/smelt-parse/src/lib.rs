//! Event-based JSON parser.
//!
//! The parser walks the token stream produced by [`smelt_tokenizer`] and
//! emits structural events ([`Event`]) to a [`ParseCallback`]. Strings are
//! decoded (escape sequences resolved) and numbers parsed before they are
//! handed to the callback; the first error event ends the parse.

pub use smelt_tokenizer::{Span, Token, TokenKind, Tokenizer};

mod callback;
pub use callback::ParseCallback;

mod event;
pub use event::{Event, Number, ParseErrorKind};

mod parser;
pub use parser::Parser;
