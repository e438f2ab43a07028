//! Document tree representation for JSON.
//!
//! This crate turns the event stream of [`smelt_parse`] into an in-memory
//! token tree ([`Value`]) with positional metadata, and renders parse
//! errors as diagnostics. The tree is the input to schema-driven
//! materialization; it can also be written back out as JSON text.

mod builder;
mod diagnostic;
mod value;
mod write;

pub use builder::TreeBuilder;
pub use diagnostic::ParseError;
pub use smelt_parse::{Number, ParseErrorKind, Span};
pub use value::{Array, Entry, Node, NodeKind, Object, Value};
pub use write::{to_string, to_string_pretty};

/// Parse a JSON document into a tree.
pub fn parse(source: &str) -> Result<Value, ParseError> {
    let parser = smelt_parse::Parser::new(source);
    let mut builder = TreeBuilder::new();
    parser.parse(&mut builder);
    builder.finish()
}
