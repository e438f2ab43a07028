//! Tree builder from parse events.

use smelt_parse::{Event, ParseCallback, ParseErrorKind, Span};

use crate::diagnostic::ParseError;
use crate::value::{Array, Entry, Node, Object, Value};

/// Builder that constructs a tree from parse events.
///
/// The first error event stops the build; `finish` then reports it.
pub struct TreeBuilder {
    stack: Vec<Frame>,
    root: Option<Value>,
    error: Option<ParseError>,
}

enum Frame {
    Object {
        entries: Vec<Entry>,
        span: Span,
        pending_key: Option<(String, Span)>,
    },
    Array {
        items: Vec<Value>,
        span: Span,
    },
}

impl TreeBuilder {
    /// Create a new tree builder.
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            root: None,
            error: None,
        }
    }

    /// Finish building and return the root value.
    pub fn finish(self) -> Result<Value, ParseError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        match self.root {
            Some(value) => Ok(value),
            // The parser emits an error event before ending a document
            // without a root value, so this arm is not reachable through
            // `parse`; it covers direct misuse of the builder.
            None => Err(ParseError::new(
                ParseErrorKind::UnexpectedEof { expected: "value" },
                Span::empty(0),
            )),
        }
    }

    /// Place a finished value into the current context.
    fn push_value(&mut self, value: Value) {
        match self.stack.last_mut() {
            Some(Frame::Object {
                entries,
                pending_key,
                ..
            }) => {
                // The parser emits a Key event before every value inside
                // an object.
                if let Some((key, key_span)) = pending_key.take() {
                    entries.push(Entry {
                        key,
                        key_span: Some(key_span),
                        value,
                    });
                }
            }
            Some(Frame::Array { items, .. }) => {
                items.push(value);
            }
            None => {
                self.root = Some(value);
            }
        }
    }

    fn scalar(&mut self, node: Node, span: Span) {
        self.push_value(Value {
            node,
            span: Some(span),
        });
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<'src> ParseCallback<'src> for TreeBuilder {
    fn event(&mut self, event: Event<'src>) -> bool {
        match event {
            Event::DocumentStart | Event::DocumentEnd => {
                // No-op for tree building
            }

            Event::ObjectStart { span } => {
                self.stack.push(Frame::Object {
                    entries: Vec::new(),
                    span,
                    pending_key: None,
                });
            }

            Event::ObjectEnd { span } => {
                if let Some(Frame::Object {
                    entries,
                    span: start_span,
                    ..
                }) = self.stack.pop()
                {
                    let full = start_span.extend(span);
                    self.push_value(Value {
                        node: Node::Object(Object {
                            entries,
                            span: Some(full),
                        }),
                        span: Some(full),
                    });
                }
            }

            Event::ArrayStart { span } => {
                self.stack.push(Frame::Array {
                    items: Vec::new(),
                    span,
                });
            }

            Event::ArrayEnd { span } => {
                if let Some(Frame::Array {
                    items,
                    span: start_span,
                }) = self.stack.pop()
                {
                    let full = start_span.extend(span);
                    self.push_value(Value {
                        node: Node::Array(Array {
                            items,
                            span: Some(full),
                        }),
                        span: Some(full),
                    });
                }
            }

            Event::Key { span, name } => {
                if let Some(Frame::Object { pending_key, .. }) = self.stack.last_mut() {
                    *pending_key = Some((name.into_owned(), span));
                }
            }

            Event::Str { span, value } => {
                self.scalar(Node::Str(value.into_owned()), span);
            }

            Event::Number { span, value } => {
                self.scalar(Node::Number(value), span);
            }

            Event::Bool { span, value } => {
                self.scalar(Node::Bool(value), span);
            }

            Event::Null { span } => {
                self.scalar(Node::Null, span);
            }

            Event::Error { span, kind } => {
                self.error = Some(ParseError::new(kind, span));
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use smelt_parse::{Number, Parser};

    use super::*;

    fn parse(source: &str) -> Value {
        let parser = Parser::new(source);
        let mut builder = TreeBuilder::new();
        parser.parse(&mut builder);
        builder.finish().unwrap()
    }

    #[test]
    fn test_scalar_root() {
        let value = parse("true");
        assert_eq!(value.as_bool(), Some(true));
    }

    #[test]
    fn test_object() {
        let value = parse(r#"{"name": "Alice"}"#);
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("name").and_then(|v| v.as_str()), Some("Alice"));
    }

    #[test]
    fn test_array_order() {
        let value = parse("[1, 2, 3]");
        let arr = value.as_array().unwrap();
        let nums: Vec<_> = arr
            .iter()
            .map(|v| v.as_number().and_then(|n| n.as_u64()).unwrap())
            .collect();
        assert_eq!(nums, vec![1, 2, 3]);
    }

    #[test]
    fn test_entry_order_preserved() {
        let value = parse(r#"{"z": 1, "a": 2, "m": 3}"#);
        let keys: Vec<_> = value
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, _)| k.to_string())
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_spans_recorded() {
        let source = r#"{"a": [1]}"#;
        let value = parse(source);
        assert_eq!(value.span, Some(Span::new(0, source.len() as u32)));
        let arr = value.get("a").unwrap();
        assert_eq!(arr.span, Some(Span::new(6, 9)));
    }

    #[test]
    fn test_error_stops_build() {
        let parser = Parser::new(r#"{"a": }"#);
        let mut builder = TreeBuilder::new();
        parser.parse(&mut builder);
        let err = builder.finish().unwrap_err();
        assert!(matches!(
            err.kind,
            ParseErrorKind::UnexpectedToken { expected: "value" }
        ));
    }

    #[test]
    fn test_number_kinds() {
        let value = parse(r#"[800, -18000, 266.74]"#);
        let arr = value.as_array().unwrap();
        assert_eq!(arr.get(0).unwrap().as_number(), Some(Number::PosInt(800)));
        assert_eq!(
            arr.get(1).unwrap().as_number(),
            Some(Number::NegInt(-18000))
        );
        assert_eq!(
            arr.get(2).unwrap().as_number(),
            Some(Number::Float(266.74))
        );
    }
}
