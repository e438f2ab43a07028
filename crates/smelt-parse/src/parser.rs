//! Event-based parser for JSON.

use std::borrow::Cow;
use std::iter::Peekable;
use std::str::CharIndices;

use tracing::trace;

use crate::callback::ParseCallback;
use crate::event::{Event, Number, ParseErrorKind};
use crate::{Span, Token, TokenKind, Tokenizer};

/// Maximum container nesting depth, matching serde_json's default guard.
const MAX_DEPTH: usize = 128;

/// Event-based parser for JSON documents.
pub struct Parser<'src> {
    tokens: Peekable<TokenIter<'src>>,
    depth: usize,
}

/// Wrapper to make the tokenizer yield its `Eof` token exactly once.
struct TokenIter<'src> {
    tokenizer: Tokenizer<'src>,
    done: bool,
}

impl<'src> Iterator for TokenIter<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let token = self.tokenizer.next_token();
        if token.kind == TokenKind::Eof {
            self.done = true;
        }
        Some(token)
    }
}

impl<'src> Parser<'src> {
    /// Create a new parser for the given source.
    pub fn new(source: &'src str) -> Self {
        let tokenizer = Tokenizer::new(source);
        Self {
            tokens: TokenIter {
                tokenizer,
                done: false,
            }
            .peekable(),
            depth: 0,
        }
    }

    /// Parse and emit events to the callback.
    ///
    /// Exactly one root value is accepted; anything after it is
    /// [`ParseErrorKind::TrailingContent`]. The first error event ends
    /// the parse: no recovery is attempted, since the same malformed
    /// input would fail identically on a retry.
    pub fn parse<C: ParseCallback<'src>>(mut self, callback: &mut C) {
        if !callback.event(Event::DocumentStart) {
            return;
        }

        if self.parse_value(callback) {
            if let Some(token) = self.peek()
                && token.kind != TokenKind::Eof
            {
                let span = token.span;
                self.error(callback, span, ParseErrorKind::TrailingContent);
            }
        }

        callback.event(Event::DocumentEnd);
    }

    /// Convenience: parse and collect all events.
    pub fn parse_to_vec(self) -> Vec<Event<'src>> {
        let mut events = Vec::new();
        self.parse(&mut events);
        events
    }

    /// Peek at the next non-trivia token.
    fn peek(&mut self) -> Option<&Token<'src>> {
        while let Some(token) = self.tokens.peek() {
            if token.kind.is_trivia() {
                self.tokens.next();
            } else {
                break;
            }
        }
        self.tokens.peek()
    }

    /// Consume the next non-trivia token.
    fn advance(&mut self) -> Option<Token<'src>> {
        while let Some(token) = self.tokens.peek() {
            if token.kind.is_trivia() {
                self.tokens.next();
            } else {
                break;
            }
        }
        self.tokens.next()
    }

    /// Emit an error event. Always returns `false`: errors are fatal.
    fn error<C: ParseCallback<'src>>(
        &mut self,
        callback: &mut C,
        span: Span,
        kind: ParseErrorKind,
    ) -> bool {
        trace!("Parse error {:?} at {:?}", kind, span);
        callback.event(Event::Error { span, kind });
        false
    }

    /// Parse a single value, emitting its events.
    fn parse_value<C: ParseCallback<'src>>(&mut self, callback: &mut C) -> bool {
        let Some(token) = self.peek().cloned() else {
            // Only reachable if the Eof token was already consumed.
            return self.error(
                callback,
                Span::empty(0),
                ParseErrorKind::UnexpectedEof { expected: "value" },
            );
        };

        match token.kind {
            TokenKind::LBrace => {
                if self.depth >= MAX_DEPTH {
                    return self.error(callback, token.span, ParseErrorKind::RecursionLimitExceeded);
                }
                self.advance();
                self.depth += 1;
                let ok = self.parse_object(callback, token.span);
                self.depth -= 1;
                ok
            }
            TokenKind::LBracket => {
                if self.depth >= MAX_DEPTH {
                    return self.error(callback, token.span, ParseErrorKind::RecursionLimitExceeded);
                }
                self.advance();
                self.depth += 1;
                let ok = self.parse_array(callback, token.span);
                self.depth -= 1;
                ok
            }
            TokenKind::Str => {
                self.advance();
                match decode_string(&token) {
                    Ok(value) => callback.event(Event::Str {
                        span: token.span,
                        value,
                    }),
                    Err((span, kind)) => self.error(callback, span, kind),
                }
            }
            TokenKind::Number => {
                self.advance();
                match decode_number(token.text) {
                    Ok(value) => callback.event(Event::Number {
                        span: token.span,
                        value,
                    }),
                    Err(kind) => self.error(callback, token.span, kind),
                }
            }
            TokenKind::True => {
                self.advance();
                callback.event(Event::Bool {
                    span: token.span,
                    value: true,
                })
            }
            TokenKind::False => {
                self.advance();
                callback.event(Event::Bool {
                    span: token.span,
                    value: false,
                })
            }
            TokenKind::Null => {
                self.advance();
                callback.event(Event::Null { span: token.span })
            }
            TokenKind::Error => {
                self.advance();
                let kind = classify_error_token(token.text);
                self.error(callback, token.span, kind)
            }
            TokenKind::Eof => self.error(
                callback,
                token.span,
                ParseErrorKind::UnexpectedEof { expected: "value" },
            ),
            _ => self.error(
                callback,
                token.span,
                ParseErrorKind::UnexpectedToken { expected: "value" },
            ),
        }
    }

    /// Parse an object body after its opening brace was consumed.
    fn parse_object<C: ParseCallback<'src>>(&mut self, callback: &mut C, open_span: Span) -> bool {
        if !callback.event(Event::ObjectStart { span: open_span }) {
            return false;
        }

        // Empty object
        if let Some(token) = self.peek()
            && token.kind == TokenKind::RBrace
        {
            let span = token.span;
            self.advance();
            return callback.event(Event::ObjectEnd { span });
        }

        loop {
            // Key
            let Some(token) = self.peek().cloned() else {
                return self.error(callback, open_span, ParseErrorKind::UnclosedObject);
            };
            match token.kind {
                TokenKind::Str => {
                    self.advance();
                    match decode_string(&token) {
                        Ok(name) => {
                            if !callback.event(Event::Key {
                                span: token.span,
                                name,
                            }) {
                                return false;
                            }
                        }
                        Err((span, kind)) => return self.error(callback, span, kind),
                    }
                }
                TokenKind::Eof => {
                    return self.error(callback, open_span, ParseErrorKind::UnclosedObject);
                }
                TokenKind::Error => {
                    self.advance();
                    let kind = classify_error_token(token.text);
                    return self.error(callback, token.span, kind);
                }
                _ => {
                    return self.error(
                        callback,
                        token.span,
                        ParseErrorKind::UnexpectedToken {
                            expected: "object key",
                        },
                    );
                }
            }

            // Colon
            match self.peek().cloned() {
                Some(token) if token.kind == TokenKind::Colon => {
                    self.advance();
                }
                Some(token) if token.kind == TokenKind::Eof => {
                    return self.error(callback, open_span, ParseErrorKind::UnclosedObject);
                }
                Some(token) => {
                    return self.error(
                        callback,
                        token.span,
                        ParseErrorKind::UnexpectedToken { expected: "':'" },
                    );
                }
                None => {
                    return self.error(callback, open_span, ParseErrorKind::UnclosedObject);
                }
            }

            // Value
            if !self.parse_value(callback) {
                return false;
            }

            // Separator or close
            match self.peek().cloned() {
                Some(token) if token.kind == TokenKind::Comma => {
                    self.advance();
                    // A comma must be followed by another pair.
                    if let Some(next) = self.peek()
                        && next.kind == TokenKind::RBrace
                    {
                        let span = next.span;
                        return self.error(
                            callback,
                            span,
                            ParseErrorKind::UnexpectedToken {
                                expected: "object key",
                            },
                        );
                    }
                }
                Some(token) if token.kind == TokenKind::RBrace => {
                    self.advance();
                    return callback.event(Event::ObjectEnd { span: token.span });
                }
                Some(token) if token.kind == TokenKind::Eof => {
                    return self.error(callback, open_span, ParseErrorKind::UnclosedObject);
                }
                Some(token) => {
                    return self.error(
                        callback,
                        token.span,
                        ParseErrorKind::UnexpectedToken {
                            expected: "',' or '}'",
                        },
                    );
                }
                None => {
                    return self.error(callback, open_span, ParseErrorKind::UnclosedObject);
                }
            }
        }
    }

    /// Parse an array body after its opening bracket was consumed.
    fn parse_array<C: ParseCallback<'src>>(&mut self, callback: &mut C, open_span: Span) -> bool {
        if !callback.event(Event::ArrayStart { span: open_span }) {
            return false;
        }

        // Empty array
        if let Some(token) = self.peek()
            && token.kind == TokenKind::RBracket
        {
            let span = token.span;
            self.advance();
            return callback.event(Event::ArrayEnd { span });
        }

        loop {
            match self.peek().cloned() {
                Some(token) if token.kind == TokenKind::Eof => {
                    return self.error(callback, open_span, ParseErrorKind::UnclosedArray);
                }
                None => {
                    return self.error(callback, open_span, ParseErrorKind::UnclosedArray);
                }
                _ => {}
            }

            if !self.parse_value(callback) {
                return false;
            }

            match self.peek().cloned() {
                Some(token) if token.kind == TokenKind::Comma => {
                    self.advance();
                    // A comma must be followed by another element.
                    if let Some(next) = self.peek()
                        && next.kind == TokenKind::RBracket
                    {
                        let span = next.span;
                        return self.error(
                            callback,
                            span,
                            ParseErrorKind::UnexpectedToken { expected: "value" },
                        );
                    }
                }
                Some(token) if token.kind == TokenKind::RBracket => {
                    self.advance();
                    return callback.event(Event::ArrayEnd { span: token.span });
                }
                Some(token) if token.kind == TokenKind::Eof => {
                    return self.error(callback, open_span, ParseErrorKind::UnclosedArray);
                }
                Some(token) => {
                    return self.error(
                        callback,
                        token.span,
                        ParseErrorKind::UnexpectedToken {
                            expected: "',' or ']'",
                        },
                    );
                }
                None => {
                    return self.error(callback, open_span, ParseErrorKind::UnclosedArray);
                }
            }
        }
    }
}

/// Classify an error token produced by the tokenizer.
fn classify_error_token(text: &str) -> ParseErrorKind {
    match text.chars().next() {
        Some('"') => ParseErrorKind::UnterminatedString,
        Some(c) if c == '-' || c.is_ascii_digit() => ParseErrorKind::MalformedNumber,
        Some(c) if c.is_ascii_lowercase() => ParseErrorKind::InvalidKeyword(text.to_string()),
        Some(c) => ParseErrorKind::UnrecognizedCharacter(c),
        None => ParseErrorKind::UnexpectedEof { expected: "value" },
    }
}

/// Decode a number literal.
///
/// The tokenizer already enforced the grammar, so this only picks the
/// representation: integers that fit 64 bits keep their exact value,
/// everything else becomes a float.
fn decode_number(text: &str) -> Result<Number, ParseErrorKind> {
    if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>()
            .map(Number::Float)
            .map_err(|_| ParseErrorKind::MalformedNumber)
    } else if text.starts_with('-') {
        match text.parse::<i64>() {
            Ok(n) => Ok(Number::NegInt(n)),
            Err(_) => text
                .parse::<f64>()
                .map(Number::Float)
                .map_err(|_| ParseErrorKind::MalformedNumber),
        }
    } else {
        match text.parse::<u64>() {
            Ok(n) => Ok(Number::PosInt(n)),
            Err(_) => text
                .parse::<f64>()
                .map(Number::Float)
                .map_err(|_| ParseErrorKind::MalformedNumber),
        }
    }
}

/// Decode a string token, resolving JSON escape sequences.
///
/// Borrows from the source when no escapes are present. Errors carry the
/// span of the offending sequence inside the literal.
fn decode_string<'src>(token: &Token<'src>) -> Result<Cow<'src, str>, (Span, ParseErrorKind)> {
    let text = token.text;
    // The tokenizer guarantees surrounding quotes on Str tokens.
    let inner = &text[1..text.len() - 1];
    let base = token.span.start + 1;

    // Fast path: nothing to decode, nothing to reject.
    if !inner.bytes().any(|b| b == b'\\' || b < 0x20) {
        return Ok(Cow::Borrowed(inner));
    }

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.char_indices();

    while let Some((i, c)) = chars.next() {
        let here = |len: u32| Span::new(base + i as u32, base + i as u32 + len);
        match c {
            '\\' => match chars.next() {
                Some((_, '"')) => result.push('"'),
                Some((_, '\\')) => result.push('\\'),
                Some((_, '/')) => result.push('/'),
                Some((_, 'b')) => result.push('\u{0008}'),
                Some((_, 'f')) => result.push('\u{000C}'),
                Some((_, 'n')) => result.push('\n'),
                Some((_, 'r')) => result.push('\r'),
                Some((_, 't')) => result.push('\t'),
                Some((_, 'u')) => {
                    let Some(hi) = read_hex4(&mut chars) else {
                        let seq: String = inner[i..].chars().take(6).collect();
                        return Err((
                            here(seq.len() as u32),
                            ParseErrorKind::InvalidEscape(seq),
                        ));
                    };
                    match hi {
                        0xD800..=0xDBFF => {
                            // High surrogate: a `\uXXXX` low surrogate must follow.
                            let backslash = matches!(chars.next(), Some((_, '\\')));
                            let u = matches!(chars.next(), Some((_, 'u')));
                            if !(backslash && u) {
                                return Err((here(6), ParseErrorKind::LoneSurrogate));
                            }
                            let Some(lo) = read_hex4(&mut chars) else {
                                return Err((here(6), ParseErrorKind::LoneSurrogate));
                            };
                            if !(0xDC00..=0xDFFF).contains(&lo) {
                                return Err((here(12), ParseErrorKind::LoneSurrogate));
                            }
                            let code = 0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00);
                            match char::from_u32(code) {
                                Some(ch) => result.push(ch),
                                None => return Err((here(12), ParseErrorKind::LoneSurrogate)),
                            }
                        }
                        0xDC00..=0xDFFF => {
                            return Err((here(6), ParseErrorKind::LoneSurrogate));
                        }
                        _ => match char::from_u32(hi) {
                            Some(ch) => result.push(ch),
                            None => {
                                let seq: String = inner[i..].chars().take(6).collect();
                                return Err((here(6), ParseErrorKind::InvalidEscape(seq)));
                            }
                        },
                    }
                }
                Some((_, other)) => {
                    return Err((here(2), ParseErrorKind::InvalidEscape(format!("\\{}", other))));
                }
                None => {
                    return Err((here(1), ParseErrorKind::InvalidEscape("\\".to_string())));
                }
            },
            c if (c as u32) < 0x20 => {
                return Err((here(1), ParseErrorKind::ControlCharacter));
            }
            c => result.push(c),
        }
    }

    Ok(Cow::Owned(result))
}

/// Read exactly four hex digits from the iterator.
fn read_hex4(chars: &mut CharIndices<'_>) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..4 {
        let (_, c) = chars.next()?;
        value = value * 16 + c.to_digit(16)?;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use similar::{ChangeTag, TextDiff};

    use super::*;

    fn events(source: &str) -> Vec<Event<'_>> {
        Parser::new(source).parse_to_vec()
    }

    fn format_event(event: &Event<'_>) -> String {
        match event {
            Event::DocumentStart => "DocumentStart".to_string(),
            Event::DocumentEnd => "DocumentEnd".to_string(),
            Event::ObjectStart { .. } => "ObjectStart".to_string(),
            Event::ObjectEnd { .. } => "ObjectEnd".to_string(),
            Event::ArrayStart { .. } => "ArrayStart".to_string(),
            Event::ArrayEnd { .. } => "ArrayEnd".to_string(),
            Event::Key { name, .. } => format!("Key({:?})", name.as_ref()),
            Event::Str { value, .. } => format!("Str({:?})", value.as_ref()),
            Event::Number { value, .. } => format!("Number({})", value),
            Event::Bool { value, .. } => format!("Bool({})", value),
            Event::Null { .. } => "Null".to_string(),
            Event::Error { span, kind } => format!("Error({:?} at {})", kind, span.start),
        }
    }

    /// Assert the event stream of `source`, diffing against `expected`
    /// (one event per line, indentation ignored).
    fn assert_events(source: &str, expected: &str) {
        let actual = events(source)
            .iter()
            .map(format_event)
            .collect::<Vec<_>>()
            .join("\n");
        let expected = expected
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if actual != expected {
            let diff = TextDiff::from_lines(&expected, &actual);
            for change in diff.iter_all_changes() {
                let sign = match change.tag() {
                    ChangeTag::Delete => "-",
                    ChangeTag::Insert => "+",
                    ChangeTag::Equal => " ",
                };
                eprint!("{}{}", sign, change);
            }
            panic!("event stream mismatch for {:?}", source);
        }
    }

    #[test]
    fn test_scalar_roots() {
        assert_events("42", "DocumentStart\nNumber(42)\nDocumentEnd");
        assert_events("\"hi\"", "DocumentStart\nStr(\"hi\")\nDocumentEnd");
        assert_events("true", "DocumentStart\nBool(true)\nDocumentEnd");
        assert_events("null", "DocumentStart\nNull\nDocumentEnd");
    }

    #[test]
    fn test_simple_object() {
        assert_events(
            r#"{"id": 800, "icon": "01d"}"#,
            r#"
            DocumentStart
            ObjectStart
            Key("id")
            Number(800)
            Key("icon")
            Str("01d")
            ObjectEnd
            DocumentEnd
            "#,
        );
    }

    #[test]
    fn test_nested() {
        assert_events(
            r#"{"coord": {"lon": -83.11, "lat": 42.49}}"#,
            r#"
            DocumentStart
            ObjectStart
            Key("coord")
            ObjectStart
            Key("lon")
            Number(-83.11)
            Key("lat")
            Number(42.49)
            ObjectEnd
            ObjectEnd
            DocumentEnd
            "#,
        );
    }

    #[test]
    fn test_array() {
        assert_events(
            r#"[1, "two", false, null]"#,
            r#"
            DocumentStart
            ArrayStart
            Number(1)
            Str("two")
            Bool(false)
            Null
            ArrayEnd
            DocumentEnd
            "#,
        );
    }

    #[test]
    fn test_empty_containers() {
        assert_events("{}", "DocumentStart\nObjectStart\nObjectEnd\nDocumentEnd");
        assert_events("[]", "DocumentStart\nArrayStart\nArrayEnd\nDocumentEnd");
    }

    #[test]
    fn test_duplicate_keys_pass_through() {
        // The grammar admits duplicates; resolution happens downstream.
        assert_events(
            r#"{"a": 1, "a": 2}"#,
            r#"
            DocumentStart
            ObjectStart
            Key("a")
            Number(1)
            Key("a")
            Number(2)
            ObjectEnd
            DocumentEnd
            "#,
        );
    }

    #[test]
    fn test_missing_value_error() {
        // `{"a": }` fails at the offset of the closing brace.
        let evs = events(r#"{"a": }"#);
        assert!(evs.iter().any(|e| matches!(
            e,
            Event::Error {
                span,
                kind: ParseErrorKind::UnexpectedToken { expected: "value" },
            } if span.start == 6
        )));
    }

    #[test]
    fn test_trailing_content() {
        let evs = events("{} extra");
        assert!(
            evs.iter()
                .any(|e| matches!(e, Event::Error { kind: ParseErrorKind::TrailingContent, .. }))
        );
    }

    #[test]
    fn test_unclosed_object() {
        let evs = events(r#"{"a": 1"#);
        assert!(evs.iter().any(|e| matches!(
            e,
            Event::Error { span, kind: ParseErrorKind::UnclosedObject } if span.start == 0
        )));
    }

    #[test]
    fn test_unclosed_array() {
        let evs = events("[1, 2");
        assert!(
            evs.iter()
                .any(|e| matches!(e, Event::Error { kind: ParseErrorKind::UnclosedArray, .. }))
        );
    }

    #[test]
    fn test_comma_without_follower() {
        let evs = events(r#"{"a": 1,}"#);
        assert!(evs.iter().any(|e| matches!(
            e,
            Event::Error { kind: ParseErrorKind::UnexpectedToken { expected: "object key" }, .. }
        )));

        let evs = events("[1,]");
        assert!(evs.iter().any(|e| matches!(
            e,
            Event::Error { kind: ParseErrorKind::UnexpectedToken { expected: "value" }, .. }
        )));
    }

    #[test]
    fn test_colon_outside_object() {
        let evs = events("[1:2]");
        assert!(
            evs.iter()
                .any(|e| matches!(e, Event::Error { kind: ParseErrorKind::UnexpectedToken { .. }, .. }))
        );
    }

    #[test]
    fn test_non_string_key() {
        let evs = events("{1: 2}");
        assert!(evs.iter().any(|e| matches!(
            e,
            Event::Error { kind: ParseErrorKind::UnexpectedToken { expected: "object key" }, .. }
        )));
    }

    #[test]
    fn test_escapes() {
        assert_events(
            r#""a\nb\t\"c\" \\ \/""#,
            "DocumentStart\nStr(\"a\\nb\\t\\\"c\\\" \\\\ /\")\nDocumentEnd",
        );
    }

    #[test]
    fn test_unicode_escape() {
        let evs = events("\"\\u0041\"");
        assert!(matches!(
            &evs[1],
            Event::Str { value, .. } if value.as_ref() == "A"
        ));
    }

    #[test]
    fn test_surrogate_pair() {
        let evs = events("\"\\uD83D\\uDE00\"");
        assert!(matches!(
            &evs[1],
            Event::Str { value, .. } if value.as_ref() == "\u{1F600}"
        ));
    }

    #[test]
    fn test_lone_surrogate() {
        let evs = events(r#""\uD83D""#);
        assert!(
            evs.iter()
                .any(|e| matches!(e, Event::Error { kind: ParseErrorKind::LoneSurrogate, .. }))
        );
    }

    #[test]
    fn test_invalid_escape() {
        let evs = events(r#""bad \q escape""#);
        assert!(evs.iter().any(|e| matches!(
            e,
            Event::Error { kind: ParseErrorKind::InvalidEscape(seq), .. } if seq == "\\q"
        )));
    }

    #[test]
    fn test_control_character() {
        let evs = events("\"a\u{0001}b\"");
        assert!(
            evs.iter()
                .any(|e| matches!(e, Event::Error { kind: ParseErrorKind::ControlCharacter, .. }))
        );
    }

    #[test]
    fn test_unterminated_string() {
        let evs = events("\"abc");
        assert!(
            evs.iter()
                .any(|e| matches!(e, Event::Error { kind: ParseErrorKind::UnterminatedString, .. }))
        );
    }

    #[test]
    fn test_bad_keyword() {
        let evs = events("tru");
        assert!(evs.iter().any(|e| matches!(
            e,
            Event::Error { kind: ParseErrorKind::InvalidKeyword(word), .. } if word == "tru"
        )));
    }

    #[test]
    fn test_number_overflow_falls_back_to_float() {
        let evs = events("18446744073709551616");
        assert!(matches!(
            &evs[1],
            Event::Number { value: Number::Float(_), .. }
        ));
    }

    #[test]
    fn test_recursion_limit() {
        let source = "[".repeat(200);
        let evs = events(&source);
        assert!(evs.iter().any(|e| matches!(
            e,
            Event::Error { kind: ParseErrorKind::RecursionLimitExceeded, .. }
        )));
    }

    #[test]
    fn test_empty_input() {
        let evs = events("");
        assert!(evs.iter().any(|e| matches!(
            e,
            Event::Error { kind: ParseErrorKind::UnexpectedEof { expected: "value" }, .. }
        )));
    }

    #[test]
    fn test_whitespace_everywhere() {
        assert_events(
            " {\n\t\"a\" :\r\n 1 } ",
            r#"
            DocumentStart
            ObjectStart
            Key("a")
            Number(1)
            ObjectEnd
            DocumentEnd
            "#,
        );
    }
}
