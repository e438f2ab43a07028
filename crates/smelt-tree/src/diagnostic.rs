//! Diagnostic rendering for parser errors.

use ariadne::{Color, Label, Report, ReportKind, Source};
use smelt_parse::{ParseErrorKind, Span};

/// A parser error with source location.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// Source location.
    pub span: Span,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Whether the error is lexical (malformed token) rather than
    /// syntactic (invalid token arrangement).
    pub fn is_lexical(&self) -> bool {
        self.kind.is_lexical()
    }

    /// Render this error with ariadne.
    ///
    /// Returns a string containing the formatted error message with source context.
    pub fn render(&self, filename: &str, source: &str) -> String {
        let mut output = Vec::new();
        self.write_report(filename, source, &mut output);
        String::from_utf8(output).unwrap_or_else(|_| format!("{}", self))
    }

    /// Write the error report to a writer.
    pub fn write_report<W: std::io::Write>(&self, filename: &str, source: &str, writer: W) {
        let report = self.build_report(filename);
        let _ = report
            .finish()
            .write((filename, Source::from(source)), writer);
    }

    fn build_report<'a>(
        &self,
        filename: &'a str,
    ) -> ariadne::ReportBuilder<'static, (&'a str, std::ops::Range<usize>)> {
        let range = self.span.start as usize..self.span.end as usize;

        match &self.kind {
            ParseErrorKind::UnterminatedString => {
                Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message("unterminated string")
                    .with_label(
                        Label::new((filename, range))
                            .with_message("string starts here")
                            .with_color(Color::Red),
                    )
                    .with_help("add a closing '\"'")
            }

            ParseErrorKind::InvalidEscape(seq) => {
                Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message(format!("invalid escape sequence '{}'", seq))
                    .with_label(
                        Label::new((filename, range))
                            .with_message("invalid escape")
                            .with_color(Color::Red),
                    )
                    .with_help(
                        "valid escapes are: \\\", \\\\, \\/, \\b, \\f, \\n, \\r, \\t, \\uXXXX",
                    )
            }

            ParseErrorKind::ControlCharacter => {
                Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message("unescaped control character in string")
                    .with_label(
                        Label::new((filename, range))
                            .with_message("control character here")
                            .with_color(Color::Red),
                    )
                    .with_help("control characters must be escaped, e.g. \\n or \\u0007")
            }

            ParseErrorKind::LoneSurrogate => {
                Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message("lone surrogate in \\u escape")
                    .with_label(
                        Label::new((filename, range))
                            .with_message("incomplete surrogate pair")
                            .with_color(Color::Red),
                    )
                    .with_help(
                        "a \\uD800-\\uDBFF escape must be followed by a \\uDC00-\\uDFFF escape",
                    )
            }

            ParseErrorKind::MalformedNumber => {
                Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message("malformed number")
                    .with_label(
                        Label::new((filename, range))
                            .with_message("not a valid number literal")
                            .with_color(Color::Red),
                    )
                    .with_help("numbers have no leading zeros and need digits after '.' and 'e'")
            }

            ParseErrorKind::InvalidKeyword(word) => {
                Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message(format!("unknown keyword '{}'", word))
                    .with_label(
                        Label::new((filename, range))
                            .with_message("not a JSON keyword")
                            .with_color(Color::Red),
                    )
                    .with_help("did you mean 'true', 'false', or 'null'?")
            }

            ParseErrorKind::UnrecognizedCharacter(c) => {
                Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message(format!("unrecognized character '{}'", c.escape_default()))
                    .with_label(
                        Label::new((filename, range))
                            .with_message("cannot start a token")
                            .with_color(Color::Red),
                    )
            }

            ParseErrorKind::UnexpectedToken { expected } => {
                Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message(format!("expected {}", expected))
                    .with_label(
                        Label::new((filename, range))
                            .with_message("unexpected token")
                            .with_color(Color::Red),
                    )
            }

            ParseErrorKind::UnexpectedEof { expected } => {
                Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message(format!("unexpected end of input, expected {}", expected))
                    .with_label(
                        Label::new((filename, range))
                            .with_message("input ends here")
                            .with_color(Color::Red),
                    )
            }

            ParseErrorKind::UnclosedObject => {
                Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message("unclosed object")
                    .with_label(
                        Label::new((filename, range))
                            .with_message("object opened here")
                            .with_color(Color::Red),
                    )
                    .with_help("add a closing '}'")
            }

            ParseErrorKind::UnclosedArray => {
                Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message("unclosed array")
                    .with_label(
                        Label::new((filename, range))
                            .with_message("array opened here")
                            .with_color(Color::Red),
                    )
                    .with_help("add a closing ']'")
            }

            ParseErrorKind::TrailingContent => {
                Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message("trailing content after root value")
                    .with_label(
                        Label::new((filename, range))
                            .with_message("unexpected content here")
                            .with_color(Color::Red),
                    )
                    .with_help("a JSON document is a single value; nothing can follow it")
            }

            ParseErrorKind::RecursionLimitExceeded => {
                Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message("nesting too deep")
                    .with_label(
                        Label::new((filename, range))
                            .with_message("limit reached here")
                            .with_color(Color::Red),
                    )
                    .with_help("documents nested deeper than 128 containers are rejected")
            }
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ParseErrorKind::UnterminatedString => write!(f, "unterminated string"),
            ParseErrorKind::InvalidEscape(seq) => {
                write!(f, "invalid escape sequence '{}'", seq)
            }
            ParseErrorKind::ControlCharacter => {
                write!(f, "unescaped control character in string")
            }
            ParseErrorKind::LoneSurrogate => write!(f, "lone surrogate in \\u escape"),
            ParseErrorKind::MalformedNumber => write!(f, "malformed number"),
            ParseErrorKind::InvalidKeyword(word) => write!(f, "unknown keyword '{}'", word),
            ParseErrorKind::UnrecognizedCharacter(c) => {
                write!(f, "unrecognized character '{}'", c.escape_default())
            }
            ParseErrorKind::UnexpectedToken { expected } => {
                write!(f, "expected {}", expected)
            }
            ParseErrorKind::UnexpectedEof { expected } => {
                write!(f, "unexpected end of input, expected {}", expected)
            }
            ParseErrorKind::UnclosedObject => write!(f, "unclosed object"),
            ParseErrorKind::UnclosedArray => write!(f, "unclosed array"),
            ParseErrorKind::TrailingContent => {
                write!(f, "trailing content after root value")
            }
            ParseErrorKind::RecursionLimitExceeded => write!(f, "nesting too deep"),
        }?;
        write!(f, " at offset {}", self.span.start)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(source: &str) -> String {
        let err = crate::parse(source).unwrap_err();
        let rendered = err.render("test.json", source);
        String::from_utf8(strip_ansi_escapes::strip(rendered)).unwrap()
    }

    #[test]
    fn test_display_carries_offset() {
        let err = crate::parse(r#"{"a": }"#).unwrap_err();
        assert_eq!(err.to_string(), "expected value at offset 6");
    }

    #[test]
    fn test_unclosed_object_diagnostic() {
        let out = render(r#"{"host": "localhost""#);
        assert!(out.contains("unclosed object"));
        assert!(out.contains("add a closing '}'"));
    }

    #[test]
    fn test_invalid_escape_diagnostic() {
        let out = render(r#"{"name": "hello\qworld"}"#);
        assert!(out.contains("invalid escape sequence '\\q'"));
        assert!(out.contains("valid escapes are"));
    }

    #[test]
    fn test_trailing_content_diagnostic() {
        let out = render("{} true");
        assert!(out.contains("trailing content"));
    }

    #[test]
    fn test_unknown_keyword_diagnostic() {
        let out = render("flase");
        assert!(out.contains("unknown keyword 'flase'"));
        assert!(out.contains("did you mean"));
    }

    #[test]
    fn test_lexical_partition() {
        let err = crate::parse("\"oops").unwrap_err();
        assert!(err.is_lexical());
        let err = crate::parse("[1, 2").unwrap_err();
        assert!(!err.is_lexical());
    }
}
