//! Error types for materialization.

use std::fmt;

use ariadne::{Color, Label, Report, ReportKind, Source};
use smelt_tree::{NodeKind, ParseError, Span};

/// Error that can occur while materializing a document.
///
/// Every variant is fatal for the whole call: no partial object graph is
/// ever returned.
#[derive(Debug)]
pub enum CastError {
    /// The document failed to parse (lexical or syntactic fault; see
    /// [`ParseError::is_lexical`]).
    Parse(ParseError),
    /// The document's shape disagrees with the target schema at a
    /// specific path.
    TypeMismatch {
        /// Canonical path of the mismatch.
        path: String,
        /// Name of the expected target type.
        expected: &'static str,
        /// What the document actually holds there.
        actual: NodeKind,
        /// Source span of the offending node.
        span: Option<Span>,
    },
    /// An array element (or polymorphic member) has no statically-known
    /// type and the factory declined to resolve it.
    UnresolvedAmbiguity {
        /// Canonical path of the unresolved allocation.
        path: String,
        /// Source span of the offending node.
        span: Option<Span>,
    },
    /// A descriptor or factory broke its contract (wrong concrete type,
    /// collection answer to an object request, and the like).
    Descriptor {
        /// Canonical path where the violation surfaced.
        path: String,
        /// What went wrong.
        detail: String,
    },
}

impl CastError {
    /// Render this error with ariadne when it carries a source span;
    /// falls back to the plain `Display` text otherwise.
    pub fn render(&self, filename: &str, source: &str) -> String {
        match self {
            CastError::Parse(error) => error.render(filename, source),
            CastError::TypeMismatch {
                path,
                expected,
                actual,
                span: Some(span),
            } => {
                let range = span.start as usize..span.end as usize;
                let mut output = Vec::new();
                let _ = Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message(format!("type mismatch at {}", path))
                    .with_label(
                        Label::new((filename, range))
                            .with_message(format!("expected {}, found {}", expected, actual))
                            .with_color(Color::Red),
                    )
                    .finish()
                    .write((filename, Source::from(source)), &mut output);
                String::from_utf8(output).unwrap_or_else(|_| self.to_string())
            }
            CastError::UnresolvedAmbiguity {
                path,
                span: Some(span),
            } => {
                let range = span.start as usize..span.end as usize;
                let mut output = Vec::new();
                let _ = Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message(format!("cannot determine element type at {}", path))
                    .with_label(
                        Label::new((filename, range))
                            .with_message("no static type, and the factory declined")
                            .with_color(Color::Red),
                    )
                    .with_help("resolve this path in the instance factory")
                    .finish()
                    .write((filename, Source::from(source)), &mut output);
                String::from_utf8(output).unwrap_or_else(|_| self.to_string())
            }
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CastError::Parse(error) => write!(f, "{}", error),
            CastError::TypeMismatch {
                path,
                expected,
                actual,
                ..
            } => {
                write!(
                    f,
                    "type mismatch at {}: expected {}, found {}",
                    path, expected, actual
                )
            }
            CastError::UnresolvedAmbiguity { path, .. } => {
                write!(
                    f,
                    "cannot determine element type at {}: no static type, and the factory declined",
                    path
                )
            }
            CastError::Descriptor { path, detail } => {
                write!(f, "descriptor contract violation at {}: {}", path, detail)
            }
        }
    }
}

impl std::error::Error for CastError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CastError::Parse(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ParseError> for CastError {
    fn from(error: ParseError) -> Self {
        CastError::Parse(error)
    }
}
