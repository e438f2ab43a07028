//! Event types for the event-based JSON parser.

use std::borrow::Cow;
use std::fmt;

use crate::Span;

/// Events emitted by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<'src> {
    // Document boundaries
    /// Start of document.
    DocumentStart,
    /// End of document.
    DocumentEnd,

    // Objects
    /// Start of an object `{ ... }`.
    ObjectStart {
        /// Span of the opening brace.
        span: Span,
    },
    /// End of an object.
    ObjectEnd {
        /// Span of the closing brace.
        span: Span,
    },

    // Arrays
    /// Start of an array `[ ... ]`.
    ArrayStart {
        /// Span of the opening bracket.
        span: Span,
    },
    /// End of an array.
    ArrayEnd {
        /// Span of the closing bracket.
        span: Span,
    },

    // Entry structure (within objects)
    /// A key in an object entry.
    Key {
        /// Span of the key (including quotes).
        span: Span,
        /// Key text after escape processing.
        name: Cow<'src, str>,
    },

    // Scalars
    /// A string value.
    Str {
        /// Span of the string (including quotes).
        span: Span,
        /// Value after escape processing.
        value: Cow<'src, str>,
    },
    /// A number value.
    Number {
        /// Span of the number literal.
        span: Span,
        /// Decoded value.
        value: Number,
    },
    /// A boolean value.
    Bool {
        /// Span of the literal.
        span: Span,
        /// The value.
        value: bool,
    },
    /// A `null` value.
    Null {
        /// Span of the literal.
        span: Span,
    },

    // Errors
    /// Parse error. Always the last meaningful event: the parser does not
    /// recover.
    Error {
        /// Span where the error occurred.
        span: Span,
        /// Kind of error.
        kind: ParseErrorKind,
    },
}

/// A decoded JSON number.
///
/// Integral literals keep their exact value as long as they fit in 64
/// bits; anything with a fraction, an exponent, or out of integer range
/// becomes a float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Non-negative integer.
    PosInt(u64),
    /// Negative integer.
    NegInt(i64),
    /// Floating-point number.
    Float(f64),
}

impl Number {
    /// The value as an `i64`, if it fits exactly.
    ///
    /// Floats with a zero fractional part convert; anything else is
    /// `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Number::PosInt(n) => i64::try_from(n).ok(),
            Number::NegInt(n) => Some(n),
            Number::Float(f) => {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                    Some(f as i64)
                } else {
                    None
                }
            }
        }
    }

    /// The value as a `u64`, if it fits exactly.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Number::PosInt(n) => Some(n),
            Number::NegInt(n) => u64::try_from(n).ok(),
            Number::Float(f) => {
                if f.fract() == 0.0 && f >= 0.0 && f <= u64::MAX as f64 {
                    Some(f as u64)
                } else {
                    None
                }
            }
        }
    }

    /// The value as an `f64` (possibly lossy for large integers).
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::PosInt(n) => n as f64,
            Number::NegInt(n) => n as f64,
            Number::Float(f) => f,
        }
    }

    /// Whether this number was written as an integer literal.
    pub fn is_integral(&self) -> bool {
        matches!(self, Number::PosInt(_) | Number::NegInt(_))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::PosInt(n) => write!(f, "{}", n),
            Number::NegInt(n) => write!(f, "{}", n),
            // `{:?}` keeps a trailing `.0` on round floats so the text
            // re-parses as a float
            Number::Float(v) => write!(f, "{:?}", v),
        }
    }
}

/// Parse error kinds.
///
/// The lexical kinds describe malformed tokens; the rest describe token
/// streams that do not form valid JSON. [`is_lexical`] exposes the
/// partition.
///
/// [`is_lexical`]: ParseErrorKind::is_lexical
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    // Lexical faults
    /// String literal without a closing quote.
    UnterminatedString,
    /// Invalid escape sequence in a string literal.
    InvalidEscape(String),
    /// Unescaped control character in a string literal.
    ControlCharacter,
    /// `\uXXXX` surrogate half without its pair.
    LoneSurrogate,
    /// Number literal violating the JSON grammar.
    MalformedNumber,
    /// Word that is not `true`, `false`, or `null`.
    InvalidKeyword(String),
    /// Character that cannot start any token.
    UnrecognizedCharacter(char),

    // Syntax faults
    /// Unexpected token.
    UnexpectedToken {
        /// What the parser was looking for.
        expected: &'static str,
    },
    /// Unexpected end of input.
    UnexpectedEof {
        /// What the parser was looking for.
        expected: &'static str,
    },
    /// Unclosed object (missing `}`).
    UnclosedObject,
    /// Unclosed array (missing `]`).
    UnclosedArray,
    /// Data after the root value closes.
    TrailingContent,
    /// Nesting deeper than the parser allows.
    RecursionLimitExceeded,
}

impl ParseErrorKind {
    /// Whether this error is lexical (a malformed token) as opposed to
    /// syntactic (well-formed tokens in an invalid arrangement).
    pub fn is_lexical(&self) -> bool {
        matches!(
            self,
            ParseErrorKind::UnterminatedString
                | ParseErrorKind::InvalidEscape(_)
                | ParseErrorKind::ControlCharacter
                | ParseErrorKind::LoneSurrogate
                | ParseErrorKind::MalformedNumber
                | ParseErrorKind::InvalidKeyword(_)
                | ParseErrorKind::UnrecognizedCharacter(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_as_i64() {
        assert_eq!(Number::PosInt(800).as_i64(), Some(800));
        assert_eq!(Number::NegInt(-5).as_i64(), Some(-5));
        assert_eq!(Number::Float(3.0).as_i64(), Some(3));
        assert_eq!(Number::Float(3.5).as_i64(), None);
        assert_eq!(Number::PosInt(u64::MAX).as_i64(), None);
    }

    #[test]
    fn test_number_as_u64() {
        assert_eq!(Number::PosInt(42).as_u64(), Some(42));
        assert_eq!(Number::NegInt(-1).as_u64(), None);
        assert_eq!(Number::Float(10000.0).as_u64(), Some(10000));
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Number::PosInt(800).to_string(), "800");
        assert_eq!(Number::NegInt(-18000).to_string(), "-18000");
        assert_eq!(Number::Float(3.0).to_string(), "3.0");
        assert_eq!(Number::Float(-83.11).to_string(), "-83.11");
    }

    #[test]
    fn test_error_partition() {
        assert!(ParseErrorKind::UnterminatedString.is_lexical());
        assert!(ParseErrorKind::MalformedNumber.is_lexical());
        assert!(!ParseErrorKind::TrailingContent.is_lexical());
        assert!(!ParseErrorKind::UnexpectedToken { expected: "value" }.is_lexical());
    }
}
