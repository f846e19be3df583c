use crate::span::Span;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

/// Why a single voice or sticking token could not be read
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Expected {expected}, found {found} at {span}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Unexpected end of token, expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("Unclosed delimiter '{delimiter}' opened at {open_span}")]
    UnclosedDelimiter { delimiter: char, open_span: Span },

    #[error("Unknown voice '{symbol}' at {span}")]
    UnknownVoice { symbol: String, span: Span },

    #[error("Unknown sticking '{symbol}' at {span}")]
    UnknownLimb { symbol: String, span: Span },
}

impl ParseError {
    pub fn unexpected_token(
        expected: impl Into<String>,
        found: impl Into<String>,
        span: Span,
    ) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            span,
        }
    }

    pub fn unexpected_eof(expected: impl Into<String>) -> Self {
        ParseError::UnexpectedEof {
            expected: expected.into(),
        }
    }

    pub fn unclosed_delimiter(delimiter: char, open_span: Span) -> Self {
        ParseError::UnclosedDelimiter { delimiter, open_span }
    }

    pub fn unknown_voice(symbol: impl Into<String>, span: Span) -> Self {
        ParseError::UnknownVoice {
            symbol: symbol.into(),
            span,
        }
    }

    pub fn unknown_limb(symbol: impl Into<String>, span: Span) -> Self {
        ParseError::UnknownLimb {
            symbol: symbol.into(),
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ParseError::unknown_voice("X", Span::new(0, 1));
        assert_eq!(err.to_string(), "Unknown voice 'X' at 0..1");

        let eof = ParseError::unexpected_eof("voice");
        assert_eq!(eof.to_string(), "Unexpected end of token, expected voice");
    }
}
