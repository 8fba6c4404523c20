use std::fmt;
use std::fmt::{Display, Formatter};

use logos::Span;
use thiserror::Error;

use crate::parser::tokens::Token;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum ParseError {
    #[error("unexpected character {text:?} at {}..{}", .span.start, .span.end)]
    UnexpectedCharacter { text: String, span: Span },
    #[error("unterminated string literal at {}..{}", .0.start, .0.end)]
    UnterminatedString(Span),
    #[error(transparent)]
    InvalidToken(InvalidTokenError),
    #[error("unexpected end of input")]
    UnexpectedEOF,
    #[error("invalid number: {0:?}")]
    InvalidNumber(String),
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
    #[error("invalid string literal: {0}")]
    InvalidString(String),
    #[error("invalid regex: {0}")]
    InvalidRegex(String),
    #[error("unknown function with name {0:?}")]
    UnknownFunction(String),
    #[error(transparent)]
    InvalidArgCount(ArgCountError),
    #[error("{0}")]
    InvalidSelector(String),
    #[error("{0}")]
    TypeError(String),
    #[error("{0}")]
    General(String),
}

/// A token other than the ones the grammar allows at this position.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct InvalidTokenError {
    pub expected: Vec<Token>,
    pub found: Option<Token>,
    pub text: String,
    pub range: Span,
    pub context: String,
}

impl InvalidTokenError {
    pub fn new(expected: &[Token], found: Option<Token>, text: &str, range: &Span) -> Self {
        Self {
            expected: Vec::from(expected),
            found,
            text: text.to_string(),
            range: range.clone(),
            context: "".to_string(),
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context = context.to_string();
        self
    }
}

impl std::error::Error for InvalidTokenError {}

impl Display for InvalidTokenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.found.is_none() {
            write!(f, "unexpected end of input")?;
        } else {
            write!(
                f,
                "unexpected {:?} at {}..{}",
                self.text, self.range.start, self.range.end
            )?;
        }
        if !self.context.is_empty() {
            write!(f, " in {}", self.context)?;
        }

        let num_expected = self.expected.len();
        for (idx, expected) in self.expected.iter().enumerate() {
            if idx == 0 {
                write!(f, ", expected \"{expected}\"")?;
            } else if idx == num_expected - 1 {
                write!(f, " or \"{expected}\"")?;
            } else {
                write!(f, ", \"{expected}\"")?;
            }
        }
        Ok(())
    }
}

/// Occurs when a function is called with the wrong number of arguments
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ArgCountError {
    min: usize,
    max: Option<usize>,
    actual: usize,
    signature: String,
}

impl ArgCountError {
    /// Create a new instance of the error
    ///
    /// # Arguments
    /// * `signature` - Function name
    /// * `min` - Smallest allowed number of arguments
    /// * `max` - Largest allowed number of arguments, `None` if variadic
    /// * `actual` - Number of arguments given
    pub fn new(signature: &str, min: usize, max: Option<usize>, actual: usize) -> Self {
        Self {
            min,
            max,
            actual,
            signature: signature.to_string(),
        }
    }

    /// Function call signature
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Smallest allowed number of arguments
    pub fn min(&self) -> usize {
        self.min
    }

    /// Largest allowed number of arguments
    pub fn max(&self) -> Option<usize> {
        self.max
    }
}

impl Display for ArgCountError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(
                f,
                "expected {} argument(s) in call to {:?}, got {}",
                self.min, self.signature, self.actual
            ),
            Some(max) if self.actual > max => write!(
                f,
                "expected at most {} argument(s) in call to {:?}, got {}",
                max, self.signature, self.actual
            ),
            _ => write!(
                f,
                "expected at least {} argument(s) in call to {:?}, got {}",
                self.min, self.signature, self.actual
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_count_messages() {
        let err = ArgCountError::new("abs", 1, Some(1), 2);
        assert_eq!(err.to_string(), r#"expected 1 argument(s) in call to "abs", got 2"#);

        let err = ArgCountError::new("round", 1, Some(2), 3);
        assert_eq!(
            err.to_string(),
            r#"expected at most 2 argument(s) in call to "round", got 3"#
        );

        let err = ArgCountError::new("label_join", 3, None, 1);
        assert_eq!(
            err.to_string(),
            r#"expected at least 3 argument(s) in call to "label_join", got 1"#
        );
    }

    #[test]
    fn invalid_token_message() {
        let err = InvalidTokenError::new(&[Token::RightParen, Token::Comma], Some(Token::Number), "1", &(4..5))
            .with_context("function call");
        assert_eq!(
            err.to_string(),
            r#"unexpected "1" at 4..5 in function call, expected ")" or ",""#
        );
    }
}
