use logos::{Logos, Span};

use crate::parser::tokens::Token;
use crate::parser::{ParseError, ParseResult};

#[derive(Debug, Clone, PartialEq)]
pub struct TokenWithLocation<'source> {
    pub kind: Token,
    pub text: &'source str,
    pub span: Span,
}

impl<'source> TokenWithLocation<'source> {
    pub fn new(kind: Token, text: &'source str, span: Span) -> Self {
        Self { kind, text, span }
    }
}

/// Splits `input` into tokens. Lexer errors are reported with the byte span
/// of the offending text.
pub(crate) fn tokenize(input: &str) -> ParseResult<Vec<TokenWithLocation<'_>>> {
    let mut lex = Token::lexer(input);
    let mut tokens = Vec::with_capacity(16);
    while let Some(tok) = lex.next() {
        let span = lex.span();
        match tok {
            Ok(Token::ErrorStringUnterminated) => {
                return Err(ParseError::UnterminatedString(span));
            }
            Ok(kind) => tokens.push(TokenWithLocation::new(kind, lex.slice(), span)),
            Err(_) => {
                return Err(ParseError::UnexpectedCharacter {
                    text: lex.slice().to_string(),
                    span,
                });
            }
        }
    }
    Ok(tokens)
}
