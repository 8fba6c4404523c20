use promfix_common::label::is_valid_label_name;

use crate::ast::Expr;
use crate::parser::check_ast::check_ast;
use crate::parser::expr::parse_expression;
use crate::parser::lexer::{tokenize, TokenWithLocation};
use crate::parser::tokens::Token;
use crate::parser::{InvalidTokenError, ParseError, ParseResult};

/// Parses a PromQL expression and runs the static type checks on it.
pub fn parse(input: &str) -> ParseResult<Expr> {
    let mut parser = Parser::new(input)?;
    if parser.at_end() {
        return Err(ParseError::General("no expression found in input".to_string()));
    }
    let expr = parser.parse_expression()?;
    if !parser.at_end() {
        return Err(parser.token_error(&[Token::Eof]));
    }
    check_ast(&expr)?;
    Ok(expr)
}

/// parser parses PromQL expression.
///
/// preconditions for all parser.parse* funcs:
/// - self.cursor should point to the first token to parse.
///
/// post-conditions for all parser.parse* funcs:
/// - self.cursor should point to the next token after the parsed token.
pub struct Parser<'a> {
    tokens: Vec<TokenWithLocation<'a>>,
    cursor: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> ParseResult<Self> {
        let tokens = tokenize(input)?;
        Ok(Self { tokens, cursor: 0 })
    }

    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        parse_expression(self)
    }

    pub(crate) fn peek_token(&self) -> Option<&TokenWithLocation<'a>> {
        self.tokens.get(self.cursor)
    }

    /// Kind of the token after the current one.
    pub(crate) fn peek_next_kind(&self) -> Token {
        self.tokens
            .get(self.cursor + 1)
            .map(|t| t.kind)
            .unwrap_or(Token::Eof)
    }

    pub(crate) fn peek_kind(&self) -> Token {
        self.peek_token().map(|t| t.kind).unwrap_or(Token::Eof)
    }

    pub(crate) fn at(&self, kind: Token) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn at_set(&self, set: &[Token]) -> bool {
        set.contains(&self.peek_kind())
    }

    pub(crate) fn at_end(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    pub(crate) fn bump(&mut self) {
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
        }
    }

    pub(crate) fn expect(&mut self, kind: Token) -> ParseResult<()> {
        self.expect_token(kind).map(|_| ())
    }

    pub(crate) fn expect_token(&mut self, kind: Token) -> ParseResult<TokenWithLocation<'a>> {
        match self.peek_token() {
            Some(tok) if tok.kind == kind => {
                let tok = tok.clone();
                self.bump();
                Ok(tok)
            }
            _ => Err(self.token_error(&[kind])),
        }
    }

    /// Consume the next token if it matches the expected token, otherwise return false
    pub(crate) fn consume_token(&mut self, expected: Token) -> bool {
        if self.at(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn token_error(&self, expected: &[Token]) -> ParseError {
        match self.peek_token() {
            Some(TokenWithLocation { kind, text, span }) => ParseError::InvalidToken(
                InvalidTokenError::new(expected, Some(*kind), text, span),
            ),
            None => ParseError::UnexpectedEOF,
        }
    }

    pub(crate) fn token_error_in(&self, expected: &[Token], context: &str) -> ParseError {
        match self.token_error(expected) {
            ParseError::InvalidToken(err) => ParseError::InvalidToken(err.with_context(context)),
            other => other,
        }
    }

    /// Parse a comma-separated list of 0+ items accepted by `F`, followed
    /// by one of `stop_tokens`. A trailing comma is allowed.
    pub(crate) fn parse_comma_separated<T, F>(
        &mut self,
        stop_tokens: &[Token],
        mut f: F,
    ) -> ParseResult<Vec<T>>
    where
        F: FnMut(&mut Parser<'a>) -> ParseResult<T>,
    {
        let mut values = Vec::with_capacity(4);
        loop {
            if self.at_set(stop_tokens) {
                self.bump();
                break;
            }
            let item = f(self)?;
            values.push(item);
            let kind = self.peek_kind();
            if kind == Token::Comma {
                self.bump();
                continue;
            } else if stop_tokens.contains(&kind) {
                self.bump();
                break;
            } else {
                let mut expected = Vec::from(stop_tokens);
                expected.insert(0, Token::Comma);
                return Err(self.token_error(&expected));
            }
        }
        Ok(values)
    }

    pub(crate) fn parse_arg_list(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(Token::LeftParen)?;
        self.parse_comma_separated(&[Token::RightParen], |p| p.parse_expression())
    }

    /// Parses `(a, b, …)` as used by `by`, `without`, `on`, `ignoring` and
    /// the group modifiers.
    pub(crate) fn parse_ident_list(&mut self) -> ParseResult<Vec<String>> {
        self.expect(Token::LeftParen)?;
        self.parse_comma_separated(&[Token::RightParen], |p| p.parse_label_name())
    }

    pub(crate) fn parse_label_name(&mut self) -> ParseResult<String> {
        match self.peek_token() {
            Some(tok) if tok.kind.is_ident_like() => {
                let name = tok.text.to_string();
                if !is_valid_label_name(&name) {
                    return Err(ParseError::General(format!("invalid label name {name:?}")));
                }
                self.bump();
                Ok(name)
            }
            _ => Err(self.token_error_in(&[Token::Identifier], "label list")),
        }
    }
}
