use promfix_common::label::METRIC_NAME_LABEL;

use crate::ast::{Expr, VectorSelector};
use crate::label::Matcher;
use crate::parser::number::unquote;
use crate::parser::tokens::Token;
use crate::parser::{ParseError, ParseResult, Parser};

/// Parses the optional `{…}` part of a vector selector. The metric name, if
/// any, has already been consumed.
pub(super) fn parse_vector_selector(p: &mut Parser, name: Option<String>) -> ParseResult<Expr> {
    let mut matchers = Vec::with_capacity(4);

    if p.consume_token(Token::LeftBrace) {
        matchers = p.parse_comma_separated(&[Token::RightBrace], parse_label_matcher)?;
    }

    if let Some(name) = &name {
        if let Some(m) = matchers.iter().find(|m| m.name == METRIC_NAME_LABEL) {
            return Err(ParseError::InvalidSelector(format!(
                "metric name must not be set twice: {name:?} or {:?}",
                m.value
            )));
        }
        matchers.insert(0, Matcher::equal(METRIC_NAME_LABEL, name));
    }

    // A selector must select something: at least one matcher must not match
    // the empty string.
    if !matchers.iter().any(|m| !m.matches("")) {
        return Err(ParseError::InvalidSelector(
            "vector selector must contain at least one non-empty matcher".to_string(),
        ));
    }

    Ok(Expr::VectorSelector(VectorSelector::new(name, matchers)))
}

fn parse_label_matcher(p: &mut Parser) -> ParseResult<Matcher> {
    let name = p.parse_label_name()?;

    let op = p.peek_kind();
    if !matches!(
        op,
        Token::Equal | Token::OpNotEqual | Token::RegexEqual | Token::RegexNotEqual
    ) {
        return Err(p.token_error_in(
            &[
                Token::Equal,
                Token::OpNotEqual,
                Token::RegexEqual,
                Token::RegexNotEqual,
            ],
            "label matching",
        ));
    }
    p.bump();

    let tok = p.expect_token(Token::StringLiteral)?;
    let value = unquote(tok.text)?;

    match op {
        Token::Equal => Ok(Matcher::equal(&name, &value)),
        Token::OpNotEqual => Ok(Matcher::not_equal(&name, &value)),
        Token::RegexEqual => Matcher::regex_equal(&name, &value),
        _ => Matcher::regex_not_equal(&name, &value),
    }
}
