use std::str::FromStr;

use crate::ast::{
    AtModifier, BinModifier, BinaryExpr, Expr, LabelModifier, MatrixSelector, ParensExpr,
    SubqueryExpr, UnaryExpr, VectorMatchCardinality,
};
use crate::common::Operator;
use crate::functions::{is_function, AggregateFunction};
use crate::parser::aggregation::parse_aggregation;
use crate::parser::function::parse_function_call;
use crate::parser::number::{parse_number, parse_positive_duration, unquote};
use crate::parser::selector::parse_vector_selector;
use crate::parser::tokens::Token;
use crate::parser::{ParseError, ParseResult, Parser};

pub(super) fn parse_expression(p: &mut Parser) -> ParseResult<Expr> {
    parse_binary_expr(p, 0)
}

/// Precedence climbing over the binary operators. `min_precedence` is the
/// lowest operator precedence this call may consume.
fn parse_binary_expr(p: &mut Parser, min_precedence: usize) -> ParseResult<Expr> {
    let mut left = parse_unary_expr(p)?;
    loop {
        let kind = p.peek_kind();
        if !kind.is_operator() {
            break;
        }
        let op = Operator::try_from(kind)?;
        let precedence = op.precedence();
        if precedence < min_precedence {
            break;
        }
        p.bump();
        let modifier = parse_bin_modifier(p, op)?;
        let next_min = if op.is_right_associative() {
            precedence
        } else {
            precedence + 1
        };
        let right = parse_binary_expr(p, next_min)?;
        left = Expr::BinaryOperator(BinaryExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
            modifier,
        });
    }
    Ok(left)
}

/// Unary operators bind tighter than every binary operator except `^`.
fn parse_unary_expr(p: &mut Parser) -> ParseResult<Expr> {
    let negate = match p.peek_kind() {
        Token::OpMinus => true,
        Token::OpPlus => false,
        _ => return parse_postfix_expr(p),
    };
    p.bump();
    let expr = parse_binary_expr(p, Operator::Pow.precedence())?;
    if !negate {
        return Ok(expr);
    }
    match expr {
        Expr::NumberLiteral(n) => Ok(Expr::number(-n.value)),
        expr => Ok(Expr::Unary(UnaryExpr {
            expr: Box::new(expr),
        })),
    }
}

fn parse_bin_modifier(p: &mut Parser, op: Operator) -> ParseResult<BinModifier> {
    let mut modifier = BinModifier::default();
    if p.consume_token(Token::Bool) {
        modifier.return_bool = true;
    }

    if p.peek_kind().is_group_modifier() {
        let is_on = p.at(Token::On);
        p.bump();
        let labels = p.parse_ident_list()?;
        modifier.matching = Some(if is_on {
            LabelModifier::On(labels)
        } else {
            LabelModifier::Ignoring(labels)
        });

        if p.peek_kind().is_join_modifier() {
            let is_left = p.at(Token::GroupLeft);
            p.bump();
            let labels = if p.at(Token::LeftParen) {
                p.parse_ident_list()?
            } else {
                vec![]
            };
            modifier.card = if is_left {
                VectorMatchCardinality::ManyToOne(labels)
            } else {
                VectorMatchCardinality::OneToMany(labels)
            };
        }
    }

    if op.is_set_operator() {
        if modifier.card.is_grouping() {
            return Err(ParseError::General(format!(
                "no grouping allowed for \"{op}\" operation"
            )));
        }
        modifier.card = VectorMatchCardinality::ManyToMany;
    }

    Ok(modifier)
}

/// A primary expression followed by any number of `[range]`, `[range:step]`,
/// `offset` and `@` suffixes.
fn parse_postfix_expr(p: &mut Parser) -> ParseResult<Expr> {
    let mut expr = parse_primary_expr(p)?;
    loop {
        expr = match p.peek_kind() {
            Token::LeftBracket => parse_range_suffix(p, expr)?,
            Token::Offset => parse_offset_suffix(p, expr)?,
            Token::At => parse_at_suffix(p, expr)?,
            _ => break,
        };
    }
    Ok(expr)
}

fn parse_primary_expr(p: &mut Parser) -> ParseResult<Expr> {
    let tok = match p.peek_token() {
        Some(tok) => tok.clone(),
        None => return Err(ParseError::UnexpectedEOF),
    };
    match tok.kind {
        Token::Number => {
            p.bump();
            Ok(Expr::number(parse_number(tok.text)?))
        }
        Token::StringLiteral => {
            p.bump();
            Ok(Expr::StringLiteral(unquote(tok.text)?))
        }
        Token::LeftParen => {
            p.bump();
            let expr = parse_expression(p)?;
            p.expect(Token::RightParen)?;
            Ok(Expr::Paren(ParensExpr {
                expr: Box::new(expr),
            }))
        }
        Token::LeftBrace => parse_vector_selector(p, None),
        Token::Identifier => {
            let next = p.peek_next_kind();
            if let Ok(func) = AggregateFunction::from_str(tok.text) {
                if next == Token::LeftParen || next.is_aggregate_modifier() {
                    return parse_aggregation(p, func);
                }
            }
            if next == Token::LeftParen {
                if is_function(tok.text) {
                    return parse_function_call(p);
                }
                return Err(ParseError::UnknownFunction(tok.text.to_string()));
            }
            p.bump();
            parse_vector_selector(p, Some(tok.text.to_string()))
        }
        _ => Err(p.token_error_in(
            &[
                Token::Number,
                Token::StringLiteral,
                Token::Identifier,
                Token::LeftParen,
                Token::LeftBrace,
            ],
            "expression",
        )),
    }
}

fn parse_range_suffix(p: &mut Parser, expr: Expr) -> ParseResult<Expr> {
    p.expect(Token::LeftBracket)?;
    let range = p.expect_token(Token::Duration)?;
    let range = parse_positive_duration(range.text)?;

    if p.consume_token(Token::Colon) {
        let step = if p.at(Token::Duration) {
            let tok = p.expect_token(Token::Duration)?;
            Some(parse_positive_duration(tok.text)?)
        } else {
            None
        };
        p.expect(Token::RightBracket)?;
        if let Expr::MatrixSelector(_) = expr {
            return Err(ParseError::TypeError(
                "subquery is only allowed on instant vector, got range vector".to_string(),
            ));
        }
        return Ok(Expr::Subquery(SubqueryExpr {
            expr: Box::new(expr),
            range,
            step,
            offset: None,
            at: None,
        }));
    }

    p.expect(Token::RightBracket)?;
    match expr {
        Expr::VectorSelector(vs) => {
            if vs.offset.is_some() {
                return Err(ParseError::General(
                    "no offset modifiers allowed before range".to_string(),
                ));
            }
            if vs.at.is_some() {
                return Err(ParseError::General(
                    "no @ modifiers allowed before range".to_string(),
                ));
            }
            Ok(Expr::MatrixSelector(MatrixSelector {
                selector: vs,
                range,
            }))
        }
        _ => Err(ParseError::General(
            "ranges only allowed for vector selectors".to_string(),
        )),
    }
}

fn parse_offset_suffix(p: &mut Parser, mut expr: Expr) -> ParseResult<Expr> {
    p.expect(Token::Offset)?;
    let negative = p.consume_token(Token::OpMinus);
    let tok = p.expect_token(Token::Duration)?;
    let mut offset = parse_positive_duration(tok.text)?;
    if negative {
        offset = -offset;
    }

    let slot = match &mut expr {
        Expr::VectorSelector(vs) => &mut vs.offset,
        Expr::MatrixSelector(ms) => &mut ms.selector.offset,
        Expr::Subquery(sq) => &mut sq.offset,
        _ => {
            return Err(ParseError::General(
                "offset modifier must be preceded by an instant vector selector or range vector selector or a subquery".to_string(),
            ))
        }
    };
    if slot.is_some() {
        return Err(ParseError::General(
            "offset may not be set multiple times".to_string(),
        ));
    }
    *slot = Some(offset);
    Ok(expr)
}

fn parse_at_suffix(p: &mut Parser, mut expr: Expr) -> ParseResult<Expr> {
    p.expect(Token::At)?;
    let at = parse_at_value(p)?;

    let slot = match &mut expr {
        Expr::VectorSelector(vs) => &mut vs.at,
        Expr::MatrixSelector(ms) => &mut ms.selector.at,
        Expr::Subquery(sq) => &mut sq.at,
        _ => {
            return Err(ParseError::General(
                "@ modifier must be preceded by an instant vector selector or range vector selector or a subquery".to_string(),
            ))
        }
    };
    if slot.is_some() {
        return Err(ParseError::General(
            "@ <timestamp> may not be set multiple times".to_string(),
        ));
    }
    *slot = Some(at);
    Ok(expr)
}

fn parse_at_value(p: &mut Parser) -> ParseResult<AtModifier> {
    if p.at(Token::Identifier) {
        let tok = p.expect_token(Token::Identifier)?;
        let at = match tok.text {
            "start" => AtModifier::Start,
            "end" => AtModifier::End,
            other => {
                return Err(ParseError::General(format!(
                    "invalid @ modifier {other:?}, expected a timestamp, start() or end()"
                )))
            }
        };
        p.expect(Token::LeftParen)?;
        p.expect(Token::RightParen)?;
        return Ok(at);
    }

    let negative = if p.consume_token(Token::OpMinus) {
        true
    } else {
        p.consume_token(Token::OpPlus);
        false
    };
    let tok = p.expect_token(Token::Number)?;
    let mut secs = parse_number(tok.text)?;
    if negative {
        secs = -secs;
    }
    let ms = secs * 1e3;
    if !ms.is_finite() || ms.abs() > i64::MAX as f64 {
        return Err(ParseError::General(
            "timestamp out of bounds for @ modifier".to_string(),
        ));
    }
    Ok(AtModifier::Timestamp(ms.round() as i64))
}
