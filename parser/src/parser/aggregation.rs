use crate::ast::{AggregateModifier, AggregationExpr, Expr};
use crate::functions::AggregateFunction;
use crate::parser::tokens::Token;
use crate::parser::{ParseError, ParseResult, Parser};

/// Parses `func [by|without (…)] (args) [by|without (…)]`. The cursor points
/// at the function name.
pub(super) fn parse_aggregation(p: &mut Parser, function: AggregateFunction) -> ParseResult<Expr> {
    p.expect(Token::Identifier)?;

    let mut modifier = None;
    if p.peek_kind().is_aggregate_modifier() {
        modifier = Some(parse_aggregate_modifier(p)?);
    }

    let mut args = p.parse_arg_list()?;

    if p.peek_kind().is_aggregate_modifier() {
        if modifier.is_some() {
            return Err(ParseError::General(format!(
                "{function}: grouping may be given only once"
            )));
        }
        modifier = Some(parse_aggregate_modifier(p)?);
    }

    let expected = if function.param_type().is_some() { 2 } else { 1 };
    if args.len() != expected {
        return Err(ParseError::General(format!(
            "wrong number of arguments for aggregate expression provided, expected {expected}, got {}",
            args.len()
        )));
    }

    let expr = args.pop().map(Box::new).ok_or(ParseError::UnexpectedEOF)?;
    let param = args.pop().map(Box::new);

    Ok(Expr::Aggregation(AggregationExpr {
        function,
        expr,
        param,
        modifier,
    }))
}

fn parse_aggregate_modifier(p: &mut Parser) -> ParseResult<AggregateModifier> {
    let is_by = p.at(Token::By);
    p.bump();
    let labels = p.parse_ident_list()?;
    Ok(if is_by {
        AggregateModifier::By(labels)
    } else {
        AggregateModifier::Without(labels)
    })
}
