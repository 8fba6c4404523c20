use crate::ast::{Expr, FunctionExpr};
use crate::functions::BuiltinFunction;
use crate::parser::tokens::Token;
use crate::parser::{ParseResult, Parser};

/// Parses `name(args…)`. The cursor points at the function name.
pub(super) fn parse_function_call(p: &mut Parser) -> ParseResult<Expr> {
    let tok = p.expect_token(Token::Identifier)?;
    let function = BuiltinFunction::new(tok.text)?;
    let args = p.parse_arg_list()?;
    function.signature().validate_arg_count(function.name(), args.len())?;
    Ok(Expr::Function(FunctionExpr { function, args }))
}
