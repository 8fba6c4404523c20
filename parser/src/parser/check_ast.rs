use crate::ast::{AggregationExpr, BinaryExpr, Expr, FunctionExpr, LabelModifier};
use crate::common::ValueType;
use crate::parser::{ParseError, ParseResult};

/// Type checks a parsed expression tree.
pub(super) fn check_ast(expr: &Expr) -> ParseResult<()> {
    match expr {
        Expr::NumberLiteral(_)
        | Expr::StringLiteral(_)
        | Expr::VectorSelector(_)
        | Expr::MatrixSelector(_) => Ok(()),
        Expr::Paren(p) => check_ast(&p.expr),
        Expr::Unary(u) => {
            let vt = u.expr.value_type();
            if !vt.is_operator_valid() {
                return Err(type_error(format!(
                    "unary expression only allowed on expressions of type scalar or instant vector, got {vt:?}",
                    vt = vt.as_str()
                )));
            }
            check_ast(&u.expr)
        }
        Expr::Subquery(sq) => {
            expect_type(&sq.expr, ValueType::InstantVector, "subquery")?;
            check_ast(&sq.expr)
        }
        Expr::BinaryOperator(be) => check_binary_expr(be),
        Expr::Function(fe) => check_function(fe),
        Expr::Aggregation(ae) => check_aggregation(ae),
    }
}

fn type_error(msg: String) -> ParseError {
    ParseError::TypeError(msg)
}

fn expect_type(expr: &Expr, expected: ValueType, context: &str) -> ParseResult<()> {
    let actual = expr.value_type();
    if actual != expected {
        return Err(type_error(format!(
            "expected type {expected} in {context}, got {actual}"
        )));
    }
    Ok(())
}

fn check_binary_expr(be: &BinaryExpr) -> ParseResult<()> {
    check_ast(&be.left)?;
    check_ast(&be.right)?;

    let op = be.op;
    let lt = be.left.value_type();
    let rt = be.right.value_type();

    if !lt.is_operator_valid() || !rt.is_operator_valid() {
        return Err(type_error(
            "binary expression must contain only scalar and instant vector types".to_string(),
        ));
    }

    let modifier = &be.modifier;
    if modifier.return_bool && !op.is_comparison() {
        return Err(type_error(
            "bool modifier can only be used on comparison operators".to_string(),
        ));
    }

    if op.is_comparison() && lt.is_scalar() && rt.is_scalar() && !modifier.return_bool {
        return Err(type_error(
            "comparisons between scalars must use BOOL modifier".to_string(),
        ));
    }

    if op.is_set_operator() && (lt.is_scalar() || rt.is_scalar()) {
        return Err(type_error(format!(
            "set operator \"{op}\" not allowed in binary scalar expression"
        )));
    }

    let has_matching = modifier.matching.is_some() || modifier.card.is_grouping();
    if has_matching && (lt != ValueType::InstantVector || rt != ValueType::InstantVector) {
        return Err(type_error(
            "vector matching only allowed between instant vectors".to_string(),
        ));
    }

    if let Some(LabelModifier::On(on)) = &modifier.matching {
        if let Some(label) = modifier.card.labels().iter().find(|l| on.contains(l)) {
            return Err(type_error(format!(
                "label {label:?} must not occur in ON and GROUP clause at once"
            )));
        }
    }

    Ok(())
}

fn check_function(fe: &FunctionExpr) -> ParseResult<()> {
    let signature = fe.function.signature();
    for (i, arg) in fe.args.iter().enumerate() {
        if let Some(expected) = signature.arg_type(i) {
            let actual = arg.value_type();
            if actual != expected {
                return Err(type_error(format!(
                    "expected type {expected} in call to function {:?}, got {actual}",
                    fe.name()
                )));
            }
        }
        check_ast(arg)?;
    }
    Ok(())
}

fn check_aggregation(ae: &AggregationExpr) -> ParseResult<()> {
    expect_type(&ae.expr, ValueType::InstantVector, "aggregation expression")?;
    if let (Some(param), Some(param_type)) = (&ae.param, ae.function.param_type()) {
        expect_type(param, param_type, "aggregation parameter")?;
        check_ast(param)?;
    }
    check_ast(&ae.expr)
}
