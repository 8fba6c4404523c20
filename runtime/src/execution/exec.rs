use tracing::{debug, field, trace_span};

use promfix_parser::ast::Expr;
use promfix_parser::functions::{AggregateFunction, BuiltinFunction, TransformFunction};
use promfix_parser::parser::parse;

use crate::execution::eval::Evaluator;
use crate::execution::Context;
use crate::runtime_error::{RuntimeError, RuntimeResult};
use crate::QueryValue;

pub(crate) fn parse_promql_internal(context: &Context, query: &str) -> RuntimeResult<Expr> {
    let _span = trace_span!("parse").entered();
    let expr = parse(query)?;
    check_features(context, &expr)?;
    Ok(expr)
}

/// Parses and evaluates `query` at `ts` (milliseconds since the epoch).
///
/// Instant vectors come back ordered by label set unless the outermost
/// expression decides the order itself (`sort`, `sort_desc`, `topk`,
/// `bottomk`). Range vectors are always ordered by label set.
pub fn instant_query(context: &Context, query: &str, ts: i64) -> RuntimeResult<QueryValue> {
    let expr = parse_promql_internal(context, query)?;
    debug!(query, ts, "instant query");
    exec_expr(context, &expr, ts)
}

/// Evaluates an already parsed expression at `ts`.
pub fn exec_expr(context: &Context, expr: &Expr, ts: i64) -> RuntimeResult<QueryValue> {
    let span = trace_span!("eval", ts, series = field::Empty).entered();

    let ev = Evaluator::new(context, ts);
    let mut rv = ev.eval(expr, ts)?;
    span.record("series", rv.len());

    match &mut rv {
        QueryValue::InstantVector(samples) if may_sort_results(expr) => {
            samples.sort_by(|a, b| a.metric.cmp(&b.metric));
        }
        QueryValue::RangeVector(series) => {
            series.sort_by(|a, b| a.metric.cmp(&b.metric));
        }
        _ => {}
    }
    Ok(rv)
}

fn may_sort_results(e: &Expr) -> bool {
    match e.unwrap_parens() {
        Expr::Function(fe) => !matches!(
            fe.function,
            BuiltinFunction::Transform(TransformFunction::Sort | TransformFunction::SortDesc)
        ),
        Expr::Aggregation(ae) => !matches!(
            ae.function,
            AggregateFunction::Topk | AggregateFunction::Bottomk
        ),
        _ => true,
    }
}

/// Rejects `@` modifiers and negative offsets unless the options allow them.
fn check_features(context: &Context, expr: &Expr) -> RuntimeResult<()> {
    let options = &context.options;
    if options.enable_at_modifier && options.enable_negative_offset {
        return Ok(());
    }

    let check = |at: bool, offset: Option<i64>| -> RuntimeResult<()> {
        if at && !options.enable_at_modifier {
            return Err(RuntimeError::Disabled("@ modifier is disabled".to_string()));
        }
        if offset.is_some_and(|o| o < 0) && !options.enable_negative_offset {
            return Err(RuntimeError::Disabled(
                "negative offset is disabled".to_string(),
            ));
        }
        Ok(())
    };

    match expr {
        Expr::NumberLiteral(_) | Expr::StringLiteral(_) => Ok(()),
        Expr::VectorSelector(vs) => check(vs.at.is_some(), vs.offset),
        Expr::MatrixSelector(ms) => check(ms.selector.at.is_some(), ms.selector.offset),
        Expr::Subquery(sq) => {
            check(sq.at.is_some(), sq.offset)?;
            check_features(context, &sq.expr)
        }
        Expr::Paren(p) => check_features(context, &p.expr),
        Expr::Unary(ue) => check_features(context, &ue.expr),
        Expr::BinaryOperator(be) => {
            check_features(context, &be.left)?;
            check_features(context, &be.right)
        }
        Expr::Function(fe) => fe.args.iter().try_for_each(|arg| check_features(context, arg)),
        Expr::Aggregation(ae) => {
            if let Some(param) = &ae.param {
                check_features(context, param)?;
            }
            check_features(context, &ae.expr)
        }
    }
}
