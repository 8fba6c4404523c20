use ahash::AHashMap;
use tracing::{field, trace_span};

use promfix_common::hash::Signature;
use promfix_common::value::is_stale_nan;
use promfix_parser::ast::{
    AtModifier, Expr, FunctionExpr, MatrixSelector, SubqueryExpr, UnaryExpr, VectorSelector,
};
use promfix_parser::functions::BuiltinFunction;

use crate::execution::binary::eval_binary_expr;
use crate::execution::Context;
use crate::functions::aggregate::eval_aggregation;
use crate::functions::rollup::{eval_rollup_function, RangeWindow};
use crate::functions::transform::eval_transform_function;
use crate::provider::{Deadline, SearchQuery};
use crate::types::{contains_same_labelset, Point, QueryValue, Sample, Series};
use crate::{RuntimeError, RuntimeResult};

/// Series selected by a matrix selector or produced by a subquery, together
/// with the window they were selected from.
pub(crate) struct RangeSelection {
    pub series: Vec<Series>,
    pub window: RangeWindow,
}

/// Evaluates an expression tree for a single instant query.
pub(crate) struct Evaluator<'a> {
    ctx: &'a Context,
    /// Time of the instant query. `@ start()` and `@ end()` resolve to it.
    query_time: i64,
    deadline: Deadline,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(ctx: &'a Context, query_time: i64) -> Self {
        Evaluator {
            ctx,
            query_time,
            deadline: Deadline::new(ctx.options.timeout),
        }
    }

    /// Evaluates `expr` at `ts` (milliseconds). Inside subqueries `ts` is the
    /// current step rather than the query time.
    pub(crate) fn eval(&self, expr: &Expr, ts: i64) -> RuntimeResult<QueryValue> {
        self.deadline.check("expression evaluation")?;
        match expr {
            Expr::NumberLiteral(n) => Ok(QueryValue::Scalar(n.value)),
            Expr::StringLiteral(s) => Ok(QueryValue::String(s.clone())),
            Expr::Paren(p) => self.eval(&p.expr, ts),
            Expr::VectorSelector(vs) => {
                let samples = self.eval_vector_selector(vs, ts, false)?;
                Ok(QueryValue::InstantVector(samples))
            }
            Expr::MatrixSelector(ms) => {
                let selection = self.eval_matrix_selector(ms, ts)?;
                Ok(QueryValue::RangeVector(selection.series))
            }
            Expr::Subquery(sq) => {
                let selection = self.eval_subquery(sq, ts)?;
                Ok(QueryValue::RangeVector(selection.series))
            }
            Expr::Unary(ue) => self.eval_unary(ue, ts),
            Expr::BinaryOperator(be) => {
                let span =
                    trace_span!("binary op", op = be.op.as_str(), series = field::Empty).entered();
                let rv = eval_binary_expr(self, be, ts)?;
                span.record("series", rv.len());
                Ok(rv)
            }
            Expr::Function(fe) => {
                let span =
                    trace_span!("function", function = fe.name(), series = field::Empty).entered();
                let rv = self.eval_function(fe, ts)?;
                span.record("series", rv.len());
                Ok(rv)
            }
            Expr::Aggregation(ae) => {
                let span = trace_span!(
                    "aggregate",
                    function = ae.function.name(),
                    series = field::Empty
                )
                .entered();
                let rv = eval_aggregation(self, ae, ts)?;
                span.record("series", rv.len());
                Ok(rv)
            }
        }
    }

    pub(crate) fn eval_instant_vector(&self, expr: &Expr, ts: i64) -> RuntimeResult<Vec<Sample>> {
        self.eval(expr, ts)?.into_instant_vector()
    }

    pub(crate) fn eval_scalar(&self, expr: &Expr, ts: i64) -> RuntimeResult<f64> {
        self.eval(expr, ts)?.get_scalar()
    }

    pub(crate) fn eval_string(&self, expr: &Expr, ts: i64) -> RuntimeResult<String> {
        match self.eval(expr, ts)? {
            QueryValue::String(s) => Ok(s),
            other => Err(RuntimeError::TypeCastError(format!(
                "expected string argument, got {}",
                other.data_type()
            ))),
        }
    }

    /// Evaluates the range-vector argument of a function.
    pub(crate) fn eval_range_arg(&self, expr: &Expr, ts: i64) -> RuntimeResult<RangeSelection> {
        match expr.unwrap_parens() {
            Expr::MatrixSelector(ms) => self.eval_matrix_selector(ms, ts),
            Expr::Subquery(sq) => self.eval_subquery(sq, ts),
            other => Err(RuntimeError::TypeCastError(format!(
                "expected range vector argument, got {}",
                other.value_type()
            ))),
        }
    }

    /// The time a selector or subquery reads at: its `@` time, or `ts`,
    /// moved back by its offset.
    fn reference_time(&self, at: Option<AtModifier>, offset: Option<i64>, ts: i64) -> i64 {
        let base = match at {
            Some(AtModifier::Timestamp(t)) => t,
            Some(AtModifier::Start) | Some(AtModifier::End) => self.query_time,
            None => ts,
        };
        base - offset.unwrap_or(0)
    }

    /// Selects the latest sample of every matching series within the
    /// lookback window. With `raw_timestamps` the samples keep the time they
    /// were recorded at instead of `ts`.
    pub(crate) fn eval_vector_selector(
        &self,
        vs: &VectorSelector,
        ts: i64,
        raw_timestamps: bool,
    ) -> RuntimeResult<Vec<Sample>> {
        let ref_time = self.reference_time(vs.at, vs.offset, ts);
        let lookback = self.ctx.options.lookback_millis();
        let sq = SearchQuery::new(ref_time - lookback + 1, ref_time, vs.matchers.clone());
        let series = self.ctx.storage.search(&sq)?;

        let mut samples = Vec::with_capacity(series.len());
        for s in series {
            let Some(last) = s.points.last().copied() else {
                continue;
            };
            if is_stale_nan(last.v) {
                continue;
            }
            let timestamp = if raw_timestamps { last.t } else { ts };
            samples.push(Sample::new(s.metric, timestamp, last.v));
        }
        self.check_samples(samples.len())?;
        Ok(samples)
    }

    fn eval_matrix_selector(&self, ms: &MatrixSelector, ts: i64) -> RuntimeResult<RangeSelection> {
        let vs = &ms.selector;
        let end = self.reference_time(vs.at, vs.offset, ts);
        let start = end - ms.range;
        let sq = SearchQuery::new(start + 1, end, vs.matchers.clone());
        let mut series = self.ctx.storage.search(&sq)?;

        let mut total = 0;
        for s in series.iter_mut() {
            s.points.retain(|p| !is_stale_nan(p.v));
            total += s.len();
        }
        series.retain(|s| !s.is_empty());
        self.check_samples(total)?;

        Ok(RangeSelection {
            series,
            window: RangeWindow {
                start,
                end,
                range: ms.range,
            },
        })
    }

    /// Evaluates the inner expression at every step-aligned time in
    /// `(ref - range, ref]`.
    fn eval_subquery(&self, sq: &SubqueryExpr, ts: i64) -> RuntimeResult<RangeSelection> {
        let end = self.reference_time(sq.at, sq.offset, ts);
        let start = end - sq.range;
        let step = sq
            .step
            .unwrap_or_else(|| self.ctx.options.subquery_interval_millis());
        if step <= 0 {
            return Err(RuntimeError::ArgumentError(format!(
                "subquery step must be positive, got {step}ms"
            )));
        }

        let mut t = start - start.rem_euclid(step);
        if t <= start {
            t += step;
        }

        let mut index: AHashMap<Signature, usize> = AHashMap::new();
        let mut series: Vec<Series> = vec![];
        let mut total = 0;
        while t <= end {
            let samples = match self.eval(&sq.expr, t)? {
                QueryValue::InstantVector(samples) => samples,
                QueryValue::Scalar(v) => vec![Sample::new(Default::default(), t, v)],
                other => {
                    return Err(RuntimeError::TypeCastError(format!(
                        "subquery expression must return an instant vector, got {}",
                        other.data_type()
                    )))
                }
            };
            total += samples.len();
            self.check_samples(total)?;
            for sample in samples {
                let h = sample.metric.signature();
                let idx = *index.entry(h).or_insert_with(|| {
                    series.push(Series::new(sample.metric.clone(), vec![]));
                    series.len() - 1
                });
                series[idx].points.push(Point::new(t, sample.value));
            }
            t += step;
        }
        series.sort_by(|a, b| a.metric.cmp(&b.metric));

        Ok(RangeSelection {
            series,
            window: RangeWindow {
                start,
                end,
                range: sq.range,
            },
        })
    }

    fn eval_unary(&self, ue: &UnaryExpr, ts: i64) -> RuntimeResult<QueryValue> {
        match self.eval(&ue.expr, ts)? {
            QueryValue::Scalar(v) => Ok(QueryValue::Scalar(-v)),
            QueryValue::InstantVector(mut samples) => {
                for s in samples.iter_mut() {
                    s.value = -s.value;
                    s.metric.reset_metric_name();
                }
                check_no_duplicate_labelsets(&samples)?;
                Ok(QueryValue::InstantVector(samples))
            }
            other => Err(RuntimeError::TypeCastError(format!(
                "unary expression only allowed on scalar or instant vector, got {}",
                other.data_type()
            ))),
        }
    }

    fn eval_function(&self, fe: &FunctionExpr, ts: i64) -> RuntimeResult<QueryValue> {
        let rv = match fe.function {
            BuiltinFunction::Rollup(rf) => eval_rollup_function(self, rf, &fe.args, ts)?,
            BuiltinFunction::Transform(tf) => eval_transform_function(self, tf, &fe.args, ts)?,
        };
        if let QueryValue::InstantVector(samples) = &rv {
            check_no_duplicate_labelsets(samples)?;
        }
        Ok(rv)
    }

    /// Fails once a query holds more samples than the configured limit.
    pub(crate) fn check_samples(&self, count: usize) -> RuntimeResult<()> {
        if count > self.ctx.options.max_samples {
            return Err(RuntimeError::TooManySamples("query execution".to_string()));
        }
        Ok(())
    }
}

pub(crate) fn check_no_duplicate_labelsets(samples: &[Sample]) -> RuntimeResult<()> {
    if contains_same_labelset(samples) {
        return Err(RuntimeError::DuplicateLabelSet);
    }
    Ok(())
}
