use std::cmp::Ordering;

use ahash::AHashMap;
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

use promfix_common::hash::Signature;
use promfix_common::label::{is_valid_label_name, METRIC_NAME_LABEL};
use promfix_common::regex_util::compile_anchored_regex;
use promfix_common::time::millis_to_secs;
use promfix_parser::ast::Expr;
use promfix_parser::functions::TransformFunction;
use promfix_parser::label::MatchOp;

use crate::execution::eval::Evaluator;
use crate::functions::utils::{max_nan, min_nan};
use crate::types::{MetricName, QueryValue, Sample};
use crate::{RuntimeError, RuntimeResult};

const BUCKET_LABEL: &str = "le";

pub(crate) fn eval_transform_function(
    ev: &Evaluator,
    func: TransformFunction,
    args: &[Expr],
    ts: i64,
) -> RuntimeResult<QueryValue> {
    use TransformFunction::*;

    let samples = match func {
        Time => return Ok(QueryValue::Scalar(millis_to_secs(ts))),
        Scalar => {
            let samples = ev.eval_instant_vector(arg(func, args, 0)?, ts)?;
            let value = match samples.as_slice() {
                [only] => only.value,
                _ => f64::NAN,
            };
            return Ok(QueryValue::Scalar(value));
        }
        Vector => {
            let value = ev.eval_scalar(arg(func, args, 0)?, ts)?;
            vec![Sample::new(MetricName::default(), ts, value)]
        }
        Absent => {
            let expr = arg(func, args, 0)?;
            let samples = ev.eval_instant_vector(expr, ts)?;
            if !samples.is_empty() {
                return Ok(QueryValue::InstantVector(vec![]));
            }
            vec![Sample::new(labels_for_absent(expr), ts, 1.0)]
        }
        Timestamp => {
            let expr = arg(func, args, 0)?;
            let samples = match expr.unwrap_parens() {
                Expr::VectorSelector(vs) => ev.eval_vector_selector(vs, ts, true)?,
                other => ev.eval_instant_vector(other, ts)?,
            };
            samples
                .into_iter()
                .map(|s| Sample::new(s.metric, ts, millis_to_secs(s.timestamp)))
                .collect()
        }
        DayOfMonth | DayOfWeek | DayOfYear | DaysInMonth | Hour | Minute | Month | Year => {
            let samples = match args.first() {
                Some(expr) => ev.eval_instant_vector(expr, ts)?,
                None => vec![Sample::new(MetricName::default(), ts, millis_to_secs(ts))],
            };
            map_values(samples, |v| date_value(func, v))
        }
        Round => {
            let samples = ev.eval_instant_vector(arg(func, args, 0)?, ts)?;
            let to_nearest = match args.get(1) {
                Some(expr) => ev.eval_scalar(expr, ts)?,
                None => 1.0,
            };
            // inverting first gives exact results for fractions like 0.1
            let inv = 1.0 / to_nearest;
            map_values(samples, |v| (v * inv + 0.5).floor() / inv)
        }
        Clamp => {
            let samples = ev.eval_instant_vector(arg(func, args, 0)?, ts)?;
            let min = ev.eval_scalar(arg(func, args, 1)?, ts)?;
            let max = ev.eval_scalar(arg(func, args, 2)?, ts)?;
            if max < min {
                return Ok(QueryValue::InstantVector(vec![]));
            }
            map_values(samples, |v| max_nan(min, min_nan(max, v)))
        }
        ClampMax => {
            let samples = ev.eval_instant_vector(arg(func, args, 0)?, ts)?;
            let max = ev.eval_scalar(arg(func, args, 1)?, ts)?;
            map_values(samples, |v| min_nan(max, v))
        }
        ClampMin => {
            let samples = ev.eval_instant_vector(arg(func, args, 0)?, ts)?;
            let min = ev.eval_scalar(arg(func, args, 1)?, ts)?;
            map_values(samples, |v| max_nan(min, v))
        }
        HistogramQuantile => {
            let phi = ev.eval_scalar(arg(func, args, 0)?, ts)?;
            let samples = ev.eval_instant_vector(arg(func, args, 1)?, ts)?;
            histogram_quantile(phi, samples, ts)
        }
        LabelReplace => {
            let samples = ev.eval_instant_vector(arg(func, args, 0)?, ts)?;
            let dst = ev.eval_string(arg(func, args, 1)?, ts)?;
            let replacement = ev.eval_string(arg(func, args, 2)?, ts)?;
            let src = ev.eval_string(arg(func, args, 3)?, ts)?;
            let regex = ev.eval_string(arg(func, args, 4)?, ts)?;
            label_replace(samples, &dst, &replacement, &src, &regex)?
        }
        LabelJoin => {
            let samples = ev.eval_instant_vector(arg(func, args, 0)?, ts)?;
            let dst = ev.eval_string(arg(func, args, 1)?, ts)?;
            let separator = ev.eval_string(arg(func, args, 2)?, ts)?;
            let src = args
                .get(3..)
                .unwrap_or_default()
                .iter()
                .map(|expr| ev.eval_string(expr, ts))
                .collect::<RuntimeResult<Vec<_>>>()?;
            label_join(samples, &dst, &separator, &src)?
        }
        Sort | SortDesc => {
            let mut samples = ev.eval_instant_vector(arg(func, args, 0)?, ts)?;
            sort_by_value(&mut samples, func == SortDesc);
            samples
        }
        Abs | Ceil | Exp | Floor | Ln | Log10 | Log2 | Sgn | Sqrt => {
            let samples = ev.eval_instant_vector(arg(func, args, 0)?, ts)?;
            map_values(samples, |v| math_value(func, v))
        }
    };

    let mut samples = samples;
    if !func.keep_metric_name() {
        for s in samples.iter_mut() {
            s.metric.reset_metric_name();
        }
    }
    Ok(QueryValue::InstantVector(samples))
}

fn arg(func: TransformFunction, args: &[Expr], idx: usize) -> RuntimeResult<&Expr> {
    args.get(idx).ok_or_else(|| {
        RuntimeError::ArgumentError(format!("missing argument #{} in call to {func}", idx + 1))
    })
}

fn map_values(mut samples: Vec<Sample>, f: impl Fn(f64) -> f64) -> Vec<Sample> {
    for s in samples.iter_mut() {
        s.value = f(s.value);
    }
    samples
}

fn math_value(func: TransformFunction, v: f64) -> f64 {
    use TransformFunction::*;
    match func {
        Abs => v.abs(),
        Ceil => v.ceil(),
        Exp => v.exp(),
        Floor => v.floor(),
        Ln => v.ln(),
        Log10 => v.log10(),
        Log2 => v.log2(),
        Sqrt => v.sqrt(),
        Sgn => {
            if v < 0.0 {
                -1.0
            } else if v > 0.0 {
                1.0
            } else {
                v
            }
        }
        _ => v,
    }
}

/// Interprets `v` as seconds since the epoch and extracts a UTC calendar
/// field from it.
fn date_value(func: TransformFunction, v: f64) -> f64 {
    use TransformFunction::*;

    if !v.is_finite() {
        return f64::NAN;
    }
    let Some(t) = DateTime::<Utc>::from_timestamp(v as i64, 0) else {
        return f64::NAN;
    };
    match func {
        DayOfMonth => t.day() as f64,
        DayOfWeek => t.weekday().num_days_from_sunday() as f64,
        DayOfYear => t.ordinal() as f64,
        DaysInMonth => days_in_month(t.year(), t.month()) as f64,
        Hour => t.hour() as f64,
        Minute => t.minute() as f64,
        Month => t.month() as f64,
        Year => t.year() as f64,
        _ => f64::NAN,
    }
}

fn days_in_month(year: i32, month: u32) -> i64 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(start), Some(end)) => (end - start).num_days(),
        _ => 0,
    }
}

/// The labels `absent` reports for a selector that matched nothing: those
/// pinned by equality matchers. A label constrained more than once, or by any
/// other matcher, is left out.
pub(crate) fn labels_for_absent(expr: &Expr) -> MetricName {
    let matchers = match expr.unwrap_parens() {
        Expr::VectorSelector(vs) => &vs.matchers,
        Expr::MatrixSelector(ms) => &ms.selector.matchers,
        _ => return MetricName::default(),
    };

    let mut metric = MetricName::default();
    let mut seen: Vec<&str> = Vec::with_capacity(matchers.len());
    for m in matchers {
        if m.name == METRIC_NAME_LABEL {
            continue;
        }
        if matches!(m.op, MatchOp::Equal) && !seen.contains(&m.name.as_str()) {
            metric.set_label(&m.name, &m.value);
        } else {
            metric.remove_label(&m.name);
        }
        seen.push(&m.name);
    }
    metric
}

fn label_replace(
    mut samples: Vec<Sample>,
    dst: &str,
    replacement: &str,
    src: &str,
    regex: &str,
) -> RuntimeResult<Vec<Sample>> {
    let re = compile_anchored_regex(regex)
        .map_err(|e| RuntimeError::InvalidRegex(format!("{regex}: {e}")))?;
    if !is_valid_label_name(dst) {
        return Err(RuntimeError::ArgumentError(format!(
            "invalid destination label name in label_replace(): {dst}"
        )));
    }

    for s in samples.iter_mut() {
        let src_value = s.metric.get(src).unwrap_or_default().to_string();
        let Some(captures) = re.captures(&src_value) else {
            continue;
        };
        let mut value = String::new();
        captures.expand(replacement, &mut value);
        s.metric.set_label(dst, &value);
    }
    Ok(samples)
}

fn label_join(
    mut samples: Vec<Sample>,
    dst: &str,
    separator: &str,
    src: &[String],
) -> RuntimeResult<Vec<Sample>> {
    if !is_valid_label_name(dst) {
        return Err(RuntimeError::ArgumentError(format!(
            "invalid destination label name in label_join(): {dst}"
        )));
    }
    if let Some(bad) = src.iter().find(|name| !is_valid_label_name(name)) {
        return Err(RuntimeError::ArgumentError(format!(
            "invalid source label name in label_join(): {bad}"
        )));
    }

    for s in samples.iter_mut() {
        let value = src
            .iter()
            .map(|name| s.metric.get(name).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(separator);
        s.metric.set_label(dst, &value);
    }
    Ok(samples)
}

/// Sorts by value, ascending or descending. NaN goes last either way.
pub(crate) fn sort_by_value(samples: &mut [Sample], descending: bool) {
    samples.sort_by(|a, b| match (a.value.is_nan(), b.value.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => {
            let ord = a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
    });
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct Bucket {
    upper_bound: f64,
    count: f64,
}

fn histogram_quantile(phi: f64, samples: Vec<Sample>, ts: i64) -> Vec<Sample> {
    let drop = [BUCKET_LABEL.to_string()];
    let mut groups: AHashMap<Signature, (MetricName, Vec<Bucket>)> = AHashMap::new();
    let mut order: Vec<Signature> = vec![];

    for s in samples {
        // series without a parseable upper bound are not buckets
        let Some(upper_bound) = s.metric.get(BUCKET_LABEL).and_then(|le| le.parse::<f64>().ok())
        else {
            continue;
        };
        let sig = s.metric.matching_signature(false, &drop);
        let entry = groups.entry(sig).or_insert_with(|| {
            order.push(sig);
            (s.metric.matching_labels(false, &drop), vec![])
        });
        entry.1.push(Bucket {
            upper_bound,
            count: s.value,
        });
    }

    order
        .into_iter()
        .filter_map(|sig| groups.remove(&sig))
        .map(|(metric, mut buckets)| {
            let value = bucket_quantile(phi, &mut buckets);
            Sample::new(metric, ts, value)
        })
        .collect()
}

/// Estimates the φ-quantile from cumulative histogram buckets, assuming
/// observations are spread linearly within a bucket.
fn bucket_quantile(phi: f64, buckets: &mut Vec<Bucket>) -> f64 {
    if phi.is_nan() {
        return f64::NAN;
    }
    if phi < 0.0 {
        return f64::NEG_INFINITY;
    }
    if phi > 1.0 {
        return f64::INFINITY;
    }
    buckets.sort_by(|a, b| {
        a.upper_bound
            .partial_cmp(&b.upper_bound)
            .unwrap_or(Ordering::Equal)
    });
    match buckets.last() {
        Some(b) if b.upper_bound == f64::INFINITY => {}
        _ => return f64::NAN,
    }

    coalesce_buckets(buckets);
    ensure_monotonic(buckets);

    if buckets.len() < 2 {
        return f64::NAN;
    }
    let observations = buckets[buckets.len() - 1].count;
    if observations == 0.0 {
        return f64::NAN;
    }
    let mut rank = phi * observations;
    let b = buckets[..buckets.len() - 1]
        .iter()
        .position(|bucket| bucket.count >= rank)
        .unwrap_or(buckets.len() - 1);

    if b == buckets.len() - 1 {
        return buckets[buckets.len() - 2].upper_bound;
    }
    if b == 0 && buckets[0].upper_bound <= 0.0 {
        return buckets[0].upper_bound;
    }

    let mut bucket_start = 0.0;
    let bucket_end = buckets[b].upper_bound;
    let mut count = buckets[b].count;
    if b > 0 {
        bucket_start = buckets[b - 1].upper_bound;
        count -= buckets[b - 1].count;
        rank -= buckets[b - 1].count;
    }
    bucket_start + (bucket_end - bucket_start) * (rank / count)
}

/// Merges buckets sharing an upper bound, e.g. `le="1"` and `le="1.0"`.
fn coalesce_buckets(buckets: &mut Vec<Bucket>) {
    buckets.dedup_by(|next, prev| {
        if next.upper_bound == prev.upper_bound {
            prev.count += next.count;
            true
        } else {
            false
        }
    });
}

/// Raises every bucket count to at least the count before it.
fn ensure_monotonic(buckets: &mut [Bucket]) {
    let mut max = f64::NEG_INFINITY;
    for b in buckets.iter_mut() {
        if b.count > max {
            max = b.count;
        } else if b.count < max {
            b.count = max;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use promfix_parser::parser::parse;
    use test_case::test_case;

    fn buckets(pairs: &[(f64, f64)]) -> Vec<Bucket> {
        pairs
            .iter()
            .map(|(upper_bound, count)| Bucket {
                upper_bound: *upper_bound,
                count: *count,
            })
            .collect()
    }

    #[test_case(0.5, 1.0 ; "median")]
    #[test_case(0.25, 0.5 ; "lower quartile")]
    #[test_case(0.75, 1.5 ; "upper quartile")]
    #[test_case(0.0, 0.0 ; "zero")]
    #[test_case(1.0, 2.0 ; "highest finite bucket")]
    fn quantile_from_buckets(phi: f64, expected: f64) {
        let mut b = buckets(&[(1.0, 10.0), (2.0, 20.0), (f64::INFINITY, 20.0)]);
        assert_eq!(bucket_quantile(phi, &mut b), expected);
    }

    #[test]
    fn quantile_needs_an_inf_bucket() {
        let mut b = buckets(&[(1.0, 10.0), (2.0, 20.0)]);
        assert!(bucket_quantile(0.5, &mut b).is_nan());
    }

    #[test]
    fn quantile_fixes_non_monotonic_counts() {
        let mut b = buckets(&[(1.0, 10.0), (2.0, 8.0), (f64::INFINITY, 20.0)]);
        let v = bucket_quantile(0.75, &mut b);
        assert_eq!(b[1].count, 10.0);
        assert_eq!(v, 2.0);
    }

    #[test]
    fn coalesces_equal_bounds() {
        let mut b = buckets(&[(1.0, 1.0), (1.0, 2.0), (f64::INFINITY, 5.0)]);
        coalesce_buckets(&mut b);
        assert_eq!(b, buckets(&[(1.0, 3.0), (f64::INFINITY, 5.0)]));
    }

    #[test_case(-1.5, -1.0)]
    #[test_case(0.0, 0.0)]
    #[test_case(3.0, 1.0)]
    fn sgn(v: f64, expected: f64) {
        assert_eq!(math_value(TransformFunction::Sgn, v), expected);
    }

    #[test_case(TransformFunction::Year, 2021.0)]
    #[test_case(TransformFunction::Month, 2.0)]
    #[test_case(TransformFunction::DayOfMonth, 14.0)]
    #[test_case(TransformFunction::DayOfWeek, 0.0)]
    #[test_case(TransformFunction::DayOfYear, 45.0)]
    #[test_case(TransformFunction::DaysInMonth, 28.0)]
    #[test_case(TransformFunction::Hour, 13.0)]
    #[test_case(TransformFunction::Minute, 5.0)]
    fn date_fields(func: TransformFunction, expected: f64) {
        // 2021-02-14T13:05:00Z, a Sunday
        assert_eq!(date_value(func, 1_613_307_900.0), expected);
    }

    #[test]
    fn leap_february() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 12), 31);
    }

    #[test]
    fn absent_labels_from_equality_matchers() {
        let expr = parse(r#"nope{job="a", instance=~"x", env="p", env="q"}"#).unwrap();
        assert_eq!(labels_for_absent(&expr), MetricName::from_strings(&[("job", "a")]));
    }

    #[test]
    fn label_replace_expands_captures() {
        let samples = vec![Sample::new(
            MetricName::from_strings(&[("__name__", "up"), ("instance", "host:9090")]),
            0,
            1.0,
        )];
        let res = label_replace(samples, "host", "$1", "instance", "(.*):.*").unwrap();
        assert_eq!(res[0].metric.get("host"), Some("host"));

        let res = label_replace(res, "host", "$1", "instance", "nomatch").unwrap();
        assert_eq!(res[0].metric.get("host"), Some("host"));
    }

    #[test]
    fn label_replace_rejects_bad_input() {
        assert!(matches!(
            label_replace(vec![], "dst", "", "src", "("),
            Err(RuntimeError::InvalidRegex(_))
        ));
        assert!(label_replace(vec![], "1dst", "", "src", ".*").is_err());
    }

    #[test]
    fn label_join_joins_missing_as_empty() {
        let samples = vec![Sample::new(MetricName::from_strings(&[("a", "x"), ("c", "z")]), 0, 1.0)];
        let src = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let res = label_join(samples, "joined", "-", &src).unwrap();
        assert_eq!(res[0].metric.get("joined"), Some("x--z"));
    }

    #[test]
    fn sort_puts_nan_last() {
        let mut samples: Vec<Sample> = [2.0, f64::NAN, 1.0, 3.0]
            .iter()
            .map(|v| Sample::new(MetricName::default(), 0, *v))
            .collect();
        sort_by_value(&mut samples, true);
        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        assert_eq!(&values[..3], &[3.0, 2.0, 1.0]);
        assert!(values[3].is_nan());
    }
}
