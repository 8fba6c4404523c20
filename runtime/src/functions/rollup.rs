use promfix_parser::ast::Expr;
use promfix_parser::functions::RollupFunction;

use crate::execution::eval::Evaluator;
use crate::functions::transform::labels_for_absent;
use crate::functions::utils::{linear_regression, mean, quantile, variance};
use crate::types::{Point, QueryValue, Sample};
use crate::{RuntimeError, RuntimeResult};

/// The window a range vector was selected from: `(start, end]`, with
/// `range = end - start`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RangeWindow {
    pub start: i64,
    pub end: i64,
    pub range: i64,
}

pub(crate) fn eval_rollup_function(
    ev: &Evaluator,
    func: RollupFunction,
    args: &[Expr],
    ts: i64,
) -> RuntimeResult<QueryValue> {
    let range_arg = arg(func, args, func.range_arg_index())?;
    let selection = ev.eval_range_arg(range_arg, ts)?;

    let param = match func {
        RollupFunction::PredictLinear => Some(ev.eval_scalar(arg(func, args, 1)?, ts)?),
        RollupFunction::QuantileOverTime => Some(ev.eval_scalar(arg(func, args, 0)?, ts)?),
        _ => None,
    };

    if func == RollupFunction::AbsentOverTime {
        if !selection.series.is_empty() {
            return Ok(QueryValue::InstantVector(vec![]));
        }
        let metric = labels_for_absent(range_arg);
        return Ok(QueryValue::InstantVector(vec![Sample::new(metric, ts, 1.0)]));
    }

    let mut samples = Vec::with_capacity(selection.series.len());
    for series in selection.series {
        let Some(value) = rollup_value(func, &series.points, &selection.window, ts, param) else {
            continue;
        };
        let mut metric = series.metric;
        if !func.keep_metric_name() {
            metric.reset_metric_name();
        }
        samples.push(Sample::new(metric, ts, value));
    }
    Ok(QueryValue::InstantVector(samples))
}

fn arg(func: RollupFunction, args: &[Expr], idx: usize) -> RuntimeResult<&Expr> {
    args.get(idx).ok_or_else(|| {
        RuntimeError::ArgumentError(format!("missing argument #{} in call to {func}", idx + 1))
    })
}

/// Reduces the points of one series to a single value. Returns None when the
/// function has no result for these points.
pub(crate) fn rollup_value(
    func: RollupFunction,
    points: &[Point],
    window: &RangeWindow,
    ts: i64,
    param: Option<f64>,
) -> Option<f64> {
    use RollupFunction::*;

    let first = points.first()?;
    let last = points.last()?;

    let value = match func {
        Rate => extrapolated_rate(points, window, true, true)?,
        Increase => extrapolated_rate(points, window, true, false)?,
        Delta => extrapolated_rate(points, window, false, false)?,
        IRate => instant_value(points, true)?,
        IDelta => instant_value(points, false)?,
        Deriv => {
            if points.len() < 2 {
                return None;
            }
            linear_regression(points, first.t).0
        }
        PredictLinear => {
            if points.len() < 2 {
                return None;
            }
            let (slope, intercept) = linear_regression(points, ts);
            slope * param.unwrap_or(0.0) + intercept
        }
        Changes => {
            let mut changes = 0;
            let mut prev = first.v;
            for p in &points[1..] {
                if p.v != prev && !(p.v.is_nan() && prev.is_nan()) {
                    changes += 1;
                }
                prev = p.v;
            }
            changes as f64
        }
        Resets => {
            let mut resets = 0;
            let mut prev = first.v;
            for p in &points[1..] {
                if p.v < prev {
                    resets += 1;
                }
                prev = p.v;
            }
            resets as f64
        }
        AvgOverTime => mean(points.iter().map(|p| p.v)),
        SumOverTime => points.iter().map(|p| p.v).sum(),
        CountOverTime => points.len() as f64,
        LastOverTime => last.v,
        PresentOverTime => 1.0,
        MaxOverTime => points.iter().skip(1).fold(first.v, |max, p| {
            if p.v > max || max.is_nan() {
                p.v
            } else {
                max
            }
        }),
        MinOverTime => points.iter().skip(1).fold(first.v, |min, p| {
            if p.v < min || min.is_nan() {
                p.v
            } else {
                min
            }
        }),
        StdvarOverTime => variance(points.iter().map(|p| p.v)),
        StddevOverTime => variance(points.iter().map(|p| p.v)).sqrt(),
        QuantileOverTime => {
            let mut values: Vec<f64> = points.iter().map(|p| p.v).collect();
            quantile(param.unwrap_or(f64::NAN), &mut values)
        }
        AbsentOverTime => 1.0,
    };
    Some(value)
}

/// Rate of change over the window, extrapolated to the window boundaries.
/// Counters are adjusted for resets and never extrapolated below zero.
fn extrapolated_rate(
    points: &[Point],
    window: &RangeWindow,
    is_counter: bool,
    is_rate: bool,
) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let first = points[0];
    let last = points[points.len() - 1];

    let mut result = last.v - first.v;
    if is_counter {
        let mut prev = 0.0;
        for p in points {
            if p.v < prev {
                result += prev;
            }
            prev = p.v;
        }
    }

    let mut duration_to_start = (first.t - window.start) as f64 / 1e3;
    let mut duration_to_end = (window.end - last.t) as f64 / 1e3;
    let sampled_interval = (last.t - first.t) as f64 / 1e3;
    let average_duration_between_samples = sampled_interval / (points.len() - 1) as f64;

    // Only extrapolate to the boundary when the gap to it looks like a
    // regular scrape interval.
    let extrapolation_threshold = average_duration_between_samples * 1.1;
    if duration_to_start >= extrapolation_threshold {
        duration_to_start = average_duration_between_samples / 2.0;
    }
    if is_counter && result > 0.0 && first.v >= 0.0 {
        let duration_to_zero = sampled_interval * (first.v / result);
        if duration_to_zero < duration_to_start {
            duration_to_start = duration_to_zero;
        }
    }
    if duration_to_end >= extrapolation_threshold {
        duration_to_end = average_duration_between_samples / 2.0;
    }

    let extrapolate_to_interval = sampled_interval + duration_to_start + duration_to_end;
    let mut factor = extrapolate_to_interval / sampled_interval;
    if is_rate {
        factor /= window.range as f64 / 1e3;
    }
    Some(result * factor)
}

/// irate and idelta: the change between the last two points.
fn instant_value(points: &[Point], is_rate: bool) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let last = points[points.len() - 1];
    let previous = points[points.len() - 2];

    let result = if is_rate && last.v < previous.v {
        // counter reset
        last.v
    } else {
        last.v - previous.v
    };

    let sampled_interval = last.t - previous.t;
    if sampled_interval == 0 {
        return None;
    }
    if is_rate {
        return Some(result / (sampled_interval as f64 / 1e3));
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn points(values: &[(i64, f64)]) -> Vec<Point> {
        values.iter().map(|(t, v)| Point::new(*t, *v)).collect()
    }

    fn window(end: i64, range: i64) -> RangeWindow {
        RangeWindow {
            start: end - range,
            end,
            range,
        }
    }

    fn eval(func: RollupFunction, pts: &[(i64, f64)]) -> Option<f64> {
        rollup_value(func, &points(pts), &window(300_000, 300_000), 300_000, None)
    }

    #[test]
    fn rate_extrapolates_to_window() {
        // 0, 10, ... 50 at 1m steps over (0, 5m]: the first point lies on the
        // open boundary and is not part of the range.
        let pts: Vec<(i64, f64)> = (1..=5).map(|i| (i * 60_000, i as f64 * 10.0)).collect();
        let rate = eval(RollupFunction::Rate, &pts).unwrap();
        // 40 over 4m sampled; the first point is 1m from the window start,
        // under the 1.1 x average interval threshold, so the full minute is
        // extrapolated. The zero point is 1m away too and does not shorten it.
        let expected = 40.0 * (300.0 / 240.0) / 300.0;
        assert!((rate - expected).abs() < 1e-12, "{rate} != {expected}");
        assert!((rate - 1.0 / 6.0).abs() < 1e-12);

        let increase = eval(RollupFunction::Increase, &pts).unwrap();
        assert!((increase - 50.0).abs() < 1e-12);
    }

    #[test]
    fn rate_handles_counter_resets() {
        let pts = [(60_000, 10.0), (120_000, 20.0), (180_000, 5.0), (240_000, 15.0)];
        let increase = eval(RollupFunction::Increase, &pts).unwrap();
        let delta = eval(RollupFunction::Delta, &pts).unwrap();
        assert!(increase > 0.0);
        assert!(delta > 0.0 && delta < increase);
    }

    #[test]
    fn rate_needs_two_points() {
        assert_eq!(eval(RollupFunction::Rate, &[(60_000, 1.0)]), None);
        assert_eq!(eval(RollupFunction::IRate, &[(60_000, 1.0)]), None);
        assert_eq!(eval(RollupFunction::Deriv, &[(60_000, 1.0)]), None);
    }

    #[test]
    fn irate_and_idelta() {
        let pts = [(60_000, 10.0), (120_000, 40.0), (150_000, 70.0)];
        assert_eq!(eval(RollupFunction::IRate, &pts), Some(1.0));
        assert_eq!(eval(RollupFunction::IDelta, &pts), Some(30.0));
        let reset = [(60_000, 10.0), (120_000, 6.0)];
        assert_eq!(eval(RollupFunction::IRate, &reset), Some(0.1));
        assert_eq!(eval(RollupFunction::IDelta, &reset), Some(-4.0));
    }

    #[test_case(RollupFunction::AvgOverTime, 2.5)]
    #[test_case(RollupFunction::SumOverTime, 10.0)]
    #[test_case(RollupFunction::CountOverTime, 4.0)]
    #[test_case(RollupFunction::LastOverTime, 2.0)]
    #[test_case(RollupFunction::MaxOverTime, 4.0)]
    #[test_case(RollupFunction::MinOverTime, 1.0)]
    #[test_case(RollupFunction::PresentOverTime, 1.0)]
    #[test_case(RollupFunction::Changes, 3.0)]
    #[test_case(RollupFunction::Resets, 2.0)]
    #[test_case(RollupFunction::StdvarOverTime, 1.25)]
    fn over_time(func: RollupFunction, expected: f64) {
        let pts = [(1, 1.0), (2, 4.0), (3, 3.0), (4, 2.0)];
        assert_eq!(eval(func, &pts), Some(expected));
    }

    #[test]
    fn avg_over_time_survives_sum_overflow() {
        let pts = [(1, 1e308), (2, 1e308), (3, 1e308)];
        assert_eq!(eval(RollupFunction::AvgOverTime, &pts), Some(1e308));
    }

    #[test]
    fn min_and_max_skip_leading_nan() {
        let pts = [(1, f64::NAN), (2, 4.0), (3, 3.0)];
        assert_eq!(eval(RollupFunction::MaxOverTime, &pts), Some(4.0));
        assert_eq!(eval(RollupFunction::MinOverTime, &pts), Some(3.0));
    }

    #[test]
    fn quantile_over_time() {
        let pts = points(&[(1, 1.0), (2, 2.0), (3, 3.0)]);
        let v = rollup_value(
            RollupFunction::QuantileOverTime,
            &pts,
            &window(10, 10),
            10,
            Some(0.5),
        );
        assert_eq!(v, Some(2.0));
    }

    #[test]
    fn deriv_and_predict_linear() {
        let pts = points(&[(0, 0.0), (60_000, 60.0), (120_000, 120.0)]);
        let w = window(120_000, 180_000);
        let deriv = rollup_value(RollupFunction::Deriv, &pts, &w, 120_000, None).unwrap();
        assert!((deriv - 1.0).abs() < 1e-9);
        let predicted =
            rollup_value(RollupFunction::PredictLinear, &pts, &w, 120_000, Some(60.0)).unwrap();
        assert!((predicted - 180.0).abs() < 1e-9);
    }
}
