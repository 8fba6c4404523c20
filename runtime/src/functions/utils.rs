use std::cmp::Ordering;

use crate::types::Point;

/// Orders values ascending with NaN before everything else.
pub(crate) fn cmp_nan_first(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Maximum that propagates NaN.
pub(crate) fn max_nan(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    a.max(b)
}

/// Minimum that propagates NaN.
pub(crate) fn min_nan(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    a.min(b)
}

/// φ-quantile of `values`, interpolating between the two closest ranks.
/// φ below 0 yields -Inf, above 1 +Inf.
pub(crate) fn quantile(phi: f64, values: &mut [f64]) -> f64 {
    if values.is_empty() || phi.is_nan() {
        return f64::NAN;
    }
    if phi < 0.0 {
        return f64::NEG_INFINITY;
    }
    if phi > 1.0 {
        return f64::INFINITY;
    }
    values.sort_by(|a, b| cmp_nan_first(*a, *b));

    let n = values.len() as f64;
    let rank = phi * (n - 1.0);
    let lower = rank.floor().max(0.0);
    let upper = (lower + 1.0).min(n - 1.0);
    let weight = rank - rank.floor();
    values[lower as usize] * (1.0 - weight) + values[upper as usize] * weight
}

/// Least-squares fit of the points, with x in seconds relative to
/// `intercept_time`. Returns (slope, intercept).
pub(crate) fn linear_regression(points: &[Point], intercept_time: i64) -> (f64, f64) {
    let mut n = 0.0;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    let init_y = points.first().map_or(f64::NAN, |p| p.v);
    let mut const_y = true;

    for (i, p) in points.iter().enumerate() {
        if const_y && i > 0 && p.v != init_y {
            const_y = false;
        }
        n += 1.0;
        let x = (p.t - intercept_time) as f64 / 1e3;
        sum_x += x;
        sum_y += p.v;
        sum_xy += x * p.v;
        sum_x2 += x * x;
    }

    if const_y {
        if init_y.is_infinite() {
            return (f64::NAN, f64::NAN);
        }
        return (0.0, init_y);
    }

    let cov_xy = sum_xy - sum_x * sum_y / n;
    let var_x = sum_x2 - sum_x * sum_x / n;
    let slope = cov_xy / var_x;
    let intercept = sum_y / n - slope * sum_x / n;
    (slope, intercept)
}

/// Arithmetic mean. Switches to an incremental mean once the running sum
/// overflows, so large finite inputs keep a finite result.
pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut count = 0.0;
    let mut sum = 0.0;
    let mut incremental: Option<f64> = None;
    for v in values {
        count += 1.0;
        if let Some(mean) = incremental.as_mut() {
            if mean.is_infinite() {
                if v.is_infinite() && (*mean > 0.0) == (v > 0.0) {
                    continue;
                }
                if v.is_finite() {
                    continue;
                }
            }
            *mean += v / count - *mean / count;
            continue;
        }
        let next = sum + v;
        if next.is_infinite() && sum.is_finite() && v.is_finite() {
            let mean = sum / (count - 1.0);
            incremental = Some(mean + v / count - mean / count);
        } else {
            sum = next;
        }
    }
    if count == 0.0 {
        return f64::NAN;
    }
    incremental.unwrap_or(sum / count)
}

/// Population variance using Welford's method.
pub(crate) fn variance(values: impl Iterator<Item = f64>) -> f64 {
    let mut count = 0.0;
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for v in values {
        count += 1.0;
        let delta = v - mean;
        mean += delta / count;
        m2 += delta * (v - mean);
    }
    if count == 0.0 {
        return f64::NAN;
    }
    m2 / count
}
