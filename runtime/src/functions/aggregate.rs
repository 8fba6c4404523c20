use std::cmp::Ordering;

use ahash::AHashMap;

use promfix_common::format::format_value;
use promfix_common::hash::Signature;
use promfix_common::label::is_valid_label_name;
use promfix_parser::ast::{AggregateModifier, AggregationExpr, Expr};
use promfix_parser::functions::AggregateFunction;

use crate::execution::eval::Evaluator;
use crate::functions::utils::{mean, quantile, variance};
use crate::types::{MetricName, QueryValue, Sample};
use crate::{RuntimeError, RuntimeResult};

/// Samples that share a grouping signature, with the labels the group is
/// reported under.
struct SampleGroup {
    metric: MetricName,
    samples: Vec<Sample>,
}

pub(crate) fn eval_aggregation(
    ev: &Evaluator,
    ae: &AggregationExpr,
    ts: i64,
) -> RuntimeResult<QueryValue> {
    let func = ae.function;
    let samples = ev.eval_instant_vector(&ae.expr, ts)?;

    let result = match func {
        AggregateFunction::Topk | AggregateFunction::Bottomk => {
            let k = ev.eval_scalar(param(ae)?, ts)?;
            if k.is_nan() {
                return Err(RuntimeError::ArgumentError(format!(
                    "Parameter value is NaN in {func}"
                )));
            }
            if k < 1.0 {
                return Ok(QueryValue::InstantVector(vec![]));
            }
            let k = if k >= samples.len() as f64 {
                samples.len()
            } else {
                k as usize
            };
            let groups = group_samples(samples, ae.modifier.as_ref());
            groups
                .into_iter()
                .flat_map(|g| top_k(g.samples, k, func == AggregateFunction::Topk))
                .collect()
        }
        AggregateFunction::CountValues => {
            let label = ev.eval_string(param(ae)?, ts)?;
            if !is_valid_label_name(&label) {
                return Err(RuntimeError::ArgumentError(format!(
                    "invalid label name {label:?}"
                )));
            }
            count_values(samples, &label, ae.modifier.as_ref(), ts)
        }
        _ => {
            let phi = match func {
                AggregateFunction::Quantile => ev.eval_scalar(param(ae)?, ts)?,
                _ => f64::NAN,
            };
            group_samples(samples, ae.modifier.as_ref())
                .into_iter()
                .map(|g| {
                    let value = aggregate_values(func, &g.samples, phi);
                    Sample::new(g.metric, ts, value)
                })
                .collect()
        }
    };

    Ok(QueryValue::InstantVector(result))
}

fn param(ae: &AggregationExpr) -> RuntimeResult<&Expr> {
    ae.param.as_deref().ok_or_else(|| {
        RuntimeError::ArgumentError(format!("{} requires a parameter", ae.function))
    })
}

/// `by` keeps only the listed labels, `without` everything but them and the
/// metric name. No modifier puts every sample in one group.
fn grouping(modifier: Option<&AggregateModifier>) -> (bool, &[String]) {
    match modifier {
        Some(AggregateModifier::By(labels)) => (true, labels.as_slice()),
        Some(AggregateModifier::Without(labels)) => (false, labels.as_slice()),
        None => (true, &[]),
    }
}

/// Splits samples into groups, in order of first appearance.
fn group_samples(samples: Vec<Sample>, modifier: Option<&AggregateModifier>) -> Vec<SampleGroup> {
    let (on, names) = grouping(modifier);
    let mut index: AHashMap<Signature, usize> = AHashMap::new();
    let mut groups: Vec<SampleGroup> = vec![];

    for sample in samples {
        let sig = sample.metric.matching_signature(on, names);
        let idx = *index.entry(sig).or_insert_with(|| {
            groups.push(SampleGroup {
                metric: sample.metric.matching_labels(on, names),
                samples: vec![],
            });
            groups.len() - 1
        });
        groups[idx].samples.push(sample);
    }
    groups
}

fn aggregate_values(func: AggregateFunction, samples: &[Sample], phi: f64) -> f64 {
    use AggregateFunction::*;

    let values = samples.iter().map(|s| s.value);
    match func {
        Sum => values.sum(),
        Avg => mean(values),
        Count => samples.len() as f64,
        Group => 1.0,
        // NaN only survives when every value is NaN
        Max => values.fold(f64::NAN, |max, v| if v > max || max.is_nan() { v } else { max }),
        Min => values.fold(f64::NAN, |min, v| if v < min || min.is_nan() { v } else { min }),
        StdVar => variance(values),
        StdDev => variance(values).sqrt(),
        Quantile => {
            let mut values: Vec<f64> = values.collect();
            quantile(phi, &mut values)
        }
        Topk | Bottomk | CountValues => f64::NAN,
    }
}

/// The `k` largest (or smallest) samples of a group, best first. NaN ranks
/// below every number.
fn top_k(mut samples: Vec<Sample>, k: usize, largest: bool) -> Vec<Sample> {
    samples.sort_by(|a, b| match (a.value.is_nan(), b.value.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => {
            let ord = a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal);
            if largest {
                ord.reverse()
            } else {
                ord
            }
        }
    });
    samples.truncate(k);
    samples
}

/// Counts the samples sharing each distinct value, per group. The value is
/// reported in `label`.
fn count_values(
    samples: Vec<Sample>,
    label: &str,
    modifier: Option<&AggregateModifier>,
    ts: i64,
) -> Vec<Sample> {
    let (on, names) = grouping(modifier);
    let mut index: AHashMap<Signature, usize> = AHashMap::new();
    let mut result: Vec<Sample> = vec![];

    for sample in samples {
        let mut metric = sample.metric.matching_labels(on, names);
        metric.set_label(label, &format_value(sample.value));
        let idx = *index.entry(metric.signature()).or_insert_with(|| {
            result.push(Sample::new(metric, ts, 0.0));
            result.len() - 1
        });
        result[idx].value += 1.0;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn sample(pairs: &[(&str, &str)], value: f64) -> Sample {
        Sample::new(MetricName::from_strings(pairs), 0, value)
    }

    fn input() -> Vec<Sample> {
        vec![
            sample(&[("__name__", "req"), ("job", "a"), ("code", "200")], 3.0),
            sample(&[("__name__", "req"), ("job", "a"), ("code", "500")], 1.0),
            sample(&[("__name__", "req"), ("job", "b"), ("code", "200")], 4.0),
        ]
    }

    #[test]
    fn groups_by_labels() {
        let by = AggregateModifier::By(vec!["job".to_string()]);
        let groups = group_samples(input(), Some(&by));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].metric, MetricName::from_strings(&[("job", "a")]));
        assert_eq!(groups[0].samples.len(), 2);
    }

    #[test]
    fn groups_without_labels_drops_name() {
        let without = AggregateModifier::Without(vec!["code".to_string()]);
        let groups = group_samples(input(), Some(&without));
        assert_eq!(groups[1].metric, MetricName::from_strings(&[("job", "b")]));
    }

    #[test]
    fn no_modifier_is_one_group() {
        let groups = group_samples(input(), None);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].metric.is_empty());
    }

    #[test_case(AggregateFunction::Sum, 8.0)]
    #[test_case(AggregateFunction::Avg, 8.0 / 3.0)]
    #[test_case(AggregateFunction::Count, 3.0)]
    #[test_case(AggregateFunction::Group, 1.0)]
    #[test_case(AggregateFunction::Max, 4.0)]
    #[test_case(AggregateFunction::Min, 1.0)]
    fn simple_aggregates(func: AggregateFunction, expected: f64) {
        assert_eq!(aggregate_values(func, &input(), f64::NAN), expected);
    }

    #[test]
    fn avg_survives_sum_overflow() {
        let samples = vec![
            sample(&[("a", "1")], 1e308),
            sample(&[("a", "2")], 1e308),
            sample(&[("a", "3")], 1e308),
        ];
        assert_eq!(aggregate_values(AggregateFunction::Avg, &samples, 0.0), 1e308);
    }

    #[test]
    fn min_max_ignore_nan_unless_all_nan() {
        let samples = vec![sample(&[("a", "1")], f64::NAN), sample(&[("a", "2")], 2.0)];
        assert_eq!(aggregate_values(AggregateFunction::Max, &samples, 0.0), 2.0);
        assert_eq!(aggregate_values(AggregateFunction::Min, &samples, 0.0), 2.0);
        let all_nan = vec![sample(&[("a", "1")], f64::NAN)];
        assert!(aggregate_values(AggregateFunction::Max, &all_nan, 0.0).is_nan());
    }

    #[test]
    fn topk_keeps_labels_and_sorts() {
        let res = top_k(input(), 2, true);
        assert_eq!(
            res,
            vec![
                sample(&[("__name__", "req"), ("job", "b"), ("code", "200")], 4.0),
                sample(&[("__name__", "req"), ("job", "a"), ("code", "200")], 3.0),
            ]
        );
    }

    #[test]
    fn bottomk_ranks_nan_last() {
        let mut samples = input();
        samples.push(sample(&[("job", "c")], f64::NAN));
        let res = top_k(samples, 4, false);
        let values: Vec<f64> = res.iter().map(|s| s.value).collect();
        assert_eq!(&values[..3], &[1.0, 3.0, 4.0]);
        assert!(values[3].is_nan());
    }

    #[test]
    fn counts_values() {
        let mut samples = input();
        samples.push(sample(&[("job", "c")], 3.0));
        let res = count_values(samples, "value", None, 0);
        assert_eq!(
            res,
            vec![
                sample(&[("value", "3")], 2.0),
                sample(&[("value", "1")], 1.0),
                sample(&[("value", "4")], 1.0),
            ]
        );
    }
}
