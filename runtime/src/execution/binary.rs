use ahash::{AHashMap, AHashSet};

use promfix_common::hash::Signature;
use promfix_parser::ast::{BinModifier, BinaryExpr, LabelModifier, VectorMatchCardinality};
use promfix_parser::binaryop::{get_arithmetic_handler, scalar_binary_operation, vector_elem_binop};
use promfix_parser::common::Operator;

use crate::execution::eval::{check_no_duplicate_labelsets, Evaluator};
use crate::types::{MetricName, QueryValue, Sample};
use crate::{RuntimeError, RuntimeResult};

pub(crate) fn eval_binary_expr(
    ev: &Evaluator,
    be: &BinaryExpr,
    ts: i64,
) -> RuntimeResult<QueryValue> {
    let lhs = ev.eval(&be.left, ts)?;
    let rhs = ev.eval(&be.right, ts)?;
    let return_bool = be.modifier.return_bool;

    let samples = match (lhs, rhs) {
        (QueryValue::Scalar(left), QueryValue::Scalar(right)) => {
            return Ok(QueryValue::Scalar(scalar_binary_operation(
                left, right, be.op,
            )));
        }
        (QueryValue::InstantVector(left), QueryValue::Scalar(right)) => {
            vector_scalar_binop(be.op, left, right, false, return_bool)
        }
        (QueryValue::Scalar(left), QueryValue::InstantVector(right)) => {
            vector_scalar_binop(be.op, right, left, true, return_bool)
        }
        (QueryValue::InstantVector(left), QueryValue::InstantVector(right)) => match be.op {
            Operator::And => vector_and(&be.modifier, left, right),
            Operator::Or => vector_or(&be.modifier, left, right),
            Operator::Unless => vector_unless(&be.modifier, left, right),
            _ => vector_binop(be.op, &be.modifier, left, right)?,
        },
        (left, right) => {
            return Err(RuntimeError::TypeCastError(format!(
                "invalid operand types for binary operator {}: {} and {}",
                be.op,
                left.data_type(),
                right.data_type()
            )))
        }
    };

    check_no_duplicate_labelsets(&samples)?;
    Ok(QueryValue::InstantVector(samples))
}

fn should_drop_metric_name(op: Operator, return_bool: bool) -> bool {
    return_bool || get_arithmetic_handler(op).is_some()
}

/// Applies `op` between every sample and a scalar. `swap` is set when the
/// scalar is the left operand.
fn vector_scalar_binop(
    op: Operator,
    samples: Vec<Sample>,
    scalar: f64,
    swap: bool,
    return_bool: bool,
) -> Vec<Sample> {
    let drop_name = should_drop_metric_name(op, return_bool);
    let mut result = Vec::with_capacity(samples.len());
    for mut sample in samples {
        let (left, right) = if swap {
            (scalar, sample.value)
        } else {
            (sample.value, scalar)
        };
        let (mut value, mut keep) = vector_elem_binop(op, left, right);
        // comparisons always yield the vector side, even when it is the right operand
        if op.is_comparison() && swap {
            value = right;
        }
        if return_bool {
            value = if keep { 1.0 } else { 0.0 };
            keep = true;
        }
        if keep {
            sample.value = value;
            if drop_name {
                sample.metric.reset_metric_name();
            }
            result.push(sample);
        }
    }
    result
}

fn matching(modifier: &BinModifier) -> (bool, &[String]) {
    match &modifier.matching {
        Some(LabelModifier::On(labels)) => (true, labels.as_slice()),
        Some(LabelModifier::Ignoring(labels)) => (false, labels.as_slice()),
        None => (false, &[]),
    }
}

fn signatures(modifier: &BinModifier, samples: &[Sample]) -> AHashSet<Signature> {
    let (on, names) = matching(modifier);
    samples
        .iter()
        .map(|s| s.metric.matching_signature(on, names))
        .collect()
}

fn vector_and(modifier: &BinModifier, lhs: Vec<Sample>, rhs: Vec<Sample>) -> Vec<Sample> {
    if lhs.is_empty() || rhs.is_empty() {
        return vec![];
    }
    let (on, names) = matching(modifier);
    let right_sigs = signatures(modifier, &rhs);
    lhs.into_iter()
        .filter(|s| right_sigs.contains(&s.metric.matching_signature(on, names)))
        .collect()
}

fn vector_or(modifier: &BinModifier, lhs: Vec<Sample>, rhs: Vec<Sample>) -> Vec<Sample> {
    if lhs.is_empty() {
        return rhs;
    }
    if rhs.is_empty() {
        return lhs;
    }
    let (on, names) = matching(modifier);
    let left_sigs = signatures(modifier, &lhs);
    let mut result = lhs;
    result.extend(
        rhs.into_iter()
            .filter(|s| !left_sigs.contains(&s.metric.matching_signature(on, names))),
    );
    result
}

fn vector_unless(modifier: &BinModifier, lhs: Vec<Sample>, rhs: Vec<Sample>) -> Vec<Sample> {
    if lhs.is_empty() || rhs.is_empty() {
        return lhs;
    }
    let (on, names) = matching(modifier);
    let right_sigs = signatures(modifier, &rhs);
    lhs.into_iter()
        .filter(|s| !right_sigs.contains(&s.metric.matching_signature(on, names)))
        .collect()
}

/// Arithmetic and comparison between two instant vectors with one-to-one,
/// many-to-one or one-to-many matching.
fn vector_binop(
    op: Operator,
    modifier: &BinModifier,
    lhs: Vec<Sample>,
    rhs: Vec<Sample>,
) -> RuntimeResult<Vec<Sample>> {
    if lhs.is_empty() || rhs.is_empty() {
        return Ok(vec![]);
    }
    let (on, names) = matching(modifier);
    let card = &modifier.card;
    let one_to_many = matches!(card, VectorMatchCardinality::OneToMany(_));

    // the "many" side goes left
    let (lhs, rhs) = if one_to_many { (rhs, lhs) } else { (lhs, rhs) };

    let mut right_sigs: AHashMap<Signature, &Sample> = AHashMap::with_capacity(rhs.len());
    for rs in rhs.iter() {
        let sig = rs.metric.matching_signature(on, names);
        if let Some(dupl) = right_sigs.get(&sig) {
            let one_side = if one_to_many { "left" } else { "right" };
            return Err(RuntimeError::General(format!(
                "found duplicate series for the match group {} on the {one_side} hand-side of the operation: [{}, {}];many-to-many matching not allowed: matching labels must be unique on one side",
                rs.metric.matching_labels(on, names),
                rs.metric,
                dupl.metric
            )));
        }
        right_sigs.insert(sig, rs);
    }

    // For one-to-one matching the value is None. Otherwise it holds the
    // output label sets produced so far for the match group.
    let mut matched_sigs: AHashMap<Signature, Option<AHashSet<Signature>>> = AHashMap::new();
    let drop_name = should_drop_metric_name(op, modifier.return_bool);
    let mut result = Vec::with_capacity(lhs.len());

    for ls in lhs.iter() {
        let sig = ls.metric.matching_signature(on, names);
        let Some(rs) = right_sigs.get(&sig) else {
            continue;
        };

        let (left, right) = if one_to_many {
            (rs.value, ls.value)
        } else {
            (ls.value, rs.value)
        };
        let (mut value, keep) = vector_elem_binop(op, left, right);
        if modifier.return_bool {
            value = if keep { 1.0 } else { 0.0 };
        } else if !keep {
            continue;
        }

        let metric = result_metric(&ls.metric, &rs.metric, drop_name, modifier);

        match card {
            VectorMatchCardinality::OneToOne => {
                if matched_sigs.contains_key(&sig) {
                    return Err(RuntimeError::General(
                        "multiple matches for labels: many-to-one matching must be explicit (group_left/group_right)".to_string(),
                    ));
                }
                matched_sigs.insert(sig, None);
            }
            _ => {
                let inserted = matched_sigs
                    .entry(sig)
                    .or_insert_with(|| Some(AHashSet::new()))
                    .get_or_insert_with(AHashSet::new);
                if !inserted.insert(metric.signature()) {
                    return Err(RuntimeError::General(
                        "multiple matches for labels: grouping labels must ensure unique matches"
                            .to_string(),
                    ));
                }
            }
        }

        result.push(Sample::new(metric, ls.timestamp, value));
    }

    Ok(result)
}

/// Label set of a vector-matching result. `lhs` is the "many" side.
fn result_metric(
    lhs: &MetricName,
    rhs: &MetricName,
    drop_name: bool,
    modifier: &BinModifier,
) -> MetricName {
    let mut metric = lhs.clone();
    if drop_name {
        metric.reset_metric_name();
    }
    if modifier.card == VectorMatchCardinality::OneToOne {
        match &modifier.matching {
            Some(LabelModifier::On(labels)) => metric.retain_labels(labels),
            Some(LabelModifier::Ignoring(labels)) => metric.remove_labels(labels),
            None => {}
        }
    }
    // labels included by group_x come from the "one" side
    for name in modifier.card.labels() {
        match rhs.get(name) {
            Some(value) => metric.set_label(name, value),
            None => metric.remove_label(name),
        }
    }
    metric
}
