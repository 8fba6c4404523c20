use crate::common::Operator;

pub type BinopFunc = fn(left: f64, right: f64) -> f64;

/// Plus returns left + right
#[inline]
fn op_plus(left: f64, right: f64) -> f64 {
    left + right
}

/// Minus returns left - right
#[inline]
fn op_minus(left: f64, right: f64) -> f64 {
    left - right
}

/// Mul returns left * right
#[inline]
fn op_mul(left: f64, right: f64) -> f64 {
    left * right
}

/// Div returns left / right
#[inline]
fn op_div(left: f64, right: f64) -> f64 {
    left / right
}

/// returns left % right, with the sign of `left`
#[inline]
fn op_mod(left: f64, right: f64) -> f64 {
    left % right
}

/// pow returns pow(left, right)
#[inline]
fn op_pow(left: f64, right: f64) -> f64 {
    left.powf(right)
}

/// returns atan2(left, right)
#[inline]
fn op_atan2(left: f64, right: f64) -> f64 {
    left.atan2(right)
}

/// Returns the arithmetic handler for `op`, or `None` for comparison and
/// set operators.
pub const fn get_arithmetic_handler(op: Operator) -> Option<BinopFunc> {
    match op {
        Operator::Add => Some(op_plus),
        Operator::Sub => Some(op_minus),
        Operator::Mul => Some(op_mul),
        Operator::Div => Some(op_div),
        Operator::Mod => Some(op_mod),
        Operator::Pow => Some(op_pow),
        Operator::Atan2 => Some(op_atan2),
        _ => None,
    }
}

/// Evaluates a comparison. NaN compares false to everything.
#[inline]
pub fn compare(op: Operator, left: f64, right: f64) -> bool {
    match op {
        Operator::Eql => left == right,
        Operator::NotEq => left != right,
        Operator::Gt => left > right,
        Operator::Lt => left < right,
        Operator::Gte => left >= right,
        Operator::Lte => left <= right,
        _ => false,
    }
}

/// Applies `op` to a pair of sample values.
///
/// Returns the resulting value and whether the sample is kept. Arithmetic
/// always keeps the sample; a comparison keeps it only when it holds, and
/// then yields the left operand.
pub fn vector_elem_binop(op: Operator, left: f64, right: f64) -> (f64, bool) {
    if let Some(handler) = get_arithmetic_handler(op) {
        return (handler(left, right), true);
    }
    if op.is_comparison() {
        return (left, compare(op, left, right));
    }
    (left, true)
}

/// Evaluates an operation between two scalars. Comparisons between scalars
/// are only valid with `bool`, yielding 1 or 0.
pub fn scalar_binary_operation(left: f64, right: f64, op: Operator) -> f64 {
    if op.is_comparison() {
        return if compare(op, left, right) { 1.0 } else { 0.0 };
    }
    let (value, _) = vector_elem_binop(op, left, right);
    value
}
