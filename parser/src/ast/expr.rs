use std::fmt;
use std::fmt::{Display, Formatter};

use promfix_common::duration::format_duration;
use promfix_common::format::quote;

use crate::common::{Operator, ValueType};
use crate::functions::{AggregateFunction, BuiltinFunction};
use crate::label::Matcher;

/// Expression Trees
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A number literal such as `1.5` or `-Inf`.
    NumberLiteral(NumberLiteral),

    /// A quoted string, e.g. the replacement argument of `label_replace`.
    StringLiteral(String),

    /// `foo{bar="baz"}`
    VectorSelector(VectorSelector),

    /// `foo{bar="baz"}[5m]`
    MatrixSelector(MatrixSelector),

    /// `rate(foo[1m])[1h:5m]`
    Subquery(SubqueryExpr),

    Paren(ParensExpr),

    /// Unary negation. Unary plus is dropped while parsing.
    Unary(UnaryExpr),

    BinaryOperator(BinaryExpr),

    Function(FunctionExpr),

    Aggregation(AggregationExpr),
}

impl Expr {
    pub fn value_type(&self) -> ValueType {
        match self {
            Expr::NumberLiteral(_) => ValueType::Scalar,
            Expr::StringLiteral(_) => ValueType::String,
            Expr::VectorSelector(_) => ValueType::InstantVector,
            Expr::MatrixSelector(_) | Expr::Subquery(_) => ValueType::RangeVector,
            Expr::Paren(p) => p.expr.value_type(),
            Expr::Unary(u) => u.expr.value_type(),
            Expr::BinaryOperator(be) => be.return_type(),
            Expr::Function(fe) => fe.function.return_type(),
            Expr::Aggregation(_) => ValueType::InstantVector,
        }
    }

    pub fn number(value: f64) -> Self {
        Expr::NumberLiteral(NumberLiteral::new(value))
    }

    pub fn string_literal(s: &str) -> Self {
        Expr::StringLiteral(s.to_string())
    }

    /// Strips any number of enclosing parentheses.
    pub fn unwrap_parens(&self) -> &Expr {
        let mut expr = self;
        while let Expr::Paren(p) = expr {
            expr = &p.expr;
        }
        expr
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::NumberLiteral(n) => write!(f, "{n}"),
            Expr::StringLiteral(s) => write!(f, "{}", quote(s)),
            Expr::VectorSelector(vs) => write!(f, "{vs}"),
            Expr::MatrixSelector(ms) => write!(f, "{ms}"),
            Expr::Subquery(sq) => write!(f, "{sq}"),
            Expr::Paren(p) => write!(f, "({})", p.expr),
            Expr::Unary(u) => write!(f, "-{}", u.expr),
            Expr::BinaryOperator(be) => write!(f, "{be}"),
            Expr::Function(fe) => write!(f, "{fe}"),
            Expr::Aggregation(ae) => write!(f, "{ae}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberLiteral {
    pub value: f64,
}

impl NumberLiteral {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Display for NumberLiteral {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.value.is_nan() {
            write!(f, "NaN")
        } else if self.value.is_infinite() {
            let sign = if self.value.is_sign_negative() { "-" } else { "" };
            write!(f, "{sign}Inf")
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// The `@` modifier of a selector or subquery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtModifier {
    /// A fixed evaluation time in milliseconds.
    Timestamp(i64),
    Start,
    End,
}

impl Display for AtModifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AtModifier::Timestamp(ts) => write!(f, "@ {:.3}", *ts as f64 / 1e3),
            AtModifier::Start => write!(f, "@ start()"),
            AtModifier::End => write!(f, "@ end()"),
        }
    }
}

fn write_modifiers(f: &mut Formatter<'_>, offset: Option<i64>, at: Option<AtModifier>) -> fmt::Result {
    if let Some(at) = at {
        write!(f, " {at}")?;
    }
    if let Some(offset) = offset {
        write!(f, " offset {}", format_duration(offset))?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorSelector {
    /// The metric name when given outside the braces.
    pub name: Option<String>,
    /// Every matcher of the selector, including the one for the metric name.
    pub matchers: Vec<Matcher>,
    /// Offset in milliseconds. Negative values look forward in time.
    pub offset: Option<i64>,
    pub at: Option<AtModifier>,
}

impl VectorSelector {
    pub fn new(name: Option<String>, matchers: Vec<Matcher>) -> Self {
        Self {
            name,
            matchers,
            offset: None,
            at: None,
        }
    }

    pub fn metric_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or_else(|| crate::label::metric_name_from_matchers(&self.matchers))
    }
}

impl Display for VectorSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut skipped_name = false;
        let mut filters = Vec::with_capacity(self.matchers.len());
        for m in &self.matchers {
            if !skipped_name
                && m.is_metric_name_filter()
                && self.name.as_deref() == Some(m.value.as_str())
            {
                skipped_name = true;
                continue;
            }
            filters.push(m.to_string());
        }
        if let Some(name) = &self.name {
            write!(f, "{name}")?;
        }
        if !filters.is_empty() || self.name.is_none() {
            write!(f, "{{{}}}", filters.join(", "))?;
        }
        write_modifiers(f, self.offset, self.at)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSelector {
    pub selector: VectorSelector,
    /// Range in milliseconds.
    pub range: i64,
}

impl Display for MatrixSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // the selector's modifiers are printed after the range
        let mut inner = self.selector.clone();
        inner.offset = None;
        inner.at = None;
        write!(f, "{inner}[{}]", format_duration(self.range))?;
        write_modifiers(f, self.selector.offset, self.selector.at)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryExpr {
    pub expr: Box<Expr>,
    /// Range in milliseconds.
    pub range: i64,
    /// Resolution step in milliseconds. `None` means the engine default.
    pub step: Option<i64>,
    pub offset: Option<i64>,
    pub at: Option<AtModifier>,
}

impl Display for SubqueryExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let step = self.step.map(format_duration).unwrap_or_default();
        write!(f, "{}[{}:{}]", self.expr, format_duration(self.range), step)?;
        write_modifiers(f, self.offset, self.at)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParensExpr {
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub expr: Box<Expr>,
}

/// `on(…)` / `ignoring(…)` label lists of a binary operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelModifier {
    On(Vec<String>),
    Ignoring(Vec<String>),
}

impl LabelModifier {
    pub fn labels(&self) -> &[String] {
        match self {
            LabelModifier::On(labels) | LabelModifier::Ignoring(labels) => labels,
        }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, LabelModifier::On(_))
    }
}

/// VectorMatchCardinality describes the cardinality relationship
/// of two Vectors in a binary operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VectorMatchCardinality {
    #[default]
    OneToOne,
    /// `group_left(…)`, carrying the labels to copy from the "one" side.
    ManyToOne(Vec<String>),
    /// `group_right(…)`
    OneToMany(Vec<String>),
    ManyToMany,
}

impl VectorMatchCardinality {
    pub fn labels(&self) -> &[String] {
        match self {
            VectorMatchCardinality::ManyToOne(labels)
            | VectorMatchCardinality::OneToMany(labels) => labels,
            _ => &[],
        }
    }

    pub fn is_grouping(&self) -> bool {
        matches!(
            self,
            VectorMatchCardinality::ManyToOne(_) | VectorMatchCardinality::OneToMany(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinModifier {
    pub return_bool: bool,
    pub matching: Option<LabelModifier>,
    pub card: VectorMatchCardinality,
}

impl BinModifier {
    pub fn is_default(&self) -> bool {
        !self.return_bool && self.matching.is_none() && self.card == VectorMatchCardinality::OneToOne
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: Operator,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub modifier: BinModifier,
}

impl BinaryExpr {
    pub fn return_type(&self) -> ValueType {
        if self.left.value_type().is_scalar() && self.right.value_type().is_scalar() {
            ValueType::Scalar
        } else {
            ValueType::InstantVector
        }
    }

    pub fn return_bool(&self) -> bool {
        self.modifier.return_bool
    }
}

impl Display for BinaryExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.left, self.op)?;
        if self.modifier.return_bool {
            write!(f, " bool")?;
        }
        match &self.modifier.matching {
            Some(LabelModifier::On(labels)) => write!(f, " on ({})", labels.join(", "))?,
            Some(LabelModifier::Ignoring(labels)) => {
                write!(f, " ignoring ({})", labels.join(", "))?
            }
            None => {}
        }
        match &self.modifier.card {
            VectorMatchCardinality::ManyToOne(labels) => {
                write!(f, " group_left ({})", labels.join(", "))?
            }
            VectorMatchCardinality::OneToMany(labels) => {
                write!(f, " group_right ({})", labels.join(", "))?
            }
            _ => {}
        }
        write!(f, " {}", self.right)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpr {
    pub function: BuiltinFunction,
    pub args: Vec<Expr>,
}

impl FunctionExpr {
    pub fn name(&self) -> &'static str {
        self.function.name()
    }
}

impl Display for FunctionExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name())?;
        write_args(f, self.args.iter())?;
        write!(f, ")")
    }
}

fn write_args<'a>(f: &mut Formatter<'_>, args: impl Iterator<Item = &'a Expr>) -> fmt::Result {
    for (i, arg) in args.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

/// `by (…)` / `without (…)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateModifier {
    By(Vec<String>),
    Without(Vec<String>),
}

impl Display for AggregateModifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AggregateModifier::By(labels) => write!(f, "by ({})", labels.join(", ")),
            AggregateModifier::Without(labels) => write!(f, "without ({})", labels.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationExpr {
    pub function: AggregateFunction,
    pub expr: Box<Expr>,
    /// The leading argument of `topk`, `bottomk`, `quantile` and `count_values`.
    pub param: Option<Box<Expr>>,
    pub modifier: Option<AggregateModifier>,
}

impl Display for AggregationExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.function)?;
        if let Some(modifier) = &self.modifier {
            write!(f, " {modifier} ")?;
        }
        write!(f, "(")?;
        if let Some(param) = &self.param {
            write!(f, "{param}, ")?;
        }
        write!(f, "{})", self.expr)
    }
}
