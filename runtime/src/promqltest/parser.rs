use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use promfix_common::duration::parse_duration;
use promfix_common::hash::Signature;
use promfix_common::value::STALE_NAN;
use promfix_parser::ast::Expr;
use promfix_parser::label::MatchOp;
use promfix_parser::parser::number::parse_number;
use promfix_parser::parser::parse;

use super::LoadError;
use crate::types::{MetricName, Point};

static PAT_LOAD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^load\s+(.+?)$").unwrap());

const NUMBER: &str = r"(?:(?i:inf|nan)|(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)";

/// `vxN` and `v±dxN`
static PAT_SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<start>[+-]?{NUMBER})(?:(?P<sign>[+-])(?P<delta>{NUMBER}))?x(?P<times>[0-9]+)$"
    ))
    .unwrap()
});

#[derive(Debug, Copy, Clone, PartialEq)]
pub(super) struct SequenceValue {
    pub value: f64,
    pub omitted: bool,
}

impl SequenceValue {
    fn new(value: f64) -> Self {
        Self {
            value,
            omitted: false,
        }
    }

    fn omitted() -> Self {
        Self {
            value: 0.0,
            omitted: true,
        }
    }
}

/// The series defined by the `load` blocks of a script, with their samples
/// already placed in time.
#[derive(Debug, Clone, Default)]
pub struct LoadCmd {
    pub(super) metrics: BTreeMap<Signature, MetricName>,
    pub(super) defs: BTreeMap<Signature, Vec<Point>>,
}

impl LoadCmd {
    /// Defines `metric` with one value per `step`, starting at the epoch.
    /// Redefining a series replaces it.
    pub(super) fn set(&mut self, metric: MetricName, values: &[SequenceValue], step: i64) {
        let hash = metric.signature();
        let points = values
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.omitted)
            .map(|(i, v)| Point::new(i as i64 * step, v.value))
            .collect();
        self.defs.insert(hash, points);
        self.metrics.insert(hash, metric);
    }

    pub fn series(&self) -> impl Iterator<Item = &MetricName> {
        self.metrics.values()
    }

    /// Number of samples not yet handed to storage.
    pub fn pending_samples(&self) -> usize {
        self.defs.values().map(Vec::len).sum()
    }
}

/// Splits a script into trimmed lines. Comment lines become blank lines.
fn get_lines(input: &str) -> Vec<&str> {
    input
        .lines()
        .map(|l| {
            let l = l.trim();
            if l.starts_with('#') {
                ""
            } else {
                l
            }
        })
        .collect()
}

/// Parses a script made of `load` blocks. A blank line ends a block.
pub(super) fn parse_script(input: &str) -> Result<LoadCmd, LoadError> {
    let lines = get_lines(input);
    let mut cmd: Option<LoadCmd> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if line.is_empty() {
            i += 1;
            continue;
        }
        let command = line.split_whitespace().next().unwrap_or_default();
        if command != "load" {
            return Err(LoadError::InvalidCommand {
                line: i + 1,
                command: line.to_string(),
            });
        }
        let step = parse_load(line, i + 1)?;
        let cmd = cmd.get_or_insert_with(LoadCmd::default);

        i += 1;
        while i < lines.len() && !lines[i].is_empty() {
            let (metric, values) = parse_series(lines[i], i + 1)?;
            cmd.set(metric, &values, step);
            i += 1;
        }
    }

    cmd.ok_or(LoadError::NoLoadCommand)
}

/// Parses the `load <step>` header and returns the step in milliseconds.
fn parse_load(line: &str, lineno: usize) -> Result<i64, LoadError> {
    let step = PAT_LOAD
        .captures(line)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| LoadError::parse(lineno, "invalid load command. (load <step:duration>)"))?
        .as_str();
    let millis = parse_duration(step).map_err(|e| {
        LoadError::parse(lineno, format!("invalid step definition {step:?}: {e}"))
    })?;
    if millis <= 0 {
        return Err(LoadError::parse(
            lineno,
            format!("step must be positive, got {step:?}"),
        ));
    }
    Ok(millis)
}

/// Parses `<series descriptor> <values>`.
pub(super) fn parse_series(
    line: &str,
    lineno: usize,
) -> Result<(MetricName, Vec<SequenceValue>), LoadError> {
    let (descriptor, rest) = split_descriptor(line);
    let metric = parse_descriptor(descriptor).map_err(|msg| LoadError::parse(lineno, msg))?;

    let mut values = vec![];
    for item in rest.split_whitespace() {
        let parsed = parse_item(item).map_err(|msg| LoadError::parse(lineno, msg))?;
        values.extend(parsed);
    }
    Ok((metric, values))
}

/// Separates the series descriptor from the values following it. Braces and
/// quoted label values may contain whitespace.
fn split_descriptor(line: &str) -> (&str, &str) {
    let mut in_braces = false;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, c) in line.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' if in_braces => quote = Some(c),
            '{' => in_braces = true,
            '}' => {
                let end = idx + c.len_utf8();
                return (&line[..end], &line[end..]);
            }
            c if c.is_whitespace() && !in_braces => return (&line[..idx], &line[idx..]),
            _ => {}
        }
    }
    (line, "")
}

fn parse_descriptor(descriptor: &str) -> Result<MetricName, String> {
    let expr = parse(descriptor).map_err(|e| format!("invalid series descriptor {descriptor:?}: {e}"))?;
    let Expr::VectorSelector(vs) = expr else {
        return Err(format!(
            "series descriptor must be a metric selector, got {descriptor:?}"
        ));
    };
    if vs.offset.is_some() || vs.at.is_some() {
        return Err(format!(
            "series descriptor may not carry modifiers: {descriptor:?}"
        ));
    }

    let mut metric = MetricName::default();
    for m in &vs.matchers {
        if !matches!(m.op, MatchOp::Equal) {
            return Err(format!(
                "only equality matchers are allowed in series descriptors, got {m}"
            ));
        }
        metric.set_label(&m.name, &m.value);
    }
    Ok(metric)
}

fn parse_item(item: &str) -> Result<Vec<SequenceValue>, String> {
    if item == "_" {
        return Ok(vec![SequenceValue::omitted()]);
    }
    if item == "stale" {
        return Ok(vec![SequenceValue::new(STALE_NAN)]);
    }
    if let Some(times) = item.strip_prefix("_x") {
        let times = parse_times(times, item)?;
        return Ok(vec![SequenceValue::omitted(); times]);
    }

    let Some(caps) = PAT_SEQUENCE.captures(item) else {
        let value = parse_value(item)?;
        return Ok(vec![SequenceValue::new(value)]);
    };

    let start = parse_value(&caps["start"])?;
    let times = parse_times(&caps["times"], item)?;
    let delta = match (caps.name("sign"), caps.name("delta")) {
        (Some(sign), Some(delta)) => {
            let d = parse_value(delta.as_str())?;
            if sign.as_str() == "-" {
                -d
            } else {
                d
            }
        }
        _ => 0.0,
    };

    // values are accumulated rather than multiplied, matching how the series
    // are written out by hand
    let mut values = Vec::with_capacity(times + 1);
    let mut current = start;
    for _ in 0..=times {
        values.push(SequenceValue::new(current));
        current += delta;
    }
    Ok(values)
}

fn parse_times(text: &str, item: &str) -> Result<usize, String> {
    text.parse::<usize>()
        .map_err(|_| format!("invalid repetition in {item:?}"))
}

fn parse_value(text: &str) -> Result<f64, String> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let v = parse_number(unsigned).map_err(|_| format!("invalid value {text:?}"))?;
    Ok(if negative { -v } else { v })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use promfix_common::value::is_stale_nan;
    use test_case::test_case;

    fn values(item: &str) -> Vec<f64> {
        parse_item(item)
            .unwrap()
            .into_iter()
            .map(|v| if v.omitted { -999.0 } else { v.value })
            .collect()
    }

    #[test_case("1", vec![1.0])]
    #[test_case("-2.5", vec![-2.5])]
    #[test_case("1e3", vec![1000.0])]
    #[test_case("_", vec![-999.0])]
    #[test_case("_x3", vec![-999.0, -999.0, -999.0])]
    #[test_case("1x3", vec![1.0, 1.0, 1.0, 1.0])]
    #[test_case("0+10x3", vec![0.0, 10.0, 20.0, 30.0])]
    #[test_case("10-2x2", vec![10.0, 8.0, 6.0])]
    #[test_case("-1+1x2", vec![-1.0, 0.0, 1.0])]
    #[test_case("1e-3x1", vec![0.001, 0.001])]
    #[test_case("1+1e1x1", vec![1.0, 11.0])]
    #[test_case("Inf", vec![f64::INFINITY])]
    #[test_case("-Infx1", vec![f64::NEG_INFINITY, f64::NEG_INFINITY])]
    fn items(item: &str, expected: Vec<f64>) {
        assert_eq!(values(item), expected);
    }

    #[test]
    fn nan_and_stale_items() {
        assert!(values("NaN")[0].is_nan());
        let stale = parse_item("stale").unwrap();
        assert!(is_stale_nan(stale[0].value));
    }

    #[test_case("abc")]
    #[test_case("1x")]
    #[test_case("_xfoo")]
    #[test_case("1+x2")]
    fn invalid_items(item: &str) {
        assert!(parse_item(item).is_err());
    }

    #[test_case("up 1 2", "up", " 1 2")]
    #[test_case(r#"up{job="a b"} 1"#, r#"up{job="a b"}"#, " 1")]
    #[test_case(r#"{__name__="up", x="}"} 1"#, r#"{__name__="up", x="}"}"#, " 1")]
    #[test_case("up", "up", "")]
    fn splits_descriptor(line: &str, descriptor: &str, rest: &str) {
        assert_eq!(split_descriptor(line), (descriptor, rest));
    }

    #[test]
    fn parses_series_line() {
        let (metric, vals) = parse_series(r#"http_requests{job="api", code="200"} 0+1x2 _"#, 3).unwrap();
        assert_eq!(
            metric,
            MetricName::from_strings(&[("__name__", "http_requests"), ("job", "api"), ("code", "200")])
        );
        assert_eq!(vals.len(), 4);
        assert!(vals[3].omitted);
    }

    #[test]
    fn rejects_non_equality_matchers() {
        let err = parse_series(r#"up{job=~"a.*"} 1"#, 2).unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 2, .. }), "{err}");
    }

    #[test]
    fn places_samples_at_steps() {
        let cmd = parse_script("load 30s\n  a 1 _ 3\n").unwrap();
        let points: Vec<&Vec<Point>> = cmd.defs.values().collect();
        assert_eq!(points, vec![&vec![Point::new(0, 1.0), Point::new(60_000, 3.0)]]);
    }

    #[test]
    fn merges_blocks_and_replaces_redefinitions() {
        let script = "
# first block
load 1m
  a 1 2
  b 1

load 10s
  a 5
";
        let cmd = parse_script(script).unwrap();
        assert_eq!(cmd.series().count(), 2);
        let a = MetricName::new("a").signature();
        assert_eq!(cmd.defs[&a], vec![Point::new(0, 5.0)]);
        assert_eq!(cmd.pending_samples(), 2);
    }

    #[test_case("", LoadError::NoLoadCommand ; "empty")]
    #[test_case("# only a comment", LoadError::NoLoadCommand ; "comment")]
    #[test_case("eval instant at 0 up", LoadError::InvalidCommand { line: 1, command: "eval instant at 0 up".to_string() } ; "eval")]
    #[test_case("load", LoadError::parse(1, "invalid load command. (load <step:duration>)") ; "no step")]
    #[test_case("LOAD 1m\n  up 1", LoadError::InvalidCommand { line: 1, command: "LOAD 1m".to_string() } ; "uppercase load")]
    fn script_errors(script: &str, expected: LoadError) {
        assert_eq!(parse_script(script).unwrap_err(), expected);
    }

    #[test]
    fn invalid_step() {
        let err = parse_script("load soon\n a 1").unwrap_err();
        assert!(err.to_string().starts_with("parse error at line 1: invalid step definition"), "{err}");
    }
}
