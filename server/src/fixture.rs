//! Model of a Prometheus rule unit-test file and its translation into a
//! load script.
//!
//! Only the input series feed the engine; rule files and expectations are
//! decoded so that real unit-test files can be served unchanged.
use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Deserialize;

use promfix_common::duration::{format_duration, parse_duration};

use crate::error::SetupError;

const DEFAULT_INTERVAL: &str = "1m";

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UnitTestFile {
    pub rule_files: Vec<String>,
    pub evaluation_interval: Option<String>,
    pub tests: Vec<UnitTest>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UnitTest {
    pub name: Option<String>,
    pub interval: Option<String>,
    pub input_series: Vec<InputSeries>,
    pub alert_rule_test: Vec<AlertRuleTest>,
    pub promql_expr_test: Vec<PromqlExprTest>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InputSeries {
    pub series: String,
    pub values: String,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlertRuleTest {
    pub eval_time: Option<String>,
    pub alertname: String,
    pub exp_alerts: Vec<ExpectedAlert>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExpectedAlert {
    pub exp_labels: BTreeMap<String, String>,
    pub exp_annotations: BTreeMap<String, String>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PromqlExprTest {
    pub expr: String,
    pub name: Option<String>,
    pub eval_time: Option<String>,
    pub exp_samples: Vec<ExpectedSample>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExpectedSample {
    pub labels: String,
    pub value: f64,
}

impl UnitTestFile {
    pub fn from_yaml(input: &str) -> Result<Self, SetupError> {
        Ok(serde_yaml::from_str(input)?)
    }

    pub fn input_series(&self) -> impl Iterator<Item = &InputSeries> {
        self.tests.iter().flat_map(|t| t.input_series.iter())
    }
}

/// Renders the input series of every test group as a load script, one
/// `load` block per group.
pub fn build_load_script(file: &UnitTestFile) -> Result<String, SetupError> {
    if file.input_series().next().is_none() {
        return Err(SetupError::NoInputSeries);
    }

    let default_interval = non_empty(&file.evaluation_interval).unwrap_or(DEFAULT_INTERVAL);

    let mut script = String::new();
    for test in file.tests.iter().filter(|t| !t.input_series.is_empty()) {
        let interval = non_empty(&test.interval).unwrap_or(default_interval);
        let step = parse_duration(interval).map_err(|source| SetupError::Interval {
            value: interval.to_string(),
            source,
        })?;

        if !script.is_empty() {
            script.push('\n');
        }
        let _ = writeln!(script, "load {}", format_duration(step));
        for is in &test.input_series {
            let _ = writeln!(script, "  {} {}", is.series.trim(), is.values.trim());
        }
    }

    Ok(script)
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
