use std::fmt;
use std::hash::{Hash, Hasher};

use regex::Regex;

use promfix_common::format::quote;
use promfix_common::label::METRIC_NAME_LABEL;
use promfix_common::regex_util::compile_anchored_regex;

use crate::parser::{ParseError, ParseResult};

// NOTE: https://github.com/rust-lang/regex/issues/668
#[derive(Debug, Default, Clone)]
pub enum MatchOp {
    #[default]
    Equal,
    NotEqual,
    Re(Regex),
    NotRe(Regex),
}

impl MatchOp {
    pub fn is_negative(&self) -> bool {
        matches!(self, MatchOp::NotEqual | MatchOp::NotRe(_))
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Self::NotRe(_) | Self::Re(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOp::Equal => "=",
            MatchOp::NotEqual => "!=",
            MatchOp::Re(_) => "=~",
            MatchOp::NotRe(_) => "!~",
        }
    }
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for MatchOp {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MatchOp::Equal, MatchOp::Equal) => true,
            (MatchOp::NotEqual, MatchOp::NotEqual) => true,
            (MatchOp::Re(s), MatchOp::Re(o)) => s.as_str().eq(o.as_str()),
            (MatchOp::NotRe(s), MatchOp::NotRe(o)) => s.as_str().eq(o.as_str()),
            _ => false,
        }
    }
}

impl Eq for MatchOp {}

impl Hash for MatchOp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            MatchOp::Equal => "eq".hash(state),
            MatchOp::NotEqual => "ne".hash(state),
            MatchOp::Re(s) => format!("re:{}", s.as_str()).hash(state),
            MatchOp::NotRe(s) => format!("nre:{}", s.as_str()).hash(state),
        }
    }
}

/// A label matcher such as `job="api"` or `path=~"/v1/.*"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Matcher {
    pub op: MatchOp,
    pub name: String,
    pub value: String,
}

impl Matcher {
    pub fn new(op: MatchOp, name: &str, value: &str) -> Self {
        Self {
            op,
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn equal(name: &str, value: &str) -> Self {
        Self::new(MatchOp::Equal, name, value)
    }

    pub fn not_equal(name: &str, value: &str) -> Self {
        Self::new(MatchOp::NotEqual, name, value)
    }

    /// Builds a regex matcher. The pattern is anchored at both ends.
    pub fn regex_equal(name: &str, value: &str) -> ParseResult<Self> {
        let re = compile(value)?;
        Ok(Self::new(MatchOp::Re(re), name, value))
    }

    pub fn regex_not_equal(name: &str, value: &str) -> ParseResult<Self> {
        let re = compile(value)?;
        Ok(Self::new(MatchOp::NotRe(re), name, value))
    }

    /// Returns true if the matcher accepts `s`. A label missing from a
    /// series is matched as the empty string.
    pub fn matches(&self, s: &str) -> bool {
        match &self.op {
            MatchOp::Equal => self.value == s,
            MatchOp::NotEqual => self.value != s,
            MatchOp::Re(re) => re.is_match(s),
            MatchOp::NotRe(re) => !re.is_match(s),
        }
    }

    pub fn is_metric_name_filter(&self) -> bool {
        self.name == METRIC_NAME_LABEL && self.op == MatchOp::Equal
    }
}

fn compile(value: &str) -> ParseResult<Regex> {
    compile_anchored_regex(value).map_err(|e| ParseError::InvalidRegex(e.to_string()))
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, self.op, quote(&self.value))
    }
}

/// Returns the value of the first `__name__="…"` matcher, if any.
pub fn metric_name_from_matchers(matchers: &[Matcher]) -> Option<&str> {
    matchers
        .iter()
        .find(|m| m.is_metric_name_filter())
        .map(|m| m.value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_matchers() {
        let m = Matcher::equal("job", "api");
        assert!(m.matches("api"));
        assert!(!m.matches("db"));
        assert!(!m.matches(""));

        let m = Matcher::not_equal("job", "api");
        assert!(!m.matches("api"));
        assert!(m.matches(""));
    }

    #[test]
    fn regex_matchers_are_anchored() {
        let m = Matcher::regex_equal("path", "/api/.*").unwrap();
        assert!(m.matches("/api/v1"));
        assert!(!m.matches("/x/api/v1"));

        let m = Matcher::regex_not_equal("code", "5..").unwrap();
        assert!(m.matches("200"));
        assert!(!m.matches("503"));
        assert!(m.matches("5030"));
    }

    #[test]
    fn invalid_regex() {
        assert!(matches!(
            Matcher::regex_equal("a", "(").unwrap_err(),
            ParseError::InvalidRegex(_)
        ));
    }

    #[test]
    fn display() {
        assert_eq!(Matcher::equal("job", "a\"b").to_string(), r#"job="a\"b""#);
        assert_eq!(
            Matcher::regex_not_equal("job", "x|y").unwrap().to_string(),
            r#"job!~"x|y""#
        );
    }
}
