use std::fmt;
use std::fmt::Formatter;

use thiserror::Error;

const NAMES: [&str; 7] = ["y", "w", "d", "h", "m", "s", "ms"];
const SIZES_MS: [i64; 7] = [
    86_400_000 * 365,
    86_400_000 * 7,
    86_400_000,
    3_600_000,
    60_000,
    1_000,
    1,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("empty duration string")]
    Empty,
    #[error("not a valid duration string: {0:?}")]
    Invalid(String),
    #[error("duration out of range: {0:?}")]
    Overflow(String),
}

/// Parses a Prometheus duration such as `5m`, `1h30m` or `250ms` into
/// milliseconds. Units must appear in decreasing order, each at most once.
pub fn parse_duration(s: &str) -> Result<i64, DurationError> {
    if s.is_empty() {
        return Err(DurationError::Empty);
    }
    if s == "0" {
        return Ok(0);
    }

    let invalid = || DurationError::Invalid(s.to_string());
    let bytes = s.as_bytes();
    let mut pos = 0;
    let mut last_unit: Option<usize> = None;
    let mut total: i64 = 0;

    while pos < bytes.len() {
        let start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if start == pos {
            return Err(invalid());
        }
        let n: i64 = s[start..pos]
            .parse()
            .map_err(|_| DurationError::Overflow(s.to_string()))?;

        let unit_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        let unit = &s[unit_start..pos];
        let idx = NAMES.iter().position(|u| *u == unit).ok_or_else(invalid)?;
        if let Some(last) = last_unit {
            if idx <= last {
                return Err(invalid());
            }
        }
        last_unit = Some(idx);

        total = n
            .checked_mul(SIZES_MS[idx])
            .and_then(|v| total.checked_add(v))
            .ok_or_else(|| DurationError::Overflow(s.to_string()))?;
    }

    Ok(total)
}

pub fn fmt_duration_ms(f: &mut Formatter<'_>, v: i64) -> fmt::Result {
    if v == 0 {
        return write!(f, "0s");
    }
    if v < 0 {
        write!(f, "-")?;
    }
    let mut rest = v.unsigned_abs();
    for (size, name) in SIZES_MS.iter().zip(NAMES.iter()) {
        let size = *size as u64;
        let whole = rest / size;
        if whole > 0 {
            write!(f, "{whole}{name}")?;
            rest %= size;
        }
    }
    Ok(())
}

/// Renders `ms` in the shortest Prometheus duration form, e.g. `1h30m`.
pub fn format_duration(ms: i64) -> String {
    struct Wrapper(i64);

    impl fmt::Display for Wrapper {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            fmt_duration_ms(f, self.0)
        }
    }

    Wrapper(ms).to_string()
}
