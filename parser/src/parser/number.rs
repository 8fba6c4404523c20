use promfix_common::duration::parse_duration;

use crate::parser::{ParseError, ParseResult};

/// Parses the text of a number token: decimal, float, hex, `NaN` or `Inf`.
pub fn parse_number(text: &str) -> ParseResult<f64> {
    if text.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    if text.eq_ignore_ascii_case("inf") {
        return Ok(f64::INFINITY);
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .map_err(|_| ParseError::InvalidNumber(text.to_string()));
    }
    text.parse::<f64>()
        .map_err(|_| ParseError::InvalidNumber(text.to_string()))
}

/// Parses a duration token into milliseconds. Ranges and steps must be positive.
pub fn parse_positive_duration(text: &str) -> ParseResult<i64> {
    let ms = parse_duration(text).map_err(|e| ParseError::InvalidDuration(e.to_string()))?;
    if ms <= 0 {
        return Err(ParseError::InvalidDuration(format!(
            "duration must be greater than 0: {text}"
        )));
    }
    Ok(ms)
}

/// Removes the quotes of a string token and resolves its escape sequences.
/// Backtick strings are raw.
pub fn unquote(text: &str) -> ParseResult<String> {
    let invalid = |msg: &str| ParseError::InvalidString(format!("{msg} in {text}"));

    let quote = text.chars().next().ok_or_else(|| invalid("empty string"))?;
    if text.len() < 2 || !text.ends_with(quote) || !matches!(quote, '"' | '\'' | '`') {
        return Err(invalid("missing quotes"));
    }
    let body = &text[1..text.len() - 1];
    if quote == '`' {
        return Ok(body.to_string());
    }

    let mut res = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            res.push(c);
            continue;
        }
        let esc = chars.next().ok_or_else(|| invalid("trailing backslash"))?;
        match esc {
            'a' => res.push('\u{07}'),
            'b' => res.push('\u{08}'),
            'f' => res.push('\u{0c}'),
            'n' => res.push('\n'),
            'r' => res.push('\r'),
            't' => res.push('\t'),
            'v' => res.push('\u{0b}'),
            '\\' | '\'' | '"' => res.push(esc),
            'x' | 'u' | 'U' => {
                let len = match esc {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.by_ref().take(len).collect();
                if digits.len() != len {
                    return Err(invalid("truncated escape sequence"));
                }
                let code = u32::from_str_radix(&digits, 16)
                    .map_err(|_| invalid("invalid escape sequence"))?;
                let ch = char::from_u32(code).ok_or_else(|| invalid("invalid code point"))?;
                res.push(ch);
            }
            '0'..='7' => {
                let mut code = esc.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    let digit = chars
                        .next()
                        .and_then(|c| c.to_digit(8))
                        .ok_or_else(|| invalid("invalid octal escape"))?;
                    code = code * 8 + digit;
                }
                let ch = char::from_u32(code).ok_or_else(|| invalid("invalid code point"))?;
                res.push(ch);
            }
            _ => return Err(invalid("unknown escape sequence")),
        }
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1", 1.0; "integer")]
    #[test_case("1.5", 1.5; "float")]
    #[test_case(".5", 0.5; "leading dot")]
    #[test_case("1.", 1.0; "trailing dot")]
    #[test_case("1e3", 1000.0; "exponent")]
    #[test_case("2E-2", 0.02; "negative exponent")]
    #[test_case("0x1f", 31.0; "hex lower")]
    #[test_case("0XFF", 255.0; "hex upper")]
    #[test_case("Inf", f64::INFINITY; "inf mixed case")]
    #[test_case("inf", f64::INFINITY; "inf lower case")]
    fn numbers(text: &str, expected: f64) {
        assert_eq!(parse_number(text).unwrap(), expected);
    }

    #[test]
    fn nan() {
        assert!(parse_number("NaN").unwrap().is_nan());
        assert!(parse_number("nan").unwrap().is_nan());
    }

    #[test_case("5m", 300_000)]
    #[test_case("1h30m", 5_400_000)]
    fn durations(text: &str, expected: i64) {
        assert_eq!(parse_positive_duration(text).unwrap(), expected);
    }

    #[test]
    fn zero_duration_is_rejected() {
        assert!(parse_positive_duration("0s").is_err());
    }

    #[test_case(r#""plain""#, "plain")]
    #[test_case(r#""a\"b""#, "a\"b")]
    #[test_case(r#"'it\'s'"#, "it's")]
    #[test_case(r#""tab\there""#, "tab\there")]
    #[test_case(r#""\x41é\101""#, "AéA")]
    #[test_case(r#""\\d+""#, "\\d+")]
    #[test_case(r"`raw\d+`", r"raw\d+")]
    fn strings(text: &str, expected: &str) {
        assert_eq!(unquote(text).unwrap(), expected);
    }

    #[test_case(r#""\q""#; "unknown escape")]
    #[test_case(r#""\x4""#; "short hex escape")]
    #[test_case("\""; "lone quote")]
    fn invalid_strings(text: &str) {
        assert!(unquote(text).is_err());
    }
}
