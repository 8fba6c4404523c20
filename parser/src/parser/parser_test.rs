#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::ast::{
        AggregateModifier, AtModifier, BinaryExpr, Expr, LabelModifier, VectorMatchCardinality,
    };
    use crate::common::{Operator, ValueType};
    use crate::functions::AggregateFunction;
    use crate::label::Matcher;
    use crate::parser::{parse, ParseError};

    fn parse_or_panic(s: &str) -> Expr {
        parse(s).unwrap_or_else(|e| panic!("Error parsing expression {s}: {e}"))
    }

    fn another(s: &str, expected: &str) {
        let expr = parse_or_panic(s);
        assert_eq!(expr.to_string(), expected, "\nquery: {s}");
        // the canonical form parses back to the same tree
        assert_eq!(parse_or_panic(expected), expr, "\nquery: {expected}");
    }

    fn same(s: &str) {
        another(s, s)
    }

    fn assert_error(s: &str, expected: &str) {
        match parse(s) {
            Ok(expr) => panic!("expected error for {s}, got {expr}"),
            Err(err) => {
                let msg = err.to_string();
                assert!(
                    msg.contains(expected),
                    "\nquery: {s}\nerror: {msg}\nexpected to contain: {expected}"
                );
            }
        }
    }

    fn binary(expr: &Expr) -> &BinaryExpr {
        match expr {
            Expr::BinaryOperator(be) => be,
            _ => panic!("expected binary expression, got {expr}"),
        }
    }

    #[test]
    fn test_parse_number_expr() {
        same("1");
        same("1.23");
        same("-1");
        same("-0.5");
        same("Inf");
        same("-Inf");
        another("+Inf", "Inf");
        another("0x10", "16");
        another("1e3", "1000");
        another(".5", "0.5");
        another("+5", "5");

        // NaN never compares equal, so only the rendering is checked
        assert_eq!(parse_or_panic("nan").to_string(), "NaN");
        assert_eq!(parse_or_panic("NaN").to_string(), "NaN");
    }

    #[test]
    fn test_parse_string_expr() {
        same(r#""foo""#);
        another("'foo'", r#""foo""#);
        another(r"`a\b`", r#""a\\b""#);
        another(r#""a\nb""#, r#""a\nb""#);
    }

    #[test]
    fn test_parse_vector_selector() {
        same("foo");
        same("foo:bar:rate5m");
        same(r#"foo{bar="baz"}"#);
        same(r#"foo{bar!="baz", x=~"y.+", z!~"w"}"#);
        same(r#"{__name__="foo"}"#);
        same(r#"{job="api"}"#);
        another(r#"foo{bar="baz",}"#, r#"foo{bar="baz"}"#);
        another("foo{}", "foo");
        another(r#"foo{on="x"}"#, r#"foo{on="x"}"#);
        same("foo offset 5m");
        same("foo offset -5m");
        same("foo @ 100.000");
        another("foo @ 100", "foo @ 100.000");
        another("foo @ -1.5", "foo @ -1.500");
        same("foo @ start()");
        same("foo @ end()");
        same("foo @ 10.000 offset 1m");
        another("foo offset 1m @ 10", "foo @ 10.000 offset 1m");
    }

    #[test]
    fn test_vector_selector_matchers() {
        let expr = parse_or_panic(r#"http_requests_total{code=~"5..", method!="GET"}"#);
        let Expr::VectorSelector(vs) = expr else {
            panic!("expected vector selector");
        };
        assert_eq!(vs.name.as_deref(), Some("http_requests_total"));
        assert_eq!(vs.metric_name(), Some("http_requests_total"));
        assert_eq!(
            vs.matchers,
            vec![
                Matcher::equal("__name__", "http_requests_total"),
                Matcher::regex_equal("code", "5..").unwrap(),
                Matcher::not_equal("method", "GET"),
            ]
        );
    }

    #[test]
    fn test_parse_matrix_selector() {
        same("foo[5m]");
        same(r#"foo{a="b"}[1h30m]"#);
        same("foo[5m] offset 1m");
        same("foo[5m] @ 100.000");
        another("foo[5m] offset -1m", "foo[5m] offset -1m");

        let Expr::MatrixSelector(ms) = parse_or_panic("foo[5m] offset 1m") else {
            panic!("expected matrix selector");
        };
        assert_eq!(ms.range, 300_000);
        assert_eq!(ms.selector.offset, Some(60_000));
    }

    #[test]
    fn test_parse_subquery() {
        same("foo[5m:1m]");
        same("foo[5m:]");
        same("rate(foo[1m])[1h:5m]");
        same("(a + b)[10m:1m] offset 5m");
        same("sum(foo)[5m:] @ end()");

        let Expr::Subquery(sq) = parse_or_panic("foo[5m:]") else {
            panic!("expected subquery");
        };
        assert_eq!(sq.range, 300_000);
        assert_eq!(sq.step, None);
        assert_eq!(sq.expr.value_type(), ValueType::InstantVector);

        let Expr::Subquery(sq) = parse_or_panic("foo[2m:30s]") else {
            panic!("expected subquery");
        };
        assert_eq!(sq.range, 120_000);
        assert_eq!(sq.step, Some(30_000));
        same("sum_over_time(foo[2m:30s])");
        same("max_over_time(job:up:sum[3m:1m])");
    }

    #[test]
    fn test_parse_function_call() {
        same("rate(foo[5m])");
        same("abs(foo)");
        same("time()");
        same("vector(1)");
        same("round(foo, 5)");
        same("round(foo)");
        same("day_of_week()");
        same("clamp(foo, 0, 1)");
        same("histogram_quantile(0.9, rate(foo_bucket[5m]))");
        same(r#"label_replace(up, "dst", "$1", "src", "(.*)")"#);
        same(r#"label_join(up, "dst", ",", "a", "b", "c")"#);
        same("quantile_over_time(0.5, foo[10m])");
        same("predict_linear(foo[10m], 3600)");
        another("abs(foo,)", "abs(foo)");
    }

    #[test]
    fn test_parse_aggregation() {
        same("sum(foo)");
        same("sum by (job) (foo)");
        same("sum without (instance) (foo)");
        same("sum by () (foo)");
        same("topk(3, foo)");
        same("topk by (job) (3, foo)");
        same("quantile(0.9, foo)");
        same(r#"count_values("value", foo)"#);
        another("sum(foo) by (job)", "sum by (job) (foo)");
        another("SUM(foo) BY (job)", "sum by (job) (foo)");
        another("sum by (job,) (foo)", "sum by (job) (foo)");
        another("sum by (on, group_left) (foo)", "sum by (on, group_left) (foo)");

        let Expr::Aggregation(ae) = parse_or_panic("topk without (a) (5, foo)") else {
            panic!("expected aggregation");
        };
        assert_eq!(ae.function, AggregateFunction::Topk);
        assert_eq!(ae.modifier, Some(AggregateModifier::Without(vec!["a".to_string()])));
        assert_eq!(ae.param.as_deref(), Some(&Expr::number(5.0)));
    }

    #[test]
    fn test_parse_binary_expr() {
        same("a + b");
        same("a - b * c");
        same("a > bool 1");
        same("1 == bool 1");
        same("a and b");
        same("a or b unless c");
        same("a + on (job) b");
        same("a + ignoring (instance) b");
        same("a * on (job) group_left (env) b");
        another("a * on (job) group_right b", "a * on (job) group_right () b");
        another("a * on(job) group_left() b", "a * on (job) group_left () b");
        same("a atan2 b");
        same("(a + b) * c");
        another("A AND b", "A and b");
    }

    #[test]
    fn test_operator_precedence() {
        // a + b * c == a + (b * c)
        let expr = parse_or_panic("a + b * c");
        let be = binary(&expr);
        assert_eq!(be.op, Operator::Add);
        assert_eq!(binary(&be.right).op, Operator::Mul);

        // a * b + c == (a * b) + c
        let expr = parse_or_panic("a * b + c");
        let be = binary(&expr);
        assert_eq!(be.op, Operator::Add);
        assert_eq!(binary(&be.left).op, Operator::Mul);

        // left associative
        let expr = parse_or_panic("a - b - c");
        let be = binary(&expr);
        assert_eq!(binary(&be.left).op, Operator::Sub);

        // ^ is right associative
        let expr = parse_or_panic("2 ^ 3 ^ 2");
        let be = binary(&expr);
        assert_eq!(be.op, Operator::Pow);
        assert_eq!(binary(&be.right).op, Operator::Pow);

        // or < and < comparison < +
        let expr = parse_or_panic("a or b and c > d + e");
        let be = binary(&expr);
        assert_eq!(be.op, Operator::Or);
        let and = binary(&be.right);
        assert_eq!(and.op, Operator::And);
        let gt = binary(&and.right);
        assert_eq!(gt.op, Operator::Gt);
        assert_eq!(binary(&gt.right).op, Operator::Add);
    }

    #[test]
    fn test_unary_expr() {
        // -2 ^ 2 == -(2 ^ 2)
        let expr = parse_or_panic("-2 ^ 2");
        let Expr::Unary(u) = &expr else {
            panic!("expected unary expression, got {expr}");
        };
        assert_eq!(binary(&u.expr).op, Operator::Pow);

        // unary minus binds tighter than *
        let expr = parse_or_panic("-a * b");
        let be = binary(&expr);
        assert_eq!(be.op, Operator::Mul);
        assert!(matches!(*be.left, Expr::Unary(_)));

        assert_eq!(parse_or_panic("-1"), Expr::number(-1.0));
        assert_eq!(parse_or_panic("- -1"), Expr::number(1.0));
        same("-foo");
        same("-(1)");
        same("2 ^ -1");
    }

    #[test]
    fn test_bin_modifiers() {
        let expr = parse_or_panic("a / on (x, y) group_left (z) b");
        let be = binary(&expr);
        assert_eq!(
            be.modifier.matching,
            Some(LabelModifier::On(vec!["x".to_string(), "y".to_string()]))
        );
        assert_eq!(
            be.modifier.card,
            VectorMatchCardinality::ManyToOne(vec!["z".to_string()])
        );

        let expr = parse_or_panic("a and ignoring (x) b");
        let be = binary(&expr);
        assert_eq!(be.modifier.card, VectorMatchCardinality::ManyToMany);
    }

    #[test]
    fn test_at_modifier() {
        let Expr::VectorSelector(vs) = parse_or_panic("foo @ 1.5") else {
            panic!("expected vector selector");
        };
        assert_eq!(vs.at, Some(AtModifier::Timestamp(1500)));
    }

    #[test]
    fn test_value_types() {
        assert_eq!(parse_or_panic("1 + 2").value_type(), ValueType::Scalar);
        assert_eq!(parse_or_panic("foo + 2").value_type(), ValueType::InstantVector);
        assert_eq!(parse_or_panic("scalar(foo)").value_type(), ValueType::Scalar);
        assert_eq!(parse_or_panic("foo[5m]").value_type(), ValueType::RangeVector);
        assert_eq!(parse_or_panic(r#""x""#).value_type(), ValueType::String);
    }

    #[test]
    fn test_parse_errors() {
        assert_error("", "no expression found in input");
        assert_error("foo{", "unexpected end of input");
        assert_error(r#"foo{a="b}"#, "unterminated string literal");
        assert_error("foo $ bar", "unexpected character");
        assert_error("foo bar", "unexpected");
        assert_error("(foo", "unexpected end of input");
        assert_error(r#"{a=""}"#, "vector selector must contain at least one non-empty matcher");
        assert_error(r#"{a=~".*"}"#, "vector selector must contain at least one non-empty matcher");
        assert_error("{}", "vector selector must contain at least one non-empty matcher");
        assert_error(r#"foo{__name__="bar"}"#, "metric name must not be set twice");
        assert_error(r#"foo{a=~"("}"#, "invalid regex");
        assert_error("foo[5m][5m]", "ranges only allowed for vector selectors");
        assert_error("(foo)[5m]", "ranges only allowed for vector selectors");
        assert_error("foo offset 1m[5m]", "no offset modifiers allowed before range");
        assert_error("foo offset 1m offset 2m", "offset may not be set multiple times");
        assert_error("foo @ 1 @ 2", "may not be set multiple times");
        assert_error("1 offset 1m", "offset modifier must be preceded by");
        assert_error("sum(foo) @ 1", "@ modifier must be preceded by");
        assert_error("foo[0s]", "duration must be greater than 0");
        assert_error("foo[5m:][1m]", "ranges only allowed for vector selectors");
        assert_error("foo[5m][1m:]", "subquery is only allowed on instant vector");
        assert_error("foo @ bar()", "invalid @ modifier");
    }

    #[test]
    fn test_function_errors() {
        assert_error("nope(foo)", r#"unknown function with name "nope""#);
        assert_error("rate(foo)", r#"expected type range vector in call to function "rate", got instant vector"#);
        assert_error("abs(foo[5m])", r#"expected type instant vector in call to function "abs", got range vector"#);
        assert_error("abs()", r#"expected 1 argument(s) in call to "abs", got 0"#);
        assert_error("round(foo, 1, 2)", r#"expected at most 2 argument(s) in call to "round", got 3"#);
        assert_error("label_join(foo)", r#"expected at least 3 argument(s) in call to "label_join", got 1"#);
        assert_error("label_replace(foo, 1, 2, 3, 4)", "expected type string");
        assert_error("histogram_quantile(foo, bar)", "expected type scalar");
    }

    #[test]
    fn test_aggregation_errors() {
        assert_error("sum(foo, bar)", "wrong number of arguments for aggregate expression provided, expected 1, got 2");
        assert_error("topk(foo)", "expected 2, got 1");
        assert_error("sum(foo[5m])", "expected type instant vector in aggregation expression, got range vector");
        assert_error("topk(foo, bar)", "expected type scalar in aggregation parameter, got instant vector");
        assert_error("count_values(1, foo)", "expected type string in aggregation parameter, got scalar");
        assert_error("sum by (a) (foo) by (b)", "grouping may be given only once");
        assert_error("sum by (a:b) (foo)", "invalid label name");
    }

    #[test]
    fn test_binary_errors() {
        assert_error("1 > 2", "comparisons between scalars must use BOOL modifier");
        assert_error("foo + bool bar", "bool modifier can only be used on comparison operators");
        assert_error("1 and foo", r#"set operator "and" not allowed in binary scalar expression"#);
        assert_error("foo and on (a) group_left bar", r#"no grouping allowed for "and" operation"#);
        assert_error("1 + on (a) foo", "vector matching only allowed between instant vectors");
        assert_error("foo[5m] + 1", "binary expression must contain only scalar and instant vector types");
        assert_error(r#""a" + 1"#, "binary expression must contain only scalar and instant vector types");
        assert_error("foo * on (a) group_left (a) bar", r#"label "a" must not occur in ON and GROUP clause at once"#);
        assert_error("-foo[5m]", "unary expression only allowed on expressions of type scalar or instant vector");
    }

    #[test]
    fn test_error_variants() {
        assert_eq!(parse("foo{").unwrap_err(), ParseError::UnexpectedEOF);
        assert!(matches!(parse("foo bar").unwrap_err(), ParseError::InvalidToken(_)));
        assert!(matches!(parse("rate(foo)").unwrap_err(), ParseError::TypeError(_)));
        assert!(matches!(parse("abs()").unwrap_err(), ParseError::InvalidArgCount(_)));
    }
}
