use std::fmt;

use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::parser::tokens::Token;
use crate::parser::ParseError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Add,
    And,
    Atan2,
    Div,
    Eql,
    Mod,
    Mul,
    Pow,
    Sub,
    Gt,
    Gte,
    Lt,
    Lte,
    NotEq,
    Or,
    Unless,
}

pub static BINARY_OPS_MAP: phf::Map<&'static str, Operator> = phf_map! {
    "+" => Operator::Add,
    "-" => Operator::Sub,
    "*" => Operator::Mul,
    "/" => Operator::Div,
    "%" => Operator::Mod,
    "^" => Operator::Pow,
    "atan2" => Operator::Atan2,

    // cmp ops
    "==" => Operator::Eql,
    "!=" => Operator::NotEq,
    "<" => Operator::Lt,
    ">" => Operator::Gt,
    "<=" => Operator::Lte,
    ">=" => Operator::Gte,

    // logic set ops
    "and" => Operator::And,
    "or" => Operator::Or,
    "unless" => Operator::Unless,
};

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum BinaryOpKind {
    Arithmetic,
    Comparison,
    Logical,
}

pub type Precedence = usize;

impl Operator {
    // See https://prometheus.io/docs/prometheus/latest/querying/operators/#binary-operator-precedence
    #[inline]
    pub fn precedence(self) -> Precedence {
        use Operator::*;

        match self {
            Or => 10,
            And | Unless => 20,
            Eql | Gte | Gt | Lt | Lte | NotEq => 30,
            Add | Sub => 40,
            Mul | Div | Mod | Atan2 => 50,
            Pow => 60,
        }
    }

    #[inline]
    pub fn kind(self) -> BinaryOpKind {
        use BinaryOpKind::*;
        use Operator::*;

        match self {
            Add | Sub | Mul | Div | Mod | Pow | Atan2 => Arithmetic,
            Eql | Gte | Gt | Lt | Lte | NotEq => Comparison,
            And | Unless | Or => Logical,
        }
    }

    pub fn is_right_associative(self) -> bool {
        self == Operator::Pow
    }

    pub fn is_comparison(&self) -> bool {
        self.kind() == BinaryOpKind::Comparison
    }

    #[inline]
    pub fn is_set_operator(&self) -> bool {
        self.kind() == BinaryOpKind::Logical
    }

    pub fn as_str(&self) -> &'static str {
        use Operator::*;
        match self {
            Add => "+",
            And => "and",
            Atan2 => "atan2",
            Div => "/",
            Eql => "==",
            Gt => ">",
            Gte => ">=",
            Mod => "%",
            Mul => "*",
            Lt => "<",
            Lte => "<=",
            NotEq => "!=",
            Or => "or",
            Pow => "^",
            Sub => "-",
            Unless => "unless",
        }
    }
}

impl TryFrom<&str> for Operator {
    type Error = ParseError;

    fn try_from(op: &str) -> Result<Self, Self::Error> {
        match BINARY_OPS_MAP.get(op.to_lowercase().as_str()) {
            Some(op) => Ok(*op),
            None => Err(ParseError::General(format!("unknown binary op {op}"))),
        }
    }
}

impl TryFrom<Token> for Operator {
    type Error = ParseError;

    fn try_from(token: Token) -> Result<Self, Self::Error> {
        match token {
            Token::OpAnd => Ok(Operator::And),
            Token::OpAtan2 => Ok(Operator::Atan2),
            Token::OpDiv => Ok(Operator::Div),
            Token::OpEqual => Ok(Operator::Eql),
            Token::OpGreaterThan => Ok(Operator::Gt),
            Token::OpGreaterThanOrEqual => Ok(Operator::Gte),
            Token::OpMod => Ok(Operator::Mod),
            Token::OpMul => Ok(Operator::Mul),
            Token::OpMinus => Ok(Operator::Sub),
            Token::OpLessThan => Ok(Operator::Lt),
            Token::OpLessThanOrEqual => Ok(Operator::Lte),
            Token::OpNotEqual => Ok(Operator::NotEq),
            Token::OpOr => Ok(Operator::Or),
            Token::OpPow => Ok(Operator::Pow),
            Token::OpUnless => Ok(Operator::Unless),
            Token::OpPlus => Ok(Operator::Add),
            _ => Err(ParseError::General(format!(
                "unexpected token {token} for binary operator"
            ))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("+", Operator::Add)]
    #[test_case("AND", Operator::And)]
    #[test_case("atan2", Operator::Atan2)]
    #[test_case(">=", Operator::Gte)]
    #[test_case("unless", Operator::Unless)]
    fn operator_from_str(s: &str, expected: Operator) {
        assert_eq!(Operator::try_from(s).unwrap(), expected);
    }

    #[test]
    fn precedence_follows_prometheus() {
        assert!(Operator::Or.precedence() < Operator::And.precedence());
        assert_eq!(Operator::And.precedence(), Operator::Unless.precedence());
        assert!(Operator::Unless.precedence() < Operator::Eql.precedence());
        assert!(Operator::Eql.precedence() < Operator::Add.precedence());
        assert!(Operator::Sub.precedence() < Operator::Atan2.precedence());
        assert!(Operator::Mod.precedence() < Operator::Pow.precedence());
        assert!(Operator::Pow.is_right_associative());
        assert!(!Operator::Sub.is_right_associative());
    }
}
