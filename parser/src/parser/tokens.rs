use std::fmt::{Display, Formatter};

use logos::Logos;

#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[logos(subpattern decimal = r"[0-9]+")]
#[logos(subpattern hex = r"0[xX][0-9a-fA-F]+")]
#[logos(subpattern float = r"(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")]
#[logos(subpattern duration = r"[0-9]+(?:ms|s|m|h|d|w|y)")]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"#[^\r\n]*")] // single line comment
pub enum Token {
    #[token("and", ignore(ascii_case))]
    OpAnd,

    #[token("atan2", ignore(ascii_case))]
    OpAtan2,

    #[token("bool", ignore(ascii_case))]
    Bool,

    #[token("by", ignore(ascii_case))]
    By,

    #[token("group_left", ignore(ascii_case))]
    GroupLeft,

    #[token("group_right", ignore(ascii_case))]
    GroupRight,

    #[token("ignoring", ignore(ascii_case))]
    Ignoring,

    #[token("on", ignore(ascii_case))]
    On,

    #[token("offset", ignore(ascii_case))]
    Offset,

    #[token("or", ignore(ascii_case))]
    OpOr,

    #[token("unless", ignore(ascii_case))]
    OpUnless,

    #[token("without", ignore(ascii_case))]
    Without,

    #[regex("(?&duration)+")]
    Duration,

    #[token("nan", ignore(ascii_case))]
    #[token("inf", ignore(ascii_case))]
    #[regex("(?&hex)")]
    #[regex("(?&float)")]
    Number,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_:]*")]
    Identifier,

    #[regex("'(?s:[^'\\\\]|\\\\.)*'")]
    #[regex("`[^`]*`")]
    #[regex("\"(?s:[^\"\\\\]|\\\\.)*\"")]
    StringLiteral,

    #[token("@")]
    At,

    #[token("{")]
    LeftBrace,

    #[token("}")]
    RightBrace,

    #[token("[")]
    LeftBracket,

    #[token("]")]
    RightBracket,

    #[token(",")]
    Comma,

    #[token(":")]
    Colon,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("=")]
    Equal,

    #[token("==")]
    OpEqual,

    #[token("!=")]
    OpNotEqual,

    #[token("<")]
    OpLessThan,

    #[token("<=")]
    OpLessThanOrEqual,

    #[token(">")]
    OpGreaterThan,

    #[token(">=")]
    OpGreaterThanOrEqual,

    #[token("+")]
    OpPlus,

    #[token("-")]
    OpMinus,

    #[token("/")]
    OpDiv,

    #[token("*")]
    OpMul,

    #[token("^")]
    OpPow,

    #[token("%")]
    OpMod,

    #[token("=~")]
    RegexEqual,

    #[token("!~")]
    RegexNotEqual,

    #[regex("\"(?s:[^\"\\\\]|\\\\.)*")]
    #[regex("'(?s:[^'\\\\]|\\\\.)*")]
    #[regex("`[^`]*")]
    ErrorStringUnterminated,

    /// Marker for end of stream.
    Eof,
}

impl Token {
    pub fn is_operator(&self) -> bool {
        use Token::*;

        matches!(
            self,
            OpAtan2
                | OpMul
                | OpDiv
                | OpMod
                | OpPlus
                | OpMinus
                | OpLessThan
                | OpGreaterThan
                | OpLessThanOrEqual
                | OpGreaterThanOrEqual
                | OpEqual
                | OpNotEqual
                | OpPow
                | OpAnd
                | OpOr
                | OpUnless
        )
    }

    #[inline]
    pub fn is_comparison_op(&self) -> bool {
        use Token::*;
        matches!(
            self,
            OpEqual
                | OpNotEqual
                | OpGreaterThanOrEqual
                | OpGreaterThan
                | OpLessThanOrEqual
                | OpLessThan
        )
    }

    #[inline]
    pub fn is_group_modifier(&self) -> bool {
        use Token::*;
        matches!(self, On | Ignoring)
    }

    #[inline]
    pub fn is_join_modifier(&self) -> bool {
        use Token::*;
        matches!(self, GroupLeft | GroupRight)
    }

    pub fn is_aggregate_modifier(&self) -> bool {
        use Token::*;
        matches!(self, By | Without)
    }

    /// Keywords that may be used where a label name is expected.
    pub fn is_ident_like(&self) -> bool {
        use Token::*;
        matches!(
            self,
            Identifier
                | By
                | Bool
                | GroupLeft
                | GroupRight
                | Ignoring
                | On
                | Offset
                | Without
                | OpAnd
                | OpAtan2
                | OpOr
                | OpUnless
        )
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            // keywords
            Self::By => "by",
            Self::Bool => "bool",
            Self::GroupLeft => "group_left",
            Self::GroupRight => "group_right",
            Self::Ignoring => "ignoring",
            Self::On => "on",
            Self::Offset => "offset",
            Self::StringLiteral => "<string literal>",
            Self::Without => "without",

            Self::Identifier => "<identifier>",

            // symbols
            Self::At => "@",
            Self::LeftBrace => "{",
            Self::RightBrace => "}",
            Self::LeftBracket => "[",
            Self::RightBracket => "]",
            Self::Colon => ":",
            Self::Comma => ",",
            Self::LeftParen => "(",
            Self::RightParen => ")",
            Self::Equal => "=",

            // operators
            Self::OpAnd => "and",
            Self::OpAtan2 => "atan2",
            Self::OpOr => "or",
            Self::OpUnless => "unless",
            Self::OpMul => "*",
            Self::OpDiv => "/",
            Self::OpMod => "%",
            Self::OpPlus => "+",
            Self::OpMinus => "-",
            Self::OpLessThan => "<",
            Self::OpGreaterThan => ">",
            Self::OpLessThanOrEqual => "<=",
            Self::OpGreaterThanOrEqual => ">=",
            Self::OpEqual => "==",
            Self::OpNotEqual => "!=",
            Self::OpPow => "^",
            Self::RegexEqual => "=~",
            Self::RegexNotEqual => "!~",

            Self::Duration => "<duration>",
            Self::Number => "<number>",

            Self::Eof => "<eof>",

            Self::ErrorStringUnterminated => "<unterminated string literal>",
        })
    }
}
