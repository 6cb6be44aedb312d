//! Integer constant expressions, as used in array bounds and enumerators.

use std::collections::HashMap;

use crate::lexer::{Token, TokenKind};

/// Why an expression has no constant value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// Refers to something that is not a known constant (a variable, a macro).
    NotConstant(String),
    /// Malformed or not an integer expression.
    Invalid(String),
}

/// Binary operators by precedence level, loosest first.
const LEVELS: &[&[&str]] = &[
    &["||"],
    &["&&"],
    &["|"],
    &["^"],
    &["&"],
    &["==", "!="],
    &["<", ">", "<=", ">="],
    &["<<", ">>"],
    &["+", "-"],
    &["*", "/", "%"],
];

/// Type keywords that can start a cast inside a constant expression.
const CAST_KEYWORDS: &[&str] = &[
    "int", "unsigned", "signed", "long", "short", "char", "_Bool", "size_t",
];

/// Deepest nesting of parentheses, unary operators and conditionals.
const MAX_NESTING: usize = 256;

/// Evaluate `tokens` as one integer constant expression.
pub fn evaluate(tokens: &[Token], constants: &HashMap<String, i128>) -> Result<i128, ExprError> {
    let mut eval = Evaluator {
        tokens,
        pos: 0,
        depth: 0,
        constants,
    };
    let value = eval.ternary()?;
    match eval.tokens.get(eval.pos) {
        None => Ok(value),
        Some(tok) => Err(ExprError::Invalid(format!("unexpected '{tok}' in constant expression"))),
    }
}

/// Parse the value of an integer literal, ignoring `u`/`l` suffixes.
pub fn parse_integer(text: &str) -> Option<i128> {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']).replace('\'', "");
    let (radix, body) = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (16, hex.to_string())
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        (2, bin.to_string())
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, digits[1..].to_string())
    } else {
        (10, digits)
    };
    i128::from_str_radix(&body, radix).ok()
}

struct Evaluator<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    constants: &'a HashMap<String, i128>,
}

impl Evaluator<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, punct: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_punct(punct)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Result<i128, ExprError>) -> Result<i128, ExprError> {
        if self.depth >= MAX_NESTING {
            return Err(ExprError::Invalid(format!(
                "constant expression nests more than {MAX_NESTING} levels deep"
            )));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn ternary(&mut self) -> Result<i128, ExprError> {
        let cond = self.binary(0)?;
        if !self.eat("?") {
            return Ok(cond);
        }
        let then = self.nested(Self::ternary)?;
        if !self.eat(":") {
            return Err(ExprError::Invalid("expected ':' in conditional expression".into()));
        }
        let otherwise = self.nested(Self::ternary)?;
        Ok(if cond != 0 { then } else { otherwise })
    }

    fn binary(&mut self, level: usize) -> Result<i128, ExprError> {
        if level == LEVELS.len() {
            return self.unary();
        }
        let mut lhs = self.binary(level + 1)?;
        loop {
            let Some(op) = LEVELS[level].iter().copied().find(|op| self.peek().is_some_and(|t| t.is_punct(op))) else {
                return Ok(lhs);
            };
            self.pos += 1;
            let rhs = self.binary(level + 1)?;
            lhs = apply(op, lhs, rhs)?;
        }
    }

    fn unary(&mut self) -> Result<i128, ExprError> {
        if self.eat("-") {
            return self.nested(Self::unary)?.checked_neg().ok_or_else(overflow);
        }
        if self.eat("+") {
            return self.nested(Self::unary);
        }
        if self.eat("~") {
            return Ok(!self.nested(Self::unary)?);
        }
        if self.eat("!") {
            return Ok(i128::from(self.nested(Self::unary)? == 0));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<i128, ExprError> {
        let Some(tok) = self.peek().cloned() else {
            return Err(ExprError::Invalid("expected expression".into()));
        };
        self.pos += 1;
        match &tok.kind {
            TokenKind::Number(text) => parse_integer(text)
                .ok_or_else(|| ExprError::Invalid(format!("'{text}' is not an integer constant"))),
            TokenKind::Char(value) => Ok(i128::from(*value)),
            TokenKind::Ident(name) if name == "sizeof" || name == "_Alignof" => {
                Err(ExprError::NotConstant(name.clone()))
            }
            TokenKind::Ident(name) => self
                .constants
                .get(name)
                .copied()
                .ok_or_else(|| ExprError::NotConstant(name.clone())),
            TokenKind::Punct("(") => {
                if self.peek().and_then(Token::ident).is_some_and(|kw| CAST_KEYWORDS.contains(&kw)) {
                    while self.peek().is_some_and(|t| !t.is_punct(")")) {
                        self.pos += 1;
                    }
                    self.eat(")");
                    return self.nested(Self::unary);
                }
                let value = self.nested(Self::ternary)?;
                if !self.eat(")") {
                    return Err(ExprError::Invalid("expected ')'".into()));
                }
                Ok(value)
            }
            _ => Err(ExprError::Invalid(format!("unexpected '{tok}' in constant expression"))),
        }
    }
}

fn apply(op: &str, lhs: i128, rhs: i128) -> Result<i128, ExprError> {
    let shift = |amount: i128| u32::try_from(amount).ok().filter(|s| *s < 128);
    let value = match op {
        "||" => i128::from(lhs != 0 || rhs != 0),
        "&&" => i128::from(lhs != 0 && rhs != 0),
        "|" => lhs | rhs,
        "^" => lhs ^ rhs,
        "&" => lhs & rhs,
        "==" => i128::from(lhs == rhs),
        "!=" => i128::from(lhs != rhs),
        "<" => i128::from(lhs < rhs),
        ">" => i128::from(lhs > rhs),
        "<=" => i128::from(lhs <= rhs),
        ">=" => i128::from(lhs >= rhs),
        "<<" => shift(rhs)
            .and_then(|s| lhs.checked_shl(s))
            .ok_or_else(|| ExprError::Invalid("shift count out of range".into()))?,
        ">>" => shift(rhs)
            .and_then(|s| lhs.checked_shr(s))
            .ok_or_else(|| ExprError::Invalid("shift count out of range".into()))?,
        "+" => lhs.checked_add(rhs).ok_or_else(overflow)?,
        "-" => lhs.checked_sub(rhs).ok_or_else(overflow)?,
        "*" => lhs.checked_mul(rhs).ok_or_else(overflow)?,
        "/" | "%" if rhs == 0 => return Err(ExprError::Invalid("division by zero".into())),
        "/" => lhs.checked_div(rhs).ok_or_else(overflow)?,
        "%" => lhs.checked_rem(rhs).ok_or_else(overflow)?,
        other => return Err(ExprError::Invalid(format!("unsupported operator '{other}'"))),
    };
    Ok(value)
}

fn overflow() -> ExprError {
    ExprError::Invalid("integer overflow in constant expression".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn eval(source: &str) -> Result<i128, ExprError> {
        let (tokens, _) = tokenize(source);
        let constants = HashMap::from([("COUNT".to_string(), 8)]);
        evaluate(&tokens, &constants)
    }

    #[test]
    fn literals() {
        assert_eq!(eval("42"), Ok(42));
        assert_eq!(eval("0x10"), Ok(16));
        assert_eq!(eval("010"), Ok(8));
        assert_eq!(eval("0b101"), Ok(5));
        assert_eq!(eval("16UL"), Ok(16));
        assert_eq!(eval("'A'"), Ok(65));
        assert_eq!(eval("0"), Ok(0));
    }

    #[test]
    fn precedence_and_grouping() {
        assert_eq!(eval("2 + 3 * 4"), Ok(14));
        assert_eq!(eval("(2 + 3) * 4"), Ok(20));
        assert_eq!(eval("1 << 4 | 1"), Ok(17));
        assert_eq!(eval("-3 + 10"), Ok(7));
        assert_eq!(eval("~0 & 0xff"), Ok(255));
        assert_eq!(eval("1 ? 5 : 6"), Ok(5));
    }

    #[test]
    fn known_constants_and_casts() {
        assert_eq!(eval("COUNT * 2"), Ok(16));
        assert_eq!(eval("(unsigned)COUNT"), Ok(8));
    }

    #[test]
    fn unknown_names_are_not_constant() {
        assert_eq!(eval("n"), Err(ExprError::NotConstant("n".into())));
        assert!(matches!(eval("sizeof(int)"), Err(ExprError::NotConstant(_))));
    }

    #[test]
    fn malformed_expressions_are_invalid() {
        assert!(matches!(eval("1.5"), Err(ExprError::Invalid(_))));
        assert!(matches!(eval("4 / 0"), Err(ExprError::Invalid(_))));
        assert!(matches!(eval("(1 + 2"), Err(ExprError::Invalid(_))));
        assert!(matches!(eval("1 2"), Err(ExprError::Invalid(_))));
    }

    #[test]
    fn overflow_is_invalid() {
        let min = "(-170141183460469231731687303715884105727 - 1)";
        assert_eq!(eval(&format!("{min} + 1")), Ok(i128::MIN + 1));
        assert!(matches!(eval(&format!("{min} / -1")), Err(ExprError::Invalid(_))));
        assert!(matches!(eval(&format!("{min} % -1")), Err(ExprError::Invalid(_))));
        assert!(matches!(eval(&format!("-{min}")), Err(ExprError::Invalid(_))));
        assert!(matches!(eval("170141183460469231731687303715884105727 + 1"), Err(ExprError::Invalid(_))));
        assert!(matches!(eval("0x7fffffffffffffffffffffffffffffff * 2"), Err(ExprError::Invalid(_))));
    }

    #[test]
    fn deep_nesting_is_invalid() {
        let deep = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
        assert_eq!(
            eval(&deep),
            Err(ExprError::Invalid("constant expression nests more than 256 levels deep".into()))
        );
        assert!(matches!(eval(&format!("{}1", "~".repeat(50_000))), Err(ExprError::Invalid(_))));
        assert_eq!(eval(&format!("{}7{}", "(".repeat(100), ")".repeat(100))), Ok(7));
    }
}
