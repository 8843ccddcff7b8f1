//! Integer arithmetic over the expressions the demo program builds.
//!
//! Grammar: `sum := product ('+' product)*`, `product := unary ('*' unary)*`,
//! `unary := '-'* atom`, `atom := digits | '(' sum ')'`. Whitespace is ignored.
//! Arithmetic is checked; overflow is an error rather than a wrapped value.

use thiserror::Error;

/// Parenthesis nesting accepted before giving up.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("unexpected '{found}' at offset {pos}")]
    Unexpected { found: char, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("'(' at offset {pos} is never closed")]
    Unclosed { pos: usize },

    #[error("integer overflow")]
    Overflow,

    #[error("parentheses nested deeper than {limit}")]
    TooDeep { limit: usize },
}

pub fn evaluate(input: &str) -> Result<i64, ExprError> {
    let mut parser = Parser {
        input,
        pos: 0,
        depth: 0,
    };
    let value = parser.sum()?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(value),
        Some(found) => Err(ExprError::Unexpected {
            found,
            pos: parser.pos,
        }),
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek()
            && c.is_ascii_whitespace()
        {
            self.pos += 1;
        }
    }

    /// Consume `expected` if it is the next non-blank character.
    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn sum(&mut self) -> Result<i64, ExprError> {
        let mut acc = self.product()?;
        while self.eat('+') {
            let rhs = self.product()?;
            acc = acc.checked_add(rhs).ok_or(ExprError::Overflow)?;
        }
        Ok(acc)
    }

    fn product(&mut self) -> Result<i64, ExprError> {
        let mut acc = self.unary()?;
        while self.eat('*') {
            let rhs = self.unary()?;
            acc = acc.checked_mul(rhs).ok_or(ExprError::Overflow)?;
        }
        Ok(acc)
    }

    fn unary(&mut self) -> Result<i64, ExprError> {
        let mut negate = false;
        while self.eat('-') {
            negate = !negate;
        }
        self.skip_whitespace();
        if negate && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return self.number(true);
        }
        let value = self.atom()?;
        if negate {
            value.checked_neg().ok_or(ExprError::Overflow)
        } else {
            Ok(value)
        }
    }

    fn atom(&mut self) -> Result<i64, ExprError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(ExprError::UnexpectedEnd),
            Some('(') => {
                let open = self.pos;
                self.pos += 1;
                self.depth += 1;
                if self.depth > MAX_DEPTH {
                    return Err(ExprError::TooDeep { limit: MAX_DEPTH });
                }
                let value = self.sum()?;
                if !self.eat(')') {
                    return match self.peek() {
                        None => Err(ExprError::Unclosed { pos: open }),
                        Some(found) => Err(ExprError::Unexpected {
                            found,
                            pos: self.pos,
                        }),
                    };
                }
                self.depth -= 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() => self.number(false),
            Some(found) => Err(ExprError::Unexpected {
                found,
                pos: self.pos,
            }),
        }
    }

    /// A negated literal accumulates downwards so `i64::MIN` fits.
    fn number(&mut self, negative: bool) -> Result<i64, ExprError> {
        let mut value: i64 = 0;
        while let Some(c) = self.peek()
            && let Some(digit) = c.to_digit(10)
        {
            let digit = i64::from(digit);
            value = value
                .checked_mul(10)
                .and_then(|v| {
                    if negative {
                        v.checked_sub(digit)
                    } else {
                        v.checked_add(digit)
                    }
                })
                .ok_or(ExprError::Overflow)?;
            self.pos += 1;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(evaluate("1+2*3"), Ok(7));
        assert_eq!(evaluate("(1+2)*3"), Ok(9));
        assert_eq!(evaluate(" 2 * ( 3 + 4 ) "), Ok(14));
        assert_eq!(evaluate("42"), Ok(42));
    }

    #[test]
    fn program_expressions() {
        assert_eq!(evaluate("((1*(1+2)+4)*(1+(1+2)+((1+2)+3)*6+5)+7)"), Ok(322));
        assert_eq!(evaluate("((1*(1+2)+4)*(1+(1+2)+((1+2)+3)*4+5)+7)"), Ok(238));
    }

    #[test]
    fn unary_minus() {
        assert_eq!(evaluate("-3+2"), Ok(-1));
        assert_eq!(evaluate("2*-3"), Ok(-6));
        assert_eq!(evaluate("--4"), Ok(4));
        assert_eq!(evaluate("-(1+1)"), Ok(-2));
    }

    #[test]
    fn extreme_literals() {
        assert_eq!(evaluate("-9223372036854775808"), Ok(i64::MIN));
        assert_eq!(evaluate("- 9223372036854775808 + 1"), Ok(i64::MIN + 1));
        assert_eq!(evaluate("2*-9223372036854775808"), Err(ExprError::Overflow));
        assert_eq!(evaluate("9223372036854775807"), Ok(i64::MAX));
        assert_eq!(evaluate("9223372036854775808"), Err(ExprError::Overflow));
        assert_eq!(evaluate("---9223372036854775808"), Ok(i64::MIN));
        assert_eq!(evaluate("--9223372036854775808"), Err(ExprError::Overflow));
    }

    #[test]
    fn malformed_input() {
        assert_eq!(evaluate(""), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("1+"), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("(1+2"), Err(ExprError::Unclosed { pos: 0 }));
        assert_eq!(
            evaluate("1+x"),
            Err(ExprError::Unexpected { found: 'x', pos: 2 })
        );
        assert_eq!(
            evaluate("(1]"),
            Err(ExprError::Unexpected { found: ']', pos: 2 })
        );
        assert_eq!(
            evaluate("1 2"),
            Err(ExprError::Unexpected { found: '2', pos: 2 })
        );
    }

    #[test]
    fn overflow_is_reported() {
        assert_eq!(evaluate("9223372036854775807+1"), Err(ExprError::Overflow));
        assert_eq!(evaluate("99999999999999999999"), Err(ExprError::Overflow));
        assert_eq!(evaluate("4294967296*4294967296"), Err(ExprError::Overflow));
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(evaluate(&deep), Err(ExprError::TooDeep { limit: MAX_DEPTH }));
        let ok = format!("{}1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(evaluate(&ok), Ok(1));
    }
}
