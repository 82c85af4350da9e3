//! Recursive-descent parser producing an expression tree.
//!
//! Precedence, lowest first:
//!
//! ```text
//! ternary    cond ? a : b          (right associative)
//! or         a || b
//! and        a && b
//! equality   == != === !==
//! comparison < <= > >=
//! additive   + -
//! term       * / %
//! unary      - + !
//! primary    literal | call | ( expr )
//! ```

use super::interpreter::Scalar;
use super::lexer::{tokenize, Spanned, Token};
use crate::error::{ExpressionError, ExpressionResult};

/// Maximum depth of a parsed expression tree, counting both parenthesized
/// nesting and operator chains.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Scalar),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

/// Tokenize and parse a complete expression.
pub fn parse(src: &str) -> ExpressionResult<Expr> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
    };
    let expr = parser.ternary()?;
    match parser.peek() {
        None => Ok(expr),
        Some(extra) => Err(ExpressionError::UnexpectedToken {
            found: extra.token.describe(),
            expected: "end of expression".to_string(),
            pos: extra.pos,
        }),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.cursor)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    /// Consume the next token if it equals `expected`.
    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek().is_some_and(|s| &s.token == expected) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> ExpressionResult<()> {
        match self.advance() {
            Some(s) if &s.token == expected => Ok(()),
            Some(s) => Err(ExpressionError::UnexpectedToken {
                found: s.token.describe(),
                expected: expected.describe(),
                pos: s.pos,
            }),
            None => Err(ExpressionError::UnexpectedEnd(expected.describe())),
        }
    }

    /// Consume the next token if it is one of the operators in `ops`.
    fn eat_op(&mut self, ops: &[&'static str]) -> Option<&'static str> {
        match self.peek() {
            Some(Spanned {
                token: Token::Op(op),
                ..
            }) if ops.contains(op) => {
                let op = *op;
                self.cursor += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn enter(&mut self) -> ExpressionResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn ternary(&mut self) -> ExpressionResult<Expr> {
        self.enter()?;
        let cond = self.or()?;
        let expr = if self.eat(&Token::Question) {
            let then = self.ternary()?;
            self.expect(&Token::Colon)?;
            let otherwise = self.ternary()?;
            Expr::Conditional {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            }
        } else {
            cond
        };
        self.leave();
        Ok(expr)
    }

    /// Left-associative chain `next (op next)*`. Every operator nests the
    /// tree one level deeper, so each one counts against [`MAX_DEPTH`].
    fn chain(
        &mut self,
        ops: &[&'static str],
        next: fn(&mut Self) -> ExpressionResult<Expr>,
        build: fn(Expr, &'static str, Expr) -> Expr,
    ) -> ExpressionResult<Expr> {
        let mut left = next(self)?;
        let mut links = 0;
        while let Some(op) = self.eat_op(ops) {
            self.enter()?;
            links += 1;
            let right = next(self)?;
            left = build(left, op, right);
        }
        self.depth -= links;
        Ok(left)
    }

    fn or(&mut self) -> ExpressionResult<Expr> {
        self.chain(&["||"], Self::and, |left, _, right| Expr::Logical {
            left: Box::new(left),
            op: LogicalOp::Or,
            right: Box::new(right),
        })
    }

    fn and(&mut self) -> ExpressionResult<Expr> {
        self.chain(&["&&"], Self::equality, |left, _, right| Expr::Logical {
            left: Box::new(left),
            op: LogicalOp::And,
            right: Box::new(right),
        })
    }

    fn equality(&mut self) -> ExpressionResult<Expr> {
        self.chain(&["==", "!=", "===", "!=="], Self::comparison, |left, op, right| {
            let op = match op {
                "==" => BinaryOp::Eq,
                "!=" => BinaryOp::Ne,
                "===" => BinaryOp::StrictEq,
                _ => BinaryOp::StrictNe,
            };
            binary(left, op, right)
        })
    }

    fn comparison(&mut self) -> ExpressionResult<Expr> {
        self.chain(&["<", "<=", ">", ">="], Self::additive, |left, op, right| {
            let op = match op {
                "<" => BinaryOp::Lt,
                "<=" => BinaryOp::Le,
                ">" => BinaryOp::Gt,
                _ => BinaryOp::Ge,
            };
            binary(left, op, right)
        })
    }

    fn additive(&mut self) -> ExpressionResult<Expr> {
        self.chain(&["+", "-"], Self::term, |left, op, right| {
            let op = if op == "+" { BinaryOp::Add } else { BinaryOp::Sub };
            binary(left, op, right)
        })
    }

    fn term(&mut self) -> ExpressionResult<Expr> {
        self.chain(&["*", "/", "%"], Self::unary, |left, op, right| {
            let op = match op {
                "*" => BinaryOp::Mul,
                "/" => BinaryOp::Div,
                _ => BinaryOp::Rem,
            };
            binary(left, op, right)
        })
    }

    fn unary(&mut self) -> ExpressionResult<Expr> {
        let Some(op) = self.eat_op(&["-", "+", "!"]) else {
            return self.primary();
        };
        self.enter()?;
        let op = match op {
            "-" => UnaryOp::Neg,
            "+" => UnaryOp::Plus,
            _ => UnaryOp::Not,
        };
        let expr = self.unary()?;
        self.leave();
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    fn primary(&mut self) -> ExpressionResult<Expr> {
        let Some(Spanned { token, pos }) = self.advance() else {
            return Err(ExpressionError::UnexpectedEnd("expression".to_string()));
        };

        match token {
            Token::Number(n) => Ok(Expr::Literal(Scalar::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Scalar::Str(s))),
            Token::LParen => {
                let expr = self.ternary()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Scalar::Bool(true))),
                "false" => Ok(Expr::Literal(Scalar::Bool(false))),
                "null" | "undefined" => Ok(Expr::Literal(Scalar::Null)),
                "NaN" => Ok(Expr::Literal(Scalar::Number(f64::NAN))),
                "Infinity" => Ok(Expr::Literal(Scalar::Number(f64::INFINITY))),
                _ if self.eat(&Token::LParen) => {
                    let args = self.arguments()?;
                    Ok(Expr::Call { name, args })
                }
                _ => Err(ExpressionError::UnknownIdentifier(name)),
            },
            other => Err(ExpressionError::UnexpectedToken {
                found: other.describe(),
                expected: "expression".to_string(),
                pos,
            }),
        }
    }

    /// Parse call arguments after the opening parenthesis.
    fn arguments(&mut self) -> ExpressionResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.ternary()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen)?;
            return Ok(args);
        }
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Expr {
        Expr::Literal(Scalar::Number(n))
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            binary(num(1.0), BinaryOp::Add, binary(num(2.0), BinaryOp::Mul, num(3.0)))
        );
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(
            parse("8 - 4 - 2").unwrap(),
            binary(binary(num(8.0), BinaryOp::Sub, num(4.0)), BinaryOp::Sub, num(2.0))
        );
    }

    #[test]
    fn test_ternary_right_associative() {
        let expr = parse("1 ? 2 : 3 ? 4 : 5").unwrap();
        match expr {
            Expr::Conditional { otherwise, .. } => {
                assert!(matches!(*otherwise, Expr::Conditional { .. }));
            }
            other => panic!("Expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_call_arguments() {
        assert_eq!(
            parse("max(1, 2)").unwrap(),
            Expr::Call {
                name: "max".into(),
                args: vec![num(1.0), num(2.0)],
            }
        );
        assert_eq!(
            parse("Math.random()").unwrap(),
            Expr::Call {
                name: "Math.random".into(),
                args: vec![],
            }
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(parse("null").unwrap(), Expr::Literal(Scalar::Null));
        assert_eq!(parse("true").unwrap(), Expr::Literal(Scalar::Bool(true)));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse("1 +"), Err(ExpressionError::UnexpectedEnd(_))));
        assert!(matches!(parse("(1"), Err(ExpressionError::UnexpectedEnd(_))));
        assert!(matches!(parse("1 2"), Err(ExpressionError::UnexpectedToken { .. })));
        assert!(matches!(parse("foo"), Err(ExpressionError::UnknownIdentifier(_))));
        assert!(matches!(parse("1 ? 2"), Err(ExpressionError::UnexpectedEnd(_))));
        assert!(matches!(parse(""), Err(ExpressionError::UnexpectedEnd(_))));
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(parse(&deep).unwrap_err(), ExpressionError::TooDeep(MAX_DEPTH));
        assert!(parse("((1))").is_ok());
    }

    #[test]
    fn test_long_operator_chain_is_too_deep() {
        let long = vec!["1"; 200_000].join("+");
        assert_eq!(parse(&long).unwrap_err(), ExpressionError::TooDeep(MAX_DEPTH));

        let mixed = vec!["2 * 3"; MAX_DEPTH + 1].join(" - ");
        assert_eq!(parse(&mixed).unwrap_err(), ExpressionError::TooDeep(MAX_DEPTH));

        let fits = vec!["1"; 100].join("+");
        assert!(parse(&fits).is_ok());
    }
}
