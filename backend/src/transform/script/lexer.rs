//! Tokenizer for computed-column expressions.

use crate::error::{ExpressionError, ExpressionResult};

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    /// Identifier, possibly dotted (`Math.round`).
    Ident(String),
    /// Operator symbol, e.g. `+`, `===`, `&&`.
    Op(&'static str),
    LParen,
    RParen,
    Comma,
    Question,
    Colon,
}

impl Token {
    /// Short human-readable form for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Str(s) => format!("string \"{}\"", s),
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Op(op) => format!("'{}'", op),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Question => "'?'".to_string(),
            Token::Colon => "':'".to_string(),
        }
    }
}

/// A token with its character offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

// Longest operators first so `===` wins over `==`.
const OPERATORS: [&str; 16] = [
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "<", ">", "+", "-", "*", "/", "%", "!",
];

/// Split an expression into tokens.
pub fn tokenize(src: &str) -> ExpressionResult<Vec<Spanned>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        let token = match c {
            '(' => {
                pos += 1;
                Token::LParen
            }
            ')' => {
                pos += 1;
                Token::RParen
            }
            ',' => {
                pos += 1;
                Token::Comma
            }
            '?' => {
                pos += 1;
                Token::Question
            }
            ':' => {
                pos += 1;
                Token::Colon
            }
            '"' | '\'' => {
                let (text, next) = read_string(&chars, pos)?;
                pos = next;
                Token::Str(text)
            }
            c if c.is_ascii_digit() || (c == '.' && next_is_digit(&chars, pos)) => {
                let (number, next) = read_number(&chars, pos)?;
                pos = next;
                Token::Number(number)
            }
            c if is_ident_start(c) => {
                pos = read_ident(&chars, pos);
                // `Math.` is the only dotted name.
                if chars[start..pos].iter().copied().eq("Math".chars())
                    && chars.get(pos) == Some(&'.')
                    && chars.get(pos + 1).is_some_and(|&c| is_ident_start(c))
                {
                    pos = read_ident(&chars, pos + 1);
                }
                Token::Ident(chars[start..pos].iter().collect())
            }
            _ => {
                let op = OPERATORS
                    .iter()
                    .copied()
                    .find(|op| matches_at(&chars, pos, op))
                    .ok_or(ExpressionError::UnexpectedChar { ch: c, pos })?;
                pos += op.len();
                Token::Op(op)
            }
        };

        tokens.push(Spanned { token, pos: start });
    }

    Ok(tokens)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn read_ident(chars: &[char], start: usize) -> usize {
    let mut pos = start;
    while pos < chars.len() && (chars[pos].is_alphanumeric() || matches!(chars[pos], '_' | '$')) {
        pos += 1;
    }
    pos
}

fn next_is_digit(chars: &[char], pos: usize) -> bool {
    chars.get(pos + 1).is_some_and(|c| c.is_ascii_digit())
}

fn matches_at(chars: &[char], pos: usize, op: &str) -> bool {
    op.chars()
        .enumerate()
        .all(|(i, oc)| chars.get(pos + i) == Some(&oc))
}

fn read_number(chars: &[char], start: usize) -> ExpressionResult<(f64, usize)> {
    let mut pos = start;
    while pos < chars.len() && chars[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos < chars.len() && chars[pos] == '.' {
        pos += 1;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    if pos < chars.len() && matches!(chars[pos], 'e' | 'E') {
        let mut exp = pos + 1;
        if exp < chars.len() && matches!(chars[exp], '+' | '-') {
            exp += 1;
        }
        if exp < chars.len() && chars[exp].is_ascii_digit() {
            pos = exp;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }

    let text: String = chars[start..pos].iter().collect();
    let number = text
        .parse::<f64>()
        .map_err(|_| ExpressionError::InvalidNumber(text.clone()))?;
    Ok((number, pos))
}

/// Read a quoted string starting at `start` (the opening quote).
///
/// Backslash escapes `\n`, `\t`, `\\` and escaped quotes are understood.
fn read_string(chars: &[char], start: usize) -> ExpressionResult<(String, usize)> {
    let quote = chars[start];
    let mut pos = start + 1;
    let mut out = String::new();

    while pos < chars.len() {
        match chars[pos] {
            c if c == quote => return Ok((out, pos + 1)),
            '\\' if pos + 1 < chars.len() => {
                let escaped = chars[pos + 1];
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
                pos += 2;
            }
            c => {
                out.push(c);
                pos += 1;
            }
        }
    }

    Err(ExpressionError::UnterminatedString(start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(
            kinds("2 + 3.5*x"),
            vec![
                Token::Number(2.0),
                Token::Op("+"),
                Token::Number(3.5),
                Token::Op("*"),
                Token::Ident("x".into()),
            ]
        );
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(
            kinds("a === b !== c <= d"),
            vec![
                Token::Ident("a".into()),
                Token::Op("==="),
                Token::Ident("b".into()),
                Token::Op("!=="),
                Token::Ident("c".into()),
                Token::Op("<="),
                Token::Ident("d".into()),
            ]
        );
    }

    #[test]
    fn test_strings_both_quotes() {
        assert_eq!(
            kinds(r#""a b" + 'c\'d'"#),
            vec![Token::Str("a b".into()), Token::Op("+"), Token::Str("c'd".into())]
        );
    }

    #[test]
    fn test_exponent_and_leading_dot() {
        assert_eq!(kinds("1e3 .5"), vec![Token::Number(1000.0), Token::Number(0.5)]);
    }

    #[test]
    fn test_dotted_identifier() {
        assert_eq!(
            kinds("Math.round(1)"),
            vec![
                Token::Ident("Math.round".into()),
                Token::LParen,
                Token::Number(1.0),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_only_math_takes_a_dot() {
        assert_eq!(
            tokenize("a.b.c(1)").unwrap_err(),
            ExpressionError::UnexpectedChar { ch: '.', pos: 1 }
        );
        assert_eq!(
            tokenize("Math.max.x").unwrap_err(),
            ExpressionError::UnexpectedChar { ch: '.', pos: 8 }
        );
        assert_eq!(kinds("Mathx"), vec![Token::Ident("Mathx".into())]);
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("1 +  2").unwrap();
        assert_eq!(tokens[1].pos, 2);
        assert_eq!(tokens[2].pos, 5);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            tokenize("a = 1").unwrap_err(),
            ExpressionError::UnexpectedChar { ch: '=', pos: 2 }
        );
        assert_eq!(tokenize("\"open").unwrap_err(), ExpressionError::UnterminatedString(0));
        assert!(tokenize("[1,2]").is_err());
    }
}
