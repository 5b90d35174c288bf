use std::collections::VecDeque;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    sequence::preceded,
};
use tracing::debug;

use crate::ast::{Atom, Expr, Number};
use crate::{Error, ParseErrorKind};

/// What `parse` does with tokens left over after the first complete expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingInput {
    /// Fail with `TrailingTokens` (exactly one expression per input)
    #[default]
    Reject,
    /// Return the first expression and drop the rest
    Ignore,
}

/// Reader options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseConfig {
    pub trailing: TrailingInput,
    /// Maximum list nesting; `None` reads until the call stack gives out
    pub max_depth: Option<usize>,
}

/// Unicode whitespace plus the ASCII information separators U+001C..=U+001F,
/// matching what `str.split()` treats as blanks.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

fn is_delimiter(c: char) -> bool {
    is_separator(c) || c == '(' || c == ')'
}

/// A single token after optional leading whitespace. Parens always stand alone.
fn token(input: &str) -> IResult<&str, &str> {
    preceded(
        take_while(is_separator),
        alt((tag("("), tag(")"), take_while1(|c: char| !is_delimiter(c)))),
    )
    .parse(input)
}

/// Split source text into tokens. Never fails; structure is checked by the parser.
pub fn tokenize(source: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = source;
    while let Ok((remaining, tok)) = token(rest) {
        tokens.push(tok);
        rest = remaining;
    }
    tokens
}

/// Classify a token: integer if it parses losslessly as one, then float, then symbol.
pub fn atom(token: &str) -> Atom {
    if let Ok(n) = token.parse::<i64>() {
        return Atom::Number(Number::Int(n));
    }
    if let Ok(x) = token.parse::<f64>() {
        return Atom::Number(Number::Float(x));
    }
    Atom::Symbol(token.to_owned())
}

/// Read one expression from the front of `tokens`, leaving anything after it in place.
pub fn read_from_tokens(tokens: &mut VecDeque<&str>) -> Result<Expr, Error> {
    read_expr(tokens, 0, None)
}

fn read_expr(
    tokens: &mut VecDeque<&str>,
    depth: usize,
    max_depth: Option<usize>,
) -> Result<Expr, Error> {
    let Some(token) = tokens.pop_front() else {
        return Err(Error::parse(
            ParseErrorKind::UnexpectedEof,
            "unexpected EOF while reading",
        ));
    };

    match token {
        "(" => {
            if let Some(max) = max_depth
                && depth >= max
            {
                return Err(Error::parse(
                    ParseErrorKind::TooDeeplyNested,
                    format!("Expression too deeply nested (max depth: {max})"),
                ));
            }

            let mut elements = Vec::new();
            loop {
                match tokens.front() {
                    None => {
                        return Err(Error::parse(
                            ParseErrorKind::UnexpectedEof,
                            "unexpected EOF while reading list",
                        ));
                    }
                    Some(&")") => {
                        tokens.pop_front();
                        return Ok(Expr::List(elements));
                    }
                    Some(_) => elements.push(read_expr(tokens, depth + 1, max_depth)?),
                }
            }
        }
        ")" => Err(Error::parse(
            ParseErrorKind::UnmatchedCloseParen,
            "unexpected )",
        )),
        _ => Ok(Expr::Atom(atom(token))),
    }
}

/// Parse exactly one expression from source text.
pub fn parse(source: &str) -> Result<Expr, Error> {
    parse_with_config(source, &ParseConfig::default())
}

pub fn parse_with_config(source: &str, config: &ParseConfig) -> Result<Expr, Error> {
    let mut tokens: VecDeque<&str> = tokenize(source).into();
    read_expr(&mut tokens, 0, config.max_depth)
        .and_then(|expr| match config.trailing {
            TrailingInput::Reject if !tokens.is_empty() => {
                let rest: Vec<&str> = tokens.iter().copied().collect();
                Err(Error::parse(
                    ParseErrorKind::TrailingTokens,
                    format!("Unexpected remaining input: '{}'", rest.join(" ")),
                ))
            }
            _ => Ok(expr),
        })
        .inspect_err(|err| debug!(error = %err, "reader rejected input"))
}
