//! Formula text → expression tree, and evaluation under an assignment.
//!
//! Grammar (whitespace is insignificant):
//!
//! ```text
//! expr   := term ( '|' term )*
//! term   := factor ( '&' factor )*
//! factor := '!' factor | '(' expr ')' | var
//! var    := [0-9]+
//! ```

use nom::{
    branch::alt,
    character::complete::{char as pchar, digit1, multispace0},
    combinator::{all_consuming, map, map_res},
    multi::many0,
    sequence::{delimited, preceded},
    IResult,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormulaError {
    #[error("invalid formula: `{formula}`")]
    Syntax { formula: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Var(usize),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    /// Evaluate with bit `j` of `assignment` as the value of variable `j`.
    pub fn eval(&self, assignment: u64) -> bool {
        match self {
            Expr::Var(v) => (assignment >> v) & 1 == 1,
            Expr::Not(e) => !e.eval(assignment),
            Expr::And(es) => es.iter().all(|e| e.eval(assignment)),
            Expr::Or(es) => es.iter().any(|e| e.eval(assignment)),
        }
    }

    pub fn max_var(&self) -> Option<usize> {
        match self {
            Expr::Var(v) => Some(*v),
            Expr::Not(e) => e.max_var(),
            Expr::And(es) | Expr::Or(es) => es.iter().filter_map(Expr::max_var).max(),
        }
    }
}

pub fn parse_formula(text: &str) -> Result<Expr, FormulaError> {
    all_consuming(delimited(multispace0, expr, multispace0))(text)
        .map(|(_, e)| e)
        .map_err(|_| FormulaError::Syntax {
            formula: text.trim().to_string(),
        })
}

fn token<'a>(c: char) -> impl FnMut(&'a str) -> IResult<&'a str, char> {
    delimited(multispace0, pchar(c), multispace0)
}

fn expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(preceded(token('|'), term))(input)?;
    Ok((input, collapse(first, rest, Expr::Or)))
}

fn term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = factor(input)?;
    let (input, rest) = many0(preceded(token('&'), factor))(input)?;
    Ok((input, collapse(first, rest, Expr::And)))
}

fn factor(input: &str) -> IResult<&str, Expr> {
    preceded(
        multispace0,
        alt((
            map(preceded(pchar('!'), factor), |e| Expr::Not(Box::new(e))),
            delimited(pchar('('), expr, token(')')),
            map_res(digit1, |d: &str| d.parse::<usize>().map(Expr::Var)),
        )),
    )(input)
}

fn collapse(first: Expr, rest: Vec<Expr>, join: fn(Vec<Expr>) -> Expr) -> Expr {
    if rest.is_empty() {
        return first;
    }
    let mut all = Vec::with_capacity(rest.len() + 1);
    all.push(first);
    all.extend(rest);
    join(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_and_negation() {
        let e = parse_formula("0 | 1 & !2").unwrap();
        assert_eq!(
            e,
            Expr::Or(vec![
                Expr::Var(0),
                Expr::And(vec![Expr::Var(1), Expr::Not(Box::new(Expr::Var(2)))]),
            ])
        );
        assert!(e.eval(0b001));
        assert!(e.eval(0b010));
        assert!(!e.eval(0b110));
    }

    #[test]
    fn parses_normalizer_output() {
        let e = parse_formula("!(0&((1)|!2)&!0)").unwrap();
        assert_eq!(e.max_var(), Some(2));
        // `0 & !0` inside is unsatisfiable, so the negation always holds.
        assert!((0..8).all(|a| e.eval(a)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_formula("(0&").is_err());
        assert!(parse_formula("0 & a").is_err());
        assert!(parse_formula("").is_err());
    }
}
