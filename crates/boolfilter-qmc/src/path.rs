//! Path expressions: one conjunctive term of a minimal cover, e.g. `3&!5&7`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub var: usize,
    pub negated: bool,
}

impl Literal {
    pub fn positive(var: usize) -> Self {
        Self {
            var,
            negated: false,
        }
    }

    pub fn negative(var: usize) -> Self {
        Self { var, negated: true }
    }

    pub fn holds(&self, assignment: u64) -> bool {
        let bit = (assignment >> self.var) & 1 == 1;
        bit != self.negated
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PathExpression {
    literals: Vec<Literal>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid path expression `{0}`")]
pub struct PathParseError(pub String);

impl PathExpression {
    pub fn new(literals: Vec<Literal>) -> Self {
        Self { literals }
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    /// Ids that must hold.
    pub fn must_have(&self) -> impl Iterator<Item = usize> + '_ {
        self.literals.iter().filter(|l| !l.negated).map(|l| l.var)
    }

    /// Ids that must not hold.
    pub fn must_not(&self) -> impl Iterator<Item = usize> + '_ {
        self.literals.iter().filter(|l| l.negated).map(|l| l.var)
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn holds(&self, assignment: u64) -> bool {
        self.literals.iter().all(|l| l.holds(assignment))
    }
}

/// Whether the disjunction of `cover` is true under `assignment`.
pub fn cover_holds(cover: &[PathExpression], assignment: u64) -> bool {
    cover.iter().any(|p| p.holds(assignment))
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, lit) in self.literals.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            if lit.negated {
                f.write_str("!")?;
            }
            write!(f, "{}", lit.var)?;
        }
        Ok(())
    }
}

impl FromStr for PathExpression {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(PathExpression::default());
        }
        let literals = s
            .split('&')
            .map(|part| {
                let part = part.trim();
                let (negated, digits) = match part.strip_prefix('!') {
                    Some(rest) => (true, rest.trim()),
                    None => (false, part),
                };
                digits
                    .parse::<usize>()
                    .map(|var| Literal { var, negated })
                    .map_err(|_| PathParseError(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PathExpression::new(literals))
    }
}
