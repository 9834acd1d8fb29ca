//! Boolean minimization for filter formulas
//!
//! Reduces a propositional formula over `num_vars` integer variables to a
//! minimal sum of products:
//!
//! 1. **Truth table**: evaluate every assignment `0..2^num_vars` (bit `j` is
//!    variable `j`) and keep the true rows (minterms).
//! 2. **Tabulation**: Quine–McCluskey merging of implicants that differ in
//!    one position, until only prime implicants remain.
//! 3. **Essential primes**: primes that alone cover some minterm.
//! 4. **Petrick's method**: minimal cover of the remaining minterms.
//!
//! Each implicant of the cover is exposed as a [`PathExpression`], a signed
//! conjunction of variable ids ready for set-algebra evaluation.
//!
//! Suitable for the tens of distinct predicates a faceted filter produces;
//! the truth table is exponential in `num_vars`.

pub mod cover;
pub mod formula;
pub mod implicant;
pub mod path;
pub mod tabulation;

use thiserror::Error;
use tracing::debug;

pub use cover::CoverSelection;
pub use formula::{parse_formula, Expr, FormulaError};
pub use implicant::{Implicant, Ternary};
pub use path::{cover_holds, Literal, PathExpression, PathParseError};

/// Widest variable count the packed implicant representation supports.
pub const MAX_VARIABLES: usize = 63;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MinimizeError {
    #[error("{count} distinct predicates exceed the supported maximum of {max}")]
    TooManyVariables { count: usize, max: usize },
    #[error("formula references variable {var} but only {num_vars} are declared")]
    UnknownVariable { var: usize, num_vars: usize },
    #[error(transparent)]
    Formula(#[from] FormulaError),
}

/// Every intermediate of one minimization run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Minimization {
    pub num_vars: usize,
    pub minterms: Vec<u64>,
    pub prime_implicants: Vec<Implicant>,
    pub essential: Vec<Implicant>,
    pub cover: Vec<Implicant>,
}

impl Minimization {
    pub fn run(formula: &str, num_vars: usize) -> Result<Self, MinimizeError> {
        if num_vars > MAX_VARIABLES {
            return Err(MinimizeError::TooManyVariables {
                count: num_vars,
                max: MAX_VARIABLES,
            });
        }
        if num_vars == 0 || formula.trim().is_empty() {
            return Ok(Self {
                num_vars,
                ..Self::default()
            });
        }

        let minterms = truth_table(formula, num_vars)?;
        if minterms.is_empty() {
            return Ok(Self {
                num_vars,
                ..Self::default()
            });
        }

        let prime_implicants = tabulation::prime_implicants(&minterms, num_vars);
        let CoverSelection { essential, cover } = cover::select_cover(&prime_implicants, &minterms);

        debug!(
            num_vars,
            minterms = minterms.len(),
            primes = prime_implicants.len(),
            essential = essential.len(),
            cover = cover.len(),
            "minimized formula"
        );

        Ok(Self {
            num_vars,
            minterms,
            prime_implicants,
            essential,
            cover,
        })
    }

    pub fn path_expressions(&self) -> Vec<PathExpression> {
        self.cover
            .iter()
            .map(Implicant::to_path_expression)
            .collect()
    }
}

/// Minimal sum-of-products cover of `formula` as path expressions.
///
/// An empty formula, a formula with no true row, or `num_vars == 0` yields an
/// empty cover.
pub fn minimize(formula: &str, num_vars: usize) -> Result<Vec<PathExpression>, MinimizeError> {
    Ok(Minimization::run(formula, num_vars)?.path_expressions())
}

/// True rows of `formula` over `num_vars` variables, ascending.
pub fn truth_table(formula: &str, num_vars: usize) -> Result<Vec<u64>, MinimizeError> {
    if num_vars > MAX_VARIABLES {
        return Err(MinimizeError::TooManyVariables {
            count: num_vars,
            max: MAX_VARIABLES,
        });
    }
    let expr = parse_formula(formula)?;
    if let Some(var) = expr.max_var().filter(|&v| v >= num_vars) {
        return Err(MinimizeError::UnknownVariable { var, num_vars });
    }
    Ok(tabulation::minterms(&expr, num_vars))
}
