//! Truth-table construction and Quine–McCluskey tabulation.

use std::collections::BTreeSet;

use ahash::AHashSet;
use tracing::trace;

use crate::formula::Expr;
use crate::implicant::Implicant;

/// Rows `0..2^num_vars` on which `expr` is true, ascending.
pub fn minterms(expr: &Expr, num_vars: usize) -> Vec<u64> {
    let rows = 1u64 << num_vars;
    (0..rows).filter(|&row| expr.eval(row)).collect()
}

/// All prime implicants of the function whose on-set is `minterms`, in
/// ascending `Implicant` order.
///
/// Each round looks up the single-position partners of every implicant in a
/// hash set instead of comparing groups pairwise.
pub fn prime_implicants(minterms: &[u64], num_vars: usize) -> Vec<Implicant> {
    let mut current: AHashSet<Implicant> = minterms
        .iter()
        .map(|&m| Implicant::from_minterm(m, num_vars))
        .collect();
    let mut primes = BTreeSet::new();
    let mut round = 0usize;

    while !current.is_empty() {
        let mut combined: AHashSet<Implicant> = AHashSet::new();
        let mut next: AHashSet<Implicant> = AHashSet::new();
        for imp in &current {
            for (partner, merged) in imp.upper_neighbours() {
                if current.contains(&partner) {
                    next.insert(merged);
                    combined.insert(*imp);
                    combined.insert(partner);
                }
            }
        }

        trace!(
            round,
            implicants = current.len(),
            merged = next.len(),
            "tabulation round"
        );

        primes.extend(current.into_iter().filter(|imp| !combined.contains(imp)));
        current = next;
        round += 1;
    }

    primes.into_iter().collect()
}
