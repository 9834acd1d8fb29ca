//! Cover selection: essential prime implicants, then Petrick's method on
//! whatever they leave uncovered.
//!
//! Petrick tie-break: fewest terms, then fewest literals, then the
//! lexicographically smallest set of prime indices (primes are sorted, so
//! this is stable for a given formula).

use std::collections::BTreeSet;

use tracing::trace;

use crate::implicant::Implicant;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoverSelection {
    pub essential: Vec<Implicant>,
    pub cover: Vec<Implicant>,
}

pub fn select_cover(primes: &[Implicant], minterms: &[u64]) -> CoverSelection {
    let coverage: Vec<BTreeSet<usize>> = minterms
        .iter()
        .map(|&m| {
            primes
                .iter()
                .enumerate()
                .filter(|(_, p)| p.covers(m))
                .map(|(i, _)| i)
                .collect()
        })
        .collect();

    let essential: BTreeSet<usize> = coverage
        .iter()
        .filter(|covering| covering.len() == 1)
        .filter_map(|covering| covering.iter().next().copied())
        .collect();

    let remaining: Vec<BTreeSet<usize>> = coverage
        .into_iter()
        .filter(|covering| covering.is_disjoint(&essential))
        .collect();

    let mut chosen = essential.clone();
    if !remaining.is_empty() {
        chosen.extend(petrick(primes, remaining));
    }

    CoverSelection {
        essential: essential.iter().map(|&i| primes[i]).collect(),
        cover: chosen.iter().map(|&i| primes[i]).collect(),
    }
}

/// Minimal selection of prime indices satisfying every sum in `sums`.
fn petrick(primes: &[Implicant], sums: Vec<BTreeSet<usize>>) -> BTreeSet<usize> {
    let sums = absorb(sums);
    trace!(sums = sums.len(), "petrick product of sums");

    let mut products: Vec<BTreeSet<usize>> = vec![BTreeSet::new()];
    for sum in &sums {
        let mut next = Vec::with_capacity(products.len() * sum.len());
        for product in &products {
            // `P · (x + ...)` with `x ∈ P` absorbs back to `P`.
            if !product.is_disjoint(sum) {
                next.push(product.clone());
                continue;
            }
            for &i in sum {
                let mut expanded = product.clone();
                expanded.insert(i);
                next.push(expanded);
            }
        }
        products = absorb(next);
    }

    let literals = |term: &BTreeSet<usize>| -> u32 {
        term.iter().map(|&i| primes[i].literal_count()).sum()
    };
    products
        .into_iter()
        .min_by(|a, b| {
            a.len()
                .cmp(&b.len())
                .then_with(|| literals(a).cmp(&literals(b)))
                .then_with(|| a.cmp(b))
        })
        .unwrap_or_default()
}

/// Drop duplicates and every set that is a superset of another.
fn absorb(mut terms: Vec<BTreeSet<usize>>) -> Vec<BTreeSet<usize>> {
    terms.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    terms.dedup();
    let mut kept: Vec<BTreeSet<usize>> = Vec::with_capacity(terms.len());
    for term in terms {
        if !kept.iter().any(|k| k.is_subset(&term)) {
            kept.push(term);
        }
    }
    kept
}
