//! Packed ternary implicants.
//!
//! An implicant fixes some variables and leaves the rest as don't-care. It is
//! stored as two bitfields over `num_vars` positions:
//!
//! | `care` bit | `value` bit | meaning      |
//! |------------|-------------|--------------|
//! | 1          | 1           | forced true  |
//! | 1          | 0           | forced false |
//! | 0          | 0           | don't care   |
//!
//! `value` never has a bit set outside `care`. Nothing outside this module
//! touches the raw bits; callers read positions through [`Implicant::literal`].

use crate::path::{Literal, PathExpression};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ternary {
    True,
    False,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Implicant {
    care: u64,
    value: u64,
    num_vars: u32,
}

fn full_mask(num_vars: usize) -> u64 {
    if num_vars >= u64::BITS as usize {
        u64::MAX
    } else {
        (1u64 << num_vars) - 1
    }
}

impl Implicant {
    /// The implicant covering exactly one truth-table row.
    pub fn from_minterm(minterm: u64, num_vars: usize) -> Self {
        let care = full_mask(num_vars);
        Self {
            care,
            value: minterm & care,
            num_vars: num_vars as u32,
        }
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars as usize
    }

    pub fn literal(&self, var: usize) -> Ternary {
        if var >= self.num_vars() {
            return Ternary::DontCare;
        }
        let bit = 1u64 << var;
        match (self.care & bit != 0, self.value & bit != 0) {
            (false, _) => Ternary::DontCare,
            (true, true) => Ternary::True,
            (true, false) => Ternary::False,
        }
    }

    pub fn covers(&self, minterm: u64) -> bool {
        minterm & self.care == self.value
    }

    /// Number of forced positions.
    pub fn literal_count(&self) -> u32 {
        self.care.count_ones()
    }

    /// For every position forced false: the implicant forcing it true
    /// instead, paired with the merge of the two.
    pub fn upper_neighbours(&self) -> impl Iterator<Item = (Implicant, Implicant)> {
        let this = *self;
        let zeros = this.care & !this.value;
        (0..this.num_vars())
            .map(|var| 1u64 << var)
            .filter(move |bit| zeros & bit != 0)
            .map(move |bit| {
                let partner = Implicant {
                    value: this.value | bit,
                    ..this
                };
                let merged = Implicant {
                    care: this.care & !bit,
                    ..this
                };
                (partner, merged)
            })
    }

    /// Combine two implicants that agree everywhere except one forced
    /// position, which becomes don't-care.
    pub fn merge(&self, other: &Implicant) -> Option<Implicant> {
        if self.care != other.care || self.num_vars != other.num_vars {
            return None;
        }
        let diff = self.value ^ other.value;
        if diff.count_ones() != 1 {
            return None;
        }
        Some(Implicant {
            care: self.care & !diff,
            value: self.value & !diff,
            num_vars: self.num_vars,
        })
    }

    pub fn to_path_expression(&self) -> PathExpression {
        let literals = (0..self.num_vars())
            .filter_map(|var| match self.literal(var) {
                Ternary::True => Some(Literal::positive(var)),
                Ternary::False => Some(Literal::negative(var)),
                Ternary::DontCare => None,
            })
            .collect();
        PathExpression::new(literals)
    }
}
