//! Candidate subsets: a membership bit set, a cost, and (for dual-cost
//! problems) a secondary cost-index bit set.

use crate::bitset::BitSet;
use std::hash::{Hash, Hasher};

/// One candidate covering subset.
///
/// Equality and hashing are defined by the membership content (and the
/// cost-index content when present), never by the cost: two subsets
/// covering the same elements are the same candidate even if one is
/// cheaper. Costs must be non-negative; a negative cost is a caller bug
/// and fails construction loudly.
#[derive(Clone, Debug)]
pub struct Subset {
    members: BitSet,
    cost: f64,
    cost_indices: Option<BitSet>,
}

impl Subset {
    pub fn new(members: BitSet, cost: f64) -> Self {
        assert!(cost >= 0.0, "subset cost {} is negative", cost);
        Subset {
            members,
            cost,
            cost_indices: None,
        }
    }

    /// A subset participating in a dual-cost problem: `cost_indices`
    /// names the secondary cost indices this subset covers.
    pub fn with_cost_indices(members: BitSet, cost: f64, cost_indices: BitSet) -> Self {
        assert!(cost >= 0.0, "subset cost {} is negative", cost);
        Subset {
            members,
            cost,
            cost_indices: Some(cost_indices),
        }
    }

    pub fn from_indices(universe: usize, indices: &[usize], cost: f64) -> Self {
        Subset::new(BitSet::from_indices(universe, indices), cost)
    }

    pub fn members(&self) -> &BitSet {
        &self.members
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn cost_indices(&self) -> Option<&BitSet> {
        self.cost_indices.as_ref()
    }

    pub fn universe(&self) -> usize {
        self.members.universe()
    }

    /// Number of covered elements.
    pub fn size(&self) -> usize {
        self.members.count()
    }
}

impl PartialEq for Subset {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members && self.cost_indices == other.cost_indices
    }
}

impl Eq for Subset {}

impl Hash for Subset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.members.hash(state);
        self.cost_indices.hash(state);
    }
}
