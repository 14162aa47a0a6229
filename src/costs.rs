//! Cost models for families of subsets.
//!
//! The aggregate cost of a family is either the plain sum of its member
//! costs, that sum plus the cost of every covered secondary cost index,
//! or a quotient that divides the member-cost sum by the secondary cost
//! still left uncovered. The quotient form rewards families whose
//! members blanket the expensive cost indices.

use crate::bitset::BitSet;
use log::warn;

/// How much headroom the quotient denominator gets over the exact
/// index-cost total, so that the difference stays positive even once
/// every cost index is covered.
const MAX_COST_FACTOR: f64 = 1.000001;

/// Per-cost-index weights, accumulated either in floating point or in
/// fixed point with a configurable number of decimal digits. Fixed-point
/// accumulation makes long add/remove sequences drift-free.
#[derive(Clone, Debug)]
pub enum IndexCosts {
    Floating(Vec<f64>),
    Fixed { scaled: Vec<i64>, pow10: i64 },
}

impl IndexCosts {
    /// Fixed-point accumulation with `decimals` digits after the point.
    /// A negative `decimals` falls back to floating accumulation.
    pub fn fixed(costs: &[f64], decimals: i32) -> Self {
        if decimals < 0 {
            return IndexCosts::Floating(costs.to_vec());
        }
        let pow10 = 10i64.pow(decimals as u32);
        let scaled = costs.iter().map(|&c| (c * pow10 as f64).round() as i64).collect();
        IndexCosts::Fixed { scaled, pow10 }
    }

    pub fn floating(costs: &[f64]) -> Self {
        IndexCosts::Floating(costs.to_vec())
    }

    /// Number of cost indices.
    pub fn len(&self) -> usize {
        match self {
            IndexCosts::Floating(costs) => costs.len(),
            IndexCosts::Fixed { scaled, .. } => scaled.len(),
        }
    }

    /// Sum of the weights of all cost indices, accumulated the same way
    /// the per-family totals are.
    pub fn total(&self) -> f64 {
        match self {
            IndexCosts::Floating(costs) => costs.iter().sum(),
            IndexCosts::Fixed { scaled, pow10 } => {
                scaled.iter().sum::<i64>() as f64 / *pow10 as f64
            }
        }
    }

    /// Sum of the weights of the cost indices covered at least once.
    pub fn covered_cost(&self, counts: &[u32]) -> f64 {
        match self {
            IndexCosts::Floating(costs) => counts
                .iter()
                .zip(costs.iter())
                .filter(|(&n, _)| n > 0)
                .map(|(_, &c)| c)
                .sum(),
            IndexCosts::Fixed { scaled, pow10 } => {
                let sum: i64 = counts
                    .iter()
                    .zip(scaled.iter())
                    .filter(|(&n, _)| n > 0)
                    .map(|(_, &c)| c)
                    .sum();
                sum as f64 / *pow10 as f64
            }
        }
    }

    /// Cost of the indices a subset would cover first (count still 0).
    pub fn add_cost(&self, indices: &BitSet, counts: &[u32]) -> f64 {
        self.transition_cost(indices, counts, 0)
    }

    /// Cost of the indices a subset covers alone (count exactly 1).
    pub fn rmv_cost(&self, indices: &BitSet, counts: &[u32]) -> f64 {
        self.transition_cost(indices, counts, 1)
    }

    fn transition_cost(&self, indices: &BitSet, counts: &[u32], at: u32) -> f64 {
        match self {
            IndexCosts::Floating(costs) => indices
                .iter()
                .filter(|&i| counts[i] == at)
                .map(|i| costs[i])
                .sum(),
            IndexCosts::Fixed { scaled, pow10 } => {
                let sum: i64 = indices
                    .iter()
                    .filter(|&i| counts[i] == at)
                    .map(|i| scaled[i])
                    .sum();
                sum as f64 / *pow10 as f64
            }
        }
    }
}

/// The cost strategy of a problem, fixed at pool construction.
#[derive(Clone, Debug)]
pub enum CostModel {
    /// Sum of member costs.
    Additive,
    /// Sum of member costs plus the covered cost indices' weights.
    DualAdditive(IndexCosts),
    /// Member-cost sum divided by the uncovered index-cost headroom.
    Quotient { index_costs: IndexCosts, max_plus: f64 },
}

impl CostModel {
    pub fn quotient(index_costs: IndexCosts) -> Self {
        let total = index_costs.total();
        // With an all-zero index-cost vector the covered total stays 0
        // forever; any positive denominator works, so use 1.
        let max_plus = if total == 0.0 { 1.0 } else { total * MAX_COST_FACTOR };
        CostModel::Quotient { index_costs, max_plus }
    }

    pub fn index_costs(&self) -> Option<&IndexCosts> {
        match self {
            CostModel::Additive => None,
            CostModel::DualAdditive(ic) => Some(ic),
            CostModel::Quotient { index_costs, .. } => Some(index_costs),
        }
    }

    /// Whether subsets carry cost-index sets under this model.
    pub fn is_dual(&self) -> bool {
        self.index_costs().is_some()
    }
}

/// Clamp a quotient denominator to a small positive value. Reaching a
/// non-positive denominator means accumulated rounding ate the headroom
/// of `MAX_COST_FACTOR`; progress matters more than the lost precision,
/// so warn and continue.
pub(crate) fn clamp_denominator(diff: f64, context: &str) -> f64 {
    if diff <= 0.0 {
        warn!(
            "quotient cost denominator {} non-positive in {}; clamping",
            diff, context
        );
        f64::MIN_POSITIVE.sqrt()
    } else {
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_matches_floating_on_exact_values() {
        let costs = [1.5, 0.25, 3.0];
        let fixed = IndexCosts::fixed(&costs, 2);
        let float = IndexCosts::floating(&costs);
        let counts = [0u32, 1, 2];
        assert_eq!(fixed.total(), float.total());
        assert_eq!(fixed.covered_cost(&counts), float.covered_cost(&counts));
        let ix = BitSet::from_indices(3, &[0, 1, 2]);
        assert_eq!(fixed.add_cost(&ix, &counts), 1.5);
        assert_eq!(fixed.rmv_cost(&ix, &counts), 0.25);
    }

    #[test]
    fn fixed_point_rounds() {
        let fixed = IndexCosts::fixed(&[0.333, 0.333, 0.333], 1);
        // Each weight rounds to 0.3 before summation.
        assert!((fixed.total() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn quotient_headroom() {
        let model = CostModel::quotient(IndexCosts::floating(&[2.0, 3.0]));
        match model {
            CostModel::Quotient { max_plus, .. } => {
                assert!(max_plus > 5.0);
                assert!(max_plus < 5.001);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn quotient_zero_costs_get_unit_denominator() {
        match CostModel::quotient(IndexCosts::floating(&[0.0, 0.0])) {
            CostModel::Quotient { max_plus, .. } => assert_eq!(max_plus, 1.0),
            _ => unreachable!(),
        }
    }

    #[test]
    fn clamp_is_positive() {
        assert!(clamp_denominator(-1.0, "test") > 0.0);
        assert_eq!(clamp_denominator(2.0, "test"), 2.0);
    }
}
