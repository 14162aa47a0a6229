//! Mutable families of chosen subsets with incremental coverage and
//! cost bookkeeping.
//!
//! A family is always bound to one [`Pool`]; its members are pool ids.
//! Every mutation keeps the per-element coverage counts, the covered /
//! uncovered bit sets, the uncovered / singly / multiply covered
//! counters, the necessity tracker and the cost state consistent, so
//! queries never rescan the pool.

use crate::bitset::BitSet;
use crate::costs::{clamp_denominator, CostModel};
use crate::pool::{Pool, SubsetId};
use crate::tracker::Tracker;

/// Secondary cost-index coverage for the dual cost models.
#[derive(Clone, Debug)]
struct AuxCosts {
    counts: Vec<u32>,
    covered_cost: f64,
}

#[derive(Clone, Debug)]
pub struct Family {
    coverage: Vec<u32>,
    covered: BitSet,
    uncovered: BitSet,
    uncovered_count: usize,
    single_count: usize,
    multi_count: usize,
    /// Sum over members of their size; total coverage mass.
    coverage_sum: usize,
    base_cost: f64,
    aux: Option<AuxCosts>,
    tracker: Tracker,
}

impl Family {
    /// The empty family over `pool`'s universe.
    pub fn new(pool: &Pool) -> Self {
        let n = pool.universe();
        let aux = pool.cost_model().index_costs().map(|ic| AuxCosts {
            counts: vec![0; ic.len()],
            covered_cost: 0.0,
        });
        Family {
            coverage: vec![0; n],
            covered: BitSet::new(n),
            uncovered: BitSet::full(n),
            uncovered_count: n,
            single_count: 0,
            multi_count: 0,
            coverage_sum: 0,
            base_cost: 0.0,
            aux,
            tracker: Tracker::new(pool.len(), n),
        }
    }

    /// A family holding the given members.
    pub fn with_members(pool: &Pool, ids: &[SubsetId]) -> Self {
        let mut family = Family::new(pool);
        for &id in ids {
            family.insert(pool, id);
        }
        family
    }

    pub fn contains(&self, id: SubsetId) -> bool {
        self.tracker.contains(id)
    }

    /// Number of members.
    pub fn size(&self) -> usize {
        self.tracker.member_count()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn universe(&self) -> usize {
        self.coverage.len()
    }

    /// Member ids in ascending order.
    pub fn members(&self) -> impl Iterator<Item = SubsetId> + '_ {
        self.tracker.members()
    }

    pub fn member_ids(&self) -> Vec<SubsetId> {
        self.members().collect()
    }

    pub fn coverage(&self, e: usize) -> u32 {
        self.coverage[e]
    }

    pub fn is_covered(&self, e: usize) -> bool {
        self.coverage[e] > 0
    }

    pub fn covered_set(&self) -> &BitSet {
        &self.covered
    }

    pub fn uncovered_count(&self) -> usize {
        self.uncovered_count
    }

    pub fn covered_count(&self) -> usize {
        self.coverage.len() - self.uncovered_count
    }

    pub fn single_count(&self) -> usize {
        self.single_count
    }

    pub fn multi_count(&self) -> usize {
        self.multi_count
    }

    pub fn is_cover(&self) -> bool {
        self.uncovered_count == 0
    }

    pub fn necessary_count(&self) -> usize {
        self.tracker.necessary_count()
    }

    pub fn redundant_count(&self) -> usize {
        self.tracker.redundant_count()
    }

    pub fn necessary(&self) -> Vec<SubsetId> {
        self.tracker.necessary()
    }

    pub fn redundant(&self) -> Vec<SubsetId> {
        self.tracker.redundant()
    }

    pub fn is_necessary(&self, pool: &Pool, id: SubsetId) -> bool {
        self.covers_alone_at_least(pool, id, 1)
    }

    /// Elements `id` covers (or would cover) alone: for members, the
    /// tracked alone-count; for non-members, the candidate's elements
    /// nobody covers yet.
    pub fn alone_count(&self, pool: &Pool, id: SubsetId) -> usize {
        if self.tracker.contains(id) {
            self.tracker.alone_count(id) as usize
        } else if self.uncovered_count == 0 {
            0
        } else {
            pool.get(id).members().count_not_in(&self.covered)
        }
    }

    /// Like `alone_count(..) >= k` but with an early-out disjointness
    /// test for the common `k == 1` case.
    pub fn covers_alone_at_least(&self, pool: &Pool, id: SubsetId, k: usize) -> bool {
        if self.tracker.contains(id) {
            self.tracker.alone_count(id) as usize >= k
        } else if self.uncovered_count == 0 {
            false
        } else if k == 1 {
            !pool.get(id).members().is_disjoint(&self.uncovered)
        } else {
            pool.get(id).members().count_not_in(&self.covered) >= k
        }
    }

    /// Members that would stop being necessary if `id` were added.
    pub fn newly_redundant(&mut self, pool: &Pool, id: SubsetId) -> Vec<SubsetId> {
        // Without singly covered elements nothing can lose necessity.
        if self.single_count == 0 || self.tracker.contains(id) {
            return Vec::new();
        }
        self.tracker.newly_redundant(pool.get(id).members())
    }

    pub fn insert(&mut self, pool: &Pool, id: SubsetId) {
        if self.tracker.contains(id) {
            return;
        }
        let subset = pool.get(id);
        assert_eq!(subset.universe(), self.coverage.len());
        self.tracker.insert(id, pool, &self.coverage);
        for e in subset.members().iter() {
            match self.coverage[e] {
                0 => {
                    self.uncovered_count -= 1;
                    self.single_count += 1;
                    self.covered.insert(e);
                    self.uncovered.remove(e);
                }
                1 => {
                    self.single_count -= 1;
                    self.multi_count += 1;
                }
                _ => {}
            }
            self.coverage[e] += 1;
        }
        self.base_cost += subset.cost();
        self.coverage_sum += subset.size();
        if let Some(aux) = self.aux.as_mut() {
            if let Some(indices) = subset.cost_indices() {
                for i in indices.iter() {
                    aux.counts[i] += 1;
                }
            }
            if let Some(ic) = pool.cost_model().index_costs() {
                aux.covered_cost = ic.covered_cost(&aux.counts);
            }
        }
    }

    pub fn remove(&mut self, pool: &Pool, id: SubsetId) {
        if !self.tracker.contains(id) {
            return;
        }
        let subset = pool.get(id);
        self.tracker.remove(id, pool, &self.coverage);
        for e in subset.members().iter() {
            match self.coverage[e] {
                1 => {
                    self.single_count -= 1;
                    self.uncovered_count += 1;
                    self.covered.remove(e);
                    self.uncovered.insert(e);
                }
                2 => {
                    self.multi_count -= 1;
                    self.single_count += 1;
                }
                _ => {}
            }
            self.coverage[e] -= 1;
        }
        self.base_cost -= subset.cost();
        // Floating accumulation may undershoot zero after long
        // add/remove sequences.
        if self.base_cost < 0.0 {
            self.base_cost = 0.0;
        }
        self.coverage_sum -= subset.size();
        if let Some(aux) = self.aux.as_mut() {
            if let Some(indices) = subset.cost_indices() {
                for i in indices.iter() {
                    aux.counts[i] -= 1;
                }
            }
            if let Some(ic) = pool.cost_model().index_costs() {
                aux.covered_cost = ic.covered_cost(&aux.counts);
            }
        }
    }

    pub fn insert_all(&mut self, pool: &Pool, ids: &[SubsetId]) {
        for &id in ids {
            self.insert(pool, id);
        }
    }

    pub fn remove_all(&mut self, pool: &Pool, ids: &[SubsetId]) {
        for &id in ids {
            self.remove(pool, id);
        }
    }

    /// Mean number of coverers per element.
    pub fn coverage_mean(&self) -> f64 {
        self.coverage_sum as f64 / self.coverage.len() as f64
    }

    fn base_with_penalty(&self, pool: &Pool, base: f64, size: usize) -> f64 {
        match pool.member_bound() {
            Some(bound) if size > bound.max => base + size as f64 * bound.penalty,
            _ => base,
        }
    }

    /// The family's aggregate cost under the pool's cost model. Always
    /// equal to a from-scratch recomputation.
    pub fn cost(&self, pool: &Pool) -> f64 {
        let base = self.base_with_penalty(pool, self.base_cost, self.size());
        match pool.cost_model() {
            CostModel::Additive => base,
            CostModel::DualAdditive(_) => base + self.aux().covered_cost,
            CostModel::Quotient { max_plus, .. } => {
                let diff = clamp_denominator(max_plus - self.aux().covered_cost, "cost");
                base / diff
            }
        }
    }

    fn aux(&self) -> &AuxCosts {
        match self.aux.as_ref() {
            Some(aux) => aux,
            None => panic!("dual cost model without aux state"),
        }
    }

    /// Marginal base cost of adding, member-bound penalty included.
    fn simple_cost_adding(&self, pool: &Pool, id: SubsetId) -> f64 {
        let cost = pool.get(id).cost();
        let size = self.size();
        match pool.member_bound() {
            Some(bound) if size >= bound.max => {
                if size == bound.max {
                    // The insertion pushes the whole family over the
                    // bound; every member starts paying.
                    cost + (size + 1) as f64 * bound.penalty
                } else {
                    cost + bound.penalty
                }
            }
            _ => cost,
        }
    }

    fn simple_cost_removing(&self, pool: &Pool, id: SubsetId) -> f64 {
        let cost = pool.get(id).cost();
        let size = self.size();
        match pool.member_bound() {
            Some(bound) if size > bound.max => {
                if size - 1 == bound.max {
                    cost + size as f64 * bound.penalty
                } else {
                    cost + bound.penalty
                }
            }
            _ => cost,
        }
    }

    /// Non-mutating cost delta of adding `id`; 0 for present members.
    pub fn cost_adding(&self, pool: &Pool, id: SubsetId) -> f64 {
        if self.tracker.contains(id) {
            return 0.0;
        }
        match pool.cost_model() {
            CostModel::Additive => self.simple_cost_adding(pool, id),
            CostModel::DualAdditive(ic) => {
                let indices = self.subset_indices(pool, id);
                self.simple_cost_adding(pool, id) + ic.add_cost(indices, &self.aux().counts)
            }
            CostModel::Quotient { index_costs, max_plus } => {
                let aux = self.aux();
                let gained = index_costs.add_cost(self.subset_indices(pool, id), &aux.counts);
                let diff =
                    clamp_denominator(max_plus - (aux.covered_cost + gained), "cost_adding");
                let base = self.base_with_penalty(pool, self.base_cost, self.size());
                let new_cost = (base + self.simple_cost_adding(pool, id)) / diff;
                new_cost - self.cost(pool)
            }
        }
    }

    /// Non-mutating cost delta of removing `id`; 0 for non-members.
    pub fn cost_removing(&self, pool: &Pool, id: SubsetId) -> f64 {
        if !self.tracker.contains(id) {
            return 0.0;
        }
        match pool.cost_model() {
            CostModel::Additive => self.simple_cost_removing(pool, id),
            CostModel::DualAdditive(ic) => {
                let indices = self.subset_indices(pool, id);
                self.simple_cost_removing(pool, id) + ic.rmv_cost(indices, &self.aux().counts)
            }
            CostModel::Quotient { index_costs, max_plus } => {
                let aux = self.aux();
                let lost = index_costs.rmv_cost(self.subset_indices(pool, id), &aux.counts);
                let diff =
                    clamp_denominator(max_plus - (aux.covered_cost - lost), "cost_removing");
                let base = self.base_with_penalty(pool, self.base_cost, self.size());
                let new_cost = (base - self.simple_cost_removing(pool, id)) / diff;
                self.cost(pool) - new_cost
            }
        }
    }

    fn subset_indices<'p>(&self, pool: &'p Pool, id: SubsetId) -> &'p BitSet {
        match pool.get(id).cost_indices() {
            Some(indices) => indices,
            None => panic!("dual cost model requires subsets with cost indices"),
        }
    }
}

/// Structural equality: the member set alone decides.
impl PartialEq for Family {
    fn eq(&self, other: &Self) -> bool {
        self.size() == other.size() && self.members().eq(other.members())
    }
}

impl Eq for Family {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costs::{CostModel, IndexCosts};
    use crate::subset::Subset;
    use proptest::prelude::*;

    fn additive_pool(universe: usize, subsets: &[(&[usize], f64)]) -> Pool {
        let mut pool = Pool::new(universe, CostModel::Additive);
        for (members, cost) in subsets {
            pool.push(Subset::from_indices(universe, members, *cost));
        }
        pool
    }

    #[test]
    fn coverage_counters() {
        let pool = additive_pool(5, &[(&[0, 1, 2], 1.0), (&[2, 3, 4], 1.0)]);
        let mut family = Family::new(&pool);
        assert_eq!(family.uncovered_count(), 5);
        family.insert(&pool, 0);
        assert_eq!(family.uncovered_count(), 2);
        assert_eq!(family.single_count(), 3);
        family.insert(&pool, 1);
        assert!(family.is_cover());
        assert_eq!(family.single_count(), 4);
        assert_eq!(family.multi_count(), 1);
        assert_eq!(family.coverage(2), 2);
        assert_eq!(family.cost(&pool), 2.0);
    }

    #[test]
    fn insert_remove_restores_exactly() {
        let pool = additive_pool(4, &[(&[0, 1], 1.5), (&[1, 2, 3], 2.5)]);
        let mut family = Family::new(&pool);
        family.insert(&pool, 0);
        let coverage_before: Vec<u32> = (0..4).map(|e| family.coverage(e)).collect();
        let cost_before = family.cost(&pool);
        family.insert(&pool, 1);
        family.remove(&pool, 1);
        let coverage_after: Vec<u32> = (0..4).map(|e| family.coverage(e)).collect();
        assert_eq!(coverage_before, coverage_after);
        assert_eq!(cost_before, family.cost(&pool));
    }

    #[test]
    fn alone_counts_for_members_and_candidates() {
        let pool = additive_pool(5, &[(&[0, 1, 2], 1.0), (&[2, 3, 4], 1.0), (&[4], 1.0)]);
        let mut family = Family::new(&pool);
        family.insert(&pool, 0);
        assert_eq!(family.alone_count(&pool, 0), 3);
        assert_eq!(family.alone_count(&pool, 1), 2); // candidate: 3, 4 uncovered
        assert!(family.covers_alone_at_least(&pool, 1, 2));
        assert!(!family.covers_alone_at_least(&pool, 2, 2));
        family.insert(&pool, 1);
        assert_eq!(family.alone_count(&pool, 2), 0); // cover complete
    }

    #[test]
    fn newly_redundant_matches_tracker() {
        let pool = additive_pool(
            5,
            &[(&[0, 1, 2], 1.0), (&[2, 3, 4], 1.0), (&[0, 1, 2, 3, 4], 3.0)],
        );
        let mut family = Family::new(&pool);
        family.insert(&pool, 0);
        family.insert(&pool, 1);
        assert_eq!(family.newly_redundant(&pool, 2), vec![0, 1]);
        // Members and complete covers yield nothing.
        assert!(family.newly_redundant(&pool, 0).is_empty());
        family.insert(&pool, 2);
        assert!(family.newly_redundant(&pool, 2).is_empty());
    }

    #[test]
    fn member_bound_penalty() {
        let mut pool = Pool::with_member_bound(
            4,
            CostModel::Additive,
            crate::pool::MemberBound { max: 1, penalty: 10.0 },
        );
        pool.push(Subset::from_indices(4, &[0, 1], 1.0));
        pool.push(Subset::from_indices(4, &[2, 3], 1.0));
        let mut family = Family::new(&pool);
        family.insert(&pool, 0);
        assert_eq!(family.cost(&pool), 1.0);
        // Second member crosses the bound: both members pay.
        assert_eq!(family.cost_adding(&pool, 1), 1.0 + 2.0 * 10.0);
        family.insert(&pool, 1);
        assert_eq!(family.cost(&pool), 2.0 + 2.0 * 10.0);
        assert_eq!(family.cost_removing(&pool, 1), 1.0 + 2.0 * 10.0);
    }

    fn dual_pool(quotient: bool) -> Pool {
        let ic = IndexCosts::floating(&[2.0, 3.0, 5.0]);
        let model = if quotient {
            CostModel::quotient(ic)
        } else {
            CostModel::DualAdditive(ic)
        };
        let mut pool = Pool::new(4, model);
        pool.push(Subset::with_cost_indices(
            BitSet::from_indices(4, &[0, 1]),
            1.0,
            BitSet::from_indices(3, &[0]),
        ));
        pool.push(Subset::with_cost_indices(
            BitSet::from_indices(4, &[2, 3]),
            1.0,
            BitSet::from_indices(3, &[0, 2]),
        ));
        pool
    }

    #[test]
    fn dual_additive_cost() {
        let pool = dual_pool(false);
        let mut family = Family::new(&pool);
        family.insert(&pool, 0);
        assert_eq!(family.cost(&pool), 1.0 + 2.0);
        // Index 0 already covered; only index 2's weight is added.
        assert!((family.cost_adding(&pool, 1) - (1.0 + 5.0)).abs() < 1e-9);
        family.insert(&pool, 1);
        assert_eq!(family.cost(&pool), 2.0 + 7.0);
        // Subset 1 alone covers index 2 but shares index 0.
        assert!((family.cost_removing(&pool, 1) - (1.0 + 5.0)).abs() < 1e-9);
    }

    #[test]
    fn quotient_cost_decreases_with_index_coverage() {
        let pool = dual_pool(true);
        let mut family = Family::new(&pool);
        family.insert(&pool, 0);
        let sparse = family.cost(&pool);
        // Marginal adding must equal the actual delta.
        let predicted = family.cost_adding(&pool, 1);
        family.insert(&pool, 1);
        let dense = family.cost(&pool);
        assert!((dense - sparse - predicted).abs() < 1e-9);
        // Same base cost over a larger covered-index mass divides by a
        // smaller headroom only when more weight is covered; here the
        // base doubled but the denominator shrank from 8 to 3 (of 10).
        assert!(dense > sparse);
        let restored = family.cost_removing(&pool, 1);
        family.remove(&pool, 1);
        assert!((family.cost(&pool) - (dense - restored)).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn random_scripts_keep_invariants(
            script in proptest::collection::vec((any::<bool>(), 0usize..6), 1..40)
        ) {
            let pool = additive_pool(
                8,
                &[
                    (&[0, 1, 2], 1.0),
                    (&[2, 3], 0.5),
                    (&[3, 4, 5], 2.0),
                    (&[5, 6, 7], 1.5),
                    (&[0, 7], 1.0),
                    (&[1, 3, 5, 7], 3.0),
                ],
            );
            let mut family = Family::new(&pool);
            for (add, id) in script {
                if add {
                    family.insert(&pool, id);
                } else {
                    family.remove(&pool, id);
                }
                // Coverage counts equal per-element membership counts.
                for e in 0..8 {
                    let expected = family
                        .members()
                        .filter(|&m| pool.get(m).members().contains(e))
                        .count() as u32;
                    prop_assert_eq!(family.coverage(e), expected);
                    prop_assert_eq!(family.is_covered(e), expected > 0);
                }
                // Incremental necessity equals a from-scratch recount.
                let necessary_scratch = family
                    .members()
                    .filter(|&m| {
                        pool.get(m)
                            .members()
                            .iter()
                            .any(|e| family.coverage(e) == 1)
                    })
                    .count();
                prop_assert_eq!(family.necessary_count(), necessary_scratch);
                // Cost equals a from-scratch sum.
                let cost_scratch: f64 =
                    family.members().map(|m| pool.get(m).cost()).sum();
                prop_assert!((family.cost(&pool) - cost_scratch).abs() < 1e-9);
            }
        }
    }
}
