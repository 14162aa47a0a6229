//! Candidate list creation: which subsets a greedy step may add to or
//! remove from the current family.
//!
//! *Fewest* keeps only the argmax of alone coverage and so pins the
//! greedy loop to the classical strongest-first order. *Most* hands the
//! whole useful frontier to the rating, filtered by a minimum coverage
//! derived from the member bound and by the best known cost. Candidate
//! lists are always in ascending id order.

use crate::family::Family;
use crate::pool::{Pool, SubsetId};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Creation {
    Fewest,
    Most,
}

impl Creation {
    /// Non-members worth offering for addition. Empty only when no
    /// candidate covers anything alone (the family already covers all
    /// it can).
    pub fn add_candidates(
        &self,
        pool: &Pool,
        family: &Family,
        best_cost: Option<f64>,
    ) -> Vec<SubsetId> {
        match self {
            Creation::Fewest => fewest_add(pool, family),
            Creation::Most => {
                let candidates = most_add(pool, family, best_cost);
                if candidates.is_empty() {
                    // The filters can empty out even when progress is
                    // possible; the strongest-first list never does.
                    fewest_add(pool, family)
                } else {
                    candidates
                }
            }
        }
    }

    /// Members worth offering for removal.
    pub fn rmv_candidates(&self, pool: &Pool, family: &Family) -> Vec<SubsetId> {
        match self {
            // The least necessary members, ties kept.
            Creation::Fewest => {
                let mut min = usize::MAX;
                let mut result = Vec::new();
                for id in family.member_ids() {
                    let alone = family.alone_count(pool, id);
                    if alone < min {
                        min = alone;
                        result.clear();
                    }
                    if alone == min {
                        result.push(id);
                    }
                }
                result
            }
            // Everything not currently necessary.
            Creation::Most => family.redundant(),
        }
    }
}

fn fewest_add(pool: &Pool, family: &Family) -> Vec<SubsetId> {
    let mut max = 0usize;
    let mut result = Vec::new();
    for id in pool.ids() {
        if family.contains(id) {
            continue;
        }
        let alone = family.alone_count(pool, id);
        if alone > max {
            max = alone;
            result.clear();
        }
        if alone == max && alone > 0 {
            result.push(id);
        }
    }
    result
}

fn most_add(pool: &Pool, family: &Family, best_cost: Option<f64>) -> Vec<SubsetId> {
    // With a member bound, the remaining slots must suffice to finish
    // the cover; demand an average share of the uncovered elements.
    let min_alone = match pool.member_bound() {
        Some(bound) if bound.max > family.size() => {
            let slots = bound.max - family.size();
            (family.uncovered_count() + slots - 1) / slots
        }
        _ => 1,
    };
    let min_alone = min_alone.max(1);
    let family_cost = best_cost.map(|_| family.cost(pool));
    pool.ids()
        .filter(|&id| !family.contains(id))
        .filter(|&id| family.covers_alone_at_least(pool, id, min_alone))
        .filter(|&id| match (best_cost, family_cost) {
            (Some(best), Some(current)) => current + family.cost_adding(pool, id) < best,
            _ => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costs::CostModel;
    use crate::pool::MemberBound;
    use crate::subset::Subset;

    fn pool(universe: usize, subsets: &[&[usize]]) -> Pool {
        let mut pool = Pool::new(universe, CostModel::Additive);
        for s in subsets {
            pool.push(Subset::from_indices(universe, s, 1.0));
        }
        pool
    }

    #[test]
    fn fewest_keeps_only_strongest() {
        let pool = pool(6, &[&[0, 1, 2, 3], &[0, 1], &[4, 5], &[2, 3, 4, 5]]);
        let family = Family::new(&pool);
        assert_eq!(Creation::Fewest.add_candidates(&pool, &family, None), vec![0, 3]);
    }

    #[test]
    fn most_keeps_every_useful_candidate() {
        let pool = pool(6, &[&[0, 1, 2, 3], &[0, 1], &[4, 5], &[2, 3, 4, 5]]);
        let mut family = Family::new(&pool);
        assert_eq!(
            Creation::Most.add_candidates(&pool, &family, None),
            vec![0, 1, 2, 3]
        );
        family.insert(&pool, 0);
        // 1 covers nothing alone anymore.
        assert_eq!(Creation::Most.add_candidates(&pool, &family, None), vec![2, 3]);
    }

    #[test]
    fn most_filters_by_best_cost_with_fallback() {
        let mut pool = Pool::new(4, CostModel::Additive);
        pool.push(Subset::from_indices(4, &[0, 1], 1.0));
        pool.push(Subset::from_indices(4, &[2, 3], 5.0));
        let mut family = Family::new(&pool);
        family.insert(&pool, 0);
        // Only subset 1 can make progress; it busts the cost cap, so
        // the strongest-first fallback still offers it.
        assert_eq!(
            Creation::Most.add_candidates(&pool, &family, Some(3.0)),
            vec![1]
        );
    }

    #[test]
    fn member_bound_raises_minimum_coverage() {
        let mut pool = Pool::with_member_bound(
            6,
            CostModel::Additive,
            MemberBound { max: 2, penalty: 100.0 },
        );
        pool.push(Subset::from_indices(6, &[0, 1, 2], 1.0));
        pool.push(Subset::from_indices(6, &[0], 1.0));
        pool.push(Subset::from_indices(6, &[3, 4, 5], 1.0));
        let family = Family::new(&pool);
        // Two slots for six elements: demand three alone-covered each.
        assert_eq!(Creation::Most.add_candidates(&pool, &family, None), vec![0, 2]);
    }

    #[test]
    fn removal_candidates() {
        let pool = pool(5, &[&[0, 1, 2], &[2, 3, 4], &[0, 1, 2, 3, 4]]);
        let family = Family::with_members(&pool, &[0, 1, 2]);
        // 2 shadows both others; nobody covers alone.
        assert_eq!(Creation::Most.rmv_candidates(&pool, &family), vec![0, 1, 2]);
        let partial = Family::with_members(&pool, &[0, 1]);
        assert!(Creation::Most.rmv_candidates(&pool, &partial).is_empty());
        assert_eq!(Creation::Fewest.rmv_candidates(&pool, &partial), vec![0, 1]);
    }
}
