//! The greedy construction loop: grow a family until it covers.

use crate::creation::Creation;
use crate::family::Family;
use crate::pool::Pool;
use crate::ratings::Rating;
use crate::selection::Selection;
use rand::rngs::StdRng;
use rand::Rng;

/// Probability of an interleaved removal step between additions, in
/// randomized mode. Lets construction escape an early bad pick instead
/// of papering over it.
const INTERLEAVED_RMV_PROB: f64 = 0.1;

/// Grow `family` until it covers the universe (or no candidate can make
/// progress). Each step adds the selected candidate and strips every
/// member the addition made redundant; in randomized mode an occasional
/// removal step is interleaved.
pub fn construct(
    pool: &Pool,
    family: &mut Family,
    rating: &Rating,
    selection: &Selection,
    creation: Creation,
    best_cost: Option<f64>,
    rng: &mut StdRng,
) {
    while !family.is_cover() {
        let candidates = creation.add_candidates(pool, family, best_cost);
        if candidates.is_empty() {
            // Nothing left can cover a new element.
            break;
        }
        let weights = rating.w_add(pool, family, &candidates);
        let picked = match selection.select(&candidates, &weights, rng) {
            Some(id) => id,
            None => break,
        };
        family.insert(pool, picked);
        strip_redundant(pool, family, picked);

        if selection.randomized
            && family.size() > 1
            && rng.gen::<f64>() < INTERLEAVED_RMV_PROB
        {
            let removable = creation.rmv_candidates(pool, family);
            if !removable.is_empty() {
                let weights = rating.w_rmv(pool, family, &removable);
                if let Some(out) = selection.select(&removable, &weights, rng) {
                    family.remove(pool, out);
                }
            }
        }
    }
}

/// Remove every redundant member except `keep`. Removing one redundant
/// member can make another necessary again, so re-list after each drop.
pub fn strip_redundant(pool: &Pool, family: &mut Family, keep: usize) {
    loop {
        let victim = family.redundant().into_iter().find(|&m| m != keep);
        match victim {
            Some(id) => family.remove(pool, id),
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costs::CostModel;
    use crate::subset::Subset;
    use rand::SeedableRng;

    fn pool(universe: usize, subsets: &[(&[usize], f64)]) -> Pool {
        let mut pool = Pool::new(universe, CostModel::Additive);
        for (members, cost) in subsets {
            pool.push(Subset::from_indices(universe, members, *cost));
        }
        pool
    }

    #[test]
    fn deterministic_construct_finds_the_obvious_cover() {
        let pool = pool(6, &[(&[0, 1, 2], 1.0), (&[3, 4, 5], 1.0), (&[2, 3], 1.0)]);
        let mut family = Family::new(&pool);
        let mut rng = StdRng::seed_from_u64(1);
        construct(
            &pool,
            &mut family,
            &Rating::CostEffective,
            &Selection::deterministic(),
            Creation::Fewest,
            None,
            &mut rng,
        );
        assert!(family.is_cover());
        assert_eq!(family.member_ids(), vec![0, 1]);
    }

    #[test]
    fn construct_strips_members_made_redundant() {
        // Greedy takes the two halves first only if forced; seed the
        // family with the narrow pair, then the wide subset shadows it.
        let pool = pool(4, &[(&[0, 1], 3.0), (&[2, 3], 3.0), (&[0, 1, 2, 3], 1.0)]);
        let mut family = Family::with_members(&pool, &[0]);
        let mut rng = StdRng::seed_from_u64(1);
        construct(
            &pool,
            &mut family,
            &Rating::CostEffective,
            &Selection::deterministic(),
            Creation::Most,
            None,
            &mut rng,
        );
        assert!(family.is_cover());
        assert_eq!(family.member_ids(), vec![2]);
    }

    #[test]
    fn construct_stops_on_an_uncoverable_universe() {
        let pool = pool(3, &[(&[0], 1.0)]);
        let mut family = Family::new(&pool);
        let mut rng = StdRng::seed_from_u64(1);
        construct(
            &pool,
            &mut family,
            &Rating::CostEffective,
            &Selection::deterministic(),
            Creation::Fewest,
            None,
            &mut rng,
        );
        assert!(!family.is_cover());
        assert_eq!(family.member_ids(), vec![0]);
    }
}
