//! Post-construction optimization operators.
//!
//! Every operator takes a redundancy-free cover and returns a cover that
//! costs no more. The driver composes the enabled operators in a fixed
//! sequence after each construction.

use crate::creation::Creation;
use crate::family::Family;
use crate::greedy;
use crate::pool::{Pool, SubsetId};
use crate::ratings::Rating;
use crate::selection::Selection;
use hashbrown::HashSet;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::VecDeque;

/// Up to this many redundant members the reduction is exhaustive;
/// beyond it the removal order is selection-guided.
const FULL_OPT_BORDER: usize = 8;
/// Restarts of the local search.
const LS_RESTARTS: usize = 5;
/// Taboo-length bound as a fraction of the cover size.
const LS_TABOO_FACTOR: f64 = 0.2;
/// Largest alone-coverage stripped by the iterated-remove operator.
const ITER_REMOVE_MAX: usize = 2;

/// FIFO taboo set over pool ids.
pub struct TabooSet {
    capacity: usize,
    queue: VecDeque<SubsetId>,
    set: HashSet<SubsetId>,
}

impl TabooSet {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        TabooSet {
            capacity,
            queue: VecDeque::new(),
            set: HashSet::new(),
        }
    }

    pub fn insert(&mut self, id: SubsetId) {
        if !self.set.insert(id) {
            return;
        }
        self.queue.push_back(id);
        if self.queue.len() > self.capacity {
            if let Some(old) = self.queue.pop_front() {
                self.set.remove(&old);
            }
        }
    }

    pub fn contains(&self, id: SubsetId) -> bool {
        self.set.contains(&id)
    }
}

/// Remove redundant members so the remaining cover is as cheap as
/// possible: exhaustively over every removal order when few members are
/// redundant, selection-guided otherwise. The family stays a cover.
pub fn reduce(
    pool: &Pool,
    family: &mut Family,
    rating: &Rating,
    selection: &Selection,
    rng: &mut StdRng,
) {
    if family.redundant_count() == 0 {
        return;
    }
    if family.redundant_count() <= FULL_OPT_BORDER {
        let (_, removed) = exhaustive_reduce(pool, family);
        family.remove_all(pool, &removed);
    } else {
        loop {
            let removable = family.redundant();
            if removable.is_empty() {
                break;
            }
            let weights = rating.w_rmv(pool, family, &removable);
            match selection.select(&removable, &weights, rng) {
                Some(id) => family.remove(pool, id),
                None => break,
            }
        }
    }
    debug_assert!(family.is_cover());
}

/// Cheapest reachable cost over all orders of removing redundant
/// members, with the removal set achieving it. Mutates and restores.
fn exhaustive_reduce(pool: &Pool, family: &mut Family) -> (f64, Vec<SubsetId>) {
    let redundant = family.redundant();
    if redundant.is_empty() {
        return (family.cost(pool), Vec::new());
    }
    let mut best_cost = f64::INFINITY;
    let mut best_removed = Vec::new();
    for id in redundant {
        family.remove(pool, id);
        let (cost, mut removed) = exhaustive_reduce(pool, family);
        family.insert(pool, id);
        if cost < best_cost {
            best_cost = cost;
            removed.push(id);
            best_removed = removed;
        }
    }
    (best_cost, best_removed)
}

#[derive(Clone, Copy, Debug)]
pub struct Optimizer {
    pub inferior: bool,
    pub add_one: bool,
    pub add_two: bool,
    pub iter_remove: bool,
    pub local_search: bool,
    /// Move budget of the local search, divided by the problem density.
    pub local_search_factor: f64,
}

impl Default for Optimizer {
    fn default() -> Self {
        Optimizer {
            inferior: true,
            add_one: true,
            add_two: false,
            iter_remove: true,
            local_search: true,
            local_search_factor: 30.0,
        }
    }
}

impl Optimizer {
    /// Run the enabled operators in sequence over `cover`.
    pub fn improve(
        &self,
        pool: &Pool,
        cover: Family,
        rating: &Rating,
        selection: &Selection,
        creation: Creation,
        rng: &mut StdRng,
    ) -> Family {
        assert!(cover.is_cover());
        let mut cover = cover;
        if self.inferior {
            cover = inferior(pool, cover, rating, selection, creation, rng);
        }
        if self.add_one {
            cover = add_search(pool, cover, rating, selection, rng, false);
        }
        if self.add_two {
            cover = add_search(pool, cover, rating, selection, rng, true);
        }
        if self.iter_remove && pool.unicost() {
            cover = iter_remove(pool, cover, rating, selection, creation, rng);
        }
        if self.local_search && pool.unicost() {
            cover = local_search(pool, cover, self.local_search_factor, rng);
        }
        debug_assert!(cover.is_cover());
        cover
    }
}

/// Drop members dominated by a single candidate: whenever inserting one
/// non-member makes at least two members redundant for less than their
/// combined removal value, those members are inferior. All inferior
/// members are dropped at once and the family re-completed greedily.
fn inferior(
    pool: &Pool,
    cover: Family,
    rating: &Rating,
    selection: &Selection,
    creation: Creation,
    rng: &mut StdRng,
) -> Family {
    let original_cost = cover.cost(pool);
    let mut work = cover.clone();
    let mut inferior_ids: HashSet<SubsetId> = HashSet::new();
    for t in pool.ids() {
        if work.contains(t) {
            continue;
        }
        let shadowed = work.newly_redundant(pool, t);
        if shadowed.len() < 2 {
            continue;
        }
        let value: f64 = shadowed.iter().map(|&m| work.cost_removing(pool, m)).sum();
        if work.cost_adding(pool, t) < value {
            inferior_ids.extend(shadowed);
        }
    }
    if inferior_ids.is_empty() {
        return cover;
    }
    let mut doomed: Vec<SubsetId> = inferior_ids.into_iter().collect();
    doomed.sort_unstable();
    work.remove_all(pool, &doomed);
    greedy::construct(pool, &mut work, rating, selection, creation, None, rng);
    reduce(pool, &mut work, rating, selection, rng);
    if work.is_cover() && work.cost(pool) <= original_cost {
        work
    } else {
        cover
    }
}

/// Insert one non-member (or, in pair mode, two) and strip what becomes
/// redundant; keep the best strict improvement and repeat until none.
fn add_search(
    pool: &Pool,
    cover: Family,
    rating: &Rating,
    selection: &Selection,
    rng: &mut StdRng,
    pairs: bool,
) -> Family {
    let mut best = cover;
    loop {
        let best_cost = best.cost(pool);
        let improved = if pairs {
            best_pair_insertion(pool, &mut best, best_cost, rating, selection, rng)
        } else {
            best_single_insertion(pool, &mut best, best_cost, rating, selection, rng)
        };
        match improved {
            Some(family) => best = family,
            None => return best,
        }
    }
}

fn best_single_insertion(
    pool: &Pool,
    best: &mut Family,
    best_cost: f64,
    rating: &Rating,
    selection: &Selection,
    rng: &mut StdRng,
) -> Option<Family> {
    let outsiders: Vec<SubsetId> = pool.ids().filter(|&t| !best.contains(t)).collect();
    let mut found: Option<(OrderedFloat<f64>, Family)> = None;
    for t in outsiders {
        // An insertion that frees nobody can only raise the cost.
        if best.newly_redundant(pool, t).is_empty() {
            continue;
        }
        let mut work = best.clone();
        work.insert(pool, t);
        reduce(pool, &mut work, rating, selection, rng);
        let cost = OrderedFloat(work.cost(pool));
        if *cost < best_cost && found.as_ref().map_or(true, |(c, _)| cost < *c) {
            found = Some((cost, work));
        }
    }
    found.map(|(_, family)| family)
}

fn best_pair_insertion(
    pool: &Pool,
    best: &mut Family,
    best_cost: f64,
    rating: &Rating,
    selection: &Selection,
    rng: &mut StdRng,
) -> Option<Family> {
    let outsiders: Vec<SubsetId> = pool.ids().filter(|&t| !best.contains(t)).collect();
    outsiders
        .iter()
        .cloned()
        .tuple_combinations::<(_, _)>()
        .filter_map(|(a, b)| {
            let mut work = best.clone();
            work.insert(pool, a);
            work.insert(pool, b);
            if work.redundant_count() == 0 {
                return None;
            }
            reduce(pool, &mut work, rating, selection, rng);
            let cost = work.cost(pool);
            if cost < best_cost {
                Some((OrderedFloat(cost), work))
            } else {
                None
            }
        })
        .min_by_key(|(cost, _)| *cost)
        .map(|(_, family)| family)
}

/// Strip every member alone-covering at most k elements (k = 1, 2),
/// re-complete greedily, keep the result if it improved. Unicost only.
fn iter_remove(
    pool: &Pool,
    cover: Family,
    rating: &Rating,
    selection: &Selection,
    creation: Creation,
    rng: &mut StdRng,
) -> Family {
    debug_assert!(pool.unicost());
    let mut best = cover;
    for k in 1..=ITER_REMOVE_MAX {
        let mut work = best.clone();
        let weak: Vec<SubsetId> = work
            .member_ids()
            .into_iter()
            .filter(|&m| work.alone_count(pool, m) <= k)
            .collect();
        if weak.is_empty() || weak.len() == work.size() {
            continue;
        }
        work.remove_all(pool, &weak);
        greedy::construct(pool, &mut work, rating, selection, creation, None, rng);
        reduce(pool, &mut work, rating, selection, rng);
        if work.is_cover() && work.cost(pool) < best.cost(pool) {
            best = work;
        }
    }
    best
}

/// Taboo-driven local search over unicost covers: random walks of
/// single-subset additions and removals, restarted from the incumbent,
/// accepting any complete cover with fewer members.
fn local_search(pool: &Pool, cover: Family, change_factor: f64, rng: &mut StdRng) -> Family {
    debug_assert!(pool.unicost());
    if cover.size() <= 1 || pool.len() < 2 {
        return cover;
    }
    // Fraction of subsets the average element appears in.
    let membership: usize = pool.ids().map(|id| pool.get(id).size()).sum();
    let density = membership as f64 / (pool.universe() * pool.len()) as f64;
    let moves = ((change_factor / density).round() as usize).max(1);

    let mut best = cover;
    for _ in 0..LS_RESTARTS {
        let mut current = best.clone();
        let taboo_bound = ((LS_TABOO_FACTOR * current.size() as f64).ceil() as usize).max(1);
        let mut taboo = TabooSet::new(1 + rng.gen_range(0, taboo_bound));
        let mut last_removed: Option<SubsetId> = None;
        let mut idle = 0usize;
        while idle < moves {
            idle += 1;
            match pick_move(pool, &current, &best, &taboo, last_removed, rng) {
                Some((true, id)) => {
                    current.insert(pool, id);
                    taboo.insert(id);
                }
                Some((false, id)) => {
                    current.remove(pool, id);
                    taboo.insert(id);
                    last_removed = Some(id);
                }
                None => break,
            }
            if current.is_cover() && current.size() < best.size() {
                best = current.clone();
                idle = 0;
            }
        }
    }
    best
}

/// The best-scored moves, one picked uniformly. Additions are admitted
/// only while the walk stays at least two members below the incumbent
/// and only for subsets touching the last removal or finishing the
/// cover outright; the score estimates the resulting (size, uncovered)
/// sum, lower being better.
fn pick_move(
    pool: &Pool,
    current: &Family,
    best: &Family,
    taboo: &TabooSet,
    last_removed: Option<SubsetId>,
    rng: &mut StdRng,
) -> Option<(bool, SubsetId)> {
    let size = current.size() as i64;
    let uncovered = current.uncovered_count() as i64;
    let mut best_score = i64::MAX;
    let mut moves: Vec<(bool, SubsetId)> = Vec::new();

    let mut offer = |score: i64, mv: (bool, SubsetId)| {
        if score < best_score {
            best_score = score;
            moves.clear();
        }
        if score == best_score {
            moves.push(mv);
        }
    };

    if current.size() + 1 < best.size() {
        for t in pool.ids() {
            if current.contains(t) || taboo.contains(t) {
                continue;
            }
            let alone = current.alone_count(pool, t);
            let finishes = alone == current.uncovered_count() && alone > 0;
            let touches = match last_removed {
                Some(last) => !pool.get(t).members().is_disjoint(pool.get(last).members()),
                None => true,
            };
            if !finishes && !touches {
                continue;
            }
            offer(size + 1 + uncovered - alone as i64, (true, t));
        }
    }
    for m in current.members() {
        if taboo.contains(m) {
            continue;
        }
        let alone = current.alone_count(pool, m) as i64;
        offer(size - 1 + uncovered + alone, (false, m));
    }
    if moves.is_empty() {
        None
    } else {
        Some(moves[rng.gen_range(0, moves.len())])
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

    fn setup() -> (StdRng, Rating, Selection) {
        (
            StdRng::seed_from_u64(1),
            Rating::CostEffective,
            Selection::deterministic(),
        )
    }

    #[test]
    fn taboo_set_evicts_fifo() {
        let mut taboo = TabooSet::new(2);
        taboo.insert(1);
        taboo.insert(2);
        taboo.insert(2); // re-insert does not evict
        assert!(taboo.contains(1));
        taboo.insert(3);
        assert!(!taboo.contains(1));
        assert!(taboo.contains(2) && taboo.contains(3));
    }

    #[test]
    fn reduce_picks_the_cheapest_removal_set() {
        // {0,1,2} is a cover; 0 and 1 are both redundant given 2 but
        // removing both uncovers nothing. Exhaustive reduction must end
        // at the singleton {2}.
        let pool = pool(
            4,
            &[(&[0, 1], 2.0), (&[2, 3], 2.0), (&[0, 1, 2, 3], 1.0)],
        );
        let mut family = Family::with_members(&pool, &[0, 1, 2]);
        let (mut rng, rating, selection) = setup();
        reduce(&pool, &mut family, &rating, &selection, &mut rng);
        assert_eq!(family.member_ids(), vec![2]);
    }

    #[test]
    fn reduce_keeps_the_expensive_necessary_member() {
        // Both cheap members are redundant only while the other stays.
        let pool = pool(3, &[(&[0, 1], 1.0), (&[1, 2], 1.0), (&[0, 1, 2], 5.0)]);
        let mut family = Family::with_members(&pool, &[0, 1, 2]);
        let (mut rng, rating, selection) = setup();
        reduce(&pool, &mut family, &rating, &selection, &mut rng);
        // Dropping 2 keeps cost 2; dropping 0 and 1 would cost 5.
        assert_eq!(family.member_ids(), vec![0, 1]);
    }

    #[test]
    fn add_one_swaps_in_a_dominating_subset() {
        let pool = pool(4, &[(&[0, 1], 2.0), (&[2, 3], 2.0), (&[0, 1, 2, 3], 1.0)]);
        let cover = Family::with_members(&pool, &[0, 1]);
        let (mut rng, rating, selection) = setup();
        let improved = add_search(&pool, cover, &rating, &selection, &mut rng, false);
        assert_eq!(improved.member_ids(), vec![2]);
    }

    #[test]
    fn add_two_finds_a_pairwise_swap() {
        // No single candidate covers either member's alone set, but the
        // two together displace both members, 2.0 vs 3.0.
        let pool = pool(
            6,
            &[
                (&[0, 1, 2], 1.5),
                (&[3, 4, 5], 1.5),
                (&[0, 1, 3, 4], 1.0),
                (&[2, 5], 1.0),
            ],
        );
        let cover = Family::with_members(&pool, &[0, 1]);
        let (mut rng, rating, selection) = setup();
        let same = add_search(&pool, cover.clone(), &rating, &selection, &mut rng, false);
        assert_eq!(same.member_ids(), vec![0, 1]);
        let improved = add_search(&pool, cover, &rating, &selection, &mut rng, true);
        assert_eq!(improved.member_ids(), vec![2, 3]);
    }

    #[test]
    fn inferior_drops_dominated_members() {
        let pool = pool(
            4,
            &[(&[0, 1], 2.0), (&[2, 3], 2.0), (&[0, 1, 2, 3], 1.0)],
        );
        let cover = Family::with_members(&pool, &[0, 1]);
        let (mut rng, rating, selection) = setup();
        let improved = inferior(
            &pool,
            cover,
            &rating,
            &selection,
            Creation::Fewest,
            &mut rng,
        );
        assert_eq!(improved.member_ids(), vec![2]);
    }

    #[test]
    fn operators_never_worsen_a_cover() {
        let pool = pool(
            6,
            &[
                (&[0, 1, 2], 1.0),
                (&[3, 4, 5], 1.0),
                (&[0, 3], 1.0),
                (&[1, 4], 1.0),
                (&[2, 5], 1.0),
            ],
        );
        let cover = Family::with_members(&pool, &[0, 1]);
        let cost = cover.cost(&pool);
        let (mut rng, rating, selection) = setup();
        let out = Optimizer::default().improve(
            &pool,
            cover,
            &rating,
            &selection,
            Creation::Fewest,
            &mut rng,
        );
        assert!(out.is_cover());
        assert!(out.cost(&pool) <= cost);
    }

    #[test]
    fn local_search_shrinks_a_bloated_unicost_cover() {
        let pool = pool(
            6,
            &[
                (&[0, 3], 1.0),
                (&[1, 4], 1.0),
                (&[2, 5], 1.0),
                (&[0, 1, 2], 1.0),
                (&[3, 4, 5], 1.0),
            ],
        );
        let cover = Family::with_members(&pool, &[0, 1, 2]);
        let mut rng = StdRng::seed_from_u64(3);
        let out = local_search(&pool, cover, 30.0, &mut rng);
        assert!(out.is_cover());
        assert!(out.size() <= 3);
    }
}
