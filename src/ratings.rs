//! Candidate rating strategies.
//!
//! A rating assigns every candidate a weight; for additions higher means
//! more attractive to add, for removals higher means more attractive to
//! remove. The four strategies trade lookahead depth against speed:
//! cost-effectiveness and coverage-frequency are local, the relaxation
//! rating iterates a damped probability fixpoint over the whole
//! candidate slice, and the hybrid rating temporarily mutates the family
//! to score one move ahead.

use crate::family::Family;
use crate::pool::{Pool, SubsetId};

/// Sentinel for moves that are free under the current cost model.
const MAX_RATING: f64 = 1e100;

/// Fixpoint steps of the relaxation rating.
const RELAX_ITERATIONS: usize = 3;
/// Damping factor per relaxation step.
const RELAX_DAMPING: f64 = 0.3;
/// Utility exponent of the coverage-frequency rating.
const FREQUENCY_EXPONENT: u32 = 2;
/// Cost exponent of the relative coverage-frequency form.
const REL_COST_EXPONENT: i32 = 1;

/// Which of the two hybrid scoring formulas to use per direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HybridStrategy {
    /// Score from the current coverage multiplicities.
    Direct,
    /// Score after temporarily applying the move.
    Lookahead,
}

#[derive(Clone, Debug)]
pub enum Rating {
    /// Chvatal-style marginal cost per alone-covered element, with a
    /// credit for members the candidate would make redundant.
    CostEffective,
    /// Coverage-frequency utility delta, absolute (per cost unit) or
    /// relative (utility density of the grown family).
    Frequency { absolute: bool },
    /// Damped iterative relaxation of the covering LP.
    Relaxation,
    /// Marchiori/Steenbeek-style hybrid scores.
    Hybrid {
        add: HybridStrategy,
        rmv: HybridStrategy,
        add_constant: f64,
    },
}

impl Rating {
    /// Weights for adding each of `candidates` (non-members) to
    /// `family`. Parallel to the candidate slice.
    pub fn w_add(&self, pool: &Pool, family: &mut Family, candidates: &[SubsetId]) -> Vec<f64> {
        match self {
            Rating::CostEffective => candidates
                .iter()
                .map(|&id| chvatal_add(pool, family, id))
                .collect(),
            Rating::Frequency { absolute } => {
                let mut cache = PowCache::new(FREQUENCY_EXPONENT);
                candidates
                    .iter()
                    .map(|&id| frequency_add(pool, family, id, *absolute, &mut cache))
                    .collect()
            }
            Rating::Relaxation => relaxation_add(pool, family, candidates),
            Rating::Hybrid { add, add_constant, .. } => candidates
                .iter()
                .map(|&id| match add {
                    HybridStrategy::Direct => hybrid_add_direct(pool, family, id, *add_constant),
                    HybridStrategy::Lookahead => {
                        hybrid_add_lookahead(pool, family, id, *add_constant)
                    }
                })
                .collect(),
        }
    }

    /// Weights for removing each of `candidates` (members) from
    /// `family`.
    pub fn w_rmv(&self, pool: &Pool, family: &mut Family, candidates: &[SubsetId]) -> Vec<f64> {
        match self {
            Rating::CostEffective => candidates
                .iter()
                .map(|&id| chvatal_rmv(pool, family, id))
                .collect(),
            Rating::Frequency { .. } => {
                let mut cache = PowCache::new(FREQUENCY_EXPONENT);
                candidates
                    .iter()
                    .map(|&id| frequency_rmv(pool, family, id, &mut cache))
                    .collect()
            }
            // Relaxation has no removal theory; uniform weights let the
            // selection fall back to its tie-break.
            Rating::Relaxation => {
                let n = candidates.len().max(1) as f64;
                vec![-1.0 / n; candidates.len()]
            }
            Rating::Hybrid { rmv, add_constant, .. } => candidates
                .iter()
                .map(|&id| match rmv {
                    HybridStrategy::Direct => hybrid_rmv_direct(pool, family, id, *add_constant),
                    HybridStrategy::Lookahead => {
                        hybrid_rmv_lookahead(pool, family, id, *add_constant)
                    }
                })
                .collect(),
        }
    }
}

fn chvatal_add(pool: &Pool, family: &mut Family, id: SubsetId) -> f64 {
    let alone = family.alone_count(pool, id) as f64;
    if alone == 0.0 {
        return -MAX_RATING;
    }
    let cost = family.cost_adding(pool, id);
    // Credit: the most expensive member this candidate frees up.
    let saving = family
        .newly_redundant(pool, id)
        .into_iter()
        .map(|m| family.cost_removing(pool, m))
        .fold(0.0, f64::max);
    let net = saving - cost;
    if net < 0.0 {
        net / alone
    } else if net == 0.0 {
        alone / family.universe() as f64
    } else {
        net * alone
    }
}

fn chvatal_rmv(pool: &Pool, family: &mut Family, id: SubsetId) -> f64 {
    let alone = family.alone_count(pool, id) as f64;
    let cost = family.cost_removing(pool, id);
    if alone == 0.0 {
        // Redundant members are always the first to go.
        cost.max(1.0) * MAX_RATING
    } else {
        cost / alone
    }
}

/// Memoized integer powers of coverage multiplicities.
struct PowCache {
    exponent: u32,
    values: Vec<f64>,
}

impl PowCache {
    fn new(exponent: u32) -> Self {
        PowCache { exponent, values: Vec::new() }
    }

    fn value(&mut self, n: u32) -> f64 {
        let n = n as usize;
        while self.values.len() <= n {
            let next = (self.values.len() as f64).powi(self.exponent as i32);
            self.values.push(next);
        }
        self.values[n]
    }
}

/// Coverage utility: one point per covered element plus a small bonus
/// for multiplicity, so among equal covers the more robust one wins.
fn utility(family: &Family, cache: &mut PowCache) -> f64 {
    let n = family.universe();
    let mut bonus = 0.0;
    for e in 0..n {
        bonus += cache.value(family.coverage(e));
    }
    family.covered_count() as f64 + bonus / n as f64
}

fn frequency_add(
    pool: &Pool,
    family: &mut Family,
    id: SubsetId,
    absolute: bool,
    cache: &mut PowCache,
) -> f64 {
    let cost = family.cost_adding(pool, id);
    let before = utility(family, cache);
    let cost_before = family.cost(pool);
    family.insert(pool, id);
    let after = utility(family, cache);
    family.remove(pool, id);
    if absolute {
        if cost == 0.0 {
            return MAX_RATING;
        }
        (after - before) / cost
    } else {
        let denom_after = (cost_before + cost).powi(REL_COST_EXPONENT);
        let denom_before = cost_before.powi(REL_COST_EXPONENT);
        if denom_after == 0.0 || denom_before == 0.0 {
            return MAX_RATING;
        }
        after / denom_after - before / denom_before
    }
}

fn frequency_rmv(pool: &Pool, family: &mut Family, id: SubsetId, cache: &mut PowCache) -> f64 {
    let cost = family.cost_removing(pool, id);
    let before = utility(family, cache);
    family.remove(pool, id);
    let after = utility(family, cache);
    family.insert(pool, id);
    let lost = before - after;
    if lost == 0.0 {
        // Removal for free in utility terms.
        cost.max(1.0) * MAX_RATING
    } else {
        cost / lost
    }
}

/// Damped relaxation: membership probabilities per candidate, iterated
/// against per-element coverage probabilities under the product formula,
/// scaled down by normalized marginal cost.
fn relaxation_add(pool: &Pool, family: &mut Family, candidates: &[SubsetId]) -> Vec<f64> {
    let n = pool.universe();
    let exponent: i32 = if pool.unicost() { 1 } else { 2 };
    let costs: Vec<f64> = candidates
        .iter()
        .map(|&id| family.cost_adding(pool, id))
        .collect();
    let max_cost = costs.iter().cloned().fold(0.0, f64::max);
    let norm: Vec<f64> = costs
        .iter()
        .map(|&c| if max_cost > 0.0 { c / max_cost } else { 1.0 })
        .collect();

    let mut q = vec![0.5f64; candidates.len()];
    let mut keep = vec![1.0f64; n];
    for _ in 0..RELAX_ITERATIONS {
        // Probability every uncovered element stays uncovered.
        for k in keep.iter_mut() {
            *k = 1.0;
        }
        for (k, &id) in candidates.iter().enumerate() {
            for e in pool.get(id).members().iter() {
                if !family.is_covered(e) {
                    keep[e] *= 1.0 - q[k];
                }
            }
        }
        // Raw demand per candidate: mean residual need of its elements,
        // discounted by normalized cost.
        let mut raw = vec![0.0f64; candidates.len()];
        let mut raw_max = 0.0f64;
        for (k, &id) in candidates.iter().enumerate() {
            let mut need = 0.0;
            let mut count = 0usize;
            for e in pool.get(id).members().iter() {
                if !family.is_covered(e) {
                    need += keep[e];
                    count += 1;
                }
            }
            if count > 0 {
                let cost_weight = norm[k].powi(exponent).max(f64::MIN_POSITIVE.sqrt());
                raw[k] = need / count as f64 / cost_weight;
            }
            raw_max = raw_max.max(raw[k]);
        }
        if raw_max == 0.0 {
            break;
        }
        for (qk, rk) in q.iter_mut().zip(raw.iter()) {
            let target = rk / raw_max;
            *qk += RELAX_DAMPING * (target - *qk);
        }
    }
    q
}

fn hybrid_add_direct(pool: &Pool, family: &Family, id: SubsetId, add_constant: f64) -> f64 {
    let mut gain = 0.0;
    for e in pool.get(id).members().iter() {
        let mult = family.coverage(e) as f64;
        gain += 1.0 / ((mult + 1.0) * (mult + 1.0));
    }
    gain / (family.cost_adding(pool, id) + add_constant)
}

fn hybrid_add_lookahead(pool: &Pool, family: &mut Family, id: SubsetId, add_constant: f64) -> f64 {
    let cost = family.cost_adding(pool, id);
    family.insert(pool, id);
    // Removable mass the insertion unlocks: expensive members with low
    // residual necessity raise the score.
    let mut unlocked = 0.0;
    for m in family.member_ids() {
        if m == id {
            continue;
        }
        let alone = family.alone_count(pool, m) as f64;
        unlocked += family.cost_removing(pool, m) / (alone + add_constant);
    }
    family.remove(pool, id);
    unlocked / (cost + add_constant)
}

fn hybrid_rmv_direct(pool: &Pool, family: &Family, id: SubsetId, add_constant: f64) -> f64 {
    // Well-covered elements make a member safe to drop.
    let mut rarity = 0.0;
    for e in pool.get(id).members().iter() {
        let mult = family.coverage(e) as f64;
        rarity += 1.0 / (mult * mult);
    }
    family.cost_removing(pool, id) / (rarity + add_constant)
}

fn hybrid_rmv_lookahead(pool: &Pool, family: &mut Family, id: SubsetId, add_constant: f64) -> f64 {
    let cost = family.cost_removing(pool, id);
    family.remove(pool, id);
    let mut pressure = 0.0;
    for m in family.member_ids() {
        let alone = family.alone_count(pool, m) as f64;
        pressure += family.cost_removing(pool, m) / (alone + add_constant);
    }
    family.insert(pool, id);
    cost / (pressure + add_constant)
}
