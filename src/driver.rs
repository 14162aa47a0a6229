//! The iterated enhanced-greedy driver.
//!
//! One run is a fixed number of construct / optimize / accept / shrink
//! iterations over a seeded random source. Iteration 0 is fully
//! deterministic; later iterations draw their rating strategy from an
//! adaptive categorical distribution owned by the run, so two runs with
//! the same seed produce the same cover.

use crate::creation::Creation;
use crate::family::Family;
use crate::greedy;
use crate::optimize::{self, Optimizer};
use crate::pool::{Pool, SubsetId};
use crate::ratings::{HybridStrategy, Rating};
use crate::selection::Selection;
use crate::shrinking::Shrinking;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Multiplier applied to the used rating's weight after an iteration.
const WEIGHT_CHANGE: f64 = 1.5;
/// Sub-choice probabilities stay inside this range so no branch dies.
const SUB_WEIGHT_MIN: f64 = 0.01;

/// Result of a run: a covering family, or proof that none exists.
#[derive(Clone, Debug)]
pub enum Outcome {
    Cover(Family),
    Infeasible,
}

impl Outcome {
    pub fn cover(self) -> Option<Family> {
        match self {
            Outcome::Cover(family) => Some(family),
            Outcome::Infeasible => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum RatingKind {
    Relaxation,
    CostEffective,
    Frequency,
    Hybrid,
}

/// Adaptive distribution over the rating strategies, plus the
/// sub-choice probabilities of the frequency and hybrid ratings. Owned
/// by one run; never shared.
#[derive(Clone, Debug)]
pub struct PolicyWeights {
    relaxation: f64,
    cost_effective: f64,
    frequency: f64,
    hybrid: f64,
    /// Probability of the absolute frequency form.
    frequency_absolute: f64,
    /// Probability of the direct (non-lookahead) hybrid formulas.
    hybrid_direct: f64,
}

impl PolicyWeights {
    pub fn unicost() -> Self {
        PolicyWeights {
            relaxation: 0.2,
            cost_effective: 0.4,
            frequency: 0.0,
            hybrid: 0.4,
            frequency_absolute: 0.5,
            hybrid_direct: 0.5,
        }
    }

    pub fn multicost() -> Self {
        PolicyWeights {
            relaxation: 0.25,
            cost_effective: 0.75,
            frequency: 0.0,
            hybrid: 0.0,
            frequency_absolute: 0.5,
            hybrid_direct: 0.5,
        }
    }

    pub fn for_pool(pool: &Pool) -> Self {
        if pool.unicost() {
            PolicyWeights::unicost()
        } else {
            PolicyWeights::multicost()
        }
    }

    fn draw(&self, rng: &mut StdRng) -> RatingKind {
        let total = self.relaxation + self.cost_effective + self.frequency + self.hybrid;
        debug_assert!(total > 0.0);
        let mut r = rng.gen::<f64>() * total;
        for (weight, kind) in [
            (self.relaxation, RatingKind::Relaxation),
            (self.cost_effective, RatingKind::CostEffective),
            (self.frequency, RatingKind::Frequency),
            (self.hybrid, RatingKind::Hybrid),
        ]
        .iter()
        {
            if r < *weight {
                return *kind;
            }
            r -= *weight;
        }
        RatingKind::CostEffective
    }

    fn make_rating(&self, kind: RatingKind, unicost: bool, rng: &mut StdRng) -> Rating {
        match kind {
            RatingKind::Relaxation => Rating::Relaxation,
            RatingKind::CostEffective => Rating::CostEffective,
            RatingKind::Frequency => Rating::Frequency {
                absolute: rng.gen::<f64>() < self.frequency_absolute,
            },
            RatingKind::Hybrid => {
                let mut strategy = || {
                    if rng.gen::<f64>() < self.hybrid_direct {
                        HybridStrategy::Direct
                    } else {
                        HybridStrategy::Lookahead
                    }
                };
                let add = strategy();
                let rmv = strategy();
                Rating::Hybrid {
                    add,
                    rmv,
                    add_constant: if unicost { 1.0 } else { 0.05 },
                }
            }
        }
    }

    /// Reweight after an iteration: the used rating gains on an
    /// improved best and loses otherwise, its sub-choice moves by
    /// square root or square, and the main weights renormalize.
    fn adapt(&mut self, kind: RatingKind, rating: &Rating, improved: bool) {
        let factor = if improved { WEIGHT_CHANGE } else { 1.0 / WEIGHT_CHANGE };
        match kind {
            RatingKind::Relaxation => self.relaxation *= factor,
            RatingKind::CostEffective => self.cost_effective *= factor,
            RatingKind::Frequency => self.frequency *= factor,
            RatingKind::Hybrid => self.hybrid *= factor,
        }
        let total = self.relaxation + self.cost_effective + self.frequency + self.hybrid;
        if total > 0.0 {
            self.relaxation /= total;
            self.cost_effective /= total;
            self.frequency /= total;
            self.hybrid /= total;
        }
        match rating {
            Rating::Frequency { absolute } => {
                self.frequency_absolute = nudge(self.frequency_absolute, *absolute, improved);
            }
            Rating::Hybrid { add, .. } => {
                let direct = *add == HybridStrategy::Direct;
                self.hybrid_direct = nudge(self.hybrid_direct, direct, improved);
            }
            _ => {}
        }
    }
}

/// Move the probability of the sub-choice actually taken: square root
/// grows it on success, squaring shrinks it on failure.
fn nudge(p: f64, taken_primary: bool, improved: bool) -> f64 {
    let q = if taken_primary { p } else { 1.0 - p };
    let q = if improved { q.sqrt() } else { q * q };
    let q = q.max(SUB_WEIGHT_MIN).min(1.0 - SUB_WEIGHT_MIN);
    if taken_primary {
        q
    } else {
        1.0 - q
    }
}

/// Configuration of one iterated run.
#[derive(Clone, Debug)]
pub struct IterEnhancedGreedy {
    /// Total construct/optimize iterations, iteration 0 included.
    pub iterations: usize,
    pub seed: u64,
    pub optimizer: Optimizer,
    pub shrinking: Shrinking,
}

impl Default for IterEnhancedGreedy {
    fn default() -> Self {
        IterEnhancedGreedy {
            iterations: 10,
            seed: 1,
            optimizer: Optimizer::default(),
            shrinking: Shrinking::Uniform,
        }
    }
}

impl IterEnhancedGreedy {
    /// Search for a minimum-cost cover of the pool's universe. A
    /// supplied known cover must actually cover (caller bug otherwise)
    /// and seeds the incumbent.
    pub fn solve(&self, pool: &Pool, known: Option<&Family>) -> Outcome {
        let n = pool.universe();
        if n == 0 {
            return Outcome::Cover(Family::new(pool));
        }
        if pool.coverable().count() < n {
            return Outcome::Infeasible;
        }
        if let Some(known) = known {
            assert!(known.is_cover(), "supplied known cover does not cover");
        }

        // Subsets that are the only coverer of some element belong to
        // every cover; when they already cover on their own, the search
        // is over before it starts.
        let mandatory = mandatory_subsets(pool);
        let mandatory_family = Family::with_members(pool, &mandatory);
        if mandatory_family.is_cover() {
            return Outcome::Cover(mandatory_family);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut weights = PolicyWeights::for_pool(pool);
        let unicost = pool.unicost();

        // Iteration 0: the strong deterministic pass.
        let rating0 = if pool.linear_cost() {
            Rating::Relaxation
        } else {
            Rating::CostEffective
        };
        let mut first = mandatory_family;
        let selection0 = Selection::deterministic();
        let creation0 = creation_for(pool, &rating0);
        greedy::construct(pool, &mut first, &rating0, &selection0, creation0, None, &mut rng);
        debug_assert!(first.is_cover());
        optimize::reduce(pool, &mut first, &rating0, &selection0, &mut rng);
        let mut best = self
            .optimizer
            .improve(pool, first, &rating0, &selection0, creation0, &mut rng);
        if let Some(known) = known {
            if known.cost(pool) <= best.cost(pool) {
                best = known.clone();
            }
        }
        debug!("iteration 0: cost {}", best.cost(pool));

        let selection = Selection::randomized();
        for iteration in 1..self.iterations {
            let best_cost = best.cost(pool);
            let kind = weights.draw(&mut rng);
            let rating = weights.make_rating(kind, unicost, &mut rng);
            let creation = creation_for(pool, &rating);

            let mut work = self.shrinking.shrink(pool, &best, &mut rng);
            greedy::construct(
                pool,
                &mut work,
                &rating,
                &selection,
                creation,
                Some(best_cost),
                &mut rng,
            );
            if !work.is_cover() {
                weights.adapt(kind, &rating, false);
                continue;
            }
            optimize::reduce(pool, &mut work, &rating, &selection, &mut rng);
            let work = self
                .optimizer
                .improve(pool, work, &rating, &selection, creation, &mut rng);
            let cost = work.cost(pool);
            debug!("iteration {}: cost {} (best {})", iteration, cost, best_cost);
            let improved = cost < best_cost;
            if cost <= best_cost {
                // Ties are accepted: a different cover at equal cost
                // diversifies the next shrink.
                best = work;
            }
            weights.adapt(kind, &rating, improved);
        }
        Outcome::Cover(best)
    }
}

fn creation_for(pool: &Pool, rating: &Rating) -> Creation {
    if !pool.unicost() || matches!(rating, Rating::Relaxation) {
        Creation::Most
    } else {
        Creation::Fewest
    }
}

/// Ids of subsets that are the sole pool-wide coverer of some element.
fn mandatory_subsets(pool: &Pool) -> Vec<SubsetId> {
    let mut counts = vec![0u32; pool.universe()];
    for id in pool.ids() {
        for e in pool.get(id).members().iter() {
            counts[e] += 1;
        }
    }
    pool.ids()
        .filter(|&id| pool.get(id).members().iter().any(|e| counts[e] == 1))
        .collect()
}
