//! Shrinking the incumbent cover into the seed of the next iteration.
//!
//! The shrunk family keeps every necessary ("fixed") member and loses a
//! random share of the rest, so the next construction starts from a
//! promising partial cover instead of from scratch. A shrink that still
//! covers gives the construction nothing to do, so it is retried.

use crate::family::Family;
use crate::pool::{Pool, SubsetId};
use crate::ratings::Rating;
use rand::rngs::StdRng;
use rand::Rng;

/// Chance of dropping every non-fixed member at once, unicost problems.
const ZERO_PROB_UNICOST: f64 = 0.2;
/// Keep fraction of the uniform shrink is drawn from this range.
const KEEP_MIN: f64 = 0.6;
const KEEP_SPAN: f64 = 0.2;
/// Target removal share of the rating-proportional shrink.
const RMV_PORTION: f64 = 0.3;
/// Give up re-drawing after this many covering results.
const MAX_RETRIES: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shrinking {
    /// Every non-fixed member faces the same keep probability.
    Uniform,
    /// Removal probability proportional to the cost-effectiveness
    /// removal rating: expensive, barely necessary members go first.
    RatingProportional,
}

impl Shrinking {
    pub fn shrink(&self, pool: &Pool, best: &Family, rng: &mut StdRng) -> Family {
        let fixed: Vec<SubsetId> = best.necessary();
        let loose: Vec<SubsetId> = best
            .member_ids()
            .into_iter()
            .filter(|id| !fixed.contains(id))
            .collect();
        if loose.is_empty() {
            return best.clone();
        }
        let zero_prob = if pool.unicost() { ZERO_PROB_UNICOST } else { 0.0 };
        for _ in 0..MAX_RETRIES {
            if rng.gen::<f64>() < zero_prob {
                let mut work = best.clone();
                work.remove_all(pool, &loose);
                return work;
            }
            let work = match self {
                Shrinking::Uniform => self.uniform(pool, best, &loose, rng),
                Shrinking::RatingProportional => self.proportional(pool, best, &loose, rng),
            };
            if !work.is_cover() {
                return work;
            }
        }
        let mut work = best.clone();
        work.remove_all(pool, &loose);
        work
    }

    fn uniform(&self, pool: &Pool, best: &Family, loose: &[SubsetId], rng: &mut StdRng) -> Family {
        let keep = KEEP_MIN + KEEP_SPAN * rng.gen::<f64>();
        let mut work = best.clone();
        for &id in loose {
            if rng.gen::<f64>() >= keep {
                work.remove(pool, id);
            }
        }
        work
    }

    fn proportional(
        &self,
        pool: &Pool,
        best: &Family,
        loose: &[SubsetId],
        rng: &mut StdRng,
    ) -> Family {
        let mut scratch = best.clone();
        let weights = Rating::CostEffective.w_rmv(pool, &mut scratch, loose);
        let total: f64 = weights.iter().sum();
        let mut work = best.clone();
        for (&id, &w) in loose.iter().zip(weights.iter()) {
            let p = if total > 0.0 {
                (RMV_PORTION * loose.len() as f64 * w / total).min(1.0)
            } else {
                RMV_PORTION
            };
            if rng.gen::<f64>() < p {
                work.remove(pool, id);
            }
        }
        work
    }
}
