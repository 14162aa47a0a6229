//! Picking one candidate from a rated slice.

use crate::pool::SubsetId;
use rand::rngs::StdRng;
use rand::Rng;

/// Width of the favorites band below the best weight.
const FAVORITES_BAND: f64 = 0.001;
/// Probability (randomized mode) of ignoring the band entirely.
const FULL_RANDOM_PROB: f64 = 0.05;

/// Best-rating selection with a near-optimal favorites band.
///
/// Deterministic mode takes the lowest-id favorite, so a fixed seed (or
/// no randomness at all) reproduces the exact same pick from the same
/// weights. Randomized mode draws uniformly from the favorites, and with
/// a small probability from all candidates, to keep the search moving.
#[derive(Clone, Copy, Debug)]
pub struct Selection {
    pub randomized: bool,
}

impl Selection {
    pub fn deterministic() -> Self {
        Selection { randomized: false }
    }

    pub fn randomized() -> Self {
        Selection { randomized: true }
    }

    /// Pick one candidate. `weights` is parallel to `candidates`, which
    /// must be in ascending id order; higher weight is better. Returns
    /// `None` only for an empty slice.
    pub fn select(
        &self,
        candidates: &[SubsetId],
        weights: &[f64],
        rng: &mut StdRng,
    ) -> Option<SubsetId> {
        assert_eq!(candidates.len(), weights.len());
        if candidates.is_empty() {
            return None;
        }
        if self.randomized && rng.gen::<f64>() < FULL_RANDOM_PROB {
            return Some(candidates[rng.gen_range(0, candidates.len())]);
        }
        let mut max = f64::NEG_INFINITY;
        for &w in weights {
            debug_assert!(!w.is_nan());
            if w > max {
                max = w;
            }
        }
        // Weights at most a band's width below the maximum count as
        // favorites; a non-positive maximum flips the band's direction.
        let threshold = if max > 0.0 {
            max / (1.0 + FAVORITES_BAND)
        } else {
            max * (1.0 + FAVORITES_BAND)
        };
        let favorites: Vec<SubsetId> = candidates
            .iter()
            .zip(weights.iter())
            .filter(|(_, &w)| w >= threshold)
            .map(|(&id, _)| id)
            .collect();
        debug_assert!(!favorites.is_empty());
        if self.randomized {
            Some(favorites[rng.gen_range(0, favorites.len())])
        } else {
            favorites.first().copied()
        }
    }
}
