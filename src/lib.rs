//! `mincover` is an incremental set-covering optimization engine: an
//! iterated randomized-greedy search for a minimum-cost sub-collection
//! of a fixed subset pool whose union is a whole universe.
//!
//! The engine keeps exact incremental coverage and necessity
//! bookkeeping, so every greedy step, optimization operator, and shrink
//! works off O(1) queries instead of rescans. Construction heuristics,
//! candidate ratings, selection, and shrinking are interchangeable
//! strategies driven by one seeded random source.

mod bitset;
mod costs;
mod creation;
mod driver;
mod family;
mod greedy;
mod optimize;
mod pool;
mod ratings;
mod selection;
mod shrinking;
mod subset;
mod tracker;

pub use bitset::BitSet;
pub use costs::{CostModel, IndexCosts};
pub use creation::Creation;
pub use driver::{IterEnhancedGreedy, Outcome, PolicyWeights};
pub use family::Family;
pub use optimize::{Optimizer, TabooSet};
pub use pool::{MemberBound, Pool, SubsetId};
pub use ratings::{HybridStrategy, Rating};
pub use selection::Selection;
pub use shrinking::Shrinking;
pub use subset::Subset;
