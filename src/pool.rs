//! The fixed candidate pool: an arena assigning every distinct subset a
//! stable dense id. All family and tracker bookkeeping is addressed by
//! these ids, so the hot paths never hash subset contents.

use crate::bitset::BitSet;
use crate::costs::CostModel;
use crate::subset::Subset;
use hashbrown::HashMap;

/// Stable index of a subset within its pool.
pub type SubsetId = usize;

/// Optional soft bound on family size. A family larger than `max`
/// members pays `penalty` per member on top of its strategy cost.
#[derive(Clone, Copy, Debug)]
pub struct MemberBound {
    pub max: usize,
    pub penalty: f64,
}

/// The immutable candidate arena for one problem instance.
///
/// Built once, never resized. Subsets are deduplicated by content: a
/// re-pushed subset returns the existing id.
pub struct Pool {
    universe: usize,
    subsets: Vec<Subset>,
    lookup: HashMap<Subset, SubsetId>,
    cost_model: CostModel,
    member_bound: Option<MemberBound>,
}

impl Pool {
    pub fn new(universe: usize, cost_model: CostModel) -> Self {
        Pool {
            universe,
            subsets: Vec::new(),
            lookup: HashMap::new(),
            cost_model,
            member_bound: None,
        }
    }

    pub fn with_member_bound(universe: usize, cost_model: CostModel, bound: MemberBound) -> Self {
        let mut pool = Pool::new(universe, cost_model);
        pool.member_bound = Some(bound);
        pool
    }

    /// Add a candidate, returning its id. Re-adding an equal subset
    /// returns the existing id. The subset's universe must match the
    /// pool's, and its cost-index set must match the cost model.
    pub fn push(&mut self, subset: Subset) -> SubsetId {
        assert_eq!(
            subset.universe(),
            self.universe,
            "subset universe does not match pool universe"
        );
        match self.cost_model.index_costs() {
            Some(index_costs) => {
                let indices = match subset.cost_indices() {
                    Some(indices) => indices,
                    None => panic!("dual cost model requires subsets with cost indices"),
                };
                assert_eq!(
                    indices.universe(),
                    index_costs.len(),
                    "cost-index range does not match the cost model"
                );
            }
            None => assert!(
                subset.cost_indices().is_none(),
                "cost indices supplied to an additive-cost pool"
            ),
        }
        if let Some(&id) = self.lookup.get(&subset) {
            return id;
        }
        let id = self.subsets.len();
        self.lookup.insert(subset.clone(), id);
        self.subsets.push(subset);
        id
    }

    pub fn get(&self, id: SubsetId) -> &Subset {
        &self.subsets[id]
    }

    pub fn id_of(&self, subset: &Subset) -> Option<SubsetId> {
        self.lookup.get(subset).copied()
    }

    pub fn len(&self) -> usize {
        self.subsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsets.is_empty()
    }

    /// All ids in ascending order; the deterministic candidate order.
    pub fn ids(&self) -> std::ops::Range<SubsetId> {
        0..self.subsets.len()
    }

    pub fn universe(&self) -> usize {
        self.universe
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    pub fn member_bound(&self) -> Option<MemberBound> {
        self.member_bound
    }

    /// Union of every candidate's membership; what the pool can cover.
    pub fn coverable(&self) -> BitSet {
        let mut union = BitSet::new(self.universe);
        for subset in &self.subsets {
            for e in subset.members().iter() {
                union.insert(e);
            }
        }
        union
    }

    /// True when all candidates carry the same cost and no member bound
    /// or dual cost structure skews the aggregate.
    pub fn unicost(&self) -> bool {
        if self.member_bound.is_some() || self.cost_model.is_dual() {
            return false;
        }
        match self.subsets.first() {
            None => true,
            Some(first) => self.subsets.iter().all(|s| s.cost() == first.cost()),
        }
    }

    /// True when the aggregate cost is a plain sum of member costs.
    pub fn linear_cost(&self) -> bool {
        self.member_bound.is_none() && !self.cost_model.is_dual()
    }
}
