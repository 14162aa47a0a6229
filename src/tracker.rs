//! Incremental necessity bookkeeping over a fixed pool.
//!
//! For every member the tracker knows how many elements that member
//! covers alone, and for every element which member is its sole coverer.
//! Both survive arbitrary add/remove sequences without rescans; only a
//! coverage drop from two coverers to one needs to find the surviving
//! coverer, and a two-deep cache of the most recently added members
//! answers that in O(1) for the common churn pattern of the search loop.
//!
//! The caller owns the per-element coverage counts and passes them in
//! *before* applying its own increment/decrement for the mutation, so
//! the counts seen here always describe the pre-mutation state.

use crate::bitset::BitSet;
use crate::pool::{Pool, SubsetId};

const NONE: usize = usize::MAX;

#[derive(Clone, Debug)]
pub struct Tracker {
    member: Vec<bool>,
    /// Elements each member covers alone; valid only while a member.
    alone: Vec<u32>,
    /// Per element, the sole covering member, or NONE when the element
    /// is uncovered or covered at least twice.
    sole: Vec<usize>,
    /// Scratch for the newly-redundant scan, indexed by pool id.
    scratch: Vec<u32>,
    /// Most recently and second-most recently added member ids.
    recent: [usize; 2],
    necessary_count: usize,
    member_count: usize,
}

impl Tracker {
    pub fn new(pool_len: usize, universe: usize) -> Self {
        Tracker {
            member: vec![false; pool_len],
            alone: vec![0; pool_len],
            sole: vec![NONE; universe],
            scratch: vec![0; pool_len],
            recent: [NONE, NONE],
            necessary_count: 0,
            member_count: 0,
        }
    }

    pub fn contains(&self, id: SubsetId) -> bool {
        self.member[id]
    }

    pub fn member_count(&self) -> usize {
        self.member_count
    }

    pub fn necessary_count(&self) -> usize {
        self.necessary_count
    }

    pub fn redundant_count(&self) -> usize {
        self.member_count - self.necessary_count
    }

    /// Elements the member `id` covers alone.
    pub fn alone_count(&self, id: SubsetId) -> u32 {
        debug_assert!(self.member[id]);
        self.alone[id]
    }

    /// Member ids in ascending order.
    pub fn members(&self) -> impl Iterator<Item = SubsetId> + '_ {
        self.member
            .iter()
            .enumerate()
            .filter(|(_, &m)| m)
            .map(|(id, _)| id)
    }

    /// Members covering at least one element alone, ascending.
    pub fn necessary(&self) -> Vec<SubsetId> {
        if self.necessary_count == 0 {
            return Vec::new();
        }
        self.members().filter(|&id| self.alone[id] > 0).collect()
    }

    /// Members covering nothing alone, ascending.
    pub fn redundant(&self) -> Vec<SubsetId> {
        if self.redundant_count() == 0 {
            return Vec::new();
        }
        self.members().filter(|&id| self.alone[id] == 0).collect()
    }

    /// Register `id` as a member. `coverage` holds the pre-insertion
    /// per-element counts. Inserting a foreign id is a caller bug.
    pub fn insert(&mut self, id: SubsetId, pool: &Pool, coverage: &[u32]) {
        assert!(id < self.member.len(), "subset id {} is not from this pool", id);
        if self.member[id] {
            return;
        }
        self.member[id] = true;
        self.member_count += 1;
        self.alone[id] = 0;
        for e in pool.get(id).members().iter() {
            if coverage[e] == 0 {
                self.sole[e] = id;
                self.alone[id] += 1;
            } else if coverage[e] == 1 {
                let prev = self.sole[e];
                debug_assert_ne!(prev, NONE);
                self.alone[prev] -= 1;
                if self.alone[prev] == 0 {
                    self.necessary_count -= 1;
                }
                self.sole[e] = NONE;
            }
        }
        if self.alone[id] > 0 {
            self.necessary_count += 1;
        }
        self.recent[1] = self.recent[0];
        self.recent[0] = id;
    }

    /// Remove member `id`. `coverage` holds the pre-removal counts (the
    /// subset still counted in). No-op for non-members.
    pub fn remove(&mut self, id: SubsetId, pool: &Pool, coverage: &[u32]) {
        if id >= self.member.len() || !self.member[id] {
            return;
        }
        self.member[id] = false;
        self.member_count -= 1;
        if self.alone[id] > 0 {
            self.necessary_count -= 1;
        }
        self.alone[id] = 0;
        for e in pool.get(id).members().iter() {
            if coverage[e] == 2 {
                // The element drops to a single coverer; find it.
                let survivor = self.covering_member(e, pool);
                debug_assert_ne!(survivor, NONE);
                self.sole[e] = survivor;
                self.alone[survivor] += 1;
                if self.alone[survivor] == 1 {
                    self.necessary_count += 1;
                }
            } else if coverage[e] == 1 {
                self.sole[e] = NONE;
            }
        }
        if self.recent[0] == id {
            self.recent[0] = NONE;
        }
        if self.recent[1] == id {
            self.recent[1] = NONE;
        }
    }

    fn covering_member(&self, e: usize, pool: &Pool) -> usize {
        for &cached in &self.recent {
            if cached != NONE && self.member[cached] && pool.get(cached).members().contains(e) {
                return cached;
            }
        }
        for id in 0..self.member.len() {
            if self.member[id] && pool.get(id).members().contains(e) {
                return id;
            }
        }
        NONE
    }

    /// Members that would stop being necessary if a subset with the
    /// given membership were added: exactly those necessary members
    /// whose alone-covered elements all lie inside `candidate`. Runs in
    /// time proportional to the candidate's size.
    pub fn newly_redundant(&mut self, candidate: &BitSet) -> Vec<SubsetId> {
        let mut result = Vec::new();
        for e in candidate.iter() {
            let s = self.sole[e];
            if s != NONE {
                self.scratch[s] = 0;
            }
        }
        for e in candidate.iter() {
            let s = self.sole[e];
            if s != NONE {
                self.scratch[s] += 1;
            }
        }
        for e in candidate.iter() {
            let s = self.sole[e];
            if s != NONE && self.scratch[s] > 0 && self.scratch[s] == self.alone[s] {
                result.push(s);
                self.scratch[s] = 0;
            }
        }
        result.sort_unstable();
        result
    }
}
