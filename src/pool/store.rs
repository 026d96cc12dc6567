//! Growable, de-duplicating proposal pool.

use super::types::Proposal;
use crate::model::MasterProblem;
use crate::partition::BlockStructure;
use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;

/// Pool of Dantzig-Wolfe proposals for one block layout.
///
/// Proposals are kept in insertion order and never evicted. A proposal
/// is rejected when a proposal of the same block with the same
/// fingerprint is already stored; the random-projection signature narrows
/// the candidates so fingerprints are compared only on signature matches.
///
/// A pool is tied to the [`BlockStructure`] it was filled under. After a
/// re-partition every fingerprint is stale: build a new pool or
/// [`clear`](Self::clear) it.
#[derive(Debug, Clone)]
pub struct ProposalPool {
    proposals: Vec<Proposal>,
    index: FxHashMap<(usize, u64), Vec<usize>>,
    column_projection: Vec<f64>,
}

impl ProposalPool {
    /// Creates an empty pool.
    ///
    /// `row_weights` holds one random coefficient per master row; each
    /// column's projection `sum_r w_r * a_rj` is computed once here.
    pub fn new(problem: &MasterProblem, row_weights: &[f64]) -> Self {
        let column_projection = (0..problem.num_columns())
            .map(|j| {
                let (rows, coefs) = problem.column(j);
                rows.iter()
                    .zip(coefs)
                    .map(|(&r, &a)| row_weights[r] * a)
                    .sum::<f64>()
            })
            .collect();
        Self {
            proposals: Vec::new(),
            index: FxHashMap::default(),
            column_projection,
        }
    }

    /// Adds one proposal per listed block taken from `solution`.
    ///
    /// Returns how many new (non-duplicate) proposals were stored.
    pub fn add_proposals(
        &mut self,
        problem: &MasterProblem,
        structure: &BlockStructure,
        solution: &[f64],
        objective: f64,
        blocks: &[usize],
        weight: f64,
    ) -> usize {
        let mut added = 0;
        for &block in blocks {
            let fingerprint = fingerprint(structure, block, solution);
            let signature: f64 = fingerprint
                .ones()
                .map(|bit| self.column_projection[structure.block_integers(block)[bit]])
                .sum();
            let key = (block, signature.to_bits());
            if self.index.get(&key).is_some_and(|ids| {
                ids.iter()
                    .any(|&id| self.proposals[id].fingerprint == fingerprint)
            }) {
                continue;
            }

            let columns = structure.block_columns(block);
            let values: Vec<f64> = columns.iter().map(|&j| solution[j]).collect();
            let cost: f64 = columns
                .iter()
                .map(|&j| problem.objective()[j] * solution[j])
                .sum();
            let mut activity: FxHashMap<usize, f64> = FxHashMap::default();
            for &j in columns.iter().filter(|&&j| solution[j] != 0.0) {
                let (rows, coefs) = problem.column(j);
                for (&r, &a) in rows.iter().zip(coefs) {
                    if structure.which_row_block()[r].is_none() {
                        *activity.entry(r).or_insert(0.0) += a * solution[j];
                    }
                }
            }
            let mut linking_activity: Vec<(usize, f64)> = activity.into_iter().collect();
            linking_activity.sort_unstable_by_key(|&(r, _)| r);

            self.index.entry(key).or_default().push(self.proposals.len());
            self.proposals.push(Proposal {
                block,
                fingerprint,
                signature,
                objective,
                cost,
                columns: values.iter().filter(|&&v| v != 0.0).count(),
                weight,
                values,
                linking_activity,
            });
            added += 1;
        }
        added
    }

    /// Whether a proposal with this block and fingerprint is stored.
    pub fn contains(&self, block: usize, fingerprint: &FixedBitSet) -> bool {
        self.proposals
            .iter()
            .any(|p| p.block == block && &p.fingerprint == fingerprint)
    }

    /// Drops every proposal, keeping the column projection.
    pub fn clear(&mut self) {
        self.proposals.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// Current storage capacity; always at least [`len`](Self::len).
    pub fn capacity(&self) -> usize {
        self.proposals.capacity()
    }

    pub fn get(&self, id: usize) -> Option<&Proposal> {
        self.proposals.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.iter()
    }

    /// Proposals of one block with their pool ids.
    pub fn for_block(&self, block: usize) -> impl Iterator<Item = (usize, &Proposal)> {
        self.proposals
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.block == block)
    }

    /// Master objective at the time proposal `id` was added.
    pub fn objective_value_when(&self, id: usize) -> Option<f64> {
        self.get(id).map(|p| p.objective)
    }

    /// Nonzero column count of proposal `id`.
    pub fn number_columns_dw(&self, id: usize) -> Option<usize> {
        self.get(id).map(|p| p.columns)
    }
}

/// Bits of `block`'s integer columns that are 1 in `solution`.
pub fn fingerprint(structure: &BlockStructure, block: usize, solution: &[f64]) -> FixedBitSet {
    let ints = structure.block_integers(block);
    let mut bits = FixedBitSet::with_capacity(ints.len());
    for (bit, &j) in ints.iter().enumerate() {
        if solution[j].round() == 1.0 {
            bits.insert(bit);
        }
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectiveSense;
    use crate::partition::{PartitionConfig, Partitioner};
    use proptest::prelude::*;

    /// Groups of four and five columns (the last one continuous),
    /// coupled by row 0.
    fn setup() -> (MasterProblem, BlockStructure) {
        let mut p = MasterProblem::new(ObjectiveSense::Minimize);
        let link = p.add_row(0.0, 8.0);
        let a = p.add_row(0.0, 4.0);
        let b = p.add_row(0.0, 4.0);
        for j in 0..9 {
            let local = if j < 4 { a } else { b };
            p.add_column(-(j as f64), 0.0, 1.0, j != 8, &[(local, 1.0), (link, 2.0)])
                .unwrap();
        }
        let s = Partitioner::find_structure(&p, &PartitionConfig::default()).unwrap();
        (p, s)
    }

    fn weights(p: &MasterProblem) -> Vec<f64> {
        (0..p.num_rows()).map(|i| 1.0 + 0.37 * i as f64).collect()
    }

    #[test]
    fn test_identical_solution_twice() {
        let (p, s) = setup();
        let mut pool = ProposalPool::new(&p, &weights(&p));
        let x = [1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.5];
        let blocks: Vec<usize> = (0..s.number_blocks()).collect();

        assert_eq!(pool.add_proposals(&p, &s, &x, -10.0, &blocks, 1.0), 2);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.add_proposals(&p, &s, &x, -10.0, &blocks, 1.0), 0);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_continuous_change_is_still_duplicate() {
        let (p, s) = setup();
        let mut pool = ProposalPool::new(&p, &weights(&p));
        let block = s.which_column_block()[8].unwrap();
        let mut x = [0.0; 9];
        x[5] = 1.0;
        assert_eq!(pool.add_proposals(&p, &s, &x, 0.0, &[block], 1.0), 1);
        x[8] = 1.0;
        assert_eq!(pool.add_proposals(&p, &s, &x, 0.0, &[block], 1.0), 0);
        x[6] = 1.0;
        assert_eq!(pool.add_proposals(&p, &s, &x, 0.0, &[block], 1.0), 1);
    }

    #[test]
    fn test_proposal_records_block_data() {
        let (p, s) = setup();
        let mut pool = ProposalPool::new(&p, &weights(&p));
        let block = s.which_column_block()[0].unwrap();
        let x = [1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        pool.add_proposals(&p, &s, &x, -1.0, &[block], 2.5);

        let prop = pool.get(0).unwrap();
        assert_eq!(prop.block, block);
        assert_eq!(prop.fingerprint.ones().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(prop.columns, 2);
        assert!((prop.cost + 1.0).abs() < 1e-12);
        assert_eq!(prop.linking_activity, vec![(0, 4.0)]);
        assert_eq!(pool.objective_value_when(0), Some(-1.0));
        assert_eq!(pool.number_columns_dw(0), Some(2));
        assert!((prop.weight - 2.5).abs() < 1e-12);
        assert!(pool.contains(block, &prop.fingerprint));
    }

    #[test]
    fn test_pool_grows_without_dropping() {
        let (p, s) = setup();
        let mut pool = ProposalPool::new(&p, &weights(&p));
        let block = s.which_column_block()[0].unwrap();
        let mut stored = 0;
        for mask in 0u32..16 {
            let mut x = [0.0; 9];
            for (bit, &j) in s.block_integers(block).iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    x[j] = 1.0;
                }
            }
            stored += pool.add_proposals(&p, &s, &x, 0.0, &[block], 1.0);
            assert!(pool.capacity() >= pool.len());
        }
        assert_eq!(stored, 16);
        assert_eq!(pool.len(), 16);
        assert_eq!(pool.for_block(block).count(), 16);

        pool.clear();
        assert!(pool.is_empty());
    }

    proptest! {
        #[test]
        fn prop_no_duplicate_fingerprints(
            solutions in proptest::collection::vec(
                proptest::collection::vec(0u8..2, 9), 1..20)
        ) {
            let (p, s) = setup();
            let mut pool = ProposalPool::new(&p, &weights(&p));
            let blocks: Vec<usize> = (0..s.number_blocks()).collect();
            for sol in &solutions {
                let x: Vec<f64> = sol.iter().map(|&v| f64::from(v)).collect();
                pool.add_proposals(&p, &s, &x, 0.0, &blocks, 1.0);
            }
            let all: Vec<&Proposal> = pool.iter().collect();
            for (i, a) in all.iter().enumerate() {
                for b in &all[i + 1..] {
                    prop_assert!(a.block != b.block || a.fingerprint != b.fingerprint);
                }
            }
        }
    }
}
