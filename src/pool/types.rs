//! Proposal records.

use fixedbitset::FixedBitSet;

/// One Dantzig-Wolfe proposal: a feasible assignment of one block's
/// columns, taken from an integer solution of the master problem.
#[derive(Debug, Clone)]
pub struct Proposal {
    /// Block the proposal belongs to.
    pub block: usize,

    /// One bit per integer column of the block, set where the column is 1.
    pub fingerprint: FixedBitSet,

    /// Random projection of the fingerprint; equal fingerprints always
    /// project to the same value.
    pub signature: f64,

    /// Master objective of the solution the proposal came from.
    pub objective: f64,

    /// Objective contribution of the block's own columns.
    pub cost: f64,

    /// Number of block columns with a nonzero value.
    pub columns: usize,

    /// Weight supplied at insertion.
    pub weight: f64,

    /// Values of the block's columns, aligned with
    /// [`BlockStructure::block_columns`](crate::partition::BlockStructure::block_columns).
    pub values: Vec<f64>,

    /// Activity of the block's columns in each linking row, sorted by row.
    pub linking_activity: Vec<(usize, f64)>,
}
