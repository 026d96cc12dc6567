//! Search request and outcome types.

use super::bounds::BoundsSnapshot;
use crate::model::SolveStatus;
use crate::partition::BlockStructure;

/// Which blocks a pass restricts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PassMode {
    /// A few selected blocks form the neighborhood; the rest stay fixed.
    Restricted,
    /// Every block forms the neighborhood.
    Full,
}

/// Inputs of one restricted solve.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    pub structure: &'a BlockStructure,
    pub snapshot: &'a BoundsSnapshot,
    /// Current incumbent, one value per master column.
    pub incumbent: &'a [f64],
    /// Continuous relaxation solution, if known.
    pub continuous: Option<&'a [f64]>,
    /// Blocks forming the neighborhood.
    pub blocks: &'a [usize],
    /// Objective the candidate must strictly beat.
    pub cutoff: f64,
    /// Minimum free integers.
    pub number_needed: usize,
    /// Solver node limit.
    pub node_limit: usize,
}

/// Result of one restricted solve.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Whether a validated, strictly better solution was found.
    pub found: bool,
    /// Objective of `solution` when found.
    pub objective: f64,
    pub solution: Option<Vec<f64>>,
    /// Solver status of the restricted problem.
    pub status: SolveStatus,
    /// Integer columns left free.
    pub free_integers: usize,
    /// Whether no integer column was fixed.
    pub all_integers_free: bool,
    /// Nodes reported by the solver.
    pub nodes: usize,
}
