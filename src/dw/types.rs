//! Controller states, callback hook and run records.

use super::runner::DwHeuristic;
use crate::model::{MipSolver, SolveStatus};
use crate::search::PassMode;

/// Lifecycle phase of the heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// Structure not detected yet; the next `run` detects it.
    Uninitialized,
    /// Structure found; passes run when due.
    Active,
    /// No usable structure (or the host declined it). Terminal.
    Disabled,
    /// Budget spent or nothing left to gain. Terminal.
    Exhausted,
}

impl Phase {
    /// Whether no further `run` call can do any work.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Disabled | Phase::Exhausted)
    }
}

/// Why the search stopped, if it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolveState {
    Fine,
    /// Target reached, incumbent matches the relaxation bound, or the
    /// whole integer space was searched without improvement.
    CannotImprove,
    /// The node limit grew past its ceiling.
    MaxNodes,
    /// The pass ceiling was reached.
    MaxPasses,
}

/// Point in the heuristic's lifecycle at which the host callback fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HookPoint {
    /// Blocks found, data not set up yet.
    BlocksFound,
    /// Blocks sorted, not used yet.
    BlocksSorted,
    /// Just before a restricted problem goes to the solver.
    BeforeSolve,
    /// The proposal pool was updated with a new solution.
    ProposalsUpdated,
    /// A better solution was accepted as incumbent.
    ImprovementFound,
}

impl HookPoint {
    /// Numeric discriminant (0..=4) in lifecycle order.
    pub fn where_from(self) -> i32 {
        match self {
            HookPoint::BlocksFound => 0,
            HookPoint::BlocksSorted => 1,
            HookPoint::BeforeSolve => 2,
            HookPoint::ProposalsUpdated => 3,
            HookPoint::ImprovementFound => 4,
        }
    }
}

/// What the host wants after a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Continue,
    /// Abandon the current pass (bounds are restored, `run` reports no
    /// improvement unless one was already committed).
    Abort,
}

/// Host hook invoked at each [`HookPoint`].
///
/// The callback sees the heuristic read-only, including the solver via
/// [`DwHeuristic::solver`]. Closures of the matching shape implement it.
pub trait DwCallback<S: MipSolver> {
    fn call(&mut self, heuristic: &DwHeuristic<S>, point: HookPoint) -> CallbackAction;
}

impl<S, F> DwCallback<S> for F
where
    S: MipSolver,
    F: FnMut(&DwHeuristic<S>, HookPoint) -> CallbackAction,
{
    fn call(&mut self, heuristic: &DwHeuristic<S>, point: HookPoint) -> CallbackAction {
        self(heuristic, point)
    }
}

/// Result of one `run` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    NoImprovement,
    Improved,
}

impl RunOutcome {
    /// `0` for no improvement, `1` for an improved solution.
    pub fn code(self) -> i32 {
        match self {
            RunOutcome::NoImprovement => 0,
            RunOutcome::Improved => 1,
        }
    }

    pub fn is_improved(self) -> bool {
        self == RunOutcome::Improved
    }
}

/// Diagnostics for one pass.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PassRecord {
    /// `run` call the pass belonged to (1-based).
    pub call: usize,
    pub mode: PassMode,
    pub blocks: Vec<usize>,
    pub status: SolveStatus,
    pub free_integers: usize,
    /// Whether the pass produced the new incumbent.
    pub improved: bool,
    /// Incumbent objective after the pass.
    pub best_objective: f64,
}
