//! Master problem model and the external solver seam.
//!
//! - **Problem**: [`MasterProblem`]: sparse constraint matrix with
//!   objective, bounds and integrality
//! - **Solver**: [`MipSolver`] trait: the stateful LP/MIP solver the
//!   heuristic drives by tightening and restoring column bounds
//!
//! [`SimpleMipSolver`] is a tiny exhaustive solver for bounded integer
//! problems, handy for tests and small demos.

mod problem;
mod solver;

pub use problem::{MasterProblem, ObjectiveSense};
pub use solver::{MipSolver, SimpleMipSolver, SolveLimits, SolveResult, SolveStatus};
