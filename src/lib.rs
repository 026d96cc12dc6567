//! Dantzig-Wolfe structure guided primal heuristic for mixed-integer
//! programs.
//!
//! Detects block-angular structure in the constraint matrix and uses it
//! to improve an incumbent by solving block-restricted sub-MIPs:
//!
//! - **Model**: [`model::MasterProblem`] and the [`model::MipSolver`]
//!   seam to the external LP/MIP solver.
//! - **Partition**: block detection with linking rows and pairwise block
//!   affinity.
//! - **Pool**: de-duplicated Dantzig-Wolfe proposals with bitset
//!   fingerprints, exportable as a restricted master.
//! - **Search**: neighborhood construction around the incumbent, scoped
//!   bound restriction and restricted solves.
//! - **DW**: the controller a host search calls repeatedly, with adaptive
//!   budgets and lifecycle callbacks.
//!
//! # Architecture
//!
//! The core is single-threaded and synchronous. It never changes the
//! solver's rows or columns, only its column bounds, and restores them on
//! every exit path. Runtime failures never surface as errors: a call
//! either improves the incumbent or it does not.

pub mod dw;
pub mod error;
pub mod model;
pub mod partition;
pub mod pool;
pub mod search;

pub use error::DwError;
