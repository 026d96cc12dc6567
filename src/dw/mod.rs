//! Heuristic controller.
//!
//! [`DwHeuristic`] wires the partitioner, the proposal pool and the search
//! driver into a single `run` entry point for a host search, with a
//! lifecycle state machine, adaptive budgets and host callbacks at five
//! [`HookPoint`]s.

mod config;
mod runner;
mod types;

pub use config::DwConfig;
pub use runner::DwHeuristic;
pub use types::{CallbackAction, DwCallback, HookPoint, PassRecord, Phase, RunOutcome, SolveState};
