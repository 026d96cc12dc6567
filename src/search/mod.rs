//! Block-restricted neighborhood search.
//!
//! Tightens the solver's bounds around the incumbent outside a set of
//! selected blocks, solves the restricted problem and always restores the
//! bounds afterwards.
//!
//! - [`SearchDriver`]: neighborhood construction, solve, validation and
//!   block selection
//! - [`BoundsSnapshot`] / [`BoundsRestriction`]: captured original bounds
//!   and the scoped tighten-solve-restore guard

mod bounds;
mod config;
mod runner;
mod types;

pub use bounds::{BoundsRestriction, BoundsSnapshot};
pub use config::SearchConfig;
pub use runner::SearchDriver;
pub use types::{PassMode, SearchOutcome, SearchRequest};
