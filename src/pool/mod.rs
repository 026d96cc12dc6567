//! Dantzig-Wolfe proposal pool.
//!
//! Each accepted integer solution is cut into per-block proposals. A
//! proposal is identified by its block and a bitset fingerprint of the
//! block's integer columns at value 1; structural duplicates are rejected
//! on insertion. The pool can export the restricted Dantzig-Wolfe master
//! built from its proposals ([`DwModel`]).

mod model;
mod store;
mod types;

pub use model::DwModel;
pub use store::{fingerprint, ProposalPool};
pub use types::Proposal;
