//! Block-angular structure detection.
//!
//! Splits the rows and columns of a master problem into independent
//! blocks coupled only through a small set of linking rows, and scores
//! how strongly each pair of blocks is coupled.
//!
//! - [`Partitioner`]: connected components over non-linking rows
//! - [`BlockStructure`]: assignment, CSR membership lists, affinity
//! - [`PartitionConfig`]: thresholds for a usable partition

mod config;
mod runner;
mod types;

pub use config::PartitionConfig;
pub use runner::Partitioner;
pub use types::BlockStructure;
