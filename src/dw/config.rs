//! Heuristic controller configuration.

use crate::error::DwError;
use crate::partition::PartitionConfig;
use crate::search::SearchConfig;

/// Configuration for the decomposition heuristic.
///
/// # Scheduling
///
/// The host calls [`DwHeuristic::run`](super::DwHeuristic::run) at its
/// own cadence. A call is due every `how_often` calls; after a pass
/// without improvement the interval doubles (up to `max_how_often`) and
/// it snaps back after an improvement. Every `full_dw_every`-th accepted
/// improvement is followed by a full pass over all blocks.
///
/// # Examples
///
/// ```
/// use u_dwsearch::dw::DwConfig;
///
/// let config = DwConfig::default()
///     .with_full_dw_every(3)
///     .with_number_passes(50)
///     .with_target_objective(-100.0)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DwConfig {
    /// Structure detection thresholds.
    pub partition: PartitionConfig,

    /// Restricted solve settings.
    pub search: SearchConfig,

    /// Run a full pass after every k-th accepted improvement (0 = off).
    pub full_dw_every: usize,

    /// Ceiling on restricted/full passes over the heuristic's life.
    pub number_passes: usize,

    /// Initial call interval.
    pub how_often: usize,

    /// Largest call interval the adaptation may reach.
    pub max_how_often: usize,

    /// Blocks restricted together in a restricted pass.
    pub blocks_per_pass: usize,

    /// Stop once the incumbent reaches this objective.
    pub target_objective: Option<f64>,

    /// Node limit ceiling; exceeding it ends the heuristic.
    pub max_node_limit: usize,

    /// Seed for the random row projection.
    pub seed: Option<u64>,
}

impl Default for DwConfig {
    fn default() -> Self {
        Self {
            partition: PartitionConfig::default(),
            search: SearchConfig::default(),
            full_dw_every: 3,
            number_passes: 100,
            how_often: 1,
            max_how_often: 64,
            blocks_per_pass: 1,
            target_objective: None,
            max_node_limit: 1_000_000,
            seed: None,
        }
    }
}

impl DwConfig {
    pub fn with_partition(mut self, partition: PartitionConfig) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn with_full_dw_every(mut self, k: usize) -> Self {
        self.full_dw_every = k;
        self
    }

    pub fn with_number_passes(mut self, n: usize) -> Self {
        self.number_passes = n;
        self
    }

    pub fn with_how_often(mut self, n: usize, max: usize) -> Self {
        self.how_often = n;
        self.max_how_often = max;
        self
    }

    pub fn with_blocks_per_pass(mut self, n: usize) -> Self {
        self.blocks_per_pass = n;
        self
    }

    pub fn with_target_objective(mut self, target: f64) -> Self {
        self.target_objective = Some(target);
        self
    }

    pub fn with_max_node_limit(mut self, n: usize) -> Self {
        self.max_node_limit = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration and its nested sections.
    pub fn validate(&self) -> Result<(), DwError> {
        self.partition.validate()?;
        self.search.validate()?;
        if self.number_passes == 0 {
            return Err(DwError::InvalidConfig(
                "number_passes must be positive".into(),
            ));
        }
        if self.how_often == 0 || self.max_how_often < self.how_often {
            return Err(DwError::InvalidConfig(format!(
                "how_often must be in [1, max_how_often], got {} (max {})",
                self.how_often, self.max_how_often
            )));
        }
        if self.blocks_per_pass == 0 {
            return Err(DwError::InvalidConfig(
                "blocks_per_pass must be positive".into(),
            ));
        }
        if self.max_node_limit < self.search.node_limit {
            return Err(DwError::InvalidConfig(format!(
                "max_node_limit {} is below the initial node limit {}",
                self.max_node_limit, self.search.node_limit
            )));
        }
        if self.target_objective.is_some_and(f64::is_nan) {
            return Err(DwError::InvalidConfig("target_objective is NaN".into()));
        }
        Ok(())
    }
}
