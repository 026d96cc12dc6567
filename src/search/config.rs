//! Search driver configuration.

use crate::error::DwError;

/// Configuration for restricted neighborhood solves.
///
/// `number_needed` and `node_limit` are starting values; the controller
/// adapts its working copies between passes.
///
/// # Examples
///
/// ```
/// use u_dwsearch::search::SearchConfig;
///
/// let config = SearchConfig::default()
///     .with_number_needed(25)
///     .with_node_limit(5_000)
///     .with_keep_continuous(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchConfig {
    /// Minimum number of free integer columns in a neighborhood.
    ///
    /// Selected blocks are widened until this many integers are free
    /// (or every integer of the selected blocks is).
    pub number_needed: usize,

    /// Node limit handed to the solver for each restricted solve.
    pub node_limit: usize,

    /// Leave continuous columns of fixed blocks free.
    pub keep_continuous: bool,

    /// Distance from an integer under which a value counts as integral.
    pub integer_tolerance: f64,

    /// Margin by which a candidate must beat the incumbent.
    pub improvement_tolerance: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            number_needed: 10,
            node_limit: 10_000,
            keep_continuous: true,
            integer_tolerance: 1e-6,
            improvement_tolerance: 1e-6,
        }
    }
}

impl SearchConfig {
    pub fn with_number_needed(mut self, n: usize) -> Self {
        self.number_needed = n;
        self
    }

    pub fn with_node_limit(mut self, n: usize) -> Self {
        self.node_limit = n;
        self
    }

    pub fn with_keep_continuous(mut self, keep: bool) -> Self {
        self.keep_continuous = keep;
        self
    }

    pub fn with_tolerances(mut self, integer: f64, improvement: f64) -> Self {
        self.integer_tolerance = integer;
        self.improvement_tolerance = improvement;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), DwError> {
        if self.node_limit == 0 {
            return Err(DwError::InvalidConfig("node_limit must be positive".into()));
        }
        if !(0.0..0.5).contains(&self.integer_tolerance) {
            return Err(DwError::InvalidConfig(format!(
                "integer_tolerance must be in [0, 0.5), got {}",
                self.integer_tolerance
            )));
        }
        if self.improvement_tolerance < 0.0 {
            return Err(DwError::InvalidConfig(format!(
                "improvement_tolerance must be non-negative, got {}",
                self.improvement_tolerance
            )));
        }
        Ok(())
    }
}
