//! Partitioner configuration.

use crate::error::DwError;

/// Configuration for block-structure detection.
///
/// Rows are considered for the linking (master) set longest first. The
/// partitioner removes the shortest prefix of that order which leaves at
/// least `min_blocks` connected components, none of them holding more
/// than `max_block_fraction` of the assigned columns.
///
/// # Examples
///
/// ```
/// use u_dwsearch::partition::PartitionConfig;
///
/// let config = PartitionConfig::default()
///     .with_max_linking_fraction(0.1)
///     .with_min_blocks(3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionConfig {
    /// Largest share of the nonempty rows that may become linking rows
    /// (rounded up to whole rows).
    pub max_linking_fraction: f64,

    /// Largest share of the assigned columns a single block may hold.
    ///
    /// A partition whose biggest block exceeds this is no partition at all.
    pub max_block_fraction: f64,

    /// Minimum number of blocks for a usable structure.
    pub min_blocks: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            max_linking_fraction: 0.25,
            max_block_fraction: 0.9,
            min_blocks: 2,
        }
    }
}

impl PartitionConfig {
    pub fn with_max_linking_fraction(mut self, fraction: f64) -> Self {
        self.max_linking_fraction = fraction;
        self
    }

    pub fn with_max_block_fraction(mut self, fraction: f64) -> Self {
        self.max_block_fraction = fraction;
        self
    }

    pub fn with_min_blocks(mut self, n: usize) -> Self {
        self.min_blocks = n;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), DwError> {
        if !(0.0..=1.0).contains(&self.max_linking_fraction) {
            return Err(DwError::InvalidConfig(format!(
                "max_linking_fraction must be in [0, 1], got {}",
                self.max_linking_fraction
            )));
        }
        if self.max_block_fraction <= 0.0 || self.max_block_fraction > 1.0 {
            return Err(DwError::InvalidConfig(format!(
                "max_block_fraction must be in (0, 1], got {}",
                self.max_block_fraction
            )));
        }
        if self.min_blocks < 2 {
            return Err(DwError::InvalidConfig(
                "min_blocks must be at least 2".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PartitionConfig::default();
        assert!((config.max_linking_fraction - 0.25).abs() < 1e-12);
        assert_eq!(config.min_blocks, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_fractions() {
        assert!(PartitionConfig::default()
            .with_max_linking_fraction(1.5)
            .validate()
            .is_err());
        assert!(PartitionConfig::default()
            .with_max_block_fraction(0.0)
            .validate()
            .is_err());
        assert!(PartitionConfig::default()
            .with_min_blocks(1)
            .validate()
            .is_err());
    }
}
