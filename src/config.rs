//! Construction parameters for every map in the crate.

use crate::error::{ConfigError, Result};
use crate::reference_map::ReferenceStrength;

/// Default number of buckets.
pub const DEFAULT_CAPACITY: usize = 16;
/// Default fill ratio at which the bucket array doubles.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;
/// Largest bucket array the core will allocate.
pub const MAXIMUM_CAPACITY: usize = 1 << 30;
/// Default bound for `LruMap`.
pub const DEFAULT_MAX_SIZE: usize = 100;

/// Bucket array sizing shared by every table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableConfig {
    /// Requested bucket count; rounded up to a power of two.
    pub initial_capacity: usize,
    pub load_factor: f32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

impl TableConfig {
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_capacity == 0 || self.initial_capacity > MAXIMUM_CAPACITY {
            return Err(ConfigError::InvalidCapacity {
                requested: self.initial_capacity,
                max: MAXIMUM_CAPACITY,
            });
        }
        if !self.load_factor.is_finite() || self.load_factor <= 0.0 {
            return Err(ConfigError::InvalidLoadFactor(self.load_factor));
        }
        Ok(())
    }

    /// Bucket count actually allocated for this configuration.
    pub(crate) fn bucket_count(&self) -> usize {
        self.initial_capacity.next_power_of_two()
    }

    pub(crate) fn threshold_for(&self, buckets: usize) -> usize {
        threshold(buckets, self.load_factor)
    }
}

pub(crate) fn threshold(buckets: usize, load_factor: f32) -> usize {
    // f64 keeps 2^30 * lf exact enough; saturates for absurd factors.
    (buckets as f64 * f64::from(load_factor)) as usize
}

/// Bound and eviction behavior of an `LruMap`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LruConfig {
    pub max_size: usize,
    /// Starting bucket count. When `None` it follows `max_size`, capped at
    /// `MAXIMUM_CAPACITY`.
    pub initial_capacity: Option<usize>,
    pub load_factor: f32,
    /// Walk past vetoed candidates instead of giving up after the oldest.
    pub scan_until_removable: bool,
}

impl Default for LruConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            initial_capacity: None,
            load_factor: DEFAULT_LOAD_FACTOR,
            scan_until_removable: false,
        }
    }
}

impl LruConfig {
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(ConfigError::InvalidMaxSize(self.max_size));
        }
        if let Some(initial) = self.initial_capacity {
            if initial > self.max_size {
                return Err(ConfigError::CapacityExceedsMaxSize {
                    initial,
                    max_size: self.max_size,
                });
            }
        }
        self.table().validate()
    }

    pub(crate) fn table(&self) -> TableConfig {
        TableConfig {
            initial_capacity: self
                .initial_capacity
                .unwrap_or(self.max_size.min(MAXIMUM_CAPACITY)),
            load_factor: self.load_factor,
        }
    }
}

/// Holder strengths and purge behavior of a `ReferenceMap`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceConfig {
    pub key_strength: ReferenceStrength,
    pub value_strength: ReferenceStrength,
    pub table: TableConfig,
    /// Drop a purged key's value immediately instead of leaving it orphaned.
    pub purge_values: bool,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            key_strength: ReferenceStrength::Hard,
            value_strength: ReferenceStrength::Soft,
            table: TableConfig::default(),
            purge_values: false,
        }
    }
}

impl ReferenceConfig {
    pub fn new(key_strength: ReferenceStrength, value_strength: ReferenceStrength) -> Self {
        Self {
            key_strength,
            value_strength,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.table.validate()
    }
}
