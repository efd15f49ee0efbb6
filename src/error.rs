//! Error types surfaced by map constructors and guarded mutations.
//!
//! Usage-sequence errors (cursor misuse, concurrent modification) are not
//! represented here: they panic at the call site.

/// Rejected construction parameters. A map is never built from an invalid
/// configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("initial capacity must be between 1 and {max}, got {requested}")]
    InvalidCapacity { requested: usize, max: usize },

    #[error("load factor must be finite and greater than zero, got {0}")]
    InvalidLoadFactor(f32),

    #[error("maximum size must be at least 1, got {0}")]
    InvalidMaxSize(usize),

    #[error("initial capacity {initial} exceeds maximum size {max_size}")]
    CapacityExceedsMaxSize { initial: usize, max_size: usize },
}

/// A bidi map refused a mutation that would break the key/value bijection.
/// The map is unchanged and remains usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BidiError {
    #[error("value is already bound to a different key")]
    ValueAlreadyBound,
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
