//! Sorting configuration.

use std::error::Error;
use std::fmt::{self, Display};

/// Smallest accepted block size in bytes.
pub const MIN_BLOCK_SIZE: u64 = 4;
/// Largest accepted block size in bytes (32 GiB).
pub const MAX_BLOCK_SIZE: u64 = 32 * 1024 * 1024 * 1024;
/// Smallest accepted branching degree.
pub const MIN_BRANCHING_DEGREE: usize = 2;

pub const DEFAULT_BLOCK_SIZE: u64 = 1024 * 1024 * 1024;
pub const DEFAULT_BRANCHING_DEGREE: usize = 8;

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Block size lies outside of the accepted range.
    BlockSizeOutOfRange(u64),
    /// Block size is not a multiple of the record width.
    BlockSizeNotAligned { block_size: u64, record_width: usize },
    /// Branching degree is too small to make progress.
    BranchingDegreeTooSmall(usize),
}

impl Error for ConfigError {}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            ConfigError::BlockSizeOutOfRange(block_size) => write!(
                f,
                "block size {} is out of range [{}; {}] bytes",
                block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE
            ),
            ConfigError::BlockSizeNotAligned {
                block_size,
                record_width,
            } => write!(
                f,
                "block size {} is not a multiple of the record width {}",
                block_size, record_width
            ),
            ConfigError::BranchingDegreeTooSmall(degree) => write!(
                f,
                "branching degree {} is less than {}",
                degree, MIN_BRANCHING_DEGREE
            ),
        }
    }
}

/// External sort tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortConfig {
    /// Maximum number of input bytes held in memory at once.
    pub block_size: u64,
    /// Maximum number of runs merged at once and of sub-files produced by one split.
    pub branching_degree: usize,
}

impl SortConfig {
    pub fn new(block_size: u64, branching_degree: usize) -> Self {
        SortConfig {
            block_size,
            branching_degree,
        }
    }

    /// Checks the configuration against records of `record_width` bytes.
    pub fn validate(&self, record_width: usize) -> Result<(), ConfigError> {
        if self.block_size < MIN_BLOCK_SIZE || self.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::BlockSizeOutOfRange(self.block_size));
        }
        if self.block_size % record_width as u64 != 0 {
            return Err(ConfigError::BlockSizeNotAligned {
                block_size: self.block_size,
                record_width,
            });
        }
        if self.branching_degree < MIN_BRANCHING_DEGREE {
            return Err(ConfigError::BranchingDegreeTooSmall(self.branching_degree));
        }

        return Ok(());
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        SortConfig::new(DEFAULT_BLOCK_SIZE, DEFAULT_BRANCHING_DEGREE)
    }
}
