//! Errors raised while constructing allocators.
//!
//! Allocation itself never produces these: an exhausted allocator returns
//! `None` from the [`Allocator`](crate::Allocator) operations.

use snafu::Snafu;
use snafu_utils::{Located, Location};

use crate::os::OsError;

/// Errors creating an [`Arena`](crate::Arena) or
/// [`ChainedArena`](crate::ChainedArena).
#[derive(Debug, Snafu)]
#[snafu(module, visibility(pub(crate)))]
pub enum ArenaError {
    #[snafu(display("invalid arena configuration: {reason}"))]
    InvalidConfig {
        reason: &'static str,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to reserve {size} bytes of address space"))]
    Reserve {
        size: usize,
        #[snafu(source)]
        source: OsError,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for ArenaError {
    fn location(&self) -> Location {
        match self {
            Self::InvalidConfig { location, .. } | Self::Reserve { location, .. } => *location,
        }
    }
}

/// Errors creating a [`BlockAllocator`](crate::BlockAllocator).
#[derive(Debug, Snafu)]
#[snafu(module, visibility(pub(crate)))]
pub enum BlockAllocatorError {
    #[snafu(display("invalid block allocator configuration: {reason}"))]
    InvalidConfig {
        reason: &'static str,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to obtain {size} bytes of backing memory"))]
    Backing {
        size: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for BlockAllocatorError {
    fn location(&self) -> Location {
        match self {
            Self::InvalidConfig { location, .. } | Self::Backing { location, .. } => *location,
        }
    }
}
