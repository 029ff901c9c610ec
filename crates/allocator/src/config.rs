//! Construction parameters for the allocators.
//!
//! Values are validated when the allocator is created and are immutable
//! afterwards.

/// Configuration of a commit-on-demand [`Arena`](crate::Arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Bytes of address space reserved up front. This is the arena's hard
    /// capacity.
    ///
    /// Rounded up to the OS page size. Must be non-zero.
    pub reserve_size: usize,

    /// Minimum number of bytes committed at once when the cursor crosses the
    /// committed boundary.
    ///
    /// Rounded up to the OS page size.
    pub commit_granularity: usize,
}

impl ArenaConfig {
    /// Default reservation: 64 MiB.
    pub const DEFAULT_RESERVE_SIZE: usize = 64 * 1024 * 1024;

    /// Default commit batch: 64 KiB.
    pub const DEFAULT_COMMIT_GRANULARITY: usize = 64 * 1024;

    /// Creates a config reserving `reserve_size` bytes with the default
    /// commit granularity.
    #[must_use]
    pub const fn new(reserve_size: usize) -> Self {
        Self {
            reserve_size,
            commit_granularity: Self::DEFAULT_COMMIT_GRANULARITY,
        }
    }

    /// Replaces the commit granularity.
    #[must_use]
    pub const fn with_commit_granularity(mut self, commit_granularity: usize) -> Self {
        self.commit_granularity = commit_granularity;
        self
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RESERVE_SIZE)
    }
}

/// Configuration of a [`ChainedArena`](crate::ChainedArena).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainedArenaConfig {
    /// Size of a regular block, header included. Requests that do not fit
    /// get a dedicated larger block.
    ///
    /// Rounded up to the OS page size. Must be non-zero.
    pub block_size: usize,
}

impl ChainedArenaConfig {
    /// Default block size: 64 KiB.
    pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

    /// Creates a config with the given minimum block size.
    ///
    /// # Arguments
    ///
    /// * `block_size` - Smallest block obtained from the OS, in bytes. It is
    ///   rounded up to the page size when the arena is created. Requests that
    ///   do not fit get a dedicated block of their own size.
    ///
    /// # Examples
    ///
    /// ```
    /// use allocator::ChainedArenaConfig;
    ///
    /// let config = ChainedArenaConfig::new(16 * 1024);
    /// assert_eq!(config.block_size, 16 * 1024);
    /// ```
    #[must_use]
    pub const fn new(block_size: usize) -> Self {
        Self { block_size }
    }
}

impl Default for ChainedArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BLOCK_SIZE)
    }
}

/// Configuration of a [`BlockAllocator`](crate::BlockAllocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAllocatorConfig {
    /// Bytes per block, rounded up to the block alignment. Must be non-zero.
    pub block_size: usize,
    /// Number of blocks. Must be non-zero.
    pub block_count: usize,
}

impl BlockAllocatorConfig {
    /// Creates a config for `block_count` blocks of `block_size` bytes.
    #[must_use]
    pub const fn new(block_size: usize, block_count: usize) -> Self {
        Self {
            block_size,
            block_count,
        }
    }
}

/// Configuration of the permanent/temporary arena pair of a
/// [`MemoryContext`](crate::MemoryContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Arena that lives until shutdown.
    pub permanent: ArenaConfig,
    /// Arena reset at every frame boundary.
    pub temporary: ArenaConfig,
}

impl MemoryConfig {
    /// Default permanent reservation: 256 MiB.
    pub const DEFAULT_PERMANENT_SIZE: usize = 256 * 1024 * 1024;

    /// Default temporary reservation: 64 MiB.
    pub const DEFAULT_TEMPORARY_SIZE: usize = 64 * 1024 * 1024;
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            permanent: ArenaConfig::new(Self::DEFAULT_PERMANENT_SIZE),
            temporary: ArenaConfig::new(Self::DEFAULT_TEMPORARY_SIZE),
        }
    }
}
