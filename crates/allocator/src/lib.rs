//! Allocators for a frame-based game engine.
//!
//! Every allocator implements the [`Allocator`] capability contract, so the
//! containers built on top of it do not care where their memory comes from.
//!
//! | Allocator | Backing | Release | Use case |
//! |-----------|---------|---------|----------|
//! | [`HeapAllocator`] | process heap | individual | general purpose default |
//! | [`BlockAllocator`] | one heap region | individual, O(1) | fixed-size objects |
//! | [`Arena`] | reserved address range, committed on demand | whole arena | per-frame scratch, load-time data |
//! | [`ChainedArena`] | chain of OS blocks | whole arena | targets without reserve/commit |
//!
//! [`MemoryContext`] pairs a permanent arena with a temporary one that is
//! reset at every frame boundary.
//!
//! # Example
//!
//! ```
//! use core::alloc::Layout;
//!
//! use allocator::{Allocator, Arena, ArenaConfig};
//!
//! let mut arena = Arena::create(&ArenaConfig::new(1 << 20)).unwrap();
//! let layout = Layout::from_size_align(256, 16).unwrap();
//! let ptr = Allocator::allocate(&arena, layout).unwrap();
//! assert_eq!(ptr.addr().get() % 16, 0);
//!
//! // Everything allocated so far is invalidated at once.
//! arena.reset();
//! ```
//!
//! # Thread Safety
//!
//! The allocators are `Send` but not `Sync`. They use interior mutability so
//! that several containers can share one allocator by reference.

#![no_std]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

pub use self::{
    arena::{Arena, ArenaMark},
    block::{BLOCK_ALIGN, BlockAllocator},
    chained::ChainedArena,
    config::{ArenaConfig, BlockAllocatorConfig, ChainedArenaConfig, MemoryConfig},
    context::{Frames, MemoryContext},
    contract::Allocator,
    error::{ArenaError, BlockAllocatorError},
    heap::{HeapAllocator, MAX_ALIGN},
    os::OsError,
};

mod arena;
mod block;
mod chained;
mod config;
mod context;
pub mod contract;
mod error;
mod heap;
pub mod os;
