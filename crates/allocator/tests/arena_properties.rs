use core::alloc::Layout;

use allocator::{Allocator, Arena, ArenaConfig, ChainedArena, ChainedArenaConfig, os};
use proptest::prelude::*;

fn layouts() -> impl Strategy<Value = Vec<Layout>> {
    proptest::collection::vec(
        (1_usize..5_000, 0_u32..7)
            .prop_map(|(size, shift)| Layout::from_size_align(size, 1 << shift).unwrap()),
        1..40,
    )
}

proptest! {
    #[test]
    fn reset_then_same_allocations_never_commit(layouts in layouts()) {
        let mut arena = Arena::create(
            &ArenaConfig::new(1 << 22).with_commit_granularity(os::page_size()),
        )
        .unwrap();
        for layout in &layouts {
            prop_assert!(arena.allocate(*layout).is_some());
        }
        let commits = arena.commit_count();
        let committed = arena.committed();

        arena.reset();
        for layout in &layouts {
            prop_assert!(arena.allocate(*layout).is_some());
        }
        prop_assert_eq!(arena.commit_count(), commits);
        prop_assert_eq!(arena.committed(), committed);
    }

    #[test]
    fn arena_cursor_stays_within_bounds(layouts in layouts()) {
        let arena = Arena::create(&ArenaConfig::new(1 << 16)).unwrap();
        for layout in &layouts {
            if let Some(ptr) = arena.allocate(*layout) {
                prop_assert_eq!(ptr.addr().get() % layout.align(), 0);
            }
            prop_assert!(arena.used() <= arena.committed());
            prop_assert!(arena.committed() <= arena.reserved());
        }
    }

    #[test]
    fn chained_allocations_are_disjoint(layouts in layouts()) {
        let arena = ChainedArena::create(&ChainedArenaConfig::new(os::page_size())).unwrap();
        let mut ranges = Vec::new();
        for layout in &layouts {
            let ptr = Allocator::allocate(&arena, *layout).unwrap();
            prop_assert_eq!(ptr.addr().get() % layout.align(), 0);
            unsafe { ptr.as_ptr().write_bytes(0x33, layout.size()) };
            let start = ptr.addr().get();
            ranges.push((start, start + layout.size()));
        }
        ranges.sort_unstable();
        for pair in ranges.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].0);
        }
    }
}
