mod access;
mod allocator;
mod block;
mod deallocator;
mod error;
mod report;

pub use access::{ReadOutcome, WriteOutcome};
pub use block::{Block, Miniblock, Permission};
pub use error::{ArenaError, Boundary, Operation};
pub use report::{BlockReport, LayoutReport, MiniblockReport};

use anyhow::{anyhow, Result};
use log::*;

/// Simulated address space of a fixed capacity. Allocated ranges
/// are tracked as a list of blocks sorted by address, each block
/// being a maximal run of adjacent miniblocks.
#[derive(Debug)]
pub struct Arena {
    /// Total number of addressable bytes.
    capacity: u64,
    /// Bytes not covered by any block.
    free_bytes: u64,
    /// Number of miniblocks across all blocks.
    miniblock_count: usize,
    /// Blocks sorted by start address. Two blocks never overlap
    /// nor touch: touching blocks are merged on allocation.
    blocks: Vec<Block>,
}

impl Arena {
    pub fn new(capacity: u64) -> Self {
        info!("Arena of {capacity:#X} bytes created.");

        Self {
            capacity,
            free_bytes: capacity,
            miniblock_count: 0,
            blocks: Vec::new(),
        }
    }

    /// Releases the arena along with every block, miniblock and
    /// buffer it still holds.
    pub fn destroy(self) {
        info!(
            "Arena destroyed, releasing {} blocks and {} miniblocks.",
            self.blocks.len(),
            self.miniblock_count,
        );
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn free_bytes(&self) -> u64 {
        self.free_bytes
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn miniblock_count(&self) -> usize {
        self.miniblock_count
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Index of the block whose range holds `address`.
    fn block_containing(&self, address: u64) -> Option<usize> {
        // Blocks are sorted and disjoint, so the only candidate is
        // the last block starting at or before the address.
        let index = self
            .blocks
            .partition_point(|block| block.start <= address)
            .checked_sub(1)?;

        self.blocks[index].contains(address).then_some(index)
    }

    /// Checks every structural invariant of the arena and reports
    /// the first one that does not hold.
    pub fn verify(&self) -> Result<()> {
        let mut used = 0;
        let mut miniblocks = 0;

        for (index, block) in self.blocks.iter().enumerate() {
            let first = block
                .miniblocks
                .first()
                .ok_or_else(|| anyhow!("Block {index} has no miniblocks."))?;
            if first.start != block.start {
                return Err(anyhow!(
                    "Block {index} starts at {:#X} but its first miniblock at {:#X}.",
                    block.start,
                    first.start,
                ));
            }

            // The miniblocks must tile the block: each one begins
            // where the previous one ends.
            let mut cursor = block.start;
            for miniblock in &block.miniblocks {
                if miniblock.start != cursor {
                    return Err(anyhow!(
                        "Gap or overlap in block {index} at {:#X}.",
                        miniblock.start,
                    ));
                }
                if miniblock.size() == 0 {
                    return Err(anyhow!("Empty miniblock at {:#X}.", miniblock.start));
                }
                cursor = miniblock.end();
            }
            if cursor != block.end() {
                return Err(anyhow!(
                    "Block {index} has size {:#X} but its miniblocks cover {:#X}.",
                    block.size,
                    cursor - block.start,
                ));
            }

            if let Some(next) = self.blocks.get(index + 1) {
                if block.end() >= next.start {
                    return Err(anyhow!(
                        "Blocks {index} and {} overlap or touch.",
                        index + 1,
                    ));
                }
            }
            if block.end() > self.capacity {
                return Err(anyhow!("Block {index} runs past the arena."));
            }

            used += block.size;
            miniblocks += block.miniblocks.len();
        }

        if self.free_bytes + used != self.capacity {
            return Err(anyhow!(
                "Free bytes {:#X} do not match capacity {:#X} minus used {:#X}.",
                self.free_bytes,
                self.capacity,
                used,
            ));
        }
        if miniblocks != self.miniblock_count {
            return Err(anyhow!(
                "Counted {miniblocks} miniblocks, arena records {}.",
                self.miniblock_count,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Start/end pairs of every block, for compact assertions.
    pub(crate) fn spans(arena: &Arena) -> Vec<(u64, u64)> {
        arena
            .blocks()
            .iter()
            .map(|block| (block.start(), block.end()))
            .collect()
    }

    #[test]
    fn new_arena_is_empty() {
        let arena = Arena::new(0x100);
        assert_eq!(arena.capacity(), 0x100);
        assert_eq!(arena.free_bytes(), 0x100);
        assert_eq!(arena.block_count(), 0);
        assert_eq!(arena.miniblock_count(), 0);
        arena.verify().unwrap();
        arena.destroy();
    }

    #[test]
    fn block_lookup_uses_half_open_ranges() {
        let mut arena = Arena::new(100);
        arena.allocate(10, 10).unwrap();
        arena.allocate(40, 10).unwrap();

        assert_eq!(arena.block_containing(9), None);
        assert_eq!(arena.block_containing(10), Some(0));
        assert_eq!(arena.block_containing(19), Some(0));
        assert_eq!(arena.block_containing(20), None);
        assert_eq!(arena.block_containing(45), Some(1));
        assert_eq!(arena.block_containing(50), None);
    }

    #[derive(Clone, Debug)]
    enum Step {
        Allocate(u64, u64),
        Free(u64),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0_u64..260, 0_u64..24).prop_map(|(address, size)| Step::Allocate(address, size)),
            (0_u64..260).prop_map(Step::Free),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn random_sequences_keep_layout_consistent(steps in prop::collection::vec(step(), 1..80)) {
            let mut arena = Arena::new(256);
            // Live allocations as (start, size), to check the
            // arena against a plain model.
            let mut live: Vec<(u64, u64)> = Vec::new();

            for step in steps {
                let free_before = arena.free_bytes();
                let spans_before = spans(&arena);

                match step {
                    Step::Allocate(address, size) => {
                        let fits = size > 0 && address + size <= 256;
                        let clear = live
                            .iter()
                            .all(|&(start, len)| address + size <= start || start + len <= address);

                        match arena.allocate(address, size) {
                            Ok(()) => {
                                prop_assert!(fits && clear);
                                live.push((address, size));
                            }
                            Err(_) => {
                                prop_assert!(!(fits && clear));
                                prop_assert_eq!(arena.free_bytes(), free_before);
                                prop_assert_eq!(spans(&arena), spans_before);
                            }
                        }
                    }
                    Step::Free(address) => {
                        let position = live.iter().position(|&(start, _)| start == address);
                        match arena.free(address) {
                            Ok(()) => {
                                let position = position.expect("freed an untracked address");
                                live.remove(position);
                            }
                            Err(error) => {
                                prop_assert!(position.is_none());
                                prop_assert_eq!(error, ArenaError::InvalidAddress(Operation::Free));
                                prop_assert_eq!(spans(&arena), spans_before);
                            }
                        }
                    }
                }

                prop_assert!(arena.verify().is_ok(), "{:?}", arena.verify());
                prop_assert_eq!(arena.miniblock_count(), live.len());
                let used: u64 = live.iter().map(|&(_, size)| size).sum();
                prop_assert_eq!(arena.free_bytes(), 256 - used);
            }
        }
    }
}
