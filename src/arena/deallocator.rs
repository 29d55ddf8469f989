use super::{Arena, ArenaError, Block, Operation};

use log::debug;

impl Arena {
    /// Releases the miniblock that starts at `address`.
    ///
    /// Removing a miniblock from the middle of a block leaves a
    /// hole in it, so the block is split in two around that hole.
    pub fn free(&mut self, address: u64) -> Result<(), ArenaError> {
        // Find the block holding the address, then the miniblock
        // inside it that starts exactly there. An address in the
        // middle of a miniblock does not identify an allocation.
        let invalid = ArenaError::InvalidAddress(Operation::Free);
        let block_index = self.block_containing(address).ok_or(invalid)?;
        let block = &mut self.blocks[block_index];
        let index = block.miniblock_at(address).ok_or(invalid)?;
        let count = block.miniblocks.len();

        let removed = if count == 1 {
            debug!("Freeing {address:#X} removes block {block_index}.");
            let mut block = self.blocks.remove(block_index);
            block.miniblocks.remove(index)
        } else if index == 0 || index == count - 1 {
            debug!("Freeing {address:#X} shrinks block {block_index}.");
            let removed = block.miniblocks.remove(index);
            block.size -= removed.size();
            if index == 0 {
                block.start = block.miniblocks[0].start;
            }
            removed
        } else {
            debug!("Freeing {address:#X} splits block {block_index}.");

            // Everything after the freed miniblock moves to a new
            // block placed right after the current one; the list
            // stays sorted since the new block only covers
            // addresses the old one used to.
            let tail = block.miniblocks.split_off(index + 1);
            let removed = block.miniblocks.remove(index);
            let right = Block::from_miniblocks(tail);
            block.size -= removed.size() + right.size;
            self.blocks.insert(block_index + 1, right);
            removed
        };

        self.free_bytes += removed.size();
        self.miniblock_count -= 1;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::spans;
    use super::*;

    #[test]
    fn freeing_the_tail_shrinks_the_block() {
        let mut arena = Arena::new(100);
        arena.allocate(0, 10).unwrap();
        arena.allocate(10, 10).unwrap();
        arena.free(10).unwrap();

        assert_eq!(spans(&arena), vec![(0, 10)]);
        assert_eq!(arena.blocks()[0].miniblocks().len(), 1);
        assert_eq!(arena.free_bytes(), 90);
        assert_eq!(arena.miniblock_count(), 1);
        arena.verify().unwrap();
    }

    #[test]
    fn freeing_the_head_moves_the_block_start() {
        let mut arena = Arena::new(100);
        arena.allocate(0, 10).unwrap();
        arena.allocate(10, 10).unwrap();
        arena.free(0).unwrap();

        assert_eq!(spans(&arena), vec![(10, 20)]);
        arena.verify().unwrap();
    }

    #[test]
    fn freeing_an_interior_miniblock_splits_the_block() {
        let mut arena = Arena::new(100);
        arena.allocate(0, 10).unwrap();
        arena.allocate(10, 10).unwrap();
        arena.allocate(20, 10).unwrap();
        arena.allocate(50, 5).unwrap();
        arena.free(10).unwrap();

        assert_eq!(spans(&arena), vec![(0, 10), (20, 30), (50, 55)]);
        assert!(arena.blocks().iter().all(|block| block.miniblocks().len() == 1));
        assert_eq!(arena.miniblock_count(), 3);
        assert_eq!(arena.free_bytes(), 75);
        arena.verify().unwrap();
    }

    #[test]
    fn split_keeps_multi_miniblock_halves() {
        let mut arena = Arena::new(100);
        for address in (0..50).step_by(10) {
            arena.allocate(address, 10).unwrap();
        }
        arena.free(20).unwrap();

        assert_eq!(spans(&arena), vec![(0, 20), (30, 50)]);
        assert_eq!(arena.blocks()[0].miniblocks().len(), 2);
        assert_eq!(arena.blocks()[1].miniblocks().len(), 2);
        assert_eq!(arena.blocks()[1].size(), 20);
        arena.verify().unwrap();
    }

    #[test]
    fn freeing_the_last_miniblock_removes_the_block() {
        let mut arena = Arena::new(100);
        arena.allocate(10, 10).unwrap();
        arena.allocate(40, 10).unwrap();
        arena.free(10).unwrap();

        assert_eq!(spans(&arena), vec![(40, 50)]);
        assert_eq!(arena.free_bytes(), 90);
        arena.verify().unwrap();
    }

    #[test]
    fn double_free_is_rejected() {
        let mut arena = Arena::new(100);
        arena.allocate(0, 10).unwrap();

        assert_eq!(arena.free(0), Ok(()));
        assert_eq!(
            arena.free(0),
            Err(ArenaError::InvalidAddress(Operation::Free)),
        );
        assert_eq!(arena.free_bytes(), 100);
    }

    #[test]
    fn free_requires_an_exact_start() {
        let mut arena = Arena::new(100);
        arena.allocate(0, 10).unwrap();
        arena.allocate(10, 10).unwrap();

        let invalid = Err(ArenaError::InvalidAddress(Operation::Free));
        assert_eq!(arena.free(5), invalid);
        assert_eq!(arena.free(20), invalid);
        assert_eq!(arena.free(99), invalid);
        assert_eq!(arena.miniblock_count(), 2);
        assert_eq!(spans(&arena), vec![(0, 20)]);
    }
}
