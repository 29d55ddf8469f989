use super::{Arena, ArenaError, Block, Boundary, Miniblock};

use log::debug;

impl Arena {
    /// Reserves `[address, address + size)` as a new miniblock.
    ///
    /// The range must lie inside the arena and must not share a
    /// byte with any existing allocation. When it touches existing
    /// blocks it is merged into them, so that the block list keeps
    /// describing maximal contiguous regions.
    pub fn allocate(&mut self, address: u64, size: u64) -> Result<(), ArenaError> {
        let end = self.check_range(address, size)?;
        let miniblock = Miniblock::new(address, size)?;

        self.free_bytes -= size;
        self.miniblock_count += 1;

        // Since the range is free, at most one block can end right
        // where it begins (the left neighbour) and at most one can
        // begin right where it ends (the right neighbour). Blocks
        // are sorted, so if both exist, they are consecutive.
        let left = self.blocks.iter().position(|block| block.end() == address);
        let right = self.blocks.iter().position(|block| block.start == end);

        match (left, right) {
            (Some(left), Some(right)) => {
                debug!("Allocation {address:#X}+{size:#X} bridges blocks {left} and {right}.");

                // The right block disappears into the left one,
                // after the new miniblock.
                let right = self.blocks.remove(right);
                let block = &mut self.blocks[left];
                block.push_back(miniblock);
                block.absorb(right);
            }
            (Some(left), None) => {
                debug!("Allocation {address:#X}+{size:#X} extends block {left}.");
                self.blocks[left].push_back(miniblock);
            }
            (None, Some(right)) => {
                debug!("Allocation {address:#X}+{size:#X} prepended to block {right}.");
                self.blocks[right].push_front(miniblock);
            }
            (None, None) => {
                // No neighbour: insert a new block at the position
                // that keeps the list sorted by address.
                let index = self.blocks.partition_point(|block| block.start < address);
                debug!("Allocation {address:#X}+{size:#X} creates block {index}.");
                self.blocks.insert(index, Block::new(miniblock));
            }
        }

        Ok(())
    }

    /// Validates a requested range and returns its end address.
    /// Nothing is modified, whatever the outcome.
    fn check_range(&self, address: u64, size: u64) -> Result<u64, ArenaError> {
        if size == 0 {
            return Err(ArenaError::EmptyRegion);
        }
        if address >= self.capacity {
            return Err(ArenaError::OutOfBounds(Boundary::Start));
        }

        let end = address
            .checked_add(size)
            .filter(|&end| end <= self.capacity)
            .ok_or(ArenaError::OutOfBounds(Boundary::End))?;

        // Miniblocks tile their block, so a range that intersects
        // a block necessarily intersects one of its miniblocks.
        // Only the blocks starting before `end` can intersect, and
        // among them only the last one can reach past `address`.
        let candidates = self.blocks.partition_point(|block| block.start < end);
        if candidates > 0 && self.blocks[candidates - 1].intersects(address, end) {
            return Err(ArenaError::RegionOverlap);
        }

        Ok(end)
    }
}
