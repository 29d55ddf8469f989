use std::fmt;

use super::{Arena, Permission};

/// Snapshot of the layout of an arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutReport {
    pub capacity: u64,
    pub free_bytes: u64,
    pub block_count: usize,
    pub miniblock_count: usize,
    pub blocks: Vec<BlockReport>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockReport {
    pub start: u64,
    pub end: u64,
    pub miniblocks: Vec<MiniblockReport>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MiniblockReport {
    pub start: u64,
    pub end: u64,
    pub permission: Permission,
}

impl Arena {
    pub fn report(&self) -> LayoutReport {
        let blocks = self
            .blocks
            .iter()
            .map(|block| BlockReport {
                start: block.start(),
                end: block.end(),
                miniblocks: block
                    .miniblocks()
                    .iter()
                    .map(|miniblock| MiniblockReport {
                        start: miniblock.start(),
                        end: miniblock.end(),
                        permission: miniblock.permission(),
                    })
                    .collect(),
            })
            .collect();

        LayoutReport {
            capacity: self.capacity,
            free_bytes: self.free_bytes,
            block_count: self.blocks.len(),
            miniblock_count: self.miniblock_count,
            blocks,
        }
    }
}

// Process-map style listing: totals first, then each block with
// its miniblocks, numbered from 1.
impl fmt::Display for LayoutReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total memory: 0x{:X} bytes", self.capacity)?;
        writeln!(f, "Free memory: 0x{:X} bytes", self.free_bytes)?;
        writeln!(f, "Number of allocated blocks: {}", self.block_count)?;
        writeln!(f, "Number of allocated miniblocks: {}", self.miniblock_count)?;

        for (i, block) in self.blocks.iter().enumerate() {
            let number = i + 1;
            writeln!(f)?;
            writeln!(f, "Block {number} begin")?;
            writeln!(f, "Zone: 0x{:X} - 0x{:X}", block.start, block.end)?;
            for (j, miniblock) in block.miniblocks.iter().enumerate() {
                writeln!(
                    f,
                    "Miniblock {}:\t\t0x{:X}\t\t-\t\t0x{:X}\t\t| {}",
                    j + 1,
                    miniblock.start,
                    miniblock.end,
                    miniblock.permission,
                )?;
            }
            writeln!(f, "Block {number} end")?;
        }

        Ok(())
    }
}
