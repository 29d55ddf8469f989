use std::ops::Range;

use super::{Arena, ArenaError, Operation};

use log::warn;

/// Result of a successful write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Bytes actually copied into the arena.
    pub written: u64,
    /// Set when the allocation ended before the whole payload
    /// could be written.
    pub truncated: bool,
}

/// Result of a successful read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadOutcome {
    pub data: Vec<u8>,
    /// Set when the allocation ended before `size` bytes could be
    /// read; `data` then holds what was available.
    pub truncated: bool,
}

/// Where an access lands: the block, the miniblocks it may walk
/// through, and the offset into the first of them.
struct Span {
    block: usize,
    miniblocks: Range<usize>,
    offset: usize,
}

impl Arena {
    fn span(&self, address: u64, operation: Operation) -> Result<Span, ArenaError> {
        let invalid = ArenaError::InvalidAddress(operation);
        let block = self.block_containing(address).ok_or(invalid)?;
        let index = self.blocks[block]
            .miniblock_containing(address)
            .ok_or(invalid)?;
        let miniblock = &self.blocks[block].miniblocks[index];

        // An access starting exactly on a miniblock may continue
        // into the following miniblocks of the same block. One
        // starting inside a miniblock stays within it.
        let miniblocks = if miniblock.start == address {
            index..self.blocks[block].miniblocks.len()
        } else {
            index..index + 1
        };

        Ok(Span {
            block,
            miniblocks,
            offset: (address - miniblock.start) as usize,
        })
    }

    /// Copies `data` into the arena starting at `address`.
    ///
    /// At most `size` bytes are written, and never more than the
    /// payload holds. If the allocation is too short, as many
    /// bytes as fit are written and the outcome is flagged as
    /// truncated.
    pub fn write(&mut self, address: u64, size: u64, data: &[u8]) -> Result<WriteOutcome, ArenaError> {
        let span = self.span(address, Operation::Write)?;
        let requested = size.min(data.len() as u64);

        let mut written = 0;
        let mut offset = span.offset;
        for miniblock in &mut self.blocks[span.block].miniblocks[span.miniblocks] {
            if written == requested {
                break;
            }

            let room = &mut miniblock.buffer[offset..];
            let count = (requested - written).min(room.len() as u64) as usize;
            let source = &data[written as usize..written as usize + count];
            room[..count].copy_from_slice(source);

            written += count as u64;
            offset = 0;
        }

        let truncated = written < requested;
        if truncated {
            warn!("Write at {address:#X} truncated to {written} of {requested} bytes.");
        }

        Ok(WriteOutcome { written, truncated })
    }

    /// Reads up to `size` bytes starting at `address`.
    pub fn read(&self, address: u64, size: u64) -> Result<ReadOutcome, ArenaError> {
        let span = self.span(address, Operation::Read)?;

        let mut data = Vec::new();
        let mut offset = span.offset;
        for miniblock in &self.blocks[span.block].miniblocks[span.miniblocks] {
            let read = data.len() as u64;
            if read == size {
                break;
            }

            let available = &miniblock.buffer[offset..];
            let count = (size - read).min(available.len() as u64) as usize;
            data.extend_from_slice(&available[..count]);
            offset = 0;
        }

        let truncated = (data.len() as u64) < size;
        if truncated {
            warn!("Read at {address:#X} truncated to {} of {size} bytes.", data.len());
        }

        Ok(ReadOutcome { data, truncated })
    }
}
