use std::fmt;

use super::ArenaError;

/// Access rights of a miniblock. Every miniblock is created
/// readable and writable, and nothing changes it afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Permission(u8);

impl Permission {
    pub const READ: u8 = 0b100;
    pub const WRITE: u8 = 0b010;
    pub const EXEC: u8 = 0b001;

    pub const fn read_write() -> Self {
        Self(Self::READ | Self::WRITE)
    }
}

impl Default for Permission {
    fn default() -> Self {
        Self::read_write()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Same layout as the `rwx` column of a process map: one
        // letter per right, a dash when it is missing.
        let flag = |bit: u8, c: char| if self.0 & bit != 0 { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(Self::READ, 'R'),
            flag(Self::WRITE, 'W'),
            flag(Self::EXEC, 'X'),
        )
    }
}

/// The range created by a single allocation. It owns the bytes
/// that are read and written through it.
#[derive(Debug)]
pub struct Miniblock {
    /// Address of the first byte of the miniblock.
    pub(crate) start: u64,
    /// Backing storage, exactly as long as the miniblock.
    pub(crate) buffer: Vec<u8>,
    pub(crate) permission: Permission,
}

impl Miniblock {
    /// Creates a zeroed miniblock. The buffer is reserved up front
    /// so that a size the host cannot hold is reported instead of
    /// aborting the process.
    pub fn new(start: u64, size: u64) -> Result<Self, ArenaError> {
        let length = usize::try_from(size).map_err(|_| ArenaError::OutOfMemory)?;

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(length)
            .map_err(|_| ArenaError::OutOfMemory)?;
        buffer.resize(length, 0);

        Ok(Self {
            start,
            buffer,
            permission: Permission::default(),
        })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn size(&self) -> u64 {
        self.buffer.len() as u64
    }

    pub fn end(&self) -> u64 {
        self.start + self.size()
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub fn contains(&self, address: u64) -> bool {
        self.start <= address && address < self.end()
    }

    #[cfg(test)]
    pub(crate) fn data(&self) -> &[u8] {
        &self.buffer
    }
}

/// A maximal run of adjacent miniblocks. The miniblocks are kept
/// sorted by address and cover `[start, start + size)` without
/// gaps, so a block is never empty.
#[derive(Debug)]
pub struct Block {
    pub(crate) start: u64,
    pub(crate) size: u64,
    pub(crate) miniblocks: Vec<Miniblock>,
}

impl Block {
    /// Creates a block holding a single miniblock.
    pub fn new(miniblock: Miniblock) -> Self {
        Self {
            start: miniblock.start,
            size: miniblock.size(),
            miniblocks: vec![miniblock],
        }
    }

    /// Builds a block out of miniblocks that are already adjacent
    /// and sorted. Used when a block is split in two.
    pub(crate) fn from_miniblocks(miniblocks: Vec<Miniblock>) -> Self {
        let start = miniblocks.first().map_or(0, Miniblock::start);
        let size = miniblocks.iter().map(Miniblock::size).sum();

        Self {
            start,
            size,
            miniblocks,
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    pub fn miniblocks(&self) -> &[Miniblock] {
        &self.miniblocks
    }

    pub fn contains(&self, address: u64) -> bool {
        self.start <= address && address < self.end()
    }

    /// Whether `[start, end)` shares at least one byte with the
    /// block. Ranges that only touch an edge do not intersect.
    pub fn intersects(&self, start: u64, end: u64) -> bool {
        start < self.end() && self.start < end
    }

    /// Index of the miniblock that begins exactly at `address`.
    pub fn miniblock_at(&self, address: u64) -> Option<usize> {
        self.miniblocks
            .binary_search_by_key(&address, Miniblock::start)
            .ok()
    }

    /// Index of the miniblock whose range holds `address`.
    pub fn miniblock_containing(&self, address: u64) -> Option<usize> {
        let index = self
            .miniblocks
            .partition_point(|miniblock| miniblock.start <= address)
            .checked_sub(1)?;

        self.miniblocks[index].contains(address).then_some(index)
    }

    pub(crate) fn push_back(&mut self, miniblock: Miniblock) {
        self.size += miniblock.size();
        self.miniblocks.push(miniblock);
    }

    pub(crate) fn push_front(&mut self, miniblock: Miniblock) {
        self.start = miniblock.start;
        self.size += miniblock.size();
        self.miniblocks.insert(0, miniblock);
    }

    /// Moves every miniblock of `other` to the tail of this block.
    pub(crate) fn absorb(&mut self, other: Block) {
        self.size += other.size;
        self.miniblocks.extend(other.miniblocks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_renders_as_rw() {
        assert_eq!(Permission::default().to_string(), "RW-");
        assert_eq!(Permission::default(), Permission::read_write());
    }

    #[test]
    fn miniblock_buffer_matches_size() {
        let miniblock = Miniblock::new(16, 8).unwrap();
        assert_eq!(miniblock.size(), 8);
        assert_eq!(miniblock.end(), 24);
        assert_eq!(miniblock.data(), &[0; 8]);
        assert!(miniblock.contains(16));
        assert!(miniblock.contains(23));
        assert!(!miniblock.contains(24));
    }

    #[test]
    fn oversized_miniblock_is_refused() {
        assert_eq!(
            Miniblock::new(0, 1 << 60).unwrap_err(),
            ArenaError::OutOfMemory,
        );
    }

    #[test]
    fn block_lookups() {
        let mut block = Block::new(Miniblock::new(10, 5).unwrap());
        block.push_back(Miniblock::new(15, 5).unwrap());
        block.push_front(Miniblock::new(0, 10).unwrap());

        assert_eq!(block.start(), 0);
        assert_eq!(block.size(), 20);
        assert_eq!(block.miniblock_at(15), Some(2));
        assert_eq!(block.miniblock_at(12), None);
        assert_eq!(block.miniblock_containing(12), Some(1));
        assert_eq!(block.miniblock_containing(20), None);
    }

    #[test]
    fn touching_ranges_do_not_intersect() {
        let block = Block::new(Miniblock::new(10, 10).unwrap());
        assert!(!block.intersects(0, 10));
        assert!(!block.intersects(20, 30));
        assert!(block.intersects(19, 21));
        assert!(block.intersects(0, 100));
    }
}
