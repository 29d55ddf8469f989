use std::fmt;

use thiserror::Error;

/// Which edge of a requested range fell outside the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boundary {
    /// The first address is already past the arena.
    Start,
    /// The range starts inside the arena but runs past its end.
    End,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Boundary::Start => "The allocated address is outside the size of arena",
            Boundary::End => "The end address is past the size of the arena",
        })
    }
}

/// Operation that was given an address it could not resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Free,
    Read,
    Write,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Free => "free",
            Operation::Read => "read",
            Operation::Write => "write",
        })
    }
}

// Every variant leaves the arena exactly as it was before the
// failed call, so callers can report it and keep going.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    #[error("{0}")]
    OutOfBounds(Boundary),
    #[error("This zone was already allocated.")]
    RegionOverlap,
    #[error("Invalid address for {0}.")]
    InvalidAddress(Operation),
    #[error("The arena has not been allocated.")]
    UninitializedArena,
    #[error("Cannot allocate an empty zone.")]
    EmptyRegion,
    #[error("Not enough memory to back the zone.")]
    OutOfMemory,
}
