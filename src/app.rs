use crate::{
    arena::{Arena, ArenaError},
    commands::{Command, CommandError, CommandReader},
};

use std::io::{BufRead, Write};

use anyhow::Result;
use log::*;

/// Whether the command loop should keep going.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// State of a command session: at most one arena, created by
/// `ALLOC_ARENA` and dropped by `DEALLOC_ARENA`.
#[derive(Default)]
pub struct Session {
    arena: Option<Arena>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arena(&self) -> Option<&Arena> {
        self.arena.as_ref()
    }

    fn arena_mut(&mut self) -> Result<&mut Arena, ArenaError> {
        self.arena.as_mut().ok_or(ArenaError::UninitializedArena)
    }

    /// Runs every command from `input`, writing what the user gets
    /// to see on `out`. Stops at `DEALLOC_ARENA` or at the end of
    /// the input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        for command in CommandReader::new(input) {
            let flow = match command {
                Ok(command) => self.execute(command, out)?,
                Err(CommandError::Invalid { words }) => {
                    // One complaint per word, so that each stray
                    // argument is accounted for.
                    for _ in 0..words {
                        writeln!(out, "{}", CommandError::Invalid { words })?;
                    }
                    Flow::Continue
                }
                Err(error) => return Err(error.into()),
            };

            if flow == Flow::Stop {
                break;
            }
        }

        Ok(())
    }

    /// Ends the session, releasing the arena if the input never
    /// deallocated it.
    pub fn close(self) {
        if let Some(arena) = self.arena {
            arena.destroy();
        }
    }

    /// Executes a single command. Failures of the arena itself are
    /// reported on `out` and do not interrupt the session; only
    /// failing to write the output is an error.
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<Flow> {
        let flow = match command {
            Command::DeallocArena => Flow::Stop,
            _ => Flow::Continue,
        };

        if let Err(error) = self.apply(command, out) {
            let error = error.downcast::<ArenaError>()?;
            writeln!(out, "{error}")?;
        }

        Ok(flow)
    }

    fn apply<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        match command {
            Command::AllocArena { size } => {
                if self.arena.is_some() {
                    warn!("Replacing the existing arena.");
                }
                self.arena = Some(Arena::new(size));
            }
            Command::DeallocArena => {
                self.arena
                    .take()
                    .ok_or(ArenaError::UninitializedArena)?
                    .destroy();
            }
            Command::AllocBlock { address, size } => {
                self.arena_mut()?.allocate(address, size)?;
            }
            Command::FreeBlock { address } => {
                self.arena_mut()?.free(address)?;
            }
            Command::Read { address, size } => {
                let outcome = self.arena_mut()?.read(address, size)?;
                if outcome.truncated {
                    writeln!(
                        out,
                        "Warning: size was bigger than the block size. Reading {} characters.",
                        outcome.data.len(),
                    )?;
                }
                out.write_all(&outcome.data)?;
                writeln!(out)?;
            }
            Command::Write { address, size, data } => {
                let outcome = self.arena_mut()?.write(address, size, &data)?;
                if outcome.truncated {
                    writeln!(
                        out,
                        "Warning: size was bigger than the block size. Writing {} characters.",
                        outcome.written,
                    )?;
                }
            }
            Command::Pmap => {
                write!(out, "{}", self.arena_mut()?.report())?;
            }
        }

        Ok(())
    }
}
