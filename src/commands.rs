use std::{collections::HashMap, io::BufRead};

use lazy_static::lazy_static;
use log::trace;
use thiserror::Error;

/// A single request read from the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    AllocArena { size: u64 },
    DeallocArena,
    AllocBlock { address: u64, size: u64 },
    FreeBlock { address: u64 },
    Read { address: u64, size: u64 },
    Write { address: u64, size: u64, data: Vec<u8> },
    Pmap,
}

/// How many arguments a command takes.
#[derive(Clone, Copy, Debug)]
enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

lazy_static! {
    static ref ARITIES: HashMap<&'static str, Arity> = HashMap::from([
        ("ALLOC_ARENA", Arity::Exactly(1)),
        ("DEALLOC_ARENA", Arity::Exactly(0)),
        ("ALLOC_BLOCK", Arity::Exactly(2)),
        ("FREE_BLOCK", Arity::Exactly(1)),
        ("READ", Arity::Exactly(2)),
        // The payload may itself contain spaces.
        ("WRITE", Arity::AtLeast(3)),
        ("PMAP", Arity::Exactly(0)),
    ]);
}

#[derive(Error, Debug)]
pub enum CommandError {
    /// The line is not a well-formed command. `words` is the
    /// number of space-separated words it held.
    #[error("Invalid command. Please try again.")]
    Invalid { words: usize },
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads commands line by line. A `WRITE` whose payload is shorter
/// than its declared size keeps consuming lines until the payload
/// is complete, newlines included.
pub struct CommandReader<R> {
    input: R,
}

impl<R: BufRead> CommandReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        match self.input.read_line(&mut line)? {
            0 => Ok(None),
            _ => Ok(Some(line)),
        }
    }

    fn parse(&mut self, raw: &str) -> Result<Command, CommandError> {
        let line = raw.trim_end_matches('\n').trim_end_matches('\r');
        let newline = &raw[line.len()..];
        trace!("Command: {line:?}");

        // Arguments are counted by separators rather than by
        // non-empty words, so doubled spaces make a line invalid.
        let separators = line.matches(' ').count();
        let invalid = || CommandError::Invalid { words: separators + 1 };

        let name = line.split(' ').next().unwrap_or_default();
        let arity = ARITIES.get(name).copied().ok_or_else(invalid)?;
        if !arity.accepts(separators) {
            return Err(invalid());
        }

        let mut words = line.splitn(4, ' ').skip(1);
        let mut number = || -> Result<u64, CommandError> {
            words
                .next()
                .and_then(|word| word.parse().ok())
                .ok_or_else(invalid)
        };

        let command = match name {
            "ALLOC_ARENA" => Command::AllocArena { size: number()? },
            "DEALLOC_ARENA" => Command::DeallocArena,
            "ALLOC_BLOCK" => Command::AllocBlock {
                address: number()?,
                size: number()?,
            },
            "FREE_BLOCK" => Command::FreeBlock { address: number()? },
            "READ" => Command::Read {
                address: number()?,
                size: number()?,
            },
            "WRITE" => {
                let address = number()?;
                let size = number()?;
                let rest = words.next().unwrap_or_default();
                let data = self.payload(rest, newline, size)?;
                Command::Write { address, size, data }
            }
            "PMAP" => Command::Pmap,
            _ => return Err(invalid()),
        };

        Ok(command)
    }

    fn payload(&mut self, rest: &str, newline: &str, size: u64) -> Result<Vec<u8>, CommandError> {
        let mut data = format!("{rest}{newline}").into_bytes();

        while (data.len() as u64) < size {
            match self.read_line()? {
                Some(line) => data.extend_from_slice(line.as_bytes()),
                None => break,
            }
        }

        if let Ok(size) = usize::try_from(size) {
            data.truncate(size);
        }
        Ok(data)
    }
}

impl<R: BufRead> Iterator for CommandReader<R> {
    type Item = Result<Command, CommandError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_line() {
            Ok(Some(line)) => Some(self.parse(&line)),
            Ok(None) => None,
            Err(error) => Some(Err(error.into())),
        }
    }
}
