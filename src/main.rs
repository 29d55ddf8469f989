use std::{
    fs::File,
    io::{self, BufReader, Write},
};

use anyhow::{Context, Result};
use log::*;

use arena_sim::app::Session;

fn main() -> Result<()> {
    // Only warnings (truncated accesses, replaced arenas) are
    // shown by default, so that the log does not drown the
    // command output.
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "warn");
    }
    pretty_env_logger::init();

    let mut out = io::stdout().lock();
    let mut session = Session::new();

    // Commands come from the script given as first argument, or
    // from the standard input when there is none.
    match std::env::args_os().nth(1) {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open {}", path.to_string_lossy()))?;
            info!("Reading commands from {}.", path.to_string_lossy());
            session.run(BufReader::new(file), &mut out)?;
        }
        None => session.run(io::stdin().lock(), &mut out)?,
    }

    out.flush()?;
    session.close();
    Ok(())
}
