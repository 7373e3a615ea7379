use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use pocketboy::ScriptHost;
use pocketboy_gb::System;

/// Game Boy emulator with a scriptable debugger.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// ROM file to run
    rom: PathBuf,

    /// Boot image (max 256 bytes) to load at address 0; execution starts
    /// from it
    #[arg(long, value_name = "FILE")]
    bootstrap: Option<PathBuf>,

    /// Debug script to attach before stepping begins
    #[arg(long, value_name = "FILE")]
    debug: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rom = fs::read(&args.rom)
        .with_context(|| format!("failed to read ROM {}", args.rom.display()))?;
    log::info!("loaded {} byte ROM from {}", rom.len(), args.rom.display());

    let mut system = System::new();
    system.load_rom(&rom);

    if let Some(path) = &args.bootstrap {
        system
            .perform_bootstrap(path)
            .with_context(|| format!("error loading {}", path.display()))?;
    }

    // A broken debug script aborts startup; running without the debugger
    // the user asked for is worse than not running.
    let _script = match &args.debug {
        Some(path) => Some(
            ScriptHost::load(&mut system, path)
                .with_context(|| format!("error loading {}", path.display()))?,
        ),
        None => None,
    };

    pocketboy::run(system)
}
