#![allow(dead_code)]

use std::path::PathBuf;

use clap::Parser;
use log::info;

use error::BuildError;
use filesystem::builder::{Geometry, DEFAULT_INODES, DEFAULT_LOG_BLOCKS, DEFAULT_SIZE};
use filesystem::fixture::{self, Corruption, InputFile};

mod error;
mod filesystem;
mod structs;

/// Build an xv6 file system image, optionally with one injected defect
#[derive(Debug, Parser)]
#[command(name = "mkfs")]
struct Args {
    /// Image to create
    output: PathBuf,
    /// Files placed in the root directory
    files: Vec<PathBuf>,
    /// Defect to inject
    #[arg(short, long, value_enum)]
    corrupt: Option<Corruption>,
    /// Total blocks
    #[arg(long, default_value_t = DEFAULT_SIZE)]
    size: u32,
    /// Inode table capacity
    #[arg(long, default_value_t = DEFAULT_INODES)]
    inodes: u32,
    /// Log blocks
    #[arg(long, default_value_t = DEFAULT_LOG_BLOCKS)]
    log_blocks: u32,
}

fn run(args: &Args) -> Result<(), BuildError> {
    let geometry = Geometry {
        size: args.size,
        inodes: args.inodes,
        log_blocks: args.log_blocks,
    };
    let files = args
        .files
        .iter()
        .map(|path| InputFile::from_path(path))
        .collect::<Result<Vec<_>, _>>()?;
    let image = fixture::build(geometry, &files, args.corrupt)?;
    std::fs::write(&args.output, image)?;
    match args.corrupt {
        Some(mode) => info!(
            "Wrote {} with {mode:?}, expecting \"{}\"",
            args.output.display(),
            mode.expected()
        ),
        None => info!("Wrote {}", args.output.display()),
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("mkfs: {e}");
        std::process::exit(libc::EXIT_FAILURE);
    }
}
