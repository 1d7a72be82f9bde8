#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;

use filesystem::Filesystem;

mod check;
mod error;
mod filesystem;
mod structs;

/// Inspect an xv6 file system image
#[derive(Debug, Parser)]
#[command(name = "debugger")]
struct Args {
    /// File system image
    #[arg(default_value = "fs.img")]
    image: PathBuf,
}

enum Flow {
    Continue,
    Quit,
}

fn prompt(separator: &str) -> Option<Vec<String>> {
    let mut line = String::new();
    print!("{separator}");
    std::io::stdout().flush().ok()?;
    match std::io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.split_whitespace().map(str::to_string).collect()),
    }
}

fn execute(fs: &Filesystem, cmd: &[String]) -> Result<Flow, Box<dyn std::error::Error>> {
    let Some(name) = cmd.first() else {
        return Ok(Flow::Continue);
    };
    let index = || -> Result<u32, Box<dyn std::error::Error>> {
        let arg = cmd.get(1).ok_or("missing index")?;
        Ok(arg.parse()?)
    };
    match name.as_str() {
        "s" => println!["{}", fs.superblock()],
        "i" => println!["{}", fs.inode(index()?)?],
        "b" => println!["{}", fs.block(index()?)?],
        "d" => {
            let inode = fs.inode(index()?)?;
            for entry in fs.entries(&inode)?.iter().filter(|e| !e.is_free()) {
                println!["{entry}"];
            }
        }
        "c" => match check::check(fs) {
            Ok(summary) => println!["consistent: {summary}"],
            Err(e) => println!["{e}"],
        },
        "q" => return Ok(Flow::Quit),
        other => println!["unknown command {other:?}, expected one of s i b d c q"],
    }
    Ok(Flow::Continue)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let fs = Filesystem::open(&args.image)?;
    while let Some(cmd) = prompt(">> ") {
        match execute(&fs, &cmd) {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => eprintln!("{e}"),
        }
    }
    Ok(())
}
