#![allow(dead_code)]

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::error::ErrorKind;
use clap::Parser;
use log::info;

use error::Error;
use filesystem::Filesystem;

mod check;
mod error;
mod filesystem;
mod structs;

/// Check an xv6 file system image for inconsistencies
#[derive(Debug, Parser)]
#[command(name = "xvfsck", version)]
struct Args {
    /// File system image
    image: PathBuf,
}

fn parse_args<I, T>(args: I) -> Result<Args, Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(args).map_err(|e| match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
        _ => Error::Usage,
    })
}

fn run(image: &Path) -> Result<(), Error> {
    let fs = Filesystem::open(image)?;
    let summary = check::check(&fs)?;
    info!("{}: {summary}", image.display());
    Ok(())
}

fn main() {
    env_logger::init();
    let status = match parse_args(std::env::args_os()).and_then(|args| run(&args.image)) {
        Ok(()) => libc::EXIT_SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            libc::EXIT_FAILURE
        }
    };
    std::process::exit(status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FormatError, ImageError};
    use crate::filesystem::builder::Geometry;
    use crate::filesystem::fixture::{build, Corruption, InputFile};

    fn write_image(dir: &tempfile::TempDir, corruption: Option<Corruption>) -> PathBuf {
        let files = [InputFile::new("README", b"hello\n")];
        let image = build(Geometry::default(), &files, corruption).unwrap();
        let path = dir.path().join("fs.img");
        std::fs::write(&path, image).unwrap();
        path
    }

    #[test]
    fn consistent_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(&dir, None);
        assert!(run(&path).is_ok());
    }

    #[test]
    fn corrupted_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(&dir, Some(Corruption::InodeNotFound));
        let e = run(&path).unwrap_err();
        assert!(matches!(e, Error::Format(FormatError::Orphan)));
        assert_eq!(
            e.to_string(),
            "ERROR: inode marked in use but not found in a directory."
        );
    }

    #[test]
    fn missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let e = run(&dir.path().join("absent.img")).unwrap_err();
        assert!(matches!(e, Error::Image(ImageError::Io(_))));
        assert_eq!(e.to_string(), "image not found.");
    }

    #[test]
    fn usage() {
        let args = parse_args(["xvfsck", "fs.img"]).unwrap();
        assert_eq!(args.image, PathBuf::from("fs.img"));
        assert!(matches!(parse_args(["xvfsck"]), Err(Error::Usage)));
        assert!(matches!(
            parse_args(["xvfsck", "a.img", "b.img"]),
            Err(Error::Usage)
        ));
        assert_eq!(
            Error::Usage.to_string(),
            "Usage: xvfsck <file_system_image>"
        );
    }
}
